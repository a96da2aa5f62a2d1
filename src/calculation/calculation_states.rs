use crate::{Deck, HandValue};
use std::collections::HashMap;

/// What the post-split policy does with a split hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitDecision {
    Stand,
    Hit,
    Double,
}

/// A final hand reachable from one split card, together with the number of
/// draw orders that end in it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayableHand {
    /// Cards drawn after the split card, by value.
    pub drawn: [u8; 10],
    pub value: HandValue,
    pub doubled: bool,
    /// The first card drawn paired the split card again.
    pub paired: bool,
    pub frequency: u32,
}

impl PlayableHand {
    pub fn number_of_drawn_cards(&self) -> usize {
        self.drawn.iter().map(|&count| count as usize).sum()
    }

    pub fn multiplier(&self) -> f64 {
        if self.doubled {
            2.0
        } else {
            1.0
        }
    }
}

type PlayableHandKey = ([u8; 10], bool, bool);

/// Gathers every final hand a split hand starting with `split_card` can end
/// in, when it's played by `policy` on `shoe` (the unseen cards at the time
/// of the split).
///
/// The policy sees the hand and `shoe` minus the hand's own draws. Split Aces
/// receive exactly one card and never consult it. Hands reached through
/// different draw orders are merged into one entry whose `frequency` counts
/// those orders.
pub fn gather_playable_hands<F>(split_card: u8, shoe: &mut Deck, policy: &mut F) -> Vec<PlayableHand>
where
    F: FnMut(HandValue, &mut Deck) -> SplitDecision,
{
    let mut hands = Vec::new();
    let mut index = HashMap::new();
    let mut drawn = [0u8; 10];
    let split_hand = HandValue::split_card(split_card);

    for card in 1..=10 {
        if !shoe.remove(card) {
            continue;
        }
        drawn[(card - 1) as usize] += 1;
        let hand = split_hand.with_card(card);
        let paired = card == split_card;
        if split_card == 1 {
            record(&mut hands, &mut index, &drawn, hand, false, paired);
        } else {
            play_split_hand(hand, paired, shoe, &mut drawn, policy, &mut hands, &mut index);
        }
        drawn[(card - 1) as usize] -= 1;
        shoe.restore(card);
    }

    hands
}

fn play_split_hand<F>(
    // Input parameters
    hand: HandValue,
    paired: bool,

    // Parameters to maintain current state
    shoe: &mut Deck,
    drawn: &mut [u8; 10],
    policy: &mut F,

    // Output parameters
    hands: &mut Vec<PlayableHand>,
    index: &mut HashMap<PlayableHandKey, usize>,
) where
    F: FnMut(HandValue, &mut Deck) -> SplitDecision,
{
    if hand.bust() || hand.get_actual_sum() >= 21 {
        record(hands, index, drawn, hand, false, paired);
        return;
    }

    match policy(hand, shoe) {
        SplitDecision::Stand => record(hands, index, drawn, hand, false, paired),
        SplitDecision::Double => {
            for card in 1..=10 {
                if !shoe.remove(card) {
                    continue;
                }
                drawn[(card - 1) as usize] += 1;
                record(hands, index, drawn, hand.with_card(card), true, paired);
                drawn[(card - 1) as usize] -= 1;
                shoe.restore(card);
            }
        }
        SplitDecision::Hit => {
            for card in 1..=10 {
                if !shoe.remove(card) {
                    continue;
                }
                drawn[(card - 1) as usize] += 1;
                play_split_hand(
                    hand.with_card(card),
                    paired,
                    shoe,
                    drawn,
                    policy,
                    hands,
                    index,
                );
                drawn[(card - 1) as usize] -= 1;
                shoe.restore(card);
            }
        }
    }
}

fn record(
    hands: &mut Vec<PlayableHand>,
    index: &mut HashMap<PlayableHandKey, usize>,
    drawn: &[u8; 10],
    value: HandValue,
    doubled: bool,
    paired: bool,
) {
    let key = (*drawn, doubled, paired);
    match index.get(&key) {
        Some(&i) => hands[i].frequency += 1,
        None => {
            index.insert(key, hands.len());
            hands.push(PlayableHand {
                drawn: *drawn,
                value,
                doubled,
                paired,
                frequency: 1,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_aces_take_one_card() {
        let mut shoe = Deck::with_number_of_decks(1);
        shoe.remove_pair(1, 1);
        let mut policy = |_: HandValue, _: &mut Deck| -> SplitDecision {
            panic!("split aces never consult the policy")
        };
        let hands = gather_playable_hands(1, &mut shoe, &mut policy);
        assert_eq!(hands.len(), 10);
        assert!(hands.iter().all(|hand| hand.number_of_drawn_cards() == 1));
        assert_eq!(hands.iter().filter(|hand| hand.paired).count(), 1);
        assert_eq!(shoe.get_total(), 50);
    }

    #[test]
    fn draw_orders_are_merged() {
        // Hit everything below 17.
        let mut policy = |hand: HandValue, _: &mut Deck| {
            if hand.get_actual_sum() < 17 {
                SplitDecision::Hit
            } else {
                SplitDecision::Stand
            }
        };
        let mut shoe = Deck::new(&[0, 1, 1, 0, 0, 0, 0, 0, 1, 0]);
        let before = shoe.clone();
        let hands = gather_playable_hands(8, &mut shoe, &mut policy);
        assert_eq!(shoe, before);

        // 8+2+3 and 8+3+2 both end in 13+9 = 22.
        let merged = hands
            .iter()
            .find(|hand| hand.drawn == [0, 1, 1, 0, 0, 0, 0, 0, 1, 0])
            .unwrap();
        assert!(merged.value.bust());
        // 8,2,3,9 / 8,3,2,9 / 8,2,9 (19: stand) / 8,3,9 (20: stand)
        // 8,9 (17: stand)
        assert_eq!(merged.frequency, 2);
        assert_eq!(hands.iter().map(|hand| hand.frequency).sum::<u32>(), 5);
    }

    #[test]
    fn double_records_one_card() {
        let mut policy = |_: HandValue, _: &mut Deck| SplitDecision::Double;
        let mut shoe = Deck::new(&[0, 0, 1, 0, 0, 0, 0, 0, 0, 2]);
        let hands = gather_playable_hands(8, &mut shoe, &mut policy);
        // 8,3 doubles into a ten. 8,10 doubles into the 3 or a ten, and
        // 8,10,3 lands on the same cards as 8,3,10.
        assert!(hands.iter().all(|hand| hand.doubled));
        assert_eq!(hands.len(), 2);
        assert_eq!(hands.iter().map(|hand| hand.frequency).sum::<u32>(), 3);
    }
}
