use super::calculation_states::{gather_playable_hands, PlayableHand};
use super::EvCalculator;
use crate::dealer::DealerEngine;
use crate::{Composition, Deck, Hand, HandValue, Rule};
use std::collections::HashMap;
use tracing::debug;

/// Probability mass of a set of split situations, with the bet each final
/// player total carries, weighted by that probability.
#[derive(Debug, Clone, Copy, Default)]
struct Stakes {
    probability: f64,
    // 0 for Bust.
    // 1 for 16 or less.
    // [2, 6] for [17, 21].
    by_total: [f64; 7],
}

impl Stakes {
    fn scaled(&self, p: f64) -> Self {
        let mut by_total = self.by_total;
        for stake in by_total.iter_mut() {
            *stake *= p;
        }
        Self {
            probability: self.probability * p,
            by_total,
        }
    }

    fn merge(&mut self, rhs: &Self) {
        self.probability += rhs.probability;
        for (stake, other) in self.by_total.iter_mut().zip(rhs.by_total.iter()) {
            *stake += other;
        }
    }

    fn settle(&mut self, hand: &PlayableHand) {
        let index = if hand.value.bust() {
            0
        } else {
            match hand.value.get_actual_sum() {
                0..=16 => 1,
                total => (total - 15) as usize,
            }
        };
        self.by_total[index] += self.probability * hand.multiplier();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SplitState {
    composition: Composition,
    /// Split hands still waiting for their second card.
    pending: u8,
    /// Hands the seat plays.
    hands: u8,
}

/// Combines the final hands of every split hand of a seat, drawing them one
/// after another from the same shoe.
///
/// Situations reached with the same remaining cards, pending hands and hand
/// count are merged. For a fixed final shoe the expectation is linear in the
/// stakes on each final total, so merging loses nothing.
pub struct SplitEnumerator<'r> {
    rule: &'r Rule,
    split_card: u8,
    dealer_up_card: u8,
    avoid_dealer_blackjack: bool,
}

impl<'r> SplitEnumerator<'r> {
    pub fn new(rule: &'r Rule, split_card: u8, dealer_up_card: u8) -> Self {
        Self {
            rule,
            split_card,
            dealer_up_card,
            avoid_dealer_blackjack: rule.impossible_hole_card(dealer_up_card).is_some(),
        }
    }

    /// Expected total return of the two hands created by splitting, where
    /// `shoe` excludes both split cards and `hands_in_play` counts the seat's
    /// hands right after this split.
    pub fn expected_value(
        &self,
        playable_hands: &[PlayableHand],
        shoe: &Deck,
        hands_in_play: u8,
        dealer: &mut DealerEngine,
    ) -> Option<f64> {
        // Indexed by the number of cards drawn since the split.
        let mut levels: Vec<HashMap<SplitState, Stakes>> = vec![HashMap::new()];
        levels[0].insert(
            SplitState {
                composition: shoe.composition(),
                pending: 2,
                hands: hands_in_play,
            },
            Stakes {
                probability: 1.0,
                ..Default::default()
            },
        );
        let mut finals: HashMap<Composition, Stakes> = HashMap::new();

        let mut level = 0;
        while level < levels.len() {
            let states = std::mem::take(&mut levels[level]);
            for (state, stakes) in states {
                let mut current_shoe = Deck::new(&state.composition.0);
                let can_resplit = self.rule.allows_split(self.split_card, state.hands, true);

                if can_resplit {
                    // The second card pairs again and starts a new hand.
                    if let Some(p) = current_shoe.remove_with_weight(
                        self.split_card,
                        self.avoid_dealer_blackjack,
                        self.dealer_up_card,
                    ) {
                        let next = SplitState {
                            composition: current_shoe.composition(),
                            pending: state.pending + 1,
                            hands: state.hands + 1,
                        };
                        current_shoe.restore(self.split_card);
                        push_state(&mut levels, level + 1, next, stakes.scaled(p));
                    }
                }

                for hand in playable_hands {
                    if can_resplit && hand.paired {
                        continue;
                    }
                    let Some(p) = self.sequence_probability(&mut current_shoe, &hand.drawn) else {
                        continue;
                    };
                    let mut next_stakes = stakes.scaled(p * hand.frequency as f64);
                    next_stakes.settle(hand);
                    let composition = remove_drawn(&state.composition, &hand.drawn);
                    if state.pending == 1 {
                        finals.entry(composition).or_default().merge(&next_stakes);
                    } else {
                        let next = SplitState {
                            composition,
                            pending: state.pending - 1,
                            hands: state.hands,
                        };
                        push_state(
                            &mut levels,
                            level + hand.number_of_drawn_cards(),
                            next,
                            next_stakes,
                        );
                    }
                }
            }
            level += 1;
        }

        debug!(
            split_card = self.split_card,
            playable_hands = playable_hands.len(),
            final_shoes = finals.len(),
            "split enumerated"
        );

        let mut total_probability = 0.0;
        let mut expectation = 0.0;
        for (composition, stakes) in &finals {
            total_probability += stakes.probability;
            expectation -= stakes.by_total[0];
            if stakes.by_total[1..].iter().all(|&stake| stake == 0.0) {
                continue;
            }
            let distribution = dealer.distribution(self.dealer_up_card, &Deck::new(&composition.0));
            expectation += stakes.by_total[1] * distribution.expectation(16);
            for total in 17..=21u8 {
                expectation += stakes.by_total[(total - 15) as usize] * distribution.expectation(total);
            }
        }

        if total_probability > 0.0 {
            Some(expectation / total_probability)
        } else {
            None
        }
    }

    /// Probability of drawing exactly the given cards in a row, which doesn't
    /// depend on their order. `None` if the shoe can't supply them.
    fn sequence_probability(&self, shoe: &mut Deck, drawn: &[u8; 10]) -> Option<f64> {
        let mut p = 1.0;
        let mut removed: Vec<u8> = Vec::with_capacity(8);
        'draw: for card in 1..=10u8 {
            for _ in 0..drawn[(card - 1) as usize] {
                match shoe.remove_with_weight(card, self.avoid_dealer_blackjack, self.dealer_up_card) {
                    Some(weight) => {
                        p *= weight;
                        removed.push(card);
                    }
                    None => {
                        p = 0.0;
                        break 'draw;
                    }
                }
            }
        }
        for &card in removed.iter().rev() {
            shoe.restore(card);
        }

        if p > 0.0 {
            Some(p)
        } else {
            None
        }
    }
}

fn push_state(
    levels: &mut Vec<HashMap<SplitState, Stakes>>,
    level: usize,
    state: SplitState,
    stakes: Stakes,
) {
    if levels.len() <= level {
        levels.resize_with(level + 1, HashMap::new);
    }
    levels[level].entry(state).or_default().merge(&stakes);
}

fn remove_drawn(composition: &Composition, drawn: &[u8; 10]) -> Composition {
    let mut counts = composition.0;
    for (count, &d) in counts.iter_mut().zip(drawn.iter()) {
        *count -= d as u16;
    }
    Composition(counts)
}

impl<'a> EvCalculator<'a> {
    /// Exact expectation of splitting `hand` (a pair), with every split hand
    /// played by the post-split policy.
    pub(crate) fn split_expectation(
        &mut self,
        hand: &Hand,
        dealer_up_card: u8,
        shoe: &mut Deck,
    ) -> Option<f64> {
        let split_card = hand.cards()[0];
        let mut policy =
            |value: HandValue, shoe: &mut Deck| self.split_decision(value, dealer_up_card, shoe);
        let playable_hands = gather_playable_hands(split_card, shoe, &mut policy);

        SplitEnumerator::new(self.rule, split_card, dealer_up_card).expected_value(
            &playable_hands,
            shoe,
            hand.hands_in_play() + 1,
            &mut self.dealer,
        )
    }

    /// The usual approximation of a split: each of the two hands is valued as
    /// if it were played alone from the shoe at the time of the split.
    pub fn approximate_split_expectation(
        &mut self,
        hand: &Hand,
        dealer_up_card: u8,
        shoe: &Deck,
    ) -> Option<f64> {
        if !hand.is_splittable() {
            return None;
        }
        let split_card = hand.cards()[0];
        let mut shoe = shoe.clone();
        let avoid = self.rule.impossible_hole_card(dealer_up_card).is_some();
        let start = HandValue::split_card(split_card);

        let mut expectation = None;
        for card in 1..=10 {
            let Some(p) = shoe.remove_with_weight(card, avoid, dealer_up_card) else {
                continue;
            };
            let value = start.with_card(card);
            let ex = if split_card == 1 {
                self.stand_expectation(value, dealer_up_card, &shoe)
            } else {
                self.best_split_hand_expectation(value, dealer_up_card, &mut shoe)
            };
            shoe.restore(card);
            *expectation.get_or_insert(0.0) += p * ex;
        }

        expectation.map(|ex| 2.0 * ex)
    }

    fn best_split_hand_expectation(
        &mut self,
        hand: HandValue,
        dealer_up_card: u8,
        shoe: &mut Deck,
    ) -> f64 {
        let mut best = self.continuation_expectation(hand, dealer_up_card, shoe);
        if self
            .rule
            .allows_double(hand.get_sum(), hand.is_soft(), true)
        {
            if let Some(double) = self.double_expectation(hand, dealer_up_card, shoe) {
                best = best.max(double);
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, DoubleAfterSplit, EvCalculator};

    fn get_shoe(number_of_decks: u8, removed: &[u8]) -> Deck {
        let mut deck = Deck::with_number_of_decks(number_of_decks);
        for &card in removed {
            assert!(deck.remove(card));
        }
        deck
    }

    #[test]
    fn eights_against_ten_differ_from_the_approximation() {
        let rule = Rule {
            allow_resplit: true,
            max_split_hands: 4,
            ..Default::default()
        };
        let hand = Hand::new(&[8, 8]).unwrap();
        let deck = get_shoe(1, &[8, 8, 10]);
        let mut calculator = EvCalculator::new(&rule).unwrap();
        let result = calculator.evaluate(&hand, 10, &deck).unwrap();
        let split = result.get(Action::Split).unwrap();
        let approximation = calculator
            .approximate_split_expectation(&hand, 10, &deck)
            .unwrap();
        assert!(
            (split - approximation).abs() > 1e-9,
            "{} vs {}",
            split,
            approximation
        );
        assert!(split > -1.0 && split < 0.0, "{}", split);
        assert!(split > result.get(Action::Stand).unwrap());
    }

    #[test]
    fn split_aces_without_resplit_need_no_policy() {
        // With no resplits and split Aces taking one card each, enumerating
        // both hands by hand is small enough to check directly.
        let rule = Rule::default();
        let deck = Deck::new(&[0, 0, 0, 0, 0, 0, 0, 1, 1, 2]);
        let mut calculator = EvCalculator::new(&rule).unwrap();
        let mut shoe = deck.clone();
        let hand = Hand::new(&[1, 1]).unwrap();
        let split = calculator.split_expectation(&hand, 7, &mut shoe).unwrap();
        assert_eq!(shoe, deck);

        let mut expected = 0.0;
        let mut first_shoe = deck.clone();
        for first in 1..=10 {
            let Some(p1) = first_shoe.remove_with_weight(first, false, 7) else {
                continue;
            };
            let mut second_shoe = first_shoe.clone();
            for second in 1..=10 {
                let Some(p2) = second_shoe.remove_with_weight(second, false, 7) else {
                    continue;
                };
                let distribution = calculator.dealer().distribution(7, &second_shoe);
                let total = |card: u8| HandValue::split_card(1).with_card(card).get_actual_sum();
                expected += p1
                    * p2
                    * (distribution.expectation(total(first))
                        + distribution.expectation(total(second)));
                second_shoe.restore(second);
            }
            first_shoe.restore(first);
        }

        assert!((split - expected).abs() < 1e-12, "{} vs {}", split, expected);
    }

    #[test]
    fn resplits_add_hands() {
        // Plenty of eights: with room for more hands, resplitting changes
        // the value of the split.
        let deck = Deck::new(&[0, 0, 0, 0, 0, 0, 0, 6, 2, 4]);
        let hand = Hand::new(&[8, 8]).unwrap();

        let no_resplit = Rule::default();
        let mut calculator = EvCalculator::new(&no_resplit).unwrap();
        let single = calculator
            .split_expectation(&hand, 9, &mut deck.clone())
            .unwrap();

        let resplit = Rule {
            allow_resplit: true,
            max_split_hands: 4,
            double_after_split: DoubleAfterSplit::NotAllowed,
            ..Default::default()
        };
        let mut calculator = EvCalculator::new(&resplit).unwrap();
        let multi = calculator
            .split_expectation(&hand, 9, &mut deck.clone())
            .unwrap();

        assert!((single - multi).abs() > 1e-9, "{} vs {}", single, multi);
    }
}
