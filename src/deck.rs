use crate::Error;
use std::ops::Index;

/// Remaining count of each card value, used directly as a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Composition(pub [u16; 10]);

/// The unseen cards of the shoe, by card value (from 1 to 10 inclusive, 10
/// standing for every ten-valued card).
///
/// Recursions mutate a single `Deck` through paired `remove`/`restore` calls
/// rather than copying it on every level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    counts: [u16; 10],
    total: u16,
}

impl Deck {
    pub fn new(counts: &[u16; 10]) -> Deck {
        Deck {
            counts: *counts,
            total: counts.iter().sum(),
        }
    }

    pub fn with_number_of_decks(number_of_decks: u8) -> Deck {
        let mut counts = [number_of_decks as u16 * 4; 10];
        counts[9] = number_of_decks as u16 * 16;
        Self::new(&counts)
    }

    /// Builds the unseen part of a fresh shoe given how many cards of each
    /// displayed label have already been dealt.
    pub fn from_dealt_tally<'a, I>(number_of_decks: u8, tally: I) -> Result<Deck, Error>
    where
        I: IntoIterator<Item = (&'a str, u16)>,
    {
        let mut deck = Self::with_number_of_decks(number_of_decks);
        let mut dealt = [0u16; 10];
        for (label, count) in tally {
            let card_value = crate::card_value_from_label(label)?;
            let index = (card_value - 1) as usize;
            dealt[index] = dealt[index].saturating_add(count);
        }
        for card_value in 1..=10u8 {
            let index = (card_value - 1) as usize;
            if dealt[index] > deck.counts[index] {
                return Err(Error::OverDealt {
                    rank: card_value,
                    dealt: dealt[index],
                    available: deck.counts[index],
                });
            }
            deck.counts[index] -= dealt[index];
            deck.total -= dealt[index];
        }

        Ok(deck)
    }

    pub fn get_count(&self, card_value: u8) -> u16 {
        self.counts[(card_value - 1) as usize]
    }

    pub fn get_total(&self) -> u16 {
        self.total
    }

    pub fn composition(&self) -> Composition {
        Composition(self.counts)
    }

    /// Fraction of the unseen cards holding the given value.
    pub fn density(&self, card_value: u8) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.get_count(card_value) as f64 / self.total as f64
    }

    /// Removes one card of the given value. Returns false and leaves the deck
    /// untouched if that value is exhausted.
    pub fn remove(&mut self, card_value: u8) -> bool {
        let index = (card_value - 1) as usize;
        if self.counts[index] == 0 {
            return false;
        }
        self.counts[index] -= 1;
        self.total -= 1;
        true
    }

    /// Puts back a card taken by a successful `remove`.
    pub fn restore(&mut self, card_value: u8) {
        self.counts[(card_value - 1) as usize] += 1;
        self.total += 1;
    }

    /// Removes the two cards of a pair, rolling the first one back if the
    /// second cannot be taken.
    pub fn remove_pair(&mut self, first: u8, second: u8) -> bool {
        if !self.remove(first) {
            return false;
        }
        if !self.remove(second) {
            self.restore(first);
            return false;
        }
        true
    }

    pub fn restore_pair(&mut self, first: u8, second: u8) {
        self.restore(second);
        self.restore(first);
    }

    /// Removes a card drawn by the player and returns the probability of that
    /// draw.
    ///
    /// When `avoid_dealer_blackjack` is set and the up card is an Ace or a
    /// Ten, the probability is conditioned on the dealer's hole card not
    /// completing a natural. The hole card is one of the unseen cards, so with
    /// `N` cards of which `n_b` complete the natural:
    ///
    /// `P(c) = n_c / (N - 1)` for `c == b`, and
    /// `P(c) = n_c / (N - 1) * (N - n_b - 1) / (N - n_b)` otherwise.
    pub fn remove_with_weight(
        &mut self,
        card_value: u8,
        avoid_dealer_blackjack: bool,
        dealer_up_card: u8,
    ) -> Option<f64> {
        let count = self.get_count(card_value) as f64;
        if count == 0.0 {
            return None;
        }
        let total = self.total as f64;
        let completing_card = match dealer_up_card {
            1 if avoid_dealer_blackjack => Some(10),
            10 if avoid_dealer_blackjack => Some(1),
            _ => None,
        };
        let weight = match completing_card {
            Some(b) if self.total > 1 && self.get_count(b) < self.total => {
                let n_b = self.get_count(b) as f64;
                let weight = count / (total - 1.0);
                if card_value == b {
                    weight
                } else {
                    weight * (total - n_b - 1.0) / (total - n_b)
                }
            }
            _ => count / total,
        };
        self.remove(card_value);

        Some(weight)
    }

    /// Removes the dealer's hole card. After a peek the hole card cannot be
    /// `excluded`, so it is drawn from the other cards only. If nothing but
    /// `excluded` cards remain, the condition is dropped.
    pub fn remove_hole_card(&mut self, card_value: u8, excluded: Option<u8>) -> Option<f64> {
        let count = self.get_count(card_value);
        if count == 0 {
            return None;
        }
        let eligible = match excluded {
            Some(x) if self.get_count(x) < self.total => {
                if x == card_value {
                    return None;
                }
                self.total - self.get_count(x)
            }
            _ => self.total,
        };
        self.remove(card_value);

        Some(count as f64 / eligible as f64)
    }

    /// Probability that the next card completes a dealer natural against the
    /// given up card. Only meaningful for Ace and Ten up cards.
    pub fn p_hole_completes_natural(&self, dealer_up_card: u8) -> f64 {
        match dealer_up_card {
            1 => self.density(10),
            10 => self.density(1),
            _ => 0.0,
        }
    }
}

impl Index<u8> for Deck {
    type Output = u16;
    fn index(&self, index: u8) -> &Self::Output {
        &self.counts[(index - 1) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn generate_random_counts(number_of_decks: u8) -> [u16; 10] {
        let mut rng = rand::thread_rng();
        let mut counts: [u16; 10] = [0; 10];
        for count in counts.iter_mut().take(9) {
            *count = rng.gen_range(0..=(number_of_decks as u16) * 4);
        }
        counts[9] = rng.gen_range(0..=(number_of_decks as u16) * 16);

        counts
    }

    #[test]
    fn fresh_single_deck_densities() {
        let deck = Deck::with_number_of_decks(1);
        assert_eq!(deck.get_total(), 52);
        assert!((deck.density(10) - 16.0 / 52.0).abs() < 1e-12);
        assert!((deck.density(1) - 4.0 / 52.0).abs() < 1e-12);
        for card_value in 2..=9 {
            assert_eq!(deck[card_value], 4);
        }
    }

    #[test]
    fn remove_and_restore_conserve_counts() {
        let mut rng = rand::thread_rng();
        for _turn in 0..20 {
            let counts = generate_random_counts(6);
            let mut deck = Deck::new(&counts);
            let before = deck.clone();

            let mut removed = Vec::new();
            for _ in 0..30 {
                let card_value = rng.gen_range(1..=10);
                if deck.remove_with_weight(card_value, true, 1).is_some() {
                    removed.push(card_value);
                }
            }
            assert_eq!(
                deck.get_total() as usize + removed.len(),
                before.get_total() as usize
            );
            while let Some(card_value) = removed.pop() {
                deck.restore(card_value);
            }

            assert_eq!(deck, before);
            for card_value in 1..=10 {
                assert_eq!(deck.get_count(card_value), counts[(card_value - 1) as usize]);
            }
        }
    }

    #[test]
    fn remove_exhausted_card_is_a_no_op() {
        let mut deck = Deck::new(&[0, 1, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(!deck.remove(1));
        assert_eq!(deck.remove_with_weight(5, false, 6), None);
        assert_eq!(deck.get_total(), 1);
        assert!(!deck.remove_pair(2, 2));
        assert_eq!(deck.get_count(2), 1);
        assert!(deck.remove(2));
        assert_eq!(deck.get_total(), 0);
    }

    #[test]
    fn conditioned_weights_sum_to_one() {
        for _turn in 0..20 {
            let counts = generate_random_counts(2);
            let mut deck = Deck::new(&counts);
            if deck.get_total() == 0 {
                continue;
            }
            for dealer_up_card in [1, 10] {
                let mut sum = 0.0;
                for card_value in 1..=10 {
                    if let Some(weight) = deck.remove_with_weight(card_value, true, dealer_up_card) {
                        sum += weight;
                        deck.restore(card_value);
                    }
                }
                assert!((sum - 1.0).abs() < 1e-12, "{:?}: {}", counts, sum);

                let excluded = if dealer_up_card == 1 { 10 } else { 1 };
                let mut sum = 0.0;
                for card_value in 1..=10 {
                    if let Some(weight) = deck.remove_hole_card(card_value, Some(excluded)) {
                        sum += weight;
                        deck.restore(card_value);
                    }
                }
                assert!((sum - 1.0).abs() < 1e-12, "{:?}: {}", counts, sum);
            }
        }
    }

    #[test]
    fn conditioned_weight_matches_closed_form() {
        // 3 tens and 2 sixes: given that the hole card isn't a ten, the hole
        // card is a six and only one six is left for the player.
        let mut deck = Deck::new(&[0, 0, 0, 0, 0, 2, 0, 0, 0, 3]);
        let p_six = deck.remove_with_weight(6, true, 1).unwrap_or_default();
        deck.restore(6);
        assert!((p_six - 0.25).abs() < 1e-12);
        let p_ten = deck.remove_with_weight(10, true, 1).unwrap_or_default();
        deck.restore(10);
        assert!((p_ten - 0.75).abs() < 1e-12);
    }

    #[test]
    fn build_from_dealt_tally() {
        let deck = Deck::from_dealt_tally(
            1,
            [("K", 2), ("q", 1), ("10", 1), ("T", 1), ("J", 1), ("A", 1), ("5", 3)],
        )
        .unwrap();
        assert_eq!(deck.get_count(10), 10);
        assert_eq!(deck.get_count(1), 3);
        assert_eq!(deck.get_count(5), 1);
        assert_eq!(deck.get_total(), 52 - 10);

        assert_eq!(
            Deck::from_dealt_tally(1, [("5", 5)]),
            Err(Error::OverDealt {
                rank: 5,
                dealt: 5,
                available: 4
            })
        );
        assert_eq!(
            Deck::from_dealt_tally(1, [("Z", 1)]),
            Err(Error::UnknownRankLabel(String::from("Z")))
        );
    }
}
