use super::{EvCalculator, HandKey, SplitDecision};
use crate::{Deck, HandValue};

impl<'a> EvCalculator<'a> {
    fn avoid_dealer_blackjack(&self, dealer_up_card: u8) -> bool {
        self.rule.impossible_hole_card(dealer_up_card).is_some()
    }

    /// Probability the dealer turns over a natural that no peek has ruled out.
    fn p_unpeeked_dealer_natural(&self, dealer_up_card: u8, shoe: &Deck) -> f64 {
        if self.rule.dealer_may_have_natural(dealer_up_card) {
            shoe.p_hole_completes_natural(dealer_up_card)
        } else {
            0.0
        }
    }

    /// Expectation of standing now, per unit bet.
    pub(crate) fn stand_expectation(
        &mut self,
        hand: HandValue,
        dealer_up_card: u8,
        shoe: &Deck,
    ) -> f64 {
        if hand.bust() {
            return -1.0;
        }
        if hand.is_natural() {
            // A dealer natural pushes.
            let p = self.p_unpeeked_dealer_natural(dealer_up_card, shoe);
            return self.rule.payout_blackjack.as_f64() * (1.0 - p);
        }

        self.dealer
            .distribution(dealer_up_card, shoe)
            .expectation(hand.get_actual_sum())
    }

    /// Expectation of taking one more card and then playing on optimally.
    /// `None` if no card can be drawn.
    pub(crate) fn hit_expectation(
        &mut self,
        hand: HandValue,
        dealer_up_card: u8,
        shoe: &mut Deck,
    ) -> Option<f64> {
        let avoid = self.avoid_dealer_blackjack(dealer_up_card);
        let mut expectation = None;
        for card in 1..=10 {
            let Some(p) = shoe.remove_with_weight(card, avoid, dealer_up_card) else {
                continue;
            };
            let ex = self.continuation_expectation(hand.with_card(card), dealer_up_card, shoe);
            shoe.restore(card);
            *expectation.get_or_insert(0.0) += p * ex;
        }

        expectation
    }

    /// Expectation of doubling: exactly one more card, then stand on twice
    /// the bet.
    pub(crate) fn double_expectation(
        &mut self,
        hand: HandValue,
        dealer_up_card: u8,
        shoe: &mut Deck,
    ) -> Option<f64> {
        let avoid = self.avoid_dealer_blackjack(dealer_up_card);
        let mut expectation = None;
        for card in 1..=10 {
            let Some(p) = shoe.remove_with_weight(card, avoid, dealer_up_card) else {
                continue;
            };
            let ex = self.stand_expectation(hand.with_card(card), dealer_up_card, shoe);
            shoe.restore(card);
            *expectation.get_or_insert(0.0) += p * ex;
        }

        expectation.map(|ex| 2.0 * ex)
    }

    /// Half the bet back, unless a dealer natural nobody peeked for takes the
    /// whole bet first.
    pub(crate) fn surrender_expectation(&self, dealer_up_card: u8, shoe: &Deck) -> f64 {
        let p = self.p_unpeeked_dealer_natural(dealer_up_card, shoe);
        -0.5 * (1.0 - p) - p
    }

    /// The better of standing and hitting for a hand that can neither double,
    /// split nor surrender anymore.
    pub(crate) fn continuation_expectation(
        &mut self,
        hand: HandValue,
        dealer_up_card: u8,
        shoe: &mut Deck,
    ) -> f64 {
        // Obvious case 1: Bust.
        if hand.bust() {
            return -1.0;
        }

        // Obvious case 2: Current actual sum is 21. Stand!
        if hand.get_actual_sum() == 21 {
            return self.stand_expectation(hand, dealer_up_card, shoe);
        }

        let key = HandKey {
            dealer_up_card,
            hand_sum: hand.get_sum(),
            has_ace: hand.has_ace(),
            natural: hand.is_natural(),
            composition: shoe.composition(),
        };
        if let Some(ex) = self.continuations.get(&key) {
            return ex;
        }

        let stand = self.stand_expectation(hand, dealer_up_card, shoe);
        let ex = match self.hit_expectation(hand, dealer_up_card, shoe) {
            Some(hit) if hit > stand => hit,
            _ => stand,
        };
        self.continuations.insert(key, ex);

        ex
    }

    /// Decision of the post-split policy for a split hand holding at least
    /// two cards: the argmax of stand, hit and (when allowed after a split)
    /// double, judged on the hand alone.
    pub(crate) fn split_decision(
        &mut self,
        hand: HandValue,
        dealer_up_card: u8,
        shoe: &mut Deck,
    ) -> SplitDecision {
        let mut best = (self.stand_expectation(hand, dealer_up_card, shoe), SplitDecision::Stand);
        if let Some(hit) = self.hit_expectation(hand, dealer_up_card, shoe) {
            if hit > best.0 {
                best = (hit, SplitDecision::Hit);
            }
        }
        if hand.number_of_cards() == 2
            && self
                .rule
                .allows_double(hand.get_sum(), hand.is_soft(), true)
        {
            if let Some(double) = self.double_expectation(hand, dealer_up_card, shoe) {
                if double > best.0 {
                    best = (double, SplitDecision::Double);
                }
            }
        }

        best.1
    }
}

#[cfg(test)]
mod tests {
    use crate::{Deck, EvCalculator, HandValue, PeekPolicy, Rule};

    #[test]
    fn hit_tree_on_a_tiny_shoe() {
        // Hand 12 against a 6 with only a five and a ten left, no peek
        // conditioning for a 6.
        let rule = Rule::default();
        let mut calculator = EvCalculator::new(&rule).unwrap();
        let mut shoe = Deck::new(&[0, 0, 0, 0, 1, 0, 0, 0, 0, 1]);
        let hand = HandValue::empty(false).with_card(10).with_card(2);

        // Hitting draws the five (17) or the ten (bust), each with p = 1/2.
        // With the five drawn the dealer holds 6 + 10 and must hit into
        // nothing, so the dealer is frozen on 16 and scored as 17: a push.
        let hit = calculator.hit_expectation(hand, 6, &mut shoe).unwrap();
        assert!((hit - (0.5 * 0.0 + 0.5 * -1.0)).abs() < 1e-12, "{}", hit);
        assert_eq!(shoe, Deck::new(&[0, 0, 0, 0, 1, 0, 0, 0, 0, 1]));
    }

    #[test]
    fn surrender_without_peek_loses_to_a_natural() {
        let rule = Rule {
            peek_policy: PeekPolicy::NoPeek,
            ..Default::default()
        };
        let calculator = EvCalculator::new(&rule).unwrap();
        let shoe = Deck::new(&[1, 0, 0, 0, 0, 0, 0, 0, 0, 3]);
        let ex = calculator.surrender_expectation(10, &shoe);
        assert!((ex - (-0.5 * 0.75 - 0.25)).abs() < 1e-12);
        assert_eq!(calculator.surrender_expectation(9, &shoe), -0.5);
    }

    #[test]
    fn continuation_is_cached() {
        let rule = Rule::default();
        let mut calculator = EvCalculator::new(&rule).unwrap();
        let mut shoe = Deck::with_number_of_decks(1);
        shoe.remove_pair(10, 3);
        shoe.remove(9);
        let hand = HandValue::empty(false).with_card(10).with_card(3).with_card(2);
        let first = calculator.continuation_expectation(hand, 9, &mut shoe);
        let second = calculator.continuation_expectation(hand, 9, &mut shoe);
        assert_eq!(first.to_bits(), second.to_bits());
        assert!(calculator.stats().1.hits > 0);
    }
}
