use crate::cache::{CacheStats, ResultCache};
use crate::{Composition, Deck, HandValue, Rule};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, trace};

const BUST: usize = 5;
const NATURAL: usize = 6;

/// Raw bucket masses while recursing.
// [0, 4] for [17, 21].
// 5 for Bust.
// 6 for a dealer natural, only reachable when the dealer doesn't peek.
type Buckets = [f64; 7];

/// Probabilities of the dealer's final hand for one up card and deck.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DealerOutcomeDistribution {
    probabilities: Buckets,
    /// Net expectation of standing on a player total of 16 or less, 17, ...,
    /// 21 (in that order) against this distribution.
    expectations: [f64; 6],
}

impl DealerOutcomeDistribution {
    fn new(probabilities: Buckets) -> Self {
        let mut expectations = [0.0; 6];
        let mut win = probabilities[BUST];
        let mut lose = probabilities[NATURAL] + probabilities[..5].iter().sum::<f64>();
        expectations[0] = win - lose;
        for total in 17..=21 {
            let p = probabilities[total - 17];
            lose -= p;
            expectations[total - 16] = win - lose;
            win += p;
        }

        Self {
            probabilities,
            expectations,
        }
    }

    /// Probability that the dealer stands on `total`, for totals in [17, 21].
    pub fn p_total(&self, total: u8) -> f64 {
        match total {
            17..=21 => self.probabilities[(total - 17) as usize],
            _ => 0.0,
        }
    }

    pub fn bust(&self) -> f64 {
        self.probabilities[BUST]
    }

    pub fn natural(&self) -> f64 {
        self.probabilities[NATURAL]
    }

    /// P17, P18, P19, P20, P21 and Pbust.
    pub fn outcomes(&self) -> [f64; 6] {
        let mut outcomes = [0.0; 6];
        outcomes.copy_from_slice(&self.probabilities[..6]);
        outcomes
    }

    pub fn total_probability(&self) -> f64 {
        self.probabilities.iter().sum()
    }

    pub fn is_normalized(&self, tolerance: f64) -> bool {
        (self.total_probability() - 1.0).abs() <= tolerance
    }

    pub fn expectations(&self) -> &[f64; 6] {
        &self.expectations
    }

    /// Net expectation of a non-natural player hand standing on `total`.
    pub fn expectation(&self, player_actual_sum: u8) -> f64 {
        match player_actual_sum {
            0..=16 => self.expectations[0],
            17..=21 => self.expectations[(player_actual_sum - 16) as usize],
            _ => -1.0,
        }
    }

    /// Probability that the dealer ends with a worse hand than a player
    /// standing on the given total.
    pub fn p_worse_than_player(&self, player_actual_sum: u8) -> f64 {
        let beaten = match player_actual_sum {
            0..=17 => 0,
            18..=21 => (player_actual_sum - 17) as usize,
            _ => return 0.0,
        };
        self.probabilities[BUST] + self.probabilities[..beaten].iter().sum::<f64>()
    }

    pub fn p_better_than_player(&self, player_actual_sum: u8) -> f64 {
        let from = match player_actual_sum {
            0..=16 => 0,
            17..=21 => (player_actual_sum - 16) as usize,
            _ => return 1.0,
        };
        self.probabilities[NATURAL] + self.probabilities[from..5].iter().sum::<f64>()
    }
}

/// Plays out the dealer's hand over every possible sequence of draws.
///
/// Results are cached by (up card, remaining composition) for the lifetime of
/// the engine, which is bound to a single `Rule`.
pub struct DealerEngine<'a> {
    rule: &'a Rule,
    cache: ResultCache<(u8, Composition), DealerOutcomeDistribution>,
    // Nodes of the evaluation in progress. Within one evaluation a
    // composition pins down the cards the dealer has drawn.
    states: HashMap<Composition, Buckets>,
    forced_stands: u64,
}

impl<'a> DealerEngine<'a> {
    pub fn new(rule: &'a Rule) -> Self {
        Self {
            rule,
            cache: ResultCache::with_capacity(1024),
            states: HashMap::with_capacity(4096),
            forced_stands: 0,
        }
    }

    pub fn rule(&self) -> &'a Rule {
        self.rule
    }

    pub fn distribution(&mut self, dealer_up_card: u8, deck: &Deck) -> DealerOutcomeDistribution {
        let key = (dealer_up_card, deck.composition());
        if let Some(distribution) = self.cache.get(&key) {
            return distribution;
        }
        trace!(dealer_up_card, total = deck.get_total(), "dealer cache miss");

        self.states.clear();
        let mut shoe = deck.clone();
        let excluded = self.rule.impossible_hole_card(dealer_up_card);
        let probabilities = self.memoization_dealer_get_cards(
            &mut shoe,
            HandValue::empty(false).with_card(dealer_up_card),
            dealer_up_card,
            excluded,
        );
        let distribution = DealerOutcomeDistribution::new(probabilities);
        self.cache.insert(key, distribution);

        distribution
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn forced_stands(&self) -> u64 {
        self.forced_stands
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.states.clear();
        self.forced_stands = 0;
    }

    fn memoization_dealer_get_cards(
        &mut self,
        shoe: &mut Deck,
        dealer_hand: HandValue,
        dealer_up_card: u8,
        excluded: Option<u8>,
    ) -> Buckets {
        let mut buckets = [0.0; 7];

        // Obvious case 1: Bust.
        if dealer_hand.bust() {
            buckets[BUST] = 1.0;
            return buckets;
        }

        // Obvious case 2: Natural. Can't happen after a peek, because the
        // hole card never completes it then.
        if dealer_hand.is_natural() {
            buckets[NATURAL] = 1.0;
            return buckets;
        }

        // Obvious case 3: Dealer stands. Soft 17 is checked first.
        let actual_sum = dealer_hand.get_actual_sum();
        let hits_soft17 =
            actual_sum == 17 && dealer_hand.is_soft() && self.rule.dealer_hit_on_soft17;
        if actual_sum >= 17 && !hits_soft17 {
            buckets[(actual_sum - 17) as usize] = 1.0;
            return buckets;
        }

        let composition = shoe.composition();
        if let Some(cached) = self.states.get(&composition) {
            return *cached;
        }

        let mut drew = false;
        for card in 1..=10 {
            let weight = if dealer_hand.number_of_cards() == 1 {
                shoe.remove_hole_card(card, excluded)
            } else {
                shoe.remove_with_weight(card, false, dealer_up_card)
            };
            let Some(weight) = weight else {
                continue;
            };
            drew = true;
            let next = self.memoization_dealer_get_cards(
                shoe,
                dealer_hand.with_card(card),
                dealer_up_card,
                excluded,
            );
            shoe.restore(card);
            for (bucket, p) in buckets.iter_mut().zip(next.iter()) {
                *bucket += p * weight;
            }
        }

        if !drew {
            // Nothing left to draw: the dealer's hand is frozen where it is.
            self.forced_stands += 1;
            debug!(actual_sum, "shoe exhausted, forcing the dealer to stand");
            buckets[(actual_sum.clamp(17, 21) - 17) as usize] = 1.0;
        }

        self.states.insert(composition, buckets);
        buckets
    }
}
