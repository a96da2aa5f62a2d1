use crate::cache::{CacheStats, ResultCache};
use crate::dealer::DealerEngine;
use crate::{validate_card, Composition, Deck, Error, Hand, Rule};
use serde::Serialize;
use std::collections::BTreeMap;
use strum_macros::{Display, EnumIter};
use tracing::debug;

mod calculation_states;
mod split_ex;
mod stand_hit_ex;

pub use calculation_states::{gather_playable_hands, PlayableHand, SplitDecision};
pub use split_ex::SplitEnumerator;

/// Player actions, declared in tie-break priority order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    Stand,
    Hit,
    Double,
    Split,
    Surrender,
}

/// Expected value of every action allowed for a hand, plus the best one.
///
/// Actions the rules or the hand don't allow are absent from `evs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvResult {
    pub evs: BTreeMap<Action, f64>,
    pub best: Action,
    pub best_ev: f64,
}

impl EvResult {
    fn from_evs(evs: BTreeMap<Action, f64>) -> Self {
        let (mut best, mut best_ev) = (Action::Stand, -f64::INFINITY);
        // Iterates in priority order, so only a strictly better action wins.
        for (&action, &ev) in &evs {
            if ev > best_ev {
                best = action;
                best_ev = ev;
            }
        }

        Self { evs, best, best_ev }
    }

    pub fn get(&self, action: Action) -> Option<f64> {
        self.evs.get(&action).copied()
    }
}

/// Key of a cached "stand or keep hitting" value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct HandKey {
    dealer_up_card: u8,
    hand_sum: u8,
    has_ace: bool,
    natural: bool,
    composition: Composition,
}

/// Computes exact expectations for one `Rule`.
///
/// The caches are keyed by remaining composition, so they stay valid across
/// queries on different decks under the same rule. Create a new calculator
/// (or call [`EvCalculator::clear`]) for every top-level analysis.
pub struct EvCalculator<'a> {
    rule: &'a Rule,
    dealer: DealerEngine<'a>,
    continuations: ResultCache<HandKey, f64>,
}

impl<'a> EvCalculator<'a> {
    pub fn new(rule: &'a Rule) -> Result<Self, Error> {
        rule.validate()?;
        Ok(Self {
            rule,
            dealer: DealerEngine::new(rule),
            continuations: ResultCache::with_capacity(1024),
        })
    }

    pub fn rule(&self) -> &'a Rule {
        self.rule
    }

    pub fn dealer(&mut self) -> &mut DealerEngine<'a> {
        &mut self.dealer
    }

    pub fn clear(&mut self) {
        self.dealer.clear();
        self.continuations.clear();
    }

    pub fn stats(&self) -> (CacheStats, CacheStats) {
        (self.dealer.stats(), self.continuations.stats())
    }

    /// Expected value of every allowed action for `hand` against
    /// `dealer_up_card`, where `deck` holds the unseen cards (the hand and the
    /// up card already removed).
    pub fn evaluate(
        &mut self,
        hand: &Hand,
        dealer_up_card: u8,
        deck: &Deck,
    ) -> Result<EvResult, Error> {
        validate_card(dealer_up_card)?;
        if hand.cards().len() < 2 {
            return Err(Error::IncompleteHand);
        }

        let mut shoe = deck.clone();
        let value = hand.value();
        let multiplier = hand.multiplier();
        let mut evs = BTreeMap::new();
        evs.insert(
            Action::Stand,
            multiplier * self.stand_expectation(value, dealer_up_card, &shoe),
        );

        let playable = !value.bust() && !value.is_natural() && !hand.is_doubled();
        let two_cards = hand.cards().len() == 2;
        if playable && value.get_actual_sum() < 21 && !hand.is_split_aces() {
            if let Some(ev) = self.hit_expectation(value, dealer_up_card, &mut shoe) {
                evs.insert(Action::Hit, ev);
            }
            if two_cards
                && self
                    .rule
                    .allows_double(value.get_sum(), value.is_soft(), hand.is_split())
            {
                if let Some(ev) = self.double_expectation(value, dealer_up_card, &mut shoe) {
                    evs.insert(Action::Double, ev);
                }
            }
        }
        if playable && two_cards && !hand.is_split() && self.rule.allow_late_surrender {
            evs.insert(
                Action::Surrender,
                self.surrender_expectation(dealer_up_card, &shoe),
            );
        }
        if playable
            && hand.is_splittable()
            && self
                .rule
                .allows_split(hand.cards()[0], hand.hands_in_play(), hand.is_split())
        {
            if let Some(ev) = self.split_expectation(hand, dealer_up_card, &mut shoe) {
                evs.insert(Action::Split, ev);
            }
        }

        let (dealer_stats, continuation_stats) = self.stats();
        debug!(
            ?dealer_stats,
            ?continuation_stats,
            cards = ?hand.cards(),
            dealer_up_card,
            "evaluated hand"
        );

        Ok(EvResult::from_evs(evs))
    }
}
