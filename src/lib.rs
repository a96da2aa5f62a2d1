pub mod analysis;
mod cache;
mod calculation;
mod dealer;
mod deck;
mod error;
mod hand;
mod rule;

pub use cache::{CacheStats, ResultCache, SharedCache};
pub use calculation::{
    gather_playable_hands, Action, EvCalculator, EvResult, PlayableHand, SplitDecision,
    SplitEnumerator,
};
pub use dealer::{DealerEngine, DealerOutcomeDistribution};
pub use deck::{Composition, Deck};
pub use error::{Error, RuleError};
pub use hand::{Hand, HandValue};
pub use rule::{BlackjackPayout, DoubleAfterSplit, DoublePolicy, PeekPolicy, Rule};

/// Card values run from 1 (Ace) to 10 (any ten-valued card).
pub fn validate_card(card_value: u8) -> Result<(), Error> {
    if (1..=10).contains(&card_value) {
        Ok(())
    } else {
        Err(Error::InvalidCard(card_value))
    }
}

/// Parses a rank label such as "A", "7", "10" or "K" into its card value.
pub fn card_value_from_label(label: &str) -> Result<u8, Error> {
    let label = label.trim();
    let card_value = match label.to_ascii_uppercase().as_str() {
        "A" | "1" => 1,
        "10" | "T" | "J" | "Q" | "K" => 10,
        other => match other.parse::<u8>() {
            Ok(value) if (2..=9).contains(&value) => value,
            _ => return Err(Error::UnknownRankLabel(label.to_string())),
        },
    };

    Ok(card_value)
}

/// Expected value of every allowed action for `hand` against
/// `dealer_up_card`, with `deck` holding the unseen cards.
pub fn evaluate_hand(
    hand: &Hand,
    dealer_up_card: u8,
    deck: &Deck,
    rule: &Rule,
) -> Result<EvResult, Error> {
    let mut calculator = EvCalculator::new(rule)?;
    calculator.evaluate(hand, dealer_up_card, deck)
}

/// Distribution of the dealer's final totals for `dealer_up_card`, drawing
/// from `deck`.
pub fn dealer_outcome_distribution(
    dealer_up_card: u8,
    deck: &Deck,
    rule: &Rule,
) -> Result<DealerOutcomeDistribution, Error> {
    rule.validate()?;
    validate_card(dealer_up_card)?;
    Ok(DealerEngine::new(rule).distribution(dealer_up_card, deck))
}
