use thiserror::Error;

/// Reasons a [`crate::Rule`] is refused before any calculation starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    #[error("number_of_decks must be > 0")]
    NoDecks,
    #[error("max_split_hands must be > 0 (got {0})")]
    NoHands(u8),
    #[error("resplitting needs max_split_hands >= 3 (got {0})")]
    ResplitWithoutRoom(u8),
    #[error("resplitting aces requires resplitting to be allowed")]
    ResplitAcesWithoutResplit,
    #[error("blackjack payout denominator must be > 0")]
    ZeroPayoutDenominator,
    #[error("insurance payout must be >= 0 (got {0})")]
    NegativeInsurancePayout(f64),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid rules: {0}")]
    InvalidRules(#[from] RuleError),
    #[error("invalid card value {0}, it must be in [1, 10]")]
    InvalidCard(u8),
    #[error("unknown rank label {0:?}")]
    UnknownRankLabel(String),
    #[error("{dealt} cards of value {rank} were dealt but the shoe only holds {available}")]
    OverDealt { rank: u8, dealt: u16, available: u16 },
    #[error("a hand needs at least two cards to be evaluated")]
    IncompleteHand,
    #[error("invalid payout {0:?}, expected a ratio such as 3:2")]
    InvalidPayout(String),
}
