use crate::{Error, RuleError};
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use std::str::FromStr;

/// Table rules shared by every calculation of one analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub number_of_decks: u8,
    pub dealer_hit_on_soft17: bool,
    pub double_policy: DoublePolicy,
    pub double_after_split: DoubleAfterSplit,
    pub allow_resplit: bool,
    pub allow_resplit_aces: bool,
    /// Total number of hands a single seat may end up with. 1 disables splitting.
    pub max_split_hands: u8,
    pub allow_late_surrender: bool,
    pub peek_policy: PeekPolicy,

    pub payout_blackjack: BlackjackPayout,
    pub payout_insurance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize_enum_str, Deserialize_enum_str)]
pub enum DoublePolicy {
    AnyTwo,
    NineTenElevenOnly,
    TenElevenOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize_enum_str, Deserialize_enum_str)]
pub enum DoubleAfterSplit {
    NotAllowed,
    Any,
    TenOrElevenOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize_enum_str, Deserialize_enum_str)]
pub enum PeekPolicy {
    UpAceOrTen,
    UpAce,
    NoPeek,
}

/// Blackjack payout as an exact ratio, e.g. 3:2 or 6:5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlackjackPayout {
    pub numerator: u16,
    pub denominator: u16,
}

impl BlackjackPayout {
    pub const THREE_TO_TWO: Self = Self {
        numerator: 3,
        denominator: 2,
    };
    pub const SIX_TO_FIVE: Self = Self {
        numerator: 6,
        denominator: 5,
    };

    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

impl FromStr for BlackjackPayout {
    type Err = Error;

    /// Accepts "3:2", "3/2" or a bare integer such as "1".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidPayout(s.to_string());
        let trimmed = s.trim();
        let (numerator, denominator) = match trimmed.split_once(|c: char| c == ':' || c == '/') {
            Some((n, d)) => (n.trim(), d.trim()),
            None => (trimmed, "1"),
        };
        let numerator = numerator.parse().map_err(|_| invalid())?;
        let denominator: u16 = denominator.parse().map_err(|_| invalid())?;
        if denominator == 0 {
            return Err(invalid());
        }

        Ok(Self {
            numerator,
            denominator,
        })
    }
}

impl Default for Rule {
    /// Six decks, S17, no double after split, no resplit, late surrender.
    fn default() -> Self {
        Rule {
            number_of_decks: 6,
            dealer_hit_on_soft17: false,
            double_policy: DoublePolicy::AnyTwo,
            double_after_split: DoubleAfterSplit::NotAllowed,
            allow_resplit: false,
            allow_resplit_aces: false,
            max_split_hands: 2,
            allow_late_surrender: true,
            peek_policy: PeekPolicy::UpAceOrTen,
            payout_blackjack: BlackjackPayout::THREE_TO_TWO,
            payout_insurance: 2.0,
        }
    }
}

impl Rule {
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.number_of_decks == 0 {
            return Err(RuleError::NoDecks);
        }
        if self.max_split_hands == 0 {
            return Err(RuleError::NoHands(self.max_split_hands));
        }
        if self.allow_resplit && self.max_split_hands < 3 {
            return Err(RuleError::ResplitWithoutRoom(self.max_split_hands));
        }
        if self.allow_resplit_aces && !self.allow_resplit {
            return Err(RuleError::ResplitAcesWithoutResplit);
        }
        if self.payout_blackjack.denominator == 0 {
            return Err(RuleError::ZeroPayoutDenominator);
        }
        if self.payout_insurance < 0.0 || self.payout_insurance.is_nan() {
            return Err(RuleError::NegativeInsurancePayout(self.payout_insurance));
        }

        Ok(())
    }

    /// The card the dealer cannot hold in the hole once a peek has shown no
    /// natural, or `None` if the dealer doesn't peek with this up card.
    pub fn impossible_hole_card(&self, dealer_up_card: u8) -> Option<u8> {
        match (dealer_up_card, self.peek_policy) {
            (1, PeekPolicy::UpAce | PeekPolicy::UpAceOrTen) => Some(10),
            (10, PeekPolicy::UpAceOrTen) => Some(1),
            _ => None,
        }
    }

    /// Whether the dealer can still turn over a natural against the player.
    pub fn dealer_may_have_natural(&self, dealer_up_card: u8) -> bool {
        (dealer_up_card == 1 || dealer_up_card == 10)
            && self.impossible_hole_card(dealer_up_card).is_none()
    }

    pub fn allows_double(&self, hard_sum: u8, is_soft: bool, after_split: bool) -> bool {
        let by_policy = match self.double_policy {
            DoublePolicy::AnyTwo => true,
            DoublePolicy::NineTenElevenOnly => !is_soft && (9..=11).contains(&hard_sum),
            DoublePolicy::TenElevenOnly => !is_soft && (10..=11).contains(&hard_sum),
        };
        if !after_split {
            return by_policy;
        }

        by_policy
            && match self.double_after_split {
                DoubleAfterSplit::NotAllowed => false,
                DoubleAfterSplit::Any => true,
                DoubleAfterSplit::TenOrElevenOnly => !is_soft && (10..=11).contains(&hard_sum),
            }
    }

    /// Whether one more hand may be created by splitting `card_value` when the
    /// seat already plays `hands_in_play` hands.
    pub fn allows_split(&self, card_value: u8, hands_in_play: u8, already_split: bool) -> bool {
        if hands_in_play >= self.max_split_hands {
            return false;
        }
        if !already_split {
            return true;
        }

        self.allow_resplit && (card_value != 1 || self.allow_resplit_aces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rule_is_valid() {
        assert_eq!(Rule::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_invalid_rules() {
        let rule = Rule {
            number_of_decks: 0,
            ..Default::default()
        };
        assert_eq!(rule.validate(), Err(RuleError::NoDecks));

        let rule = Rule {
            allow_resplit: true,
            max_split_hands: 2,
            ..Default::default()
        };
        assert_eq!(rule.validate(), Err(RuleError::ResplitWithoutRoom(2)));

        let rule = Rule {
            allow_resplit_aces: true,
            ..Default::default()
        };
        assert_eq!(rule.validate(), Err(RuleError::ResplitAcesWithoutResplit));

        let rule = Rule {
            payout_blackjack: BlackjackPayout {
                numerator: 3,
                denominator: 0,
            },
            ..Default::default()
        };
        assert_eq!(rule.validate(), Err(RuleError::ZeroPayoutDenominator));
    }

    #[test]
    fn impossible_hole_card_follows_peek_policy() {
        let mut rule = Rule::default();
        assert_eq!(rule.impossible_hole_card(1), Some(10));
        assert_eq!(rule.impossible_hole_card(10), Some(1));
        assert_eq!(rule.impossible_hole_card(9), None);

        rule.peek_policy = PeekPolicy::UpAce;
        assert_eq!(rule.impossible_hole_card(10), None);
        assert!(rule.dealer_may_have_natural(10));
        assert!(!rule.dealer_may_have_natural(1));

        rule.peek_policy = PeekPolicy::NoPeek;
        assert_eq!(rule.impossible_hole_card(1), None);
    }

    #[test]
    fn double_restrictions() {
        let mut rule = Rule::default();
        assert!(rule.allows_double(7, true, false));
        assert!(!rule.allows_double(11, false, true));

        rule.double_after_split = DoubleAfterSplit::TenOrElevenOnly;
        assert!(rule.allows_double(11, false, true));
        assert!(!rule.allows_double(9, false, true));

        rule.double_policy = DoublePolicy::NineTenElevenOnly;
        assert!(rule.allows_double(9, false, false));
        assert!(!rule.allows_double(8, false, false));
    }

    #[test]
    fn parse_payout() {
        assert_eq!(
            "3:2".parse::<BlackjackPayout>(),
            Ok(BlackjackPayout::THREE_TO_TWO)
        );
        assert_eq!(
            " 6/5 ".parse::<BlackjackPayout>(),
            Ok(BlackjackPayout::SIX_TO_FIVE)
        );
        assert!("3:0".parse::<BlackjackPayout>().is_err());
        assert!("three".parse::<BlackjackPayout>().is_err());
        assert_eq!(BlackjackPayout::SIX_TO_FIVE.as_f64(), 1.2);
    }
}
