use crate::{validate_card, Error};

/// The cards of one player hand at a decision point.
///
/// Branching into hit or double alternatives produces new hands through
/// [`Hand::with_card`] and [`Hand::double_down`], so sibling branches never
/// share state.
#[derive(Debug, Clone, PartialEq)]
pub struct Hand {
    cards: Vec<u8>,
    /// The card value this hand was split from, if it results from a split.
    split_from: Option<u8>,
    /// Hands the seat currently plays, this one included.
    hands_in_play: u8,
    doubled: bool,
}

impl Hand {
    pub fn new(cards: &[u8]) -> Result<Hand, Error> {
        for &card in cards {
            validate_card(card)?;
        }
        Ok(Hand {
            cards: cards.to_vec(),
            split_from: None,
            hands_in_play: 1,
            doubled: false,
        })
    }

    /// One of the hands created by splitting a pair of `split_card`, after it
    /// received `second_card`.
    pub fn split(split_card: u8, second_card: u8, hands_in_play: u8) -> Result<Hand, Error> {
        validate_card(split_card)?;
        validate_card(second_card)?;
        Ok(Hand {
            cards: vec![split_card, second_card],
            split_from: Some(split_card),
            hands_in_play: hands_in_play.max(2),
            doubled: false,
        })
    }

    pub fn with_card(&self, card: u8) -> Result<Hand, Error> {
        validate_card(card)?;
        let mut hand = self.clone();
        hand.cards.push(card);
        Ok(hand)
    }

    pub fn double_down(&self, card: u8) -> Result<Hand, Error> {
        let mut hand = self.with_card(card)?;
        hand.doubled = true;
        Ok(hand)
    }

    pub fn cards(&self) -> &[u8] {
        &self.cards
    }

    pub fn split_from(&self) -> Option<u8> {
        self.split_from
    }

    pub fn hands_in_play(&self) -> u8 {
        self.hands_in_play
    }

    pub fn is_split(&self) -> bool {
        self.split_from.is_some()
    }

    pub fn is_split_aces(&self) -> bool {
        self.split_from == Some(1)
    }

    pub fn is_doubled(&self) -> bool {
        self.doubled
    }

    /// Bet multiplier of this hand.
    pub fn multiplier(&self) -> f64 {
        if self.doubled {
            2.0
        } else {
            1.0
        }
    }

    /// Aces count as 11 and get demoted to 1 while the total exceeds 21.
    /// At most one Ace can stay at 11, so only that one is considered.
    pub fn total(&self) -> u8 {
        self.value().get_actual_sum()
    }

    pub fn is_soft(&self) -> bool {
        self.value().is_soft()
    }

    pub fn bust(&self) -> bool {
        self.value().bust()
    }

    pub fn is_natural(&self) -> bool {
        self.value().is_natural()
    }

    pub fn is_splittable(&self) -> bool {
        self.cards.len() == 2 && self.cards[0] == self.cards[1]
    }

    pub fn value(&self) -> HandValue {
        self.cards
            .iter()
            .fold(HandValue::empty(self.is_split()), |value, &card| {
                value.with_card(card)
            })
    }
}

/// Everything the EV recursion needs to know about a hand, cheap to copy on
/// each branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandValue {
    /// Sum with every Ace counted as 1.
    sum: u8,
    has_ace: bool,
    number_of_cards: u8,
    split: bool,
}

impl HandValue {
    pub fn empty(split: bool) -> HandValue {
        HandValue {
            sum: 0,
            has_ace: false,
            number_of_cards: 0,
            split,
        }
    }

    /// The single card a split hand starts with.
    pub fn split_card(card_value: u8) -> HandValue {
        HandValue::empty(true).with_card(card_value)
    }

    pub fn with_card(self, card_value: u8) -> HandValue {
        HandValue {
            sum: self.sum.saturating_add(card_value),
            has_ace: self.has_ace || card_value == 1,
            number_of_cards: self.number_of_cards.saturating_add(1),
            split: self.split,
        }
    }

    /// Note that this treats Ace as 1.
    pub fn get_sum(&self) -> u8 {
        self.sum
    }

    pub fn get_actual_sum(&self) -> u8 {
        if self.is_soft() {
            self.sum + 10
        } else {
            self.sum
        }
    }

    pub fn number_of_cards(&self) -> u8 {
        self.number_of_cards
    }

    pub fn has_ace(&self) -> bool {
        self.has_ace
    }

    pub fn is_split(&self) -> bool {
        self.split
    }

    pub fn is_soft(&self) -> bool {
        self.has_ace && self.sum <= 11
    }

    pub fn bust(&self) -> bool {
        self.sum > 21
    }

    pub fn is_natural(&self) -> bool {
        !self.split && self.number_of_cards == 2 && self.get_actual_sum() == 21
    }
}
