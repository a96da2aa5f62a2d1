//! Quantities derived from the engines that a strategy table or a counting
//! study asks for.

use crate::{
    DealerEngine, DealerOutcomeDistribution, Deck, Error, EvCalculator, Hand, Rule, SharedCache,
};
use tracing::debug;

/// Expectation of an insurance bet of one unit, taken against the unseen
/// cards in `deck`.
pub fn insurance_ev(deck: &Deck, rule: &Rule) -> f64 {
    let p_ten = deck.density(10);
    p_ten * rule.payout_insurance - (1.0 - p_ten)
}

/// Probability that the next card busts `hand`.
pub fn player_bust_probability(hand: &Hand, deck: &Deck) -> f64 {
    let value = hand.value();
    if value.bust() {
        return 1.0;
    }
    (1..=10)
        .filter(|&card| value.with_card(card).bust())
        .map(|card| deck.density(card))
        .sum()
}

/// Change of the best expectation of `hand` when one card of each value is
/// taken out of `deck`. `None` for values the deck has run out of.
pub fn card_removal_effects(
    hand: &Hand,
    dealer_up_card: u8,
    deck: &Deck,
    rule: &Rule,
) -> Result<[Option<f64>; 10], Error> {
    let mut calculator = EvCalculator::new(rule)?;
    let baseline = calculator.evaluate(hand, dealer_up_card, deck)?.best_ev;

    let mut effects = [None; 10];
    let mut shoe = deck.clone();
    for card in 1..=10u8 {
        if !shoe.remove(card) {
            continue;
        }
        let result = calculator.evaluate(hand, dealer_up_card, &shoe);
        shoe.restore(card);
        effects[(card - 1) as usize] = Some(result?.best_ev - baseline);
    }

    Ok(effects)
}

/// Dealer distributions for every up card, each up card dealt out of `deck`
/// first. Up cards are dispatched over `number_of_threads` threads.
pub fn dealer_table(
    deck: &Deck,
    rule: &Rule,
    number_of_threads: usize,
) -> Result<Vec<(u8, DealerOutcomeDistribution)>, Error> {
    rule.validate()?;
    let number_of_threads = number_of_threads.clamp(1, 10);

    let mut dispatched_up_cards: Vec<Vec<u8>> = vec![Vec::new(); number_of_threads];
    for dealer_up_card in 1..=10u8 {
        if deck.get_count(dealer_up_card) > 0 {
            dispatched_up_cards[(dealer_up_card - 1) as usize % number_of_threads]
                .push(dealer_up_card);
        }
    }

    let table: SharedCache<u8, DealerOutcomeDistribution> = SharedCache::new();
    std::thread::scope(|scope| {
        for up_cards in &dispatched_up_cards {
            let table = &table;
            let mut shoe = deck.clone();
            scope.spawn(move || {
                let mut dealer = DealerEngine::new(rule);
                for &dealer_up_card in up_cards {
                    shoe.remove(dealer_up_card);
                    table.insert(dealer_up_card, dealer.distribution(dealer_up_card, &shoe));
                    shoe.restore(dealer_up_card);
                }
                debug!(stats = ?dealer.stats(), ?up_cards, "dealer table thread done");
            });
        }
    });

    let mut rows = Vec::with_capacity(10);
    for dealer_up_card in 1..=10u8 {
        if let Some(distribution) = table.get(&dealer_up_card) {
            rows.push((dealer_up_card, distribution));
        }
    }

    Ok(rows)
}
