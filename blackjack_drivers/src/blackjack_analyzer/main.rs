use anyhow::{bail, Context, Result};
use blackjack_drivers::{parse_config_from_file, Config};
use blackjack_ev::{analysis, card_value_from_label, Deck, Hand, Rule};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

const DEFAULT_CONFIG_PATH: &str = "~/.blackjack_ev.yml";

#[derive(Debug, Parser)]
#[command(author, about, long_about = None)]
struct CommandLineArgs {
    /// The path of the config file
    #[arg(short, long, default_value_t = String::from(DEFAULT_CONFIG_PATH))]
    config: String,

    /// Maximum log level
    #[arg(short, long, default_value_t = Level::INFO)]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Expected value of every action for a hand
    Evaluate {
        /// Player cards, e.g. "A,7"
        #[arg(long)]
        hand: String,
        #[arg(long)]
        upcard: String,
        /// Other cards already dealt from the shoe, e.g. "K=3,5=1"
        #[arg(long)]
        dealt: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Distribution of the dealer's final totals
    Dealer {
        #[arg(long)]
        upcard: String,
        #[arg(long)]
        dealt: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Dealer distributions for every up card
    Table {
        #[arg(long)]
        dealt: Option<String>,
    },
    /// Expected value of an insurance bet
    Insurance {
        #[arg(long)]
        dealt: Option<String>,
    },
    /// Effect of removing one card of each value on the best expectation
    Removal {
        #[arg(long)]
        hand: String,
        #[arg(long)]
        upcard: String,
        #[arg(long)]
        dealt: Option<String>,
    },
}

fn main() -> Result<()> {
    let args = CommandLineArgs::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let config = load_config(&args.config)?;
    let rule: Rule = config
        .rule
        .clone()
        .try_into()
        .context("invalid rule section")?;
    info!(?rule, "loaded rules");

    match args.command {
        Command::Evaluate {
            hand,
            upcard,
            dealt,
            json,
        } => {
            let hand = parse_hand(&hand)?;
            let upcard = card_value_from_label(&upcard)?;
            let deck = unseen_cards(&rule, dealt.as_deref(), hand.cards(), Some(upcard))?;
            let result = blackjack_ev::evaluate_hand(&hand, upcard, &deck, &rule)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                for (action, ev) in &result.evs {
                    println!("{:<10}{:+.6}", action.to_string(), ev);
                }
                println!("best: {} ({:+.6})", result.best, result.best_ev);
            }
        }
        Command::Dealer {
            upcard,
            dealt,
            json,
        } => {
            let upcard = card_value_from_label(&upcard)?;
            let deck = unseen_cards(&rule, dealt.as_deref(), &[], Some(upcard))?;
            let distribution = blackjack_ev::dealer_outcome_distribution(upcard, &deck, &rule)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&distribution)?);
            } else {
                print_outcomes(upcard, &distribution.outcomes());
            }
        }
        Command::Table { dealt } => {
            let deck = unseen_cards(&rule, dealt.as_deref(), &[], None)?;
            let table = analysis::dealer_table(&deck, &rule, config.analyzer.number_of_threads)?;
            println!("up    P17      P18      P19      P20      P21      Pbust");
            for (upcard, distribution) in &table {
                print_outcomes(*upcard, &distribution.outcomes());
            }
        }
        Command::Insurance { dealt } => {
            let deck = unseen_cards(&rule, dealt.as_deref(), &[], Some(1))?;
            println!("{:+.6}", analysis::insurance_ev(&deck, &rule));
        }
        Command::Removal {
            hand,
            upcard,
            dealt,
        } => {
            let hand = parse_hand(&hand)?;
            let upcard = card_value_from_label(&upcard)?;
            let deck = unseen_cards(&rule, dealt.as_deref(), hand.cards(), Some(upcard))?;
            let effects = analysis::card_removal_effects(&hand, upcard, &deck, &rule)?;
            for (card, effect) in (1..=10).zip(effects.iter()) {
                match effect {
                    Some(effect) => println!("{:<4}{:+.6}", card, effect),
                    None => println!("{:<4}-", card),
                }
            }
        }
    }

    Ok(())
}

fn load_config(path: &str) -> Result<Config> {
    if path != DEFAULT_CONFIG_PATH {
        return parse_config_from_file(path)
            .with_context(|| format!("cannot load config file {}", path));
    }

    let home_dir = home::home_dir().context("cannot find home directory")?;
    let config_file_path = home_dir.join(".blackjack_ev.yml");
    if !config_file_path.exists() {
        info!("no config file found, using default rules");
        return Ok(Config::default());
    }
    if config_file_path.is_dir() {
        bail!("{} should be a file rather than a directory", config_file_path.display());
    }
    let path = config_file_path
        .to_str()
        .context("config path is not valid UTF-8")?;
    parse_config_from_file(path).with_context(|| format!("cannot load config file {}", path))
}

fn parse_hand(labels: &str) -> Result<Hand> {
    let cards = labels
        .split(',')
        .map(card_value_from_label)
        .collect::<Result<Vec<u8>, _>>()?;
    Ok(Hand::new(&cards)?)
}

/// The shoe of the configured rules minus the dealt tally, the player's cards
/// and the dealer's up card.
fn unseen_cards(
    rule: &Rule,
    dealt: Option<&str>,
    hand: &[u8],
    upcard: Option<u8>,
) -> Result<Deck> {
    let mut tally = Vec::new();
    for entry in dealt.unwrap_or_default().split(',').filter(|e| !e.trim().is_empty()) {
        let (label, count) = entry
            .split_once('=')
            .with_context(|| format!("dealt entry {} should look like K=3", entry))?;
        let count: u16 = count
            .trim()
            .parse()
            .with_context(|| format!("bad count in dealt entry {}", entry))?;
        tally.push((label, count));
    }

    let labels: Vec<String> = hand.iter().chain(upcard.iter()).map(u8::to_string).collect();
    tally.extend(labels.iter().map(|label| (label.as_str(), 1)));
    Ok(Deck::from_dealt_tally(rule.number_of_decks, tally)?)
}

fn print_outcomes(upcard: u8, outcomes: &[f64; 6]) {
    print!("{:<4}", upcard);
    for p in outcomes {
        print!("  {:.5}", p);
    }
    println!();
}
