use serde::{Deserialize, Serialize};
use std::fs;
use thiserror::Error;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rule: ConfigRule,
    #[serde(default)]
    pub analyzer: ConfigAnalyzer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigRule {
    pub number_of_decks: u8,
    pub dealer_hit_on_soft17: bool,
    pub double_policy: String,
    pub double_after_split: String,
    pub allow_resplit: bool,
    pub allow_resplit_aces: bool,
    pub max_split_hands: u8,
    pub allow_late_surrender: bool,
    pub peek_policy: String,

    pub payout_blackjack: String,
    pub payout_insurance: f64,
}

impl Default for ConfigRule {
    fn default() -> Self {
        let rule = blackjack_ev::Rule::default();
        Self {
            number_of_decks: rule.number_of_decks,
            dealer_hit_on_soft17: rule.dealer_hit_on_soft17,
            double_policy: rule.double_policy.to_string(),
            double_after_split: rule.double_after_split.to_string(),
            allow_resplit: rule.allow_resplit,
            allow_resplit_aces: rule.allow_resplit_aces,
            max_split_hands: rule.max_split_hands,
            allow_late_surrender: rule.allow_late_surrender,
            peek_policy: rule.peek_policy.to_string(),
            payout_blackjack: format!(
                "{}:{}",
                rule.payout_blackjack.numerator, rule.payout_blackjack.denominator
            ),
            payout_insurance: rule.payout_insurance,
        }
    }
}

impl TryFrom<ConfigRule> for blackjack_ev::Rule {
    type Error = ConfigError;

    fn try_from(config_rule: ConfigRule) -> Result<Self, Self::Error> {
        let rule = blackjack_ev::Rule {
            number_of_decks: config_rule.number_of_decks,
            dealer_hit_on_soft17: config_rule.dealer_hit_on_soft17,
            double_policy: config_rule.double_policy.parse()?,
            double_after_split: config_rule.double_after_split.parse()?,
            allow_resplit: config_rule.allow_resplit,
            allow_resplit_aces: config_rule.allow_resplit_aces,
            max_split_hands: config_rule.max_split_hands,
            allow_late_surrender: config_rule.allow_late_surrender,
            peek_policy: config_rule.peek_policy.parse()?,
            payout_blackjack: config_rule.payout_blackjack.parse()?,
            payout_insurance: config_rule.payout_insurance,
        };
        rule.validate()?;

        Ok(rule)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigAnalyzer {
    pub number_of_threads: usize,
}

impl Default for ConfigAnalyzer {
    fn default() -> Self {
        Self {
            number_of_threads: 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unknown policy: {0}")]
    Policy(#[from] serde::de::value::Error),
    #[error(transparent)]
    Payout(#[from] blackjack_ev::Error),
    #[error("invalid rules: {0}")]
    Rule(#[from] blackjack_ev::RuleError),
}

/// Reads the content of a given config file and parses it to a Config.
pub fn parse_config_from_file(filename: &str) -> Result<Config, ConfigError> {
    let file_content = fs::read_to_string(filename)?;
    parse_config(&file_content)
}

pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(serde_yaml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_typical_config_rule() -> ConfigRule {
        ConfigRule {
            number_of_decks: 8,
            dealer_hit_on_soft17: true,
            double_policy: String::from("TenElevenOnly"),
            double_after_split: String::from("Any"),
            allow_resplit: true,
            allow_resplit_aces: false,
            max_split_hands: 4,
            allow_late_surrender: false,
            peek_policy: String::from("UpAce"),
            payout_blackjack: String::from("6:5"),
            payout_insurance: 2.0,
        }
    }

    #[test]
    fn can_convert_rule() {
        let config_rule = get_typical_config_rule();
        let converted_rule: blackjack_ev::Rule = config_rule.try_into().unwrap();
        assert_eq!(converted_rule.number_of_decks, 8);
        assert_eq!(
            converted_rule.double_policy,
            blackjack_ev::DoublePolicy::TenElevenOnly
        );
        assert_eq!(
            converted_rule.double_after_split,
            blackjack_ev::DoubleAfterSplit::Any
        );
        assert_eq!(converted_rule.peek_policy, blackjack_ev::PeekPolicy::UpAce);
        assert_eq!(
            converted_rule.payout_blackjack,
            blackjack_ev::BlackjackPayout::SIX_TO_FIVE
        );
    }

    #[test]
    fn should_return_error_when_converting_rule() {
        let mut config_rule = get_typical_config_rule();
        config_rule.double_policy = String::from("Not a policy");
        let convert_result: Result<blackjack_ev::Rule, ConfigError> = config_rule.try_into();
        assert!(matches!(convert_result, Err(ConfigError::Policy(_))));

        let mut config_rule = get_typical_config_rule();
        config_rule.payout_blackjack = String::from("3:0");
        let convert_result: Result<blackjack_ev::Rule, ConfigError> = config_rule.try_into();
        assert!(matches!(convert_result, Err(ConfigError::Payout(_))));

        let mut config_rule = get_typical_config_rule();
        config_rule.max_split_hands = 2;
        let convert_result: Result<blackjack_ev::Rule, ConfigError> = config_rule.try_into();
        assert!(matches!(convert_result, Err(ConfigError::Rule(_))));
    }

    #[test]
    fn default_config_round_trips_to_default_rule() {
        let rule: blackjack_ev::Rule = ConfigRule::default().try_into().unwrap();
        assert_eq!(rule, blackjack_ev::Rule::default());
    }

    #[test]
    fn parses_yaml() {
        let config = parse_config(
            "rule:\n  number_of_decks: 2\n  dealer_hit_on_soft17: true\n  double_policy: AnyTwo\n  double_after_split: NotAllowed\n  allow_resplit: false\n  allow_resplit_aces: false\n  max_split_hands: 2\n  allow_late_surrender: true\n  peek_policy: NoPeek\n  payout_blackjack: \"3/2\"\n  payout_insurance: 2.0\nanalyzer:\n  number_of_threads: 4\n",
        )
        .unwrap();
        assert_eq!(config.analyzer.number_of_threads, 4);
        let rule: blackjack_ev::Rule = config.rule.try_into().unwrap();
        assert_eq!(rule.peek_policy, blackjack_ev::PeekPolicy::NoPeek);
        assert_eq!(
            rule.payout_blackjack,
            blackjack_ev::BlackjackPayout::THREE_TO_TWO
        );

        assert!(matches!(
            parse_config("rule: [1, 2"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
