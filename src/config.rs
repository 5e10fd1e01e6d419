//! `key=value` agent configuration.
//!
//! Tokens are whitespace-separated; a repeated key keeps its last value.
//! `name` and `role` are accepted by every agent, other keys are specific to
//! the agent kind and anything unrecognized is rejected.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::engine::{Rank, MAX_RANK};
use crate::environment::{BonusRule, BonusRuleError, EnvironmentError, TileBag, TileEnvironment};
use crate::features::{Topology, TopologyError};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("token '{0}' is not of the form key=value")]
    MalformedToken(String),
    #[error("unknown key '{key}' for {agent}")]
    UnknownKey { agent: &'static str, key: String },
    #[error("invalid value '{value}' for '{key}': {reason}")]
    InvalidValue { key: String, value: String, reason: String },
    #[error("invalid init: {0}")]
    Topology(#[from] TopologyError),
    #[error("invalid bonus rule: {0}")]
    Bonus(#[from] BonusRuleError),
}

/// Parsed `key=value` tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Reject any key outside `allowed`, `name` and `role`.
    fn expect_keys(&self, agent: &'static str, allowed: &[&str]) -> Result<(), ConfigError> {
        for key in self.keys() {
            if key != "name" && key != "role" && !allowed.contains(&key) {
                return Err(ConfigError::UnknownKey { agent, key: key.to_string() });
            }
        }
        Ok(())
    }

    fn parse_value<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

impl FromStr for Properties {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = BTreeMap::new();
        for token in s.split_whitespace() {
            let (key, value) = token
                .split_once('=')
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| ConfigError::MalformedToken(token.to_string()))?;
            entries.insert(key.to_string(), value.to_string());
        }
        Ok(Self { entries })
    }
}

/// Settings for the learning player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub name: String,
    pub alpha: f32,
    pub init: Topology,
    pub load: Option<PathBuf>,
    pub save: Option<PathBuf>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self { name: "td".to_string(), alpha: 0.01, init: Topology::default(), load: None, save: None }
    }
}

impl FromStr for PlayerConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let props: Properties = s.parse()?;
        props.expect_keys("player", &["alpha", "init", "load", "save"])?;
        let mut config = PlayerConfig::default();
        if let Some(name) = props.get("name") {
            config.name = name.to_string();
        }
        if let Some(alpha) = props.parse_value::<f32>("alpha")? {
            if !alpha.is_finite() || alpha < 0.0 {
                return Err(ConfigError::InvalidValue {
                    key: "alpha".to_string(),
                    value: alpha.to_string(),
                    reason: "must be a finite non-negative number".to_string(),
                });
            }
            config.alpha = alpha;
        }
        if let Some(init) = props.get("init") {
            config.init = init.parse()?;
        }
        config.load = props.get("load").filter(|p| !p.is_empty()).map(PathBuf::from);
        config.save = props.get("save").filter(|p| !p.is_empty()).map(PathBuf::from);
        Ok(config)
    }
}

/// Settings for the tile environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentConfig {
    pub name: String,
    /// `None` seeds from OS entropy.
    pub seed: Option<u64>,
    pub bag: Vec<Rank>,
    pub bonus: BonusRule,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            name: "hint".to_string(),
            seed: None,
            bag: TileBag::DEFAULT_RANKS.to_vec(),
            bonus: BonusRule::default(),
        }
    }
}

impl EnvironmentConfig {
    /// Same configuration with a fixed seed.
    pub fn with_seed(&self, seed: u64) -> Self {
        Self { seed: Some(seed), ..self.clone() }
    }

    /// Fails when the fields were set to an empty bag or an invalid bonus rule.
    pub fn build(&self) -> Result<TileEnvironment, EnvironmentError> {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        TileEnvironment::new(rng, self.bag.clone(), self.bonus)
    }
}

fn parse_bag(raw: &str) -> Result<Vec<Rank>, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        key: "bag".to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let ranks = raw
        .split(',')
        .map(|r| r.trim().parse::<Rank>().map_err(|e| invalid(&e.to_string())))
        .collect::<Result<Vec<_>, _>>()?;
    if ranks.is_empty() {
        return Err(invalid("bag is empty"));
    }
    if ranks.iter().any(|&r| r == 0 || r > MAX_RANK) {
        return Err(invalid("ranks must be in 1..=15"));
    }
    Ok(ranks)
}

impl FromStr for EnvironmentConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let props: Properties = s.parse()?;
        props.expect_keys(
            "environment",
            &["seed", "bag", "bonus_trigger", "bonus_base", "bonus_gap", "bonus_trip", "bonus_cap"],
        )?;
        let mut config = EnvironmentConfig::default();
        if let Some(name) = props.get("name") {
            config.name = name.to_string();
        }
        config.seed = props.parse_value("seed")?;
        if let Some(bag) = props.get("bag") {
            config.bag = parse_bag(bag)?;
        }
        let bonus = &mut config.bonus;
        if let Some(v) = props.parse_value("bonus_trigger")? {
            bonus.trigger_rank = v;
        }
        if let Some(v) = props.parse_value("bonus_base")? {
            bonus.base_rank = v;
        }
        if let Some(v) = props.parse_value("bonus_gap")? {
            bonus.rank_gap = v;
        }
        if let Some(v) = props.parse_value("bonus_trip")? {
            bonus.trip_count = v;
        }
        if let Some(v) = props.parse_value("bonus_cap")? {
            bonus.cap_rank = v;
        }
        bonus.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_split_on_whitespace_and_last_wins() {
        let props: Properties = "name=a  alpha=0.5\talpha=0.25 save=".parse().unwrap();
        assert_eq!(props.get("name"), Some("a"));
        assert_eq!(props.get("alpha"), Some("0.25"));
        assert_eq!(props.get("save"), Some(""));
        assert_eq!(props.get("load"), None);
        assert_eq!(props.keys().count(), 3);
    }

    #[test]
    fn token_without_equals_is_malformed() {
        assert_eq!(
            "alpha=0.1 oops".parse::<Properties>(),
            Err(ConfigError::MalformedToken("oops".to_string()))
        );
        assert!(matches!("=3".parse::<Properties>(), Err(ConfigError::MalformedToken(_))));
    }

    #[test]
    fn empty_player_config_uses_defaults() {
        let config: PlayerConfig = "".parse().unwrap();
        assert_eq!(config, PlayerConfig::default());
        assert_eq!(config.alpha, 0.01);
        assert_eq!(config.init, Topology::default());
    }

    #[test]
    fn player_config_reads_every_key() {
        let config: PlayerConfig =
            "name=learner role=player alpha=0.0025 init=8x4 load=in.bin save=out.bin".parse().unwrap();
        assert_eq!(config.name, "learner");
        assert_eq!(config.alpha, 0.0025);
        assert_eq!(config.init, Topology::new(8, 4).unwrap());
        assert_eq!(config.load, Some(PathBuf::from("in.bin")));
        assert_eq!(config.save, Some(PathBuf::from("out.bin")));
    }

    #[test]
    fn player_config_rejects_bad_values() {
        assert!(matches!("alpha=fast".parse::<PlayerConfig>(), Err(ConfigError::InvalidValue { .. })));
        assert!(matches!("alpha=-1".parse::<PlayerConfig>(), Err(ConfigError::InvalidValue { .. })));
        assert!(matches!("init=99x1".parse::<PlayerConfig>(), Err(ConfigError::Topology(_))));
        assert!(matches!(
            "seed=1".parse::<PlayerConfig>(),
            Err(ConfigError::UnknownKey { agent: "player", .. })
        ));
    }

    #[test]
    fn environment_config_reads_bag_and_bonus() {
        let config: EnvironmentConfig =
            "seed=7 bag=1,2,3,3 bonus_trigger=7 bonus_trip=10 bonus_cap=12".parse().unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.bag, vec![1, 2, 3, 3]);
        assert_eq!(config.bonus.trigger_rank, 7);
        assert_eq!(config.bonus.trip_count, 10);
        assert_eq!(config.bonus.cap_rank, 12);
        assert_eq!(config.bonus.base_rank, 4);
    }

    #[test]
    fn environment_config_validates() {
        assert!(matches!("bag=".parse::<EnvironmentConfig>(), Err(ConfigError::InvalidValue { .. })));
        assert!(matches!("bag=0,1".parse::<EnvironmentConfig>(), Err(ConfigError::InvalidValue { .. })));
        assert!(matches!("bonus_trip=0".parse::<EnvironmentConfig>(), Err(ConfigError::Bonus(_))));
        assert!(matches!("alpha=1".parse::<EnvironmentConfig>(), Err(ConfigError::UnknownKey { .. })));
    }

    #[test]
    fn seeded_environments_agree() {
        let config = EnvironmentConfig::default().with_seed(42);
        let mut a = config.build().unwrap();
        let mut b = config.build().unwrap();
        let board = crate::engine::Board::EMPTY;
        assert_eq!(a.place(&board, None), b.place(&board, None));
        assert_eq!(a.hint(), b.hint());
    }

    #[test]
    fn build_rejects_fields_set_past_the_parser() {
        let empty = EnvironmentConfig { bag: vec![], ..EnvironmentConfig::default().with_seed(1) };
        assert_eq!(empty.build().unwrap_err(), EnvironmentError::EmptyBag);
        let bonus = BonusRule { base_rank: 12, cap_rank: 11, ..BonusRule::default() };
        let bad_rule = EnvironmentConfig { bonus, ..EnvironmentConfig::default().with_seed(1) };
        assert!(matches!(bad_rule.build(), Err(EnvironmentError::Bonus(_))));
    }
}
