//! Session configuration.
//!
//! Defaults match the reference game; every field can be overridden from
//! environment variables.

use std::time::Duration;

/// Default board size.
pub const DEFAULT_TILE_COUNT: usize = 16;

/// Delay before a face-up pair is matched or turned back.
pub const DEFAULT_RESOLVE_DELAY: Duration = Duration::from_millis(1000);

/// Delay between the final match and the game-complete signal.
pub const DEFAULT_FINISH_DELAY: Duration = Duration::from_millis(4000);

/// Event channel capacity per session.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Configuration for a game session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Tiles on the board (even).
    pub tile_count: usize,
    /// Pair resolution delay.
    pub resolve_delay: Duration,
    /// End-of-game delay.
    pub finish_delay: Duration,
    /// Shuffle seed; derived from the session id when unset.
    pub seed: Option<u64>,
    /// Buffered events per subscriber before the oldest are dropped.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tile_count: DEFAULT_TILE_COUNT,
            resolve_delay: DEFAULT_RESOLVE_DELAY,
            finish_delay: DEFAULT_FINISH_DELAY,
            seed: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
        /// What was wrong.
        reason: String,
    },

    /// Values parsed but do not describe a playable game.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl SessionConfig {
    /// Load configuration from environment variables
    ///
    /// - `MEMORY_TILE_COUNT`
    /// - `MEMORY_RESOLVE_DELAY_MS`
    /// - `MEMORY_FINISH_DELAY_MS`
    /// - `MEMORY_SEED`
    /// - `MEMORY_EVENT_CAPACITY`
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            tile_count: parse_var(&lookup, "MEMORY_TILE_COUNT")?.unwrap_or(defaults.tile_count),
            resolve_delay: parse_var(&lookup, "MEMORY_RESOLVE_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.resolve_delay),
            finish_delay: parse_var(&lookup, "MEMORY_FINISH_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.finish_delay),
            seed: parse_var(&lookup, "MEMORY_SEED")?.or(defaults.seed),
            event_capacity: parse_var(&lookup, "MEMORY_EVENT_CAPACITY")?
                .unwrap_or(defaults.event_capacity),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the board size and channel capacity.
    ///
    /// Catalog capacity is checked at generation time, since the catalog
    /// is supplied separately.
    pub fn validate(&self) -> Result<(), ConfigError> {
        crate::game::board::check_tile_count(self.tile_count)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => {
            let trimmed = raw.trim();
            trimmed
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    var,
                    value: trimmed.to_string(),
                    reason: e.to_string(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.tile_count, 16);
        assert_eq!(config.resolve_delay, Duration::from_millis(1000));
        assert_eq!(config.finish_delay, Duration::from_millis(4000));
    }

    #[test]
    fn test_overrides() {
        let config = SessionConfig::from_lookup(lookup(&[
            ("MEMORY_TILE_COUNT", "20"),
            ("MEMORY_RESOLVE_DELAY_MS", "250"),
            ("MEMORY_FINISH_DELAY_MS", " 500 "),
            ("MEMORY_SEED", "42"),
        ]))
        .unwrap();

        assert_eq!(config.tile_count, 20);
        assert_eq!(config.resolve_delay, Duration::from_millis(250));
        assert_eq!(config.finish_delay, Duration::from_millis(500));
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn test_unparseable_value() {
        let result = SessionConfig::from_lookup(lookup(&[("MEMORY_SEED", "abc")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { var: "MEMORY_SEED", .. })
        ));
    }

    #[test]
    fn test_odd_tile_count_rejected() {
        let result = SessionConfig::from_lookup(lookup(&[("MEMORY_TILE_COUNT", "15")]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = SessionConfig {
            event_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
