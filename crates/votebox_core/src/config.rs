//! Election runtime configuration.
//!
//! # Responsibility
//! - Provide defaults for store location, logging and commit/broadcast
//!   tuning.
//! - Apply `VOTEBOX_*` environment overrides.
//!
//! # Invariants
//! - A validated config has at least one commit attempt and an observer
//!   queue capacity of at least one.
//! - A zero busy timeout is allowed: lock conflicts then fail at once and
//!   are left to the commit retry loop.

use crate::db::DEFAULT_BUSY_TIMEOUT_MS;
use crate::logging::default_log_level;
use crate::service::ballot_box::DEFAULT_MAX_COMMIT_ATTEMPTS;
use crate::service::tally_broadcaster::DEFAULT_OBSERVER_QUEUE_CAPACITY;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "VOTEBOX_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "VOTEBOX_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "VOTEBOX_LOG_DIR";
pub const ENV_MAX_COMMIT_ATTEMPTS: &str = "VOTEBOX_MAX_COMMIT_ATTEMPTS";
pub const ENV_OBSERVER_QUEUE_CAPACITY: &str = "VOTEBOX_OBSERVER_QUEUE_CAPACITY";
pub const ENV_BUSY_TIMEOUT_MS: &str = "VOTEBOX_BUSY_TIMEOUT_MS";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidNumber { key: &'static str, value: String },
    ZeroValue(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNumber { key, value } => {
                write!(f, "{key} must be a positive integer, got `{value}`")
            }
            Self::ZeroValue(key) => write!(f, "{key} must be greater than zero"),
        }
    }
}

impl Error for ConfigError {}

/// Runtime settings for one election process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ElectionConfig {
    /// SQLite file; `None` keeps the store in memory.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute log directory; `None` leaves logging uninitialized.
    pub log_dir: Option<PathBuf>,
    pub max_commit_attempts: u32,
    pub observer_queue_capacity: usize,
    /// SQLite busy timeout. Each commit attempt may wait this long on an
    /// outside writer while the store lock is held.
    pub busy_timeout_ms: u64,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
            observer_queue_capacity: DEFAULT_OBSERVER_QUEUE_CAPACITY,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl ElectionConfig {
    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`; blank values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = Some(PathBuf::from(path));
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(value) = read(ENV_MAX_COMMIT_ATTEMPTS) {
            config.max_commit_attempts = parse_number(ENV_MAX_COMMIT_ATTEMPTS, value)?;
        }
        if let Some(value) = read(ENV_OBSERVER_QUEUE_CAPACITY) {
            config.observer_queue_capacity = parse_number(ENV_OBSERVER_QUEUE_CAPACITY, value)?;
        }
        if let Some(value) = read(ENV_BUSY_TIMEOUT_MS) {
            config.busy_timeout_ms = parse_number(ENV_BUSY_TIMEOUT_MS, value)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_commit_attempts == 0 {
            return Err(ConfigError::ZeroValue("max_commit_attempts"));
        }
        if self.observer_queue_capacity == 0 {
            return Err(ConfigError::ZeroValue("observer_queue_capacity"));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_use_memory_store() {
        let config = ElectionConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ElectionConfig::default());
        assert!(config.db_path.is_none());
        assert_eq!(config.max_commit_attempts, DEFAULT_MAX_COMMIT_ATTEMPTS);
    }

    #[test]
    fn environment_overrides_are_applied() {
        let config = ElectionConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, "/var/lib/votebox/election.sqlite3"),
            (ENV_LOG_LEVEL, "warn"),
            (ENV_MAX_COMMIT_ATTEMPTS, " 5 "),
            (ENV_OBSERVER_QUEUE_CAPACITY, "8"),
            (ENV_BUSY_TIMEOUT_MS, "250"),
            (ENV_LOG_DIR, "  "),
        ]))
        .unwrap();
        assert_eq!(
            config.db_path,
            Some(PathBuf::from("/var/lib/votebox/election.sqlite3"))
        );
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, None);
        assert_eq!(config.max_commit_attempts, 5);
        assert_eq!(config.observer_queue_capacity, 8);
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn invalid_and_zero_numbers_are_rejected() {
        let err = ElectionConfig::from_lookup(lookup(&[(ENV_MAX_COMMIT_ATTEMPTS, "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));

        let err = ElectionConfig::from_lookup(lookup(&[(ENV_OBSERVER_QUEUE_CAPACITY, "0")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::ZeroValue("observer_queue_capacity"));
    }

    #[test]
    fn zero_busy_timeout_is_accepted() {
        let config = ElectionConfig::from_lookup(lookup(&[(ENV_BUSY_TIMEOUT_MS, "0")])).unwrap();
        assert_eq!(config.busy_timeout(), Duration::ZERO);
        assert_eq!(
            ElectionConfig::default().busy_timeout_ms,
            DEFAULT_BUSY_TIMEOUT_MS
        );
    }
}
