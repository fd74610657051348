//! Store and logging configuration
//!
//! Every field has a default, so a config file only needs the keys it
//! changes:
//!
//! ```json
//! {
//!     "name": "dashboard",
//!     "log": { "exclude": ["TimerTicked"] }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::logging::LogFilter;

/// Default number of yields used to let effect tasks run before draining.
pub const DEFAULT_SETTLE_ROUNDS: usize = 8;

/// Default capacity of in-memory log buffers.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Configuration for a [`Store`](crate::Store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Name attached to the store's tracing events
    pub name: String,
    /// Yields performed at the end of `run_for` so effects woken at the
    /// deadline can deliver
    pub settle_rounds: usize,
    /// Logging settings for reducers wrapped with `Logged`
    pub log: LogConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "store".to_string(),
            settle_rounds: DEFAULT_SETTLE_ROUNDS,
            log: LogConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Default configuration with a custom name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }
}

/// Configuration for reducer logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Glob patterns; if non-empty only matching actions are logged
    pub include: Vec<String>,
    /// Glob patterns for actions never logged
    pub exclude: Vec<String>,
    /// Capacity of in-memory capture buffers
    pub capacity: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl LogConfig {
    /// Build the action filter described by this config.
    pub fn filter(&self) -> LogFilter {
        LogFilter::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.name, "store");
        assert_eq!(config.settle_rounds, DEFAULT_SETTLE_ROUNDS);
        assert_eq!(config.log.capacity, DEFAULT_LOG_CAPACITY);
        assert!(config.log.filter().should_log("Anything"));
    }

    #[test]
    fn test_partial_json() {
        let config = StoreConfig::from_json_str(
            r#"{ "name": "dashboard", "log": { "exclude": ["Timer*"] } }"#,
        )
        .unwrap();

        assert_eq!(config.name, "dashboard");
        assert_eq!(config.settle_rounds, DEFAULT_SETTLE_ROUNDS);
        assert!(!config.log.filter().should_log("TimerTicked"));
        assert!(config.log.filter().should_log("StartTapped"));
    }

    #[test]
    fn test_invalid_json() {
        let err = StoreConfig::from_json_str("{ name: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = StoreConfig::from_path("/nonexistent/uniflow.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
