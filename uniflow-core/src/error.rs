//! Error types for stores, reducers and configuration

use std::path::PathBuf;

use thiserror::Error;

/// A fault raised by a reducer.
///
/// These are programmer errors: the composed reducer refuses the action
/// instead of dropping it silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReduceError {
    /// A child action arrived for a child whose state is absent.
    #[error("action `{action}` was routed to `{field}`, but that child state is absent")]
    RoutingMismatch {
        /// Name of the scoped field the action targeted
        field: &'static str,
        /// Name of the offending action
        action: &'static str,
    },
}

/// Errors surfaced by [`Store`](crate::Store) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store was torn down; no further actions are accepted.
    #[error("store is closed")]
    Closed,

    /// The reducer rejected the action.
    #[error(transparent)]
    Reduce(#[from] ReduceError),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
