//! Error types for clusterscope.

use thiserror::Error;

/// Result type alias for identity extraction.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A stable identity could not be derived from a resource object.
///
/// This is the only failure the metrics store can report. It is returned
/// unchanged from `update`/`remove`, and the store is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("{kind} object has no metadata")]
    MissingMetadata { kind: String },

    #[error("{kind} {name} has no uid")]
    MissingUid { kind: String, name: String },

    #[error("{kind} {name} has an empty uid")]
    EmptyUid { kind: String, name: String },
}

/// Errors that can occur while loading `clusterscope.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),

    #[error("unknown sink format: {0:?} (expected \"prometheus\" or \"json\")")]
    UnknownFormat(String),
}
