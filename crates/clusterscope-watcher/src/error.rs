//! Error types for the watcher.

use thiserror::Error;

pub type WatcherResult<T> = Result<T, WatcherError>;

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("failed to read event source: {0}")]
    Read(String),
}
