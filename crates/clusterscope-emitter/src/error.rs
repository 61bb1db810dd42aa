//! Error types for metric sinks.

use thiserror::Error;

pub type SinkResult<T> = Result<T, SinkError>;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to encode metrics: {0}")]
    Encode(String),

    #[error("failed to write metrics: {0}")]
    Write(String),

    #[error("downstream consumer closed")]
    Closed,
}
