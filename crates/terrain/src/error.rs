//! Error types for the terrain crate.

use terrain_decode::DecodeError;
use thiserror::Error;

/// Result alias for terrain operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from configuring decoders or running decode tasks.
#[derive(Debug, Error)]
pub enum Error {
    /// The tile itself could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A configuration value was rejected.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A configuration document was not valid JSON.
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A blocking decode task panicked or was cancelled.
    #[error("decode task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
