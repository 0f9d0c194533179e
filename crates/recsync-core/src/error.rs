//! Error types for recsync-core

use thiserror::Error;

/// Result type alias using recsync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in recsync-core operations
///
/// Nothing here reaches the caller of a load or mutation: the controller logs
/// these and degrades to the prior or default state.
#[derive(Error, Debug)]
pub enum Error {
    /// A remote operation exceeded its time bound and was cancelled
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// The request never produced an HTTP response (connect/reset/DNS)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response, or a response reporting `success: false`
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// Response body was not valid JSON or did not match the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Writing the local mirror failed (disk full, permissions, ...)
    #[error("Persistence write failure: {0}")]
    PersistenceWriteFailure(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Timeouts and transport failures: the expected noise of a flaky network.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Network(_))
    }
}
