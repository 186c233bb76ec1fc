//! Error types for framewire.

use thiserror::Error;

/// Boxed error returned by middleware stages.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for all framewire operations.
#[derive(Debug, Error)]
pub enum FramewireError {
    /// Transport read failed (end-of-stream is not an error).
    #[error("read error: {0}")]
    Read(#[source] std::io::Error),

    /// Transport write failed.
    #[error("write error: {0}")]
    Write(#[source] std::io::Error),

    /// A middleware stage rejected the message.
    ///
    /// Carries the stage's own error unchanged.
    #[error("middleware error: {0}")]
    Middleware(BoxError),

    /// A cycle was attempted on a closed session.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Any other I/O error (bind, accept, shutdown, config file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration parsed but is not usable.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl FramewireError {
    /// Whether this error leaves the session unusable.
    ///
    /// Transport failures are fatal; a middleware rejection only aborts the
    /// current cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FramewireError::Read(_) | FramewireError::Write(_) | FramewireError::ConnectionClosed
        )
    }
}

/// Result type alias using FramewireError.
pub type Result<T> = std::result::Result<T, FramewireError>;
