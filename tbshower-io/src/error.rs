//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A line of an event file could not be decoded.
    #[error("invalid event file, line {line}: {message}")]
    InvalidFormat { line: usize, message: String },

    /// A decoded event violates the hit batch contract.
    #[error("invalid event on line {line}: {source}")]
    InvalidEvent {
        line: usize,
        #[source]
        source: tbshower_core::Error,
    },

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] tbshower_core::Error),
}
