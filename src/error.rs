//! Error types for the Floodgate components.

use thiserror::Error;

/// Boxed error type carried by failed cache fetches.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for Floodgate operations.
#[derive(Error, Debug)]
pub enum FloodgateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A caller-supplied fetch operation failed
    #[error("Fetch failed: {0}")]
    FetchFailed(#[source] BoxError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Floodgate operations.
pub type Result<T> = std::result::Result<T, FloodgateError>;
