//! Inflo error types

use thiserror::Error;

/// Inflo error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected input (missing text, missing gate, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Key-value or log storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Remote memory service error
    #[error("Remote error: {0}")]
    Remote(String),

    /// Payment provider error
    #[error("Payment error: {0}")]
    Payment(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Inflo operations
pub type Result<T> = std::result::Result<T, Error>;
