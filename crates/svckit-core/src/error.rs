//! Error types shared across the svckit framework.

use thiserror::Error;

/// Result type alias using `CoreError` as the error type.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to load configuration from '{path}': {reason}")]
    LoadFailed { path: String, reason: String },

    /// The configuration file is not valid JSON
    #[error("Invalid configuration format: {reason}")]
    InvalidFormat { reason: String },

    /// A setting has an invalid value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
