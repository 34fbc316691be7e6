//! Error types for the server composition layer

use thiserror::Error;

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that can occur while starting or running a server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration loading or validation failed
    #[error("Configuration error: {0}")]
    Config(#[from] svckit_core::CoreError),

    /// The discovery service failed to start
    #[error("Discovery error: {0}")]
    Discovery(#[from] svckit_discovery::DiscoveryError),
}
