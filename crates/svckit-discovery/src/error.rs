//! Error types for multicast peer discovery

use std::net::Ipv4Addr;
use thiserror::Error;

/// Result type alias for discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Errors that can occur during peer discovery
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Invalid discovery configuration
    #[error("Invalid discovery configuration: {0}")]
    InvalidConfig(String),

    /// Network interfaces could not be enumerated
    #[error("Failed to enumerate network interfaces: {0}")]
    InterfaceLookup(String),

    /// The configured interface does not exist or has no IPv4 address
    #[error("Network interface '{0}' not found or has no IPv4 address")]
    UnknownInterface(String),

    /// Joining the multicast group failed
    #[error("Failed to join multicast group {group}: {source}")]
    JoinGroup {
        group: Ipv4Addr,
        source: std::io::Error,
    },

    /// An announcement could not be serialized
    #[error("Failed to encode announcement: {0}")]
    Encode(#[source] serde_json::Error),

    /// An inbound datagram could not be parsed; the caller drops it
    #[error("Failed to decode announcement: {0}")]
    Decode(#[source] serde_json::Error),

    /// The discovery service already has an active transport
    #[error("Discovery service is already running")]
    AlreadyStarted,

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
