//! Configuration types for multicast peer discovery
//!
//! Re-exports configuration from svckit-core to avoid circular dependencies

pub use svckit_core::discovery_config::DiscoveryConfig;
