//! Decentralized peer discovery over UDP multicast
//!
//! Every svckit instance joins a shared multicast group instead of
//! registering with a central directory. The protocol is small:
//!
//! 1. On startup an instance broadcasts a `First` announcement asking the
//!    group to identify itself.
//! 2. Peers that hear a `First` announcement (or a heartbeat from an
//!    instance they do not know yet) immediately re-broadcast their own
//!    description, so a newcomer converges without waiting for heartbeats.
//! 3. Every instance keeps heartbeating on a jittered 10-20 s cadence.
//!
//! Multicast loopback is force-enabled so co-located instances hear each
//! other; an instance therefore also hears itself, and drops those
//! self-echoes by identity `(service_name, instance_id)`.
//!
//! Discovered peers land in an in-memory [`PeerRegistry`] (never expired,
//! rebuilt from scratch on every process start) and every non-echo
//! announcement is surfaced as a [`DiscoveryEvent`] on the channel returned
//! by [`DiscoveryService::events`], which the host's dispatch loop consumes.
//!
//! # Example
//!
//! ```no_run
//! use svckit_discovery::{DiscoveryConfig, DiscoveryService};
//!
//! # async fn run() -> svckit_discovery::Result<()> {
//! let config = DiscoveryConfig {
//!     group_ip: "239.0.0.8".parse().unwrap(),
//!     group_port: 8890,
//!     interface: "eth0".to_string(),
//!     service_name: "login".to_string(),
//!     instance_id: 1,
//!     advertise_ip: "10.0.0.1".to_string(),
//!     advertise_port: 7000,
//!     data: String::new(),
//! };
//!
//! let mut service = DiscoveryService::new(config)?;
//! service.start().await?;
//!
//! let events = service.events();
//! while let Ok(event) = events.recv().await {
//!     println!("discovered {}#{}", event.peer.name, event.peer.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod announce;
pub mod config;
pub mod error;
pub mod registry;
pub mod service;
pub mod transport;

pub use announce::{AnnounceKind, PeerAnnounce, SelfAnnounce, MAX_DATAGRAM_SIZE};
pub use config::DiscoveryConfig;
pub use error::{DiscoveryError, Result};
pub use registry::PeerRegistry;
pub use service::{DiscoveryEvent, DiscoveryService};
