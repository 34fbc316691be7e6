//! Wire format for peer announcements
//!
//! Announcements are compact JSON objects, e.g.
//! `{"cmd":0,"name":"login","id":1,"ip":"10.0.0.1","port":7000,"data":""}`.
//! `cmd` 0 is the one-shot startup announcement, 1 the periodic heartbeat.
//! A datagram never exceeds [`MAX_DATAGRAM_SIZE`]; oversized payloads are a
//! deployment error, not something this layer defends against.

use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, Result};
use serde::{Deserialize, Serialize};

/// Hard receive-buffer limit for discovery datagrams.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Kind of announcement, carried on the wire as the integer `cmd` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum AnnounceKind {
    /// One-shot startup announcement requesting peers to identify themselves
    First,

    /// Steady-state heartbeat sent on a jittered cadence
    Periodic,
}

impl From<AnnounceKind> for u32 {
    fn from(kind: AnnounceKind) -> Self {
        match kind {
            AnnounceKind::First => 0,
            AnnounceKind::Periodic => 1,
        }
    }
}

impl TryFrom<u32> for AnnounceKind {
    type Error = String;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(AnnounceKind::First),
            1 => Ok(AnnounceKind::Periodic),
            other => Err(format!("unknown announcement cmd {other}")),
        }
    }
}

/// A peer self-description as carried in one announcement datagram.
///
/// Identity key is `(name, id)`. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAnnounce {
    /// Announcement kind
    #[serde(rename = "cmd")]
    pub kind: AnnounceKind,

    /// Logical service name (e.g. "login")
    pub name: String,

    /// Numeric instance id within the service
    pub id: u32,

    /// Address the peer is reachable at (dotted quad)
    pub ip: String,

    /// Port the peer is reachable at
    pub port: u16,

    /// Opaque application payload, carried verbatim
    pub data: String,
}

impl PeerAnnounce {
    /// Serializes the announcement to wire bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(DiscoveryError::Encode)
    }

    /// Parses an announcement from wire bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(DiscoveryError::Decode)
    }

    /// Whether `other` describes the same instance.
    pub fn same_identity(&self, other: &PeerAnnounce) -> bool {
        self.name == other.name && self.id == other.id
    }
}

/// The local instance's own announcement, with both wire forms serialized
/// once at startup so heartbeats and re-broadcasts never re-encode.
#[derive(Debug, Clone)]
pub struct SelfAnnounce {
    descriptor: PeerAnnounce,
    first_wire: Vec<u8>,
    periodic_wire: Vec<u8>,
}

impl SelfAnnounce {
    /// Builds the self-description and both serialized forms.
    ///
    /// Fails when the identity is unusable: empty name, zero id or zero
    /// port.
    pub fn new(name: &str, id: u32, ip: &str, port: u16, data: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(DiscoveryError::InvalidConfig(
                "service name cannot be empty".to_string(),
            ));
        }

        if id == 0 {
            return Err(DiscoveryError::InvalidConfig(
                "instance id cannot be 0".to_string(),
            ));
        }

        if port == 0 {
            return Err(DiscoveryError::InvalidConfig(
                "advertise port cannot be 0".to_string(),
            ));
        }

        let mut descriptor = PeerAnnounce {
            kind: AnnounceKind::First,
            name: name.to_string(),
            id,
            ip: ip.to_string(),
            port,
            data: data.to_string(),
        };

        let first_wire = descriptor.encode()?;
        descriptor.kind = AnnounceKind::Periodic;
        let periodic_wire = descriptor.encode()?;
        descriptor.kind = AnnounceKind::First;

        Ok(Self {
            descriptor,
            first_wire,
            periodic_wire,
        })
    }

    /// Builds the self-description from the discovery configuration.
    pub fn from_config(config: &DiscoveryConfig) -> Result<Self> {
        Self::new(
            &config.service_name,
            config.instance_id,
            &config.advertise_ip,
            config.advertise_port,
            &config.data,
        )
    }

    /// The local descriptor (in its `First` form).
    pub fn descriptor(&self) -> &PeerAnnounce {
        &self.descriptor
    }

    /// Serialized startup announcement.
    pub fn first_wire(&self) -> &[u8] {
        &self.first_wire
    }

    /// Serialized heartbeat, also used for fast-convergence re-broadcasts.
    pub fn periodic_wire(&self) -> &[u8] {
        &self.periodic_wire
    }

    /// Whether an inbound announcement is an echo of this instance.
    pub fn matches(&self, peer: &PeerAnnounce) -> bool {
        self.descriptor.same_identity(peer)
    }
}
