//! Configuration types for multicast peer discovery.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Configuration for the UDP multicast discovery service.
///
/// Covers both the multicast group this instance joins and the
/// self-description it announces to peers. The decision whether to run
/// discovery at all belongs to the caller: the section is optional in
/// [`AppConfig`](crate::config::AppConfig).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Multicast group address all peer instances join
    #[serde(default = "default_group_ip")]
    pub group_ip: Ipv4Addr,

    /// UDP port of the multicast group
    #[serde(default = "default_group_port")]
    pub group_port: u16,

    /// Name of the local network interface to join the group on
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Logical service name announced to peers (e.g. "login")
    pub service_name: String,

    /// Numeric instance id; `(service_name, instance_id)` is the peer identity
    pub instance_id: u32,

    /// Address peers should use to reach this instance (dotted quad)
    pub advertise_ip: String,

    /// Port peers should use to reach this instance
    pub advertise_port: u16,

    /// Opaque application payload carried verbatim in every announcement
    #[serde(default)]
    pub data: String,
}

impl DiscoveryConfig {
    /// Validates the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.group_ip.is_multicast() {
            return Err(format!("group_ip {} is not a multicast address", self.group_ip));
        }

        if self.group_port == 0 {
            return Err("group_port cannot be 0".to_string());
        }

        if self.interface.is_empty() {
            return Err("interface cannot be empty".to_string());
        }

        if self.service_name.is_empty() {
            return Err("service_name cannot be empty".to_string());
        }

        if self.instance_id == 0 {
            return Err("instance_id cannot be 0".to_string());
        }

        if self.advertise_ip.parse::<Ipv4Addr>().is_err() {
            return Err(format!(
                "advertise_ip '{}' is not a dotted-quad IPv4 address",
                self.advertise_ip
            ));
        }

        if self.advertise_port == 0 {
            return Err("advertise_port cannot be 0".to_string());
        }

        Ok(())
    }
}

fn default_group_ip() -> Ipv4Addr {
    Ipv4Addr::new(239, 0, 0, 8)
}

fn default_group_port() -> u16 {
    8890
}

fn default_interface() -> String {
    "eth0".to_string()
}
