//! In-memory table of discovered peers
//!
//! Keyed by service name, then instance id. Peers are never expired or
//! deleted; a peer once seen is retained for the process lifetime, and the
//! table is rebuilt from scratch on every restart purely via the protocol.
//!
//! The registry carries no locking. The receive task is its only reader and
//! writer; sharing it with other tasks would require adding one.

use crate::announce::PeerAnnounce;
use std::collections::HashMap;

/// Registry of peers discovered on the multicast group.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<String, HashMap<u32, PeerAnnounce>>,
}

impl PeerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the peer at key `(name, id)`. Idempotent.
    pub fn upsert(&mut self, peer: PeerAnnounce) {
        self.peers
            .entry(peer.name.clone())
            .or_default()
            .insert(peer.id, peer);
    }

    /// Looks up a peer by identity.
    pub fn lookup(&self, name: &str, id: u32) -> Option<&PeerAnnounce> {
        self.peers.get(name)?.get(&id)
    }

    /// Number of known peer instances across all services.
    pub fn len(&self) -> usize {
        self.peers.values().map(HashMap::len).sum()
    }

    /// Whether no peer has been discovered yet.
    pub fn is_empty(&self) -> bool {
        self.peers.values().all(HashMap::is_empty)
    }

    /// Iterates over all known peers in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &PeerAnnounce> {
        self.peers.values().flat_map(HashMap::values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announce::AnnounceKind;

    fn peer(name: &str, id: u32, ip: &str) -> PeerAnnounce {
        PeerAnnounce {
            kind: AnnounceKind::Periodic,
            name: name.to_string(),
            id,
            ip: ip.to_string(),
            port: 7100,
            data: String::new(),
        }
    }

    #[test]
    fn test_lookup_absent() {
        let registry = PeerRegistry::new();
        assert!(registry.lookup("gate", 2).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_upsert_and_lookup() {
        let mut registry = PeerRegistry::new();
        registry.upsert(peer("gate", 2, "10.0.0.2"));

        let found = registry.lookup("gate", 2).unwrap();
        assert_eq!(found.ip, "10.0.0.2");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut registry = PeerRegistry::new();
        registry.upsert(peer("gate", 2, "10.0.0.2"));
        registry.upsert(peer("gate", 2, "10.0.0.2"));

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_upsert_overwrites() {
        let mut registry = PeerRegistry::new();
        registry.upsert(peer("gate", 2, "10.0.0.2"));
        registry.upsert(peer("gate", 2, "10.0.0.99"));

        assert_eq!(registry.lookup("gate", 2).unwrap().ip, "10.0.0.99");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_instances_are_distinct() {
        let mut registry = PeerRegistry::new();
        registry.upsert(peer("gate", 1, "10.0.0.2"));
        registry.upsert(peer("gate", 2, "10.0.0.3"));
        registry.upsert(peer("login", 1, "10.0.0.4"));

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.iter().count(), 3);
        assert!(registry.lookup("gate", 1).is_some());
        assert!(registry.lookup("login", 2).is_none());
    }
}
