//! Discovery service and datagram classification
//!
//! [`DiscoveryService`] orchestrates the transport, the peer registry and
//! the event channel. The classification state machine runs synchronously
//! on the receive task, one datagram at a time, so registry mutation and
//! re-broadcast for one datagram always complete before the next datagram
//! is looked at.

use crate::announce::{AnnounceKind, PeerAnnounce, SelfAnnounce};
use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, Result};
use crate::registry::PeerRegistry;
use crate::transport::{AnnounceTx, MulticastTransport};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Maximum number of events to buffer for the dispatch loop
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Event emitted for every non-echo announcement heard on the group.
#[derive(Debug, Clone)]
pub struct DiscoveryEvent {
    /// The announcing peer's self-description
    pub peer: PeerAnnounce,

    /// When the announcement was processed
    pub timestamp: DateTime<Utc>,
}

impl DiscoveryEvent {
    fn new(peer: PeerAnnounce) -> Self {
        Self {
            peer,
            timestamp: Utc::now(),
        }
    }
}

/// Classification state machine driven by the receive task.
///
/// Owns the registry outright; no other task reads or writes it.
pub(crate) struct InboundHandler {
    self_announce: SelfAnnounce,
    registry: PeerRegistry,
    events: async_channel::Sender<DiscoveryEvent>,
}

impl InboundHandler {
    pub(crate) fn new(
        self_announce: SelfAnnounce,
        events: async_channel::Sender<DiscoveryEvent>,
    ) -> Self {
        Self {
            self_announce,
            registry: PeerRegistry::new(),
            events,
        }
    }

    /// Processes one inbound datagram.
    pub(crate) async fn on_datagram<T: AnnounceTx>(&mut self, payload: &[u8], tx: &T) {
        let peer = match PeerAnnounce::decode(payload) {
            Ok(peer) => peer,
            Err(e) => {
                warn!(error = %e, len = payload.len(), "dropping malformed announcement");
                return;
            }
        };

        // Loopback is force-enabled, so we routinely hear our own
        // announcements echoed back.
        if self.self_announce.matches(&peer) {
            return;
        }

        match peer.kind {
            AnnounceKind::First => {
                // Tell the newcomer about us right away instead of leaving
                // it to wait out our next heartbeat.
                tx.send_announce(self.self_announce.periodic_wire()).await;
                debug!(name = %peer.name, id = peer.id, "peer announced itself");
                self.registry.upsert(peer.clone());
            }
            AnnounceKind::Periodic => {
                if self.registry.lookup(&peer.name, peer.id).is_none() {
                    tx.send_announce(self.self_announce.periodic_wire()).await;
                    debug!(name = %peer.name, id = peer.id, "discovered peer from heartbeat");
                    self.registry.upsert(peer.clone());
                }
            }
        }

        if let Err(e) = self.events.send(DiscoveryEvent::new(peer)).await {
            warn!(error = %e, "failed to emit discovery event");
        }
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &PeerRegistry {
        &self.registry
    }
}

/// Peer discovery service over UDP multicast.
pub struct DiscoveryService {
    config: DiscoveryConfig,
    events_tx: async_channel::Sender<DiscoveryEvent>,
    events_rx: async_channel::Receiver<DiscoveryEvent>,
    transport: Option<MulticastTransport>,
}

impl DiscoveryService {
    /// Creates a new discovery service.
    pub fn new(config: DiscoveryConfig) -> Result<Self> {
        config.validate().map_err(DiscoveryError::InvalidConfig)?;

        let (events_tx, events_rx) = async_channel::bounded(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config,
            events_tx,
            events_rx,
            transport: None,
        })
    }

    /// Builds the self-announcement and starts the multicast transport.
    ///
    /// Any underlying failure (interface lookup, bind, group join) aborts
    /// the start with nothing left running. Fails with `AlreadyStarted` if
    /// a transport is already active.
    pub async fn start(&mut self) -> Result<()> {
        if self.transport.is_some() {
            return Err(DiscoveryError::AlreadyStarted);
        }

        let self_announce = SelfAnnounce::from_config(&self.config)?;
        let first_wire = self_announce.first_wire().to_vec();
        let periodic_wire = self_announce.periodic_wire().to_vec();
        let handler = InboundHandler::new(self_announce, self.events_tx.clone());

        let transport =
            MulticastTransport::start(&self.config, first_wire, periodic_wire, handler).await?;
        self.transport = Some(transport);

        info!(
            service = %self.config.service_name,
            id = self.config.instance_id,
            group = %self.config.group_ip,
            port = self.config.group_port,
            "discovery service started"
        );

        Ok(())
    }

    /// Stops the transport and waits for both background tasks to exit.
    ///
    /// Safe to call if the service was never started or is already stopped.
    pub async fn stop(&mut self) {
        if let Some(transport) = self.transport.take() {
            transport.stop().await;
            info!("discovery service stopped");
        }
    }

    /// Whether a transport is currently active.
    pub fn is_running(&self) -> bool {
        self.transport.is_some()
    }

    /// Returns the event receiver for the host's dispatch loop.
    pub fn events(&self) -> async_channel::Receiver<DiscoveryEvent> {
        self.events_rx.clone()
    }

    /// The configuration this service was built with.
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Records every payload instead of touching the network.
    #[derive(Default)]
    struct RecordingTx {
        sent: Mutex<Vec<Vec<u8>>>,
    }

    impl RecordingTx {
        fn sent_count(&self) -> usize {
            self.sent.lock().len()
        }
    }

    #[async_trait]
    impl AnnounceTx for RecordingTx {
        async fn send_announce(&self, payload: &[u8]) {
            self.sent.lock().push(payload.to_vec());
        }
    }

    fn local_self() -> SelfAnnounce {
        SelfAnnounce::new("login", 1, "10.0.0.1", 7000, "").unwrap()
    }

    fn handler() -> (InboundHandler, async_channel::Receiver<DiscoveryEvent>) {
        let (tx, rx) = async_channel::bounded(EVENT_CHANNEL_CAPACITY);
        (InboundHandler::new(local_self(), tx), rx)
    }

    fn gate_peer(kind: AnnounceKind) -> PeerAnnounce {
        PeerAnnounce {
            kind,
            name: "gate".to_string(),
            id: 2,
            ip: "10.0.0.2".to_string(),
            port: 7100,
            data: "v1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_heartbeat_from_unknown_peer_is_learned() {
        // Scenario A: a heartbeat from an unknown peer converges fast.
        let (mut handler, events) = handler();
        let tx = RecordingTx::default();

        let wire = gate_peer(AnnounceKind::Periodic).encode().unwrap();
        handler.on_datagram(&wire, &tx).await;

        let found = handler.registry().lookup("gate", 2).unwrap();
        assert_eq!(found.ip, "10.0.0.2");
        assert_eq!(found.port, 7100);
        assert_eq!(found.data, "v1");

        // Exactly one fast-convergence re-broadcast, in periodic form.
        assert_eq!(tx.sent_count(), 1);
        let rebroadcast = PeerAnnounce::decode(&tx.sent.lock()[0]).unwrap();
        assert_eq!(rebroadcast.kind, AnnounceKind::Periodic);
        assert_eq!(rebroadcast.name, "login");

        let event = events.try_recv().unwrap();
        assert_eq!(event.peer.name, "gate");
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_heartbeat_from_known_peer_is_quiet() {
        // Scenario B: a known peer's heartbeat triggers no send, no change.
        let (mut handler, events) = handler();
        let tx = RecordingTx::default();

        let wire = gate_peer(AnnounceKind::Periodic).encode().unwrap();
        handler.on_datagram(&wire, &tx).await;
        assert_eq!(tx.sent_count(), 1);

        handler.on_datagram(&wire, &tx).await;

        assert_eq!(tx.sent_count(), 1);
        assert_eq!(handler.registry().len(), 1);

        // Both datagrams still surface as events.
        assert!(events.try_recv().is_ok());
        assert!(events.try_recv().is_ok());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_self_echo_is_dropped() {
        // Scenario C: our own announcement echoed back does nothing at all.
        let (mut handler, events) = handler();
        let tx = RecordingTx::default();

        let wire = local_self().first_wire().to_vec();
        handler.on_datagram(&wire, &tx).await;

        assert_eq!(tx.sent_count(), 0);
        assert!(handler.registry().is_empty());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_self_echo_ignores_non_identity_fields() {
        // Same identity with a different advertised address is still an echo.
        let (mut handler, events) = handler();
        let tx = RecordingTx::default();

        let mut echo = gate_peer(AnnounceKind::Periodic);
        echo.name = "login".to_string();
        echo.id = 1;
        handler.on_datagram(&echo.encode().unwrap(), &tx).await;

        assert_eq!(tx.sent_count(), 0);
        assert!(handler.registry().is_empty());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_datagram_is_dropped() {
        // Scenario D: garbage is dropped and later datagrams still work.
        let (mut handler, events) = handler();
        let tx = RecordingTx::default();

        handler.on_datagram(b"{{{ not json", &tx).await;
        assert_eq!(tx.sent_count(), 0);
        assert!(handler.registry().is_empty());
        assert!(events.try_recv().is_err());

        let wire = gate_peer(AnnounceKind::Periodic).encode().unwrap();
        handler.on_datagram(&wire, &tx).await;
        assert_eq!(tx.sent_count(), 1);
        assert!(handler.registry().lookup("gate", 2).is_some());
    }

    #[tokio::test]
    async fn test_first_announce_always_rebroadcasts() {
        // Every First announcement is answered and re-upserted, even from
        // a peer we already know (covers peers stuck in restart loops).
        let (mut handler, events) = handler();
        let tx = RecordingTx::default();

        let wire = gate_peer(AnnounceKind::First).encode().unwrap();
        handler.on_datagram(&wire, &tx).await;
        handler.on_datagram(&wire, &tx).await;

        assert_eq!(tx.sent_count(), 2);
        assert_eq!(handler.registry().len(), 1);
        assert!(events.try_recv().is_ok());
        assert!(events.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_restarted_peer_overwrites_entry() {
        let (mut handler, _events) = handler();
        let tx = RecordingTx::default();

        let wire = gate_peer(AnnounceKind::First).encode().unwrap();
        handler.on_datagram(&wire, &tx).await;

        let mut moved = gate_peer(AnnounceKind::First);
        moved.ip = "10.0.0.50".to_string();
        handler.on_datagram(&moved.encode().unwrap(), &tx).await;

        assert_eq!(handler.registry().lookup("gate", 2).unwrap().ip, "10.0.0.50");
        assert_eq!(handler.registry().len(), 1);
    }

    fn test_config() -> DiscoveryConfig {
        DiscoveryConfig {
            group_ip: "239.0.0.8".parse().unwrap(),
            group_port: 8890,
            interface: "eth0".to_string(),
            service_name: "login".to_string(),
            instance_id: 1,
            advertise_ip: "10.0.0.1".to_string(),
            advertise_port: 7000,
            data: String::new(),
        }
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let mut service = DiscoveryService::new(test_config()).unwrap();
        assert!(!service.is_running());

        service.stop().await;
        service.stop().await;
        assert!(!service.is_running());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = test_config();
        config.instance_id = 0;
        assert!(DiscoveryService::new(config).is_err());
    }

    #[tokio::test]
    async fn test_start_fails_on_unknown_interface() {
        let mut config = test_config();
        config.interface = "surely-no-such-interface0".to_string();

        let mut service = DiscoveryService::new(config).unwrap();
        let err = service.start().await.unwrap_err();
        assert!(matches!(err, DiscoveryError::UnknownInterface(_)));
        assert!(!service.is_running());
    }
}
