//! UDP multicast transport
//!
//! Owns the socket, the group membership, and the two background tasks:
//!
//! - the **receive task**, which forwards every inbound datagram to the
//!   classification handler, one datagram at a time;
//! - the **announce task**, which sends the startup announcement once and
//!   then heartbeats on a jittered 10-20 s cadence.
//!
//! Both tasks observe a shutdown watch; [`MulticastTransport::stop`] raises
//! it and then joins both tasks, so no background activity survives the
//! call. A receive error is interpreted as "socket closed" and ends the
//! receive task without retry; resilience comes from periodic
//! re-announcement, not reconnect logic.

use crate::announce::MAX_DATAGRAM_SIZE;
use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, Result};
use crate::service::InboundHandler;
use async_trait::async_trait;
use rand::Rng;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outbound seam for announcement datagrams.
///
/// The classification handler re-broadcasts through this trait instead of a
/// concrete socket, so its state machine is testable without the network.
#[async_trait]
pub trait AnnounceTx: Send + Sync {
    /// Best-effort single-datagram send; failures are logged, never fatal.
    async fn send_announce(&self, payload: &[u8]);
}

/// Sends announcement datagrams to the multicast group.
#[derive(Clone)]
pub struct AnnounceSender {
    socket: Arc<UdpSocket>,
    group: SocketAddr,
}

#[async_trait]
impl AnnounceTx for AnnounceSender {
    async fn send_announce(&self, payload: &[u8]) {
        match self.socket.send_to(payload, self.group).await {
            Ok(sent) if sent != payload.len() => warn!(
                expected = payload.len(),
                actual = sent,
                "partial announcement datagram sent"
            ),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "failed to send announcement"),
        }
    }
}

/// Handle to the multicast socket and its two background tasks.
///
/// At most one exists per [`DiscoveryService`](crate::DiscoveryService);
/// created by `start`, fully torn down by `stop`.
pub struct MulticastTransport {
    shutdown: watch::Sender<bool>,
    recv_task: JoinHandle<()>,
    announce_task: JoinHandle<()>,
}

impl MulticastTransport {
    /// Joins the group and starts the receive and announce tasks.
    pub(crate) async fn start(
        config: &DiscoveryConfig,
        first_wire: Vec<u8>,
        periodic_wire: Vec<u8>,
        mut handler: InboundHandler,
    ) -> Result<Self> {
        let group = SocketAddr::new(IpAddr::V4(config.group_ip), config.group_port);
        let interface = resolve_interface(&config.interface)?;
        let socket = Arc::new(bind_multicast_socket(config, interface)?);

        info!(group = %group, interface = %interface, "joined multicast group");

        let sender = AnnounceSender {
            socket: Arc::clone(&socket),
            group,
        };

        let (shutdown, _) = watch::channel(false);

        let recv_socket = Arc::clone(&socket);
        let recv_sender = sender.clone();
        let mut recv_shutdown = shutdown.subscribe();
        let recv_task = tokio::spawn(async move {
            let mut buffer = [0u8; MAX_DATAGRAM_SIZE];

            loop {
                tokio::select! {
                    _ = recv_shutdown.changed() => {
                        debug!("receive task shutting down");
                        break;
                    }
                    result = recv_socket.recv_from(&mut buffer) => {
                        match result {
                            Ok((len, _source)) => {
                                handler.on_datagram(&buffer[..len], &recv_sender).await;
                            }
                            Err(e) => {
                                // The socket is gone; shutdown is in progress.
                                debug!(error = %e, "receive failed, ending receive task");
                                break;
                            }
                        }
                    }
                }
            }
        });

        let mut announce_shutdown = shutdown.subscribe();
        let announce_task = tokio::spawn(async move {
            sender.send_announce(&first_wire).await;

            loop {
                // Jitter decorrelates heartbeats across peers.
                let interval = Duration::from_secs(rand::thread_rng().gen_range(10..20));

                tokio::select! {
                    _ = announce_shutdown.changed() => {
                        debug!("announce task shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        sender.send_announce(&periodic_wire).await;
                    }
                }
            }
        });

        Ok(Self {
            shutdown,
            recv_task,
            announce_task,
        })
    }

    /// Raises the shutdown signal and joins both tasks.
    ///
    /// A panicking task body is absorbed by the join and logged; it still
    /// counts as exited. Once this returns, no further sends occur and no
    /// further inbound datagrams are handled.
    pub(crate) async fn stop(self) {
        let _ = self.shutdown.send(true);

        if let Err(e) = self.recv_task.await {
            warn!(error = %e, "receive task ended abnormally");
        }

        if let Err(e) = self.announce_task.await {
            warn!(error = %e, "announce task ended abnormally");
        }

        debug!("multicast transport stopped");
    }
}

/// Resolves an interface name to its IPv4 address.
fn resolve_interface(name: &str) -> Result<Ipv4Addr> {
    let interfaces = local_ip_address::list_afinet_netifas()
        .map_err(|e| DiscoveryError::InterfaceLookup(e.to_string()))?;

    interfaces
        .into_iter()
        .find_map(|(ifname, addr)| match addr {
            IpAddr::V4(v4) if ifname == name => Some(v4),
            _ => None,
        })
        .ok_or_else(|| DiscoveryError::UnknownInterface(name.to_string()))
}

/// Binds the group port and joins the multicast group on `interface`.
fn bind_multicast_socket(config: &DiscoveryConfig, interface: Ipv4Addr) -> Result<UdpSocket> {
    let socket = socket2::Socket::new(
        socket2::Domain::IPV4,
        socket2::Type::DGRAM,
        Some(socket2::Protocol::UDP),
    )?;

    // Co-located instances all bind the group port.
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;

    let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), config.group_port);
    socket.bind(&bind_addr.into())?;

    let socket = UdpSocket::from_std(socket.into())?;

    socket
        .join_multicast_v4(config.group_ip, interface)
        .map_err(|source| DiscoveryError::JoinGroup {
            group: config.group_ip,
            source,
        })?;

    // Loopback delivery is load-bearing: instances sharing a host (and the
    // sender itself) must observe every announcement.
    if let Err(e) = socket.set_multicast_loop_v4(true) {
        warn!(error = %e, "failed to enable multicast loopback");
    }

    let _ = socket.set_multicast_ttl_v4(1);

    Ok(socket)
}
