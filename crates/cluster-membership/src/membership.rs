//! Ties bootstrap, handshake, heartbeat and message routing together into
//! the cluster membership component.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use quic_transport::QuicClient;
use shared_types::wire::{ClusterFrame, ClusterMessageType, HandshakePayload, PingPayload, VotePayload};
use shared_types::NodeId;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bootstrap;
use crate::config::ClusterConfig;
use crate::errors::ClusterError;
use crate::peer::{Peer, PeerTable};
use crate::router::MessageRouter;

const RECEIVE_MAX_LEN: usize = 64 * 1024;
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

pub struct ClusterMembership {
    config: ClusterConfig,
    node_id: NodeId,
    client: Arc<QuicClient>,
    peers: Arc<PeerTable>,
    router: Arc<MessageRouter>,
    current_leader: Mutex<Option<NodeId>>,
    current_slot: AtomicU64,
    exit: Arc<AtomicBool>,
    on_disconnect: Arc<dyn Fn(&NodeId) + Send + Sync>,
}

impl ClusterMembership {
    pub fn new(
        config: ClusterConfig,
        node_id: NodeId,
        client: Arc<QuicClient>,
        on_disconnect: Arc<dyn Fn(&NodeId) + Send + Sync>,
    ) -> Self {
        Self {
            config,
            node_id,
            client,
            peers: Arc::new(PeerTable::new()),
            router: Arc::new(MessageRouter::new()),
            current_leader: Mutex::new(None),
            current_slot: AtomicU64::new(0),
            exit: Arc::new(AtomicBool::new(false)),
            on_disconnect,
        }
    }

    pub fn router(&self) -> Arc<MessageRouter> {
        self.router.clone()
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn current_leader(&self) -> Option<NodeId> {
        self.current_leader.lock().clone()
    }

    pub fn current_slot(&self) -> u64 {
        self.current_slot.load(Ordering::Relaxed)
    }

    /// Attempts user-supplied peers then the network's defaults, stopping
    /// once `bootstrap_target` connections succeed. Each successful peer is
    /// handed its own inbound-frame task.
    pub async fn bootstrap(self: &Arc<Self>) -> usize {
        let this = self.clone();
        bootstrap::bootstrap(&self.config, move |addr| {
            let this = this.clone();
            async move { this.connect_peer(addr).await.is_ok() }
        })
        .await
    }

    /// Dials `addr`, performs the handshake, and spawns the peer's receive
    /// loop on success.
    pub async fn connect_peer(self: &Arc<Self>, addr: SocketAddr) -> Result<NodeId, ClusterError> {
        let connection = self.client.connect(addr).await?;
        let stream = connection.open_stream().await?;

        let handshake = HandshakePayload {
            message_type: "handshake".into(),
            node_id: self.node_id.clone(),
            version: VERSION.into(),
        };
        let payload = serde_json::to_vec(&handshake)
            .map_err(|e| ClusterError::MalformedHandshake { reason: e.to_string() })?;
        let frame = ClusterFrame::new(ClusterMessageType::Handshake, now_ms(), &self.node_id, payload);
        connection.send(stream, &frame.encode()).await?;

        let reply = connection.receive(stream, RECEIVE_MAX_LEN).await?;
        let decoded = ClusterFrame::decode(&reply)?;
        if decoded.message_type != ClusterMessageType::Handshake {
            return Err(ClusterError::MalformedHandshake {
                reason: format!("expected handshake reply, got {:?}", decoded.message_type),
            });
        }
        let remote: HandshakePayload = serde_json::from_slice(&decoded.payload)
            .map_err(|e| ClusterError::MalformedHandshake { reason: e.to_string() })?;

        let peer = Arc::new(Peer::new(remote.node_id.clone(), addr, connection, stream));
        self.peers.insert(peer.clone());
        info!(node_id = %remote.node_id, %addr, "peer connected");

        let this = self.clone();
        tokio::spawn(async move { this.receive_loop(peer).await });

        Ok(remote.node_id)
    }

    /// Reads frames from one peer's stream until the connection closes or
    /// shutdown is requested, dispatching each to `handle_inbound`.
    async fn receive_loop(self: Arc<Self>, peer: Arc<Peer>) {
        while !self.exit.load(Ordering::Relaxed) {
            match peer.connection.receive(peer.stream, RECEIVE_MAX_LEN).await {
                Ok(bytes) if bytes.is_empty() => continue,
                Ok(bytes) => match ClusterFrame::decode(&bytes) {
                    Ok(frame) => self.handle_inbound(&peer, frame).await,
                    Err(e) => warn!(node_id = %peer.node_id, error = %e, "dropping malformed cluster frame"),
                },
                Err(e) => {
                    warn!(node_id = %peer.node_id, error = %e, "peer stream closed");
                    break;
                }
            }
        }
        self.peers.remove(&peer.node_id);
        (self.on_disconnect)(&peer.node_id);
    }

    async fn handle_inbound(&self, peer: &Peer, frame: ClusterFrame) {
        peer.touch();
        match frame.message_type {
            ClusterMessageType::Ping => {
                let pong = ClusterFrame::new(ClusterMessageType::Pong, now_ms(), &self.node_id, Vec::new());
                if let Err(e) = peer.connection.send(peer.stream, &pong.encode()).await {
                    warn!(node_id = %peer.node_id, error = %e, "failed to reply to ping");
                }
            }
            ClusterMessageType::Vote => {
                if let Ok(vote) = serde_json::from_slice::<VotePayload>(&frame.payload) {
                    *self.current_leader.lock() = Some(vote.node_id.clone());
                    self.current_slot.store(vote.slot, Ordering::Relaxed);
                    debug!(leader = %vote.node_id, slot = vote.slot, "leader updated by vote");
                }
            }
            _ => {}
        }
        self.router.dispatch(&frame);
    }

    /// Sends `payload` of `message_type` to every connected peer. Returns
    /// `false` if there are no connected peers.
    pub async fn broadcast(&self, message_type: ClusterMessageType, payload: Vec<u8>) -> bool {
        let peers = self.peers.all();
        if peers.is_empty() {
            return false;
        }
        for peer in peers {
            let frame = ClusterFrame::new(message_type, now_ms(), &self.node_id, payload.clone());
            if let Err(e) = peer.connection.send(peer.stream, &frame.encode()).await {
                warn!(node_id = %peer.node_id, error = %e, "broadcast send failed");
            }
        }
        true
    }

    /// Spawns the heartbeat loop: PINGs every connected peer on
    /// `heartbeat_interval`, evicting anyone idle past `peer_timeout`.
    pub fn spawn_heartbeat(self: Arc<Self>) -> JoinHandle<()> {
        let interval = self.config.heartbeat_interval;
        let timeout = self.config.peer_timeout;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            while !self.exit.load(Ordering::Relaxed) {
                ticker.tick().await;
                self.send_pings().await;
                self.evict_stale_peers(timeout);
            }
        })
    }

    async fn send_pings(&self) {
        for peer in self.peers.all() {
            let ping_payload = PingPayload {
                message_type: "ping".into(),
                timestamp: now_ms(),
            };
            let Ok(payload) = serde_json::to_vec(&ping_payload) else {
                continue;
            };
            let frame = ClusterFrame::new(ClusterMessageType::Ping, now_ms(), &self.node_id, payload);
            if let Err(e) = peer.connection.send(peer.stream, &frame.encode()).await {
                warn!(node_id = %peer.node_id, error = %e, "heartbeat ping failed");
            }
        }
    }

    fn evict_stale_peers(&self, timeout: Duration) {
        for node_id in self.peers.stale_peers(timeout) {
            if let Some(peer) = self.peers.remove(&node_id) {
                peer.connection.close();
                warn!(node_id = %node_id, "evicting unresponsive peer");
                (self.on_disconnect)(&node_id);
            }
        }
    }

    pub fn stop(&self) {
        self.exit.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkId;

    #[tokio::test]
    async fn broadcast_returns_false_with_no_connected_peers() {
        let client = Arc::new(QuicClient::new(quic_transport::TransportConfig::for_testing()).unwrap());
        let membership = Arc::new(ClusterMembership::new(
            ClusterConfig {
                network_id: NetworkId::Localnet,
                ..ClusterConfig::default()
            },
            "node_test".into(),
            client,
            Arc::new(|_node_id: &NodeId| {}),
        ));
        let sent = membership.broadcast(ClusterMessageType::Ping, Vec::new()).await;
        assert!(!sent);
    }

    #[tokio::test]
    async fn a_fresh_membership_has_no_leader_and_slot_zero() {
        let client = Arc::new(QuicClient::new(quic_transport::TransportConfig::for_testing()).unwrap());
        let membership = ClusterMembership::new(
            ClusterConfig::default(),
            "node_test".into(),
            client,
            Arc::new(|_: &NodeId| {}),
        );
        assert!(membership.current_leader().is_none());
        assert_eq!(membership.current_slot(), 0);
        assert_eq!(membership.peer_count(), 0);
    }
}
