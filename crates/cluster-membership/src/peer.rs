//! The connected-peer table: one entry per validator currently reachable
//! over QUIC, plus the bookkeeping the heartbeat loop needs to evict stale
//! entries.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use quic_transport::{Connection, StreamId};
use shared_types::NodeId;

/// A single connected peer: its transport connection and the stream
/// reserved for cluster-frame traffic.
pub struct Peer {
    pub node_id: NodeId,
    pub addr: SocketAddr,
    pub connection: Arc<Connection>,
    pub stream: StreamId,
    last_seen: Mutex<Instant>,
}

impl Peer {
    pub fn new(node_id: NodeId, addr: SocketAddr, connection: Arc<Connection>, stream: StreamId) -> Self {
        Self {
            node_id,
            addr,
            connection,
            stream,
            last_seen: Mutex::new(Instant::now()),
        }
    }

    pub fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }
}

/// The connected-peer set, keyed by node-id. Held behind one table-wide lock
/// is unnecessary here since `DashMap` already shards internally; structural
/// changes (insert/remove) never block on an in-flight send.
#[derive(Default)]
pub struct PeerTable {
    peers: DashMap<NodeId, Arc<Peer>>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self { peers: DashMap::new() }
    }

    pub fn insert(&self, peer: Arc<Peer>) {
        self.peers.insert(peer.node_id.clone(), peer);
    }

    pub fn remove(&self, node_id: &str) -> Option<Arc<Peer>> {
        self.peers.remove(node_id).map(|(_, p)| p)
    }

    pub fn get(&self, node_id: &str) -> Option<Arc<Peer>> {
        self.peers.get(node_id).map(|e| e.clone())
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn all(&self) -> Vec<Arc<Peer>> {
        self.peers.iter().map(|e| e.value().clone()).collect()
    }

    /// Returns the node-ids of every peer idle past `timeout`.
    pub fn stale_peers(&self, timeout: Duration) -> Vec<NodeId> {
        self.peers
            .iter()
            .filter(|e| e.value().idle_for() > timeout)
            .map(|e| e.key().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_fresh_table_is_empty() {
        let table = PeerTable::new();
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn removing_an_absent_peer_returns_none() {
        let table = PeerTable::new();
        assert!(table.remove("node_absent").is_none());
    }

    #[test]
    fn stale_peers_is_empty_for_an_empty_table() {
        let table = PeerTable::new();
        assert!(table.stale_peers(Duration::from_secs(60)).is_empty());
    }
}
