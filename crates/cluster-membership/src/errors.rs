//! Cluster membership error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("bootstrap failed: only {connected} of {required} required peers reachable")]
    BootstrapIncomplete { connected: usize, required: usize },

    #[error("no peers are currently connected")]
    NoPeersConnected,

    #[error("peer {node_id} is not connected")]
    UnknownPeer { node_id: String },

    #[error("transport error: {0}")]
    Transport(#[from] quic_transport::TransportError),

    #[error("wire error: {0}")]
    Wire(#[from] shared_types::errors::WireError),

    #[error("malformed handshake payload: {reason}")]
    MalformedHandshake { reason: String },
}
