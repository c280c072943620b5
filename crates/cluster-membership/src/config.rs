//! Network selection and cluster-membership configuration.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which network this validator joins, selecting the default bootstrap peer
/// list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    Mainnet,
    Testnet,
    Devnet,
    Localnet,
}

impl NetworkId {
    /// The built-in seed peers for this network. Real addresses are
    /// deployment-specific; these are illustrative defaults meant to be
    /// overridden by operator-supplied entries in practice.
    pub fn default_peers(self) -> Vec<SocketAddr> {
        match self {
            Self::Mainnet => vec![
                "145.40.93.84:8001".parse().unwrap(),
                "145.40.90.135:8001".parse().unwrap(),
                "147.28.171.51:8001".parse().unwrap(),
            ],
            Self::Testnet => vec![
                "35.203.170.30:8001".parse().unwrap(),
                "35.203.170.87:8001".parse().unwrap(),
            ],
            Self::Devnet => vec!["35.197.53.26:8001".parse().unwrap()],
            Self::Localnet => vec!["127.0.0.1:8001".parse().unwrap()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub network_id: NetworkId,
    /// User-supplied peers, tried before the network's built-in defaults.
    pub extra_peers: Vec<SocketAddr>,
    /// Stop bootstrapping once this many peers are connected.
    pub bootstrap_target: usize,
    pub heartbeat_interval: Duration,
    /// A peer silent for longer than this is evicted.
    pub peer_timeout: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            network_id: NetworkId::Localnet,
            extra_peers: Vec::new(),
            bootstrap_target: 3,
            heartbeat_interval: Duration::from_secs(1),
            peer_timeout: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localnet_default_peers_is_loopback() {
        let peers = NetworkId::Localnet.default_peers();
        assert_eq!(peers.len(), 1);
        assert!(peers[0].ip().is_loopback());
    }

    #[test]
    fn default_config_targets_three_peers() {
        let config = ClusterConfig::default();
        assert_eq!(config.bootstrap_target, 3);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(1));
        assert_eq!(config.peer_timeout, Duration::from_secs(60));
    }
}
