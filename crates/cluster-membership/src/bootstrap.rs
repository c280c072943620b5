//! Initial peer discovery: tries user-supplied addresses first, then the
//! network's built-in defaults, stopping once enough peers are reachable.

use std::net::SocketAddr;

use tracing::{debug, warn};

use crate::config::ClusterConfig;

/// The ordered list of addresses to attempt, user-supplied entries first.
pub fn candidate_addresses(config: &ClusterConfig) -> Vec<SocketAddr> {
    let mut addrs = config.extra_peers.clone();
    addrs.extend(config.network_id.default_peers());
    addrs
}

/// Runs `connect` against each candidate in order until `target` succeed or
/// the candidate list is exhausted. Returns the number of successful
/// connections.
pub async fn bootstrap<F, Fut>(config: &ClusterConfig, mut connect: F) -> usize
where
    F: FnMut(SocketAddr) -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let mut connected = 0;
    for addr in candidate_addresses(config) {
        if connected >= config.bootstrap_target {
            break;
        }
        if connect(addr).await {
            debug!(%addr, "bootstrap peer connected");
            connected += 1;
        } else {
            warn!(%addr, "bootstrap peer unreachable");
        }
    }
    connected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkId;

    #[test]
    fn candidate_addresses_puts_user_supplied_peers_first() {
        let mut config = ClusterConfig {
            network_id: NetworkId::Localnet,
            ..ClusterConfig::default()
        };
        let extra: SocketAddr = "10.0.0.1:9000".parse().unwrap();
        config.extra_peers = vec![extra];
        let addrs = candidate_addresses(&config);
        assert_eq!(addrs[0], extra);
    }

    #[tokio::test]
    async fn bootstrap_stops_once_the_target_is_reached() {
        let mut config = ClusterConfig::default();
        config.extra_peers = vec![
            "10.0.0.1:9000".parse().unwrap(),
            "10.0.0.2:9000".parse().unwrap(),
            "10.0.0.3:9000".parse().unwrap(),
        ];
        config.bootstrap_target = 2;
        let attempted = std::sync::atomic::AtomicUsize::new(0);
        let connected = bootstrap(&config, |_addr| {
            attempted.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async { true }
        })
        .await;
        assert_eq!(connected, 2);
        assert_eq!(attempted.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn bootstrap_counts_only_successful_connections() {
        let mut config = ClusterConfig::default();
        config.extra_peers = vec!["10.0.0.1:9000".parse().unwrap(), "10.0.0.2:9000".parse().unwrap()];
        config.bootstrap_target = 5;
        let connected = bootstrap(&config, |addr| async move { addr.port() == 9000 && addr.to_string().ends_with(".2:9000") }).await;
        assert_eq!(connected, 1);
    }
}
