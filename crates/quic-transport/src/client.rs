//! Outbound connection handling: dials a remote peer, reusing a pooled
//! connection when one is already live.

use std::net::SocketAddr;
use std::sync::Arc;

use quinn::Endpoint;
use tracing::debug;

use crate::config::TransportConfig;
use crate::connection::Connection;
use crate::errors::TransportError;
use crate::pool::ConnectionPool;
use crate::tls::client_config;

pub struct QuicClient {
    endpoint: Endpoint,
    pool: ConnectionPool,
    config: TransportConfig,
}

impl QuicClient {
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let mut endpoint =
            Endpoint::client("0.0.0.0:0".parse().expect("valid ephemeral bind addr"))
                .map_err(|e| TransportError::BindFailed {
                    addr: "0.0.0.0:0".into(),
                    reason: e.to_string(),
                })?;
        endpoint.set_default_client_config(client_config()?);

        Ok(Self {
            endpoint,
            pool: ConnectionPool::new(config.max_connections),
            config,
        })
    }

    /// Connects to `remote`, reusing a pooled connection if one is cached
    /// under the same `"host:port"` key.
    pub async fn connect(&self, remote: SocketAddr) -> Result<Arc<Connection>, TransportError> {
        let key = remote.to_string();
        if let Some(conn) = self.pool.get(&key) {
            debug!(remote = %remote, "reusing pooled QUIC connection");
            return Ok(conn);
        }

        let connecting = self
            .endpoint
            .connect(remote, "localhost")
            .map_err(|_| TransportError::ConnectionRefused {
                remote: remote.to_string(),
            })?;

        let inner = tokio::time::timeout(self.config.connect_timeout, connecting)
            .await
            .map_err(|_| TransportError::ConnectionTimeout {
                remote: remote.to_string(),
            })?
            .map_err(|e| TransportError::TlsError {
                reason: e.to_string(),
            })?;

        let conn = Arc::new(Connection::new(inner));
        self.pool.insert(key, conn.clone());
        Ok(conn)
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    pub fn stats(&self) -> crate::stats::TransportStats {
        self.pool.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn client_construction_binds_an_ephemeral_local_endpoint() {
        let client = QuicClient::new(TransportConfig::for_testing()).unwrap();
        assert_eq!(client.pool_len(), 0);
    }
}
