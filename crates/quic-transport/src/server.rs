//! Inbound connection handling: binds a QUIC endpoint, accepts connections
//! subject to the handshake rate limiter and the session table's capacity,
//! and hands each accepted connection off as a tracked `Session`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use quinn::Endpoint;
use tracing::{debug, warn};

use crate::config::TransportConfig;
use crate::connection::Connection;
use crate::errors::TransportError;
use crate::rate_limit::HandshakeRateLimiter;
use crate::session::{Session, SessionTable};
use crate::tls::server_config;

pub struct QuicServer {
    endpoint: Endpoint,
    pub sessions: Arc<SessionTable>,
    rate_limiter: HandshakeRateLimiter,
    next_nonce: AtomicU64,
}

impl QuicServer {
    pub fn bind(config: &TransportConfig) -> Result<Self, TransportError> {
        let server_cfg = server_config(config.idle_timeout, config.max_streams)?;
        let endpoint =
            Endpoint::server(server_cfg, config.bind_addr).map_err(|e| TransportError::BindFailed {
                addr: config.bind_addr.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            endpoint,
            sessions: Arc::new(SessionTable::new(config.max_sessions, config.session_timeout)),
            rate_limiter: HandshakeRateLimiter::new(config.handshake_rate_limit),
            next_nonce: AtomicU64::new(0),
        })
    }

    pub fn stats(&self) -> crate::stats::TransportStats {
        self.sessions.stats()
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.endpoint.local_addr().map_err(|e| TransportError::BindFailed {
            addr: "<bound endpoint>".into(),
            reason: e.to_string(),
        })
    }

    /// Waits for and accepts the next incoming connection, applying the
    /// handshake rate limiter and the session table's capacity first.
    ///
    /// Returns `Ok(None)` once the endpoint has been closed.
    pub async fn accept(&self) -> Result<Option<Arc<Session>>, TransportError> {
        let Some(incoming) = self.endpoint.accept().await else {
            return Ok(None);
        };

        let remote = incoming.remote_address();
        if !self.rate_limiter.allow(remote.ip()) {
            warn!(remote = %remote, "rejecting handshake, rate limited");
            incoming.refuse();
            return Err(TransportError::HandshakeRateLimited {
                addr: remote.to_string(),
            });
        }

        if self.sessions.is_full() {
            warn!(remote = %remote, "rejecting handshake, session table full");
            incoming.refuse();
            return Err(TransportError::TooManySessions);
        }

        let quinn_conn = incoming
            .await
            .map_err(|e| TransportError::TlsError { reason: e.to_string() })?;

        let connection = Arc::new(Connection::new(quinn_conn));
        let nonce = self.next_nonce.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(Session::new((remote, nonce), connection));
        self.sessions.insert(session.clone());
        debug!(remote = %remote, nonce, "accepted QUIC session");
        Ok(Some(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binding_to_an_ephemeral_port_succeeds() {
        let server = QuicServer::bind(&TransportConfig::for_testing()).unwrap();
        let addr = server.local_addr().unwrap();
        assert!(addr.port() > 0);
        assert!(server.sessions.is_empty());
    }
}
