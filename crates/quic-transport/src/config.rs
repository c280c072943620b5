//! Transport-wide configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Transport configuration, shared by both the client pool and the server
/// listener.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    pub bind_addr: SocketAddr,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_streams: u32,
    /// Server-side: sessions idle longer than this are swept.
    pub session_timeout: Duration,
    /// Client-side: live connections cached by `"host:port"`.
    pub max_connections: usize,
    /// Server-side: cap on concurrently tracked sessions.
    pub max_sessions: usize,
    /// Minimum spacing between accepted handshakes from the same address.
    pub handshake_rate_limit: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:0".parse().expect("valid default bind addr"),
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(30),
            max_streams: 100,
            session_timeout: Duration::from_secs(30 * 60),
            max_connections: 256,
            max_sessions: 1024,
            handshake_rate_limit: Duration::from_millis(100),
        }
    }
}

#[cfg(test)]
impl TransportConfig {
    pub fn for_testing() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".parse().expect("valid test bind addr"),
            connect_timeout: Duration::from_secs(2),
            idle_timeout: Duration::from_secs(5),
            max_streams: 10,
            session_timeout: Duration::from_secs(5),
            max_connections: 4,
            max_sessions: 4,
            handshake_rate_limit: Duration::from_millis(100),
        }
    }
}
