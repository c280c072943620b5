//! QUIC transport error types.

use std::fmt;

/// Errors that can occur in QUIC transport operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    BindFailed { addr: String, reason: String },
    /// Connection attempt timed out.
    ConnectionTimeout { remote: String },
    /// Connection was refused by the peer.
    ConnectionRefused { remote: String },
    /// TLS handshake failed.
    TlsError { reason: String },
    /// Stream creation or I/O failed.
    StreamError { reason: String },
    /// Connection has transitioned to `failed` or was closed.
    ConnectionClosed { reason: String },
    /// Certificate generation failed.
    CertificateError { reason: String },
    /// The client-side connection pool is at `max_connections` and every
    /// entry is still in active use.
    PoolExhausted,
    /// A handshake from this address arrived within the rate-limit window.
    HandshakeRateLimited { addr: String },
    /// The server-side session table is at `max_sessions`.
    TooManySessions,
    /// The transport endpoint has not been bound yet.
    NotInitialized,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BindFailed { addr, reason } => write!(f, "failed to bind to {addr}: {reason}"),
            Self::ConnectionTimeout { remote } => write!(f, "connection to {remote} timed out"),
            Self::ConnectionRefused { remote } => write!(f, "connection to {remote} refused"),
            Self::TlsError { reason } => write!(f, "TLS error: {reason}"),
            Self::StreamError { reason } => write!(f, "stream error: {reason}"),
            Self::ConnectionClosed { reason } => write!(f, "connection closed: {reason}"),
            Self::CertificateError { reason } => write!(f, "certificate error: {reason}"),
            Self::PoolExhausted => write!(f, "connection pool exhausted"),
            Self::HandshakeRateLimited { addr } => {
                write!(f, "handshake from {addr} rate-limited")
            }
            Self::TooManySessions => write!(f, "server session table full"),
            Self::NotInitialized => write!(f, "QUIC endpoint not initialized"),
        }
    }
}

impl std::error::Error for TransportError {}
