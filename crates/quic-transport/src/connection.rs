//! A single QUIC connection: lifecycle state, RTT/byte counters, and the
//! per-connection stream table keyed by monotonically increasing stream IDs.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use quinn::{Connection as QuinnConnection, RecvStream, SendStream};

use crate::errors::TransportError;

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Failed,
}

/// A caller-facing stream identifier, unique within its connection.
pub type StreamId = u64;

struct StreamHalves {
    send: SendStream,
    recv: RecvStream,
}

/// Wraps a `quinn::Connection` with the bookkeeping the rest of this crate
/// needs: lifecycle state, counters, and on-demand bidirectional streams
/// addressed by a monotonic ID rather than quinn's own stream handles.
pub struct Connection {
    inner: QuinnConnection,
    remote: SocketAddr,
    state: Mutex<ConnectionState>,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    connected_at: Instant,
    next_stream_id: AtomicU64,
    streams: Mutex<HashMap<StreamId, StreamHalves>>,
}

impl Connection {
    pub fn new(inner: QuinnConnection) -> Self {
        let remote = inner.remote_address();
        Self {
            inner,
            remote,
            state: Mutex::new(ConnectionState::Connected),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            connected_at: Instant::now(),
            next_stream_id: AtomicU64::new(0),
            streams: Mutex::new(HashMap::new()),
        }
    }

    pub fn remote_address(&self) -> SocketAddr {
        self.remote
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn mark_failed(&self) {
        *self.state.lock() = ConnectionState::Failed;
    }

    pub fn rtt(&self) -> Duration {
        self.inner.rtt()
    }

    pub fn uptime(&self) -> Duration {
        self.connected_at.elapsed()
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    pub fn active_streams(&self) -> usize {
        self.streams.lock().len()
    }

    /// Open a fresh bidirectional stream and return its assigned ID.
    pub async fn open_stream(&self) -> Result<StreamId, TransportError> {
        let (send, recv) = self.inner.open_bi().await.map_err(|e| {
            self.mark_failed();
            TransportError::StreamError {
                reason: e.to_string(),
            }
        })?;
        let id = self.next_stream_id.fetch_add(1, Ordering::Relaxed);
        self.streams.lock().insert(id, StreamHalves { send, recv });
        Ok(id)
    }

    /// Append `data` to `stream`'s outbound buffer, opening the stream first
    /// if `stream` hasn't been seen yet.
    pub async fn send(&self, stream: StreamId, data: &[u8]) -> Result<(), TransportError> {
        self.ensure_stream(stream).await?;
        let mut halves = self.take_stream(stream);
        let result = halves.send.write_all(data).await;
        self.streams.lock().insert(stream, halves);
        result.map_err(|e| {
            self.mark_failed();
            TransportError::StreamError {
                reason: e.to_string(),
            }
        })?;
        self.bytes_sent.fetch_add(data.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Pop the next reassembled chunk from `stream`'s inbound buffer.
    pub async fn receive(&self, stream: StreamId, max_len: usize) -> Result<Vec<u8>, TransportError> {
        self.ensure_stream(stream).await?;
        let mut halves = self.take_stream(stream);
        let mut buf = vec![0u8; max_len];
        let result = halves.recv.read(&mut buf).await;
        self.streams.lock().insert(stream, halves);
        let read = result
            .map_err(|e| TransportError::StreamError {
                reason: e.to_string(),
            })?
            .unwrap_or(0);
        buf.truncate(read);
        self.bytes_received
            .fetch_add(read as u64, Ordering::Relaxed);
        Ok(buf)
    }

    /// Remove a stream's halves from the table for the duration of an I/O
    /// call, so the synchronous lock is never held across an `.await`.
    fn take_stream(&self, stream: StreamId) -> StreamHalves {
        self.streams
            .lock()
            .remove(&stream)
            .expect("ensure_stream was called first")
    }

    async fn ensure_stream(&self, stream: StreamId) -> Result<(), TransportError> {
        if self.streams.lock().contains_key(&stream) {
            return Ok(());
        }
        let (send, recv) = self.inner.open_bi().await.map_err(|e| {
            self.mark_failed();
            TransportError::StreamError {
                reason: e.to_string(),
            }
        })?;
        self.streams.lock().insert(stream, StreamHalves { send, recv });
        Ok(())
    }

    pub fn close(&self) {
        self.inner.close(0u32.into(), b"closed");
        self.mark_failed();
    }
}
