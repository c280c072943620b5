//! Server-side session tracking: one entry per `(client_addr, nonce)`, swept
//! once idle past `session_timeout`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::connection::Connection;

pub type SessionKey = (SocketAddr, u64);

pub struct Session {
    pub key: SessionKey,
    pub connection: Arc<Connection>,
    last_seen: parking_lot::Mutex<Instant>,
}

impl Session {
    pub fn new(key: SessionKey, connection: Arc<Connection>) -> Self {
        Self {
            key,
            connection,
            last_seen: parking_lot::Mutex::new(Instant::now()),
        }
    }

    pub fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }
}

/// The server's live session table, plus a background sweeper that evicts
/// entries idle past `session_timeout`.
pub struct SessionTable {
    sessions: DashMap<SessionKey, Arc<Session>>,
    max_sessions: usize,
    session_timeout: Duration,
}

impl SessionTable {
    pub fn new(max_sessions: usize, session_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions,
            session_timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.sessions.len() >= self.max_sessions
    }

    pub fn get(&self, key: &SessionKey) -> Option<Arc<Session>> {
        self.sessions.get(key).map(|e| e.clone())
    }

    pub fn insert(&self, session: Arc<Session>) {
        self.sessions.insert(session.key, session);
    }

    pub fn stats(&self) -> crate::stats::TransportStats {
        let connections: Vec<Arc<Connection>> =
            self.sessions.iter().map(|e| e.value().connection.clone()).collect();
        crate::stats::TransportStats::aggregate(
            connections.iter().map(|c| c.as_ref()),
            self.sessions.len(),
        )
    }

    pub fn remove(&self, key: &SessionKey) {
        self.sessions.remove(key);
    }

    /// Removes every session idle past `session_timeout`, returning how many
    /// were evicted.
    pub fn sweep(&self) -> usize {
        let stale: Vec<SessionKey> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().idle_for() > self.session_timeout)
            .map(|entry| *entry.key())
            .collect();
        for key in &stale {
            self.sessions.remove(key);
        }
        if !stale.is_empty() {
            debug!(count = stale.len(), "swept idle QUIC sessions");
        }
        stale.len()
    }

    /// Spawns a background task that sweeps the table on a fixed interval
    /// until `exit` resolves.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.sweep();
            }
        })
    }
}
