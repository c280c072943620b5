//! Point-in-time transport statistics, computed on demand rather than
//! maintained continuously.

use std::time::Duration;

use crate::connection::Connection;

/// A snapshot of transport-wide counters and gauges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportStats {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub active_sessions: usize,
    pub active_streams: usize,
    pub average_rtt: Duration,
    pub uptime: Duration,
}

impl TransportStats {
    /// Aggregates a snapshot across a set of live connections. `session_count`
    /// is passed separately since the server tracks sessions, not raw
    /// connections, and the client has no notion of sessions at all.
    pub fn aggregate<'a>(connections: impl Iterator<Item = &'a Connection>, session_count: usize) -> Self {
        let mut bytes_sent = 0u64;
        let mut bytes_received = 0u64;
        let mut active_streams = 0usize;
        let mut rtt_total = Duration::ZERO;
        let mut longest_uptime = Duration::ZERO;
        let mut count = 0usize;

        for conn in connections {
            bytes_sent += conn.bytes_sent();
            bytes_received += conn.bytes_received();
            active_streams += conn.active_streams();
            rtt_total += conn.rtt();
            longest_uptime = longest_uptime.max(conn.uptime());
            count += 1;
        }

        let average_rtt = if count > 0 {
            rtt_total / count as u32
        } else {
            Duration::ZERO
        };

        Self {
            bytes_sent,
            bytes_received,
            active_sessions: session_count,
            active_streams,
            average_rtt,
            uptime: longest_uptime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregating_zero_connections_yields_a_zeroed_snapshot() {
        let stats = TransportStats::aggregate(std::iter::empty(), 0);
        assert_eq!(stats.bytes_sent, 0);
        assert_eq!(stats.active_sessions, 0);
        assert_eq!(stats.average_rtt, Duration::ZERO);
    }
}
