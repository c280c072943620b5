//! Per-address handshake rate limiting: rejects a new handshake from an
//! address that completed one within the configured spacing.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;

pub struct HandshakeRateLimiter {
    min_spacing: Duration,
    last_seen: DashMap<IpAddr, Instant>,
}

impl HandshakeRateLimiter {
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last_seen: DashMap::new(),
        }
    }

    /// Returns `true` if a handshake from `addr` is allowed right now, and
    /// records the attempt either way so the next check sees it.
    pub fn allow(&self, addr: IpAddr) -> bool {
        let now = Instant::now();
        match self.last_seen.get(&addr) {
            Some(last) if now.duration_since(*last) < self.min_spacing => false,
            _ => {
                self.last_seen.insert(addr, now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::thread;

    fn addr() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
    }

    #[test]
    fn first_handshake_from_an_address_is_allowed() {
        let limiter = HandshakeRateLimiter::new(Duration::from_millis(100));
        assert!(limiter.allow(addr()));
    }

    #[test]
    fn a_second_handshake_within_the_window_is_rejected() {
        let limiter = HandshakeRateLimiter::new(Duration::from_millis(100));
        assert!(limiter.allow(addr()));
        assert!(!limiter.allow(addr()));
    }

    #[test]
    fn a_handshake_after_the_window_is_allowed() {
        let limiter = HandshakeRateLimiter::new(Duration::from_millis(20));
        assert!(limiter.allow(addr()));
        thread::sleep(Duration::from_millis(30));
        assert!(limiter.allow(addr()));
    }
}
