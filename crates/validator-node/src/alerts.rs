//! Fatal-error alerting: fans a critical event out to every registered
//! channel, rate-limited to one notification per channel per (module, code)
//! pair every 60 seconds.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{error, warn};

const ALERT_WINDOW: Duration = Duration::from_secs(60);

/// A single log entry handed to every registered alert channel.
#[derive(Debug, Clone)]
pub struct AlertEntry {
    pub component: String,
    pub code: String,
    pub message: String,
}

/// A destination for critical alerts. `validator-telemetry`'s structured
/// logger is always registered; operators add paging/notification channels
/// on top.
pub trait AlertChannel: Send + Sync {
    fn send(&self, entry: &AlertEntry);
    fn enabled(&self) -> bool {
        true
    }
    fn name(&self) -> &str;
}

/// Routes every critical alert through `validator-telemetry`'s tracing
/// instrumentation, always on.
pub struct LoggingAlertChannel;

impl AlertChannel for LoggingAlertChannel {
    fn send(&self, entry: &AlertEntry) {
        error!(
            component = %entry.component,
            code = %entry.code,
            "{}",
            entry.message
        );
    }

    fn name(&self) -> &str {
        "logging"
    }
}

/// Fans a fatal alert out to every enabled channel, suppressing repeats of
/// the same (component, code) pair within the alert window.
pub struct AlertDispatcher {
    channels: Vec<Box<dyn AlertChannel>>,
    last_sent: DashMap<(String, String), Instant>,
}

impl AlertDispatcher {
    pub fn new(channels: Vec<Box<dyn AlertChannel>>) -> Self {
        Self {
            channels,
            last_sent: DashMap::new(),
        }
    }

    pub fn with_logging() -> Self {
        Self::new(vec![Box::new(LoggingAlertChannel)])
    }

    /// Fires `entry` to every enabled channel, unless this (component, code)
    /// pair already fired within the last 60 seconds.
    pub fn fire(&self, entry: AlertEntry) {
        let key = (entry.component.clone(), entry.code.clone());
        let now = Instant::now();
        if let Some(last) = self.last_sent.get(&key) {
            if now.duration_since(*last) < ALERT_WINDOW {
                return;
            }
        }
        self.last_sent.insert(key, now);

        for channel in &self.channels {
            if channel.enabled() {
                channel.send(&entry);
            } else {
                warn!(channel = channel.name(), "alert channel disabled, skipping");
            }
        }
    }
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::with_logging()
    }
}

/// Convenience constructor for wiring an `AlertDispatcher` behind an `Arc`
/// shared between the orchestrator and its event-bus subscriber task.
pub fn shared_dispatcher(channels: Vec<Box<dyn AlertChannel>>) -> Arc<AlertDispatcher> {
    Arc::new(AlertDispatcher::new(channels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingChannel {
        count: Arc<AtomicUsize>,
    }

    impl AlertChannel for CountingChannel {
        fn send(&self, _entry: &AlertEntry) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
        fn name(&self) -> &str {
            "counting"
        }
    }

    fn entry() -> AlertEntry {
        AlertEntry {
            component: "banking-stage".into(),
            code: "resource_exhausted".into(),
            message: "critical memory pressure".into(),
        }
    }

    #[test]
    fn the_first_alert_for_a_pair_always_fires() {
        let count = Arc::new(AtomicUsize::new(0));
        let dispatcher = AlertDispatcher::new(vec![Box::new(CountingChannel { count: count.clone() })]);
        dispatcher.fire(entry());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn a_repeat_within_the_window_is_suppressed() {
        let count = Arc::new(AtomicUsize::new(0));
        let dispatcher = AlertDispatcher::new(vec![Box::new(CountingChannel { count: count.clone() })]);
        dispatcher.fire(entry());
        dispatcher.fire(entry());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn a_different_code_on_the_same_component_fires_independently() {
        let count = Arc::new(AtomicUsize::new(0));
        let dispatcher = AlertDispatcher::new(vec![Box::new(CountingChannel { count: count.clone() })]);
        dispatcher.fire(entry());
        let mut other = entry();
        other.code = "ledger_corruption".into();
        dispatcher.fire(other);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
