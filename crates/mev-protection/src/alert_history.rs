//! Bounded MEV alert history.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::detection::{AlertType, Detection};

/// Maximum number of alerts retained; oldest-first eviction past this.
pub const MAX_ALERTS: usize = 1000;

/// A recorded MEV alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MevAlert {
    pub alert_type_label: String,
    pub confidence: f64,
    pub transaction_hashes: Vec<String>,
}

impl From<&Detection> for MevAlert {
    fn from(d: &Detection) -> Self {
        Self {
            alert_type_label: d.alert_type.to_string(),
            confidence: d.confidence,
            transaction_hashes: d.transaction_hashes.iter().map(hex_hash).collect(),
        }
    }
}

fn hex_hash(sig: &[u8; 64]) -> String {
    sig.iter().map(|b| format!("{b:02x}")).collect()
}

/// Bounded, insertion-ordered alert log.
pub struct AlertHistory {
    alerts: Mutex<Vec<MevAlert>>,
}

impl AlertHistory {
    pub fn new() -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
        }
    }

    pub fn push_many(&self, detections: &[Detection]) {
        let mut alerts = self.alerts.lock();
        alerts.extend(detections.iter().map(MevAlert::from));
        if alerts.len() > MAX_ALERTS {
            let overflow = alerts.len() - MAX_ALERTS;
            alerts.drain(0..overflow);
        }
    }

    pub fn push_detection(&self, detection: &Detection) {
        let mut alerts = self.alerts.lock();
        alerts.push(MevAlert::from(detection));
        if alerts.len() > MAX_ALERTS {
            let overflow = alerts.len() - MAX_ALERTS;
            alerts.drain(0..overflow);
        }
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The last `min(n, len)` alerts, oldest-to-newest.
    pub fn recent(&self, n: usize) -> Vec<MevAlert> {
        let alerts = self.alerts.lock();
        let start = alerts.len().saturating_sub(n);
        alerts[start..].to_vec()
    }
}

impl Default for AlertHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(confidence: f64) -> Detection {
        Detection {
            alert_type: AlertType::Sandwich,
            confidence,
            transaction_hashes: vec![[1; 64]],
        }
    }

    #[test]
    fn recent_returns_last_n_in_order() {
        let history = AlertHistory::new();
        for i in 0..5 {
            history.push_detection(&detection(i as f64 / 10.0));
        }
        let recent = history.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].confidence, 0.4);
    }

    #[test]
    fn history_evicts_oldest_past_cap() {
        let history = AlertHistory::new();
        for _ in 0..(MAX_ALERTS + 10) {
            history.push_detection(&detection(0.8));
        }
        assert_eq!(history.len(), MAX_ALERTS);
    }

    #[test]
    fn recent_caps_at_available_length() {
        let history = AlertHistory::new();
        history.push_detection(&detection(0.9));
        assert_eq!(history.recent(10).len(), 1);
    }
}
