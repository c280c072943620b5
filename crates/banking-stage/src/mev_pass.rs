//! Wires mev-protection's detection, ordering and filtering into a single
//! pipeline stage call.

use mev_protection::{
    filter_suspicious, scan_batch, AlertHistory, OrderingPolicy, DEFAULT_CONFIDENCE_THRESHOLD,
    DEFAULT_SANDWICH_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use shared_types::entities::Transaction;

/// Configuration for the MEV pass stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MevPassConfig {
    pub ordering_policy: OrderingPolicy,
    pub detection_enabled: bool,
    pub sandwich_threshold: f64,
    pub confidence_threshold: f64,
}

impl Default for MevPassConfig {
    fn default() -> Self {
        Self {
            ordering_policy: OrderingPolicy::FairOrdering,
            detection_enabled: true,
            sandwich_threshold: DEFAULT_SANDWICH_THRESHOLD,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Run detection (if enabled), filter suspicious transactions out, then
/// apply the configured ordering policy.
pub fn run(
    batch: Vec<Transaction>,
    config: &MevPassConfig,
    history: &AlertHistory,
) -> Vec<Transaction> {
    let batch = if config.detection_enabled {
        let detections = scan_batch(&batch, config.sandwich_threshold);
        history.push_many(&detections);
        filter_suspicious(batch, &detections, config.confidence_threshold)
    } else {
        batch
    };

    mev_protection::apply_ordering(config.ordering_policy, batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(sig: u8) -> Transaction {
        Transaction::new(vec![[sig; 64]], vec![])
    }

    #[test]
    fn passes_through_with_detection_disabled() {
        let config = MevPassConfig {
            detection_enabled: false,
            ordering_policy: OrderingPolicy::None,
            ..MevPassConfig::default()
        };
        let history = AlertHistory::new();
        let batch = vec![tx(1), tx(2)];
        let result = run(batch, &config, &history);
        assert_eq!(result.len(), 2);
        assert_eq!(history.len(), 0);
    }
}
