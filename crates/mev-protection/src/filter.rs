//! Suspicious-transaction filtering, consumed by the banking stage's MEV
//! pass when `detection_enabled` is set.

use shared_types::entities::Transaction;

use crate::detection::Detection;

/// Default confidence threshold above which an implicated transaction is
/// dropped.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Drop transactions implicated by any detection at or above
/// `confidence_threshold`, preserving the relative order of the rest.
pub fn filter_suspicious(
    transactions: Vec<Transaction>,
    detections: &[Detection],
    confidence_threshold: f64,
) -> Vec<Transaction> {
    let flagged: std::collections::HashSet<[u8; 64]> = detections
        .iter()
        .filter(|d| d.confidence >= confidence_threshold)
        .flat_map(|d| d.transaction_hashes.iter().copied())
        .collect();

    transactions
        .into_iter()
        .filter(|tx| !matches!(tx.hash(), Some(h) if flagged.contains(&h)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::AlertType;

    fn tx(sig: u8) -> Transaction {
        Transaction::new(vec![[sig; 64]], vec![])
    }

    #[test]
    fn drops_transactions_above_threshold() {
        let batch = vec![tx(1), tx(2), tx(3)];
        let detections = vec![Detection {
            alert_type: AlertType::Sandwich,
            confidence: 0.9,
            transaction_hashes: vec![[2; 64]],
        }];
        let filtered = filter_suspicious(batch, &detections, DEFAULT_CONFIDENCE_THRESHOLD);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|t| t.hash() != Some([2; 64])));
    }

    #[test]
    fn keeps_transactions_below_threshold() {
        let batch = vec![tx(1), tx(2)];
        let detections = vec![Detection {
            alert_type: AlertType::FrontRunning,
            confidence: 0.5,
            transaction_hashes: vec![[1; 64]],
        }];
        let filtered = filter_suspicious(batch, &detections, DEFAULT_CONFIDENCE_THRESHOLD);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn preserves_order_of_survivors() {
        let batch = vec![tx(1), tx(2), tx(3)];
        let detections = vec![];
        let filtered = filter_suspicious(batch, &detections, DEFAULT_CONFIDENCE_THRESHOLD);
        assert_eq!(filtered[0].hash(), Some([1; 64]));
        assert_eq!(filtered[2].hash(), Some([3; 64]));
    }
}
