//! Sandwich and front-running detection with weighted confidence scoring.

use shared_types::entities::Transaction;

/// Kind of MEV pattern an alert reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertType {
    Sandwich,
    FrontRunning,
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertType::Sandwich => write!(f, "sandwich"),
            AlertType::FrontRunning => write!(f, "front_running"),
        }
    }
}

/// Default confidence threshold above which a sandwich is reported.
pub const DEFAULT_SANDWICH_THRESHOLD: f64 = 0.7;

/// Fixed confidence assigned to every detected front-run.
pub const FRONT_RUN_CONFIDENCE: f64 = 0.75;

/// A sender proxy: a transaction's first signature.
fn sender(tx: &Transaction) -> Option<[u8; 64]> {
    tx.signatures.first().copied()
}

/// Whether two transactions touch overlapping accounts, using their full
/// signature sets as the account proxy.
fn accounts_overlap(a: &Transaction, b: &Transaction) -> bool {
    a.signatures.iter().any(|sig| b.signatures.contains(sig))
}

/// Whether two transactions' opaque message bodies look like the same kind
/// of operation: their lengths differ by less than 20% of the larger.
fn operations_similar(a: &Transaction, b: &Transaction) -> bool {
    let (la, lb) = (a.message_len(), b.message_len());
    let larger = la.max(lb);
    if larger == 0 {
        return true;
    }
    let diff = la.abs_diff(lb);
    (diff as f64) < 0.20 * larger as f64
}

/// A detected pattern, indexed into the batch it was found in.
#[derive(Debug, Clone)]
pub struct Detection {
    pub alert_type: AlertType,
    pub confidence: f64,
    pub transaction_hashes: Vec<[u8; 64]>,
}

/// Scan a batch for sandwich and front-run patterns. `sandwich_threshold`
/// gates which sandwiches are reported; front-runs are always reported at
/// their fixed confidence.
pub fn scan_batch(batch: &[Transaction], sandwich_threshold: f64) -> Vec<Detection> {
    let mut detections = Vec::new();

    for window in batch.windows(3) {
        let (t0, t1, t2) = (&window[0], &window[1], &window[2]);
        let (Some(s0), Some(s1), Some(s2)) = (sender(t0), sender(t1), sender(t2)) else {
            continue;
        };
        if s0 != s2 || s0 == s1 {
            continue;
        }
        if !accounts_overlap(t0, t1) || !accounts_overlap(t1, t2) {
            continue;
        }

        let mut confidence = 0.4; // shared outer sender
        if accounts_overlap(t0, t2) {
            confidence += 0.3;
        }
        if operations_similar(t0, t1) && operations_similar(t1, t2) {
            confidence += 0.3;
        }

        if confidence >= sandwich_threshold {
            let hashes = [t0.hash(), t1.hash(), t2.hash()]
                .into_iter()
                .flatten()
                .collect();
            detections.push(Detection {
                alert_type: AlertType::Sandwich,
                confidence,
                transaction_hashes: hashes,
            });
        }
    }

    for pair in batch.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let (Some(sa), Some(sb)) = (sender(a), sender(b)) else {
            continue;
        };
        if sa == sb {
            continue;
        }
        if accounts_overlap(a, b) && operations_similar(a, b) {
            let hashes = [a.hash(), b.hash()].into_iter().flatten().collect();
            detections.push(Detection {
                alert_type: AlertType::FrontRunning,
                confidence: FRONT_RUN_CONFIDENCE,
                transaction_hashes: hashes,
            });
        }
    }

    detections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(sig: u8, msg_len: usize) -> Transaction {
        Transaction::new(vec![[sig; 64]], vec![0u8; msg_len])
    }

    fn tx_with_accounts(sigs: &[u8], msg_len: usize) -> Transaction {
        Transaction::new(sigs.iter().map(|&s| [s; 64]).collect(), vec![0u8; msg_len])
    }

    #[test]
    fn detects_a_sandwich_with_shared_outer_sender_and_overlap() {
        let attacker = tx_with_accounts(&[1, 9], 100);
        let victim = tx_with_accounts(&[2, 9], 105);
        let attacker_close = tx_with_accounts(&[1, 9], 100);
        let batch = vec![attacker, victim, attacker_close];

        let detections = scan_batch(&batch, DEFAULT_SANDWICH_THRESHOLD);
        let sandwiches: Vec<_> = detections
            .iter()
            .filter(|d| d.alert_type == AlertType::Sandwich)
            .collect();
        assert_eq!(sandwiches.len(), 1);
        assert!(sandwiches[0].confidence >= DEFAULT_SANDWICH_THRESHOLD);
    }

    #[test]
    fn no_sandwich_without_overlap() {
        let batch = vec![tx(1, 100), tx(2, 100), tx(1, 100)];
        let detections = scan_batch(&batch, DEFAULT_SANDWICH_THRESHOLD);
        assert!(detections.iter().all(|d| d.alert_type != AlertType::Sandwich));
    }

    #[test]
    fn detects_front_running_pair() {
        let a = tx_with_accounts(&[1, 9], 100);
        let b = tx_with_accounts(&[2, 9], 105);
        let batch = vec![a, b];
        let detections = scan_batch(&batch, DEFAULT_SANDWICH_THRESHOLD);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].alert_type, AlertType::FrontRunning);
        assert_eq!(detections[0].confidence, FRONT_RUN_CONFIDENCE);
    }

    #[test]
    fn operation_similarity_threshold() {
        let a = tx(1, 100);
        let b = tx(2, 119);
        assert!(operations_similar(&a, &b));
        let c = tx(3, 121);
        assert!(!operations_similar(&a, &c));
    }
}
