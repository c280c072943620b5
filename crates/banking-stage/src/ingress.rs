//! First pipeline stage: rejects malformed transactions and drops
//! duplicates of an already-ingested signature.

use std::collections::{HashSet, VecDeque};

use parking_lot::Mutex;
use shared_types::entities::{Signature, Transaction};

use crate::errors::RejectReason;

const DEFAULT_DEDUP_CAPACITY: usize = 100_000;

/// FIFO-bounded set of first-signatures seen so far, for duplicate
/// rejection. Oldest entries are evicted once `capacity` is exceeded.
pub struct DedupCache {
    capacity: usize,
    seen: Mutex<Inner>,
}

struct Inner {
    set: HashSet<Signature>,
    order: VecDeque<Signature>,
}

impl DedupCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: Mutex::new(Inner {
                set: HashSet::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Returns `true` if `sig` was already seen; otherwise records it.
    pub fn check_and_insert(&self, sig: Signature) -> bool {
        let mut inner = self.seen.lock();
        if inner.set.contains(&sig) {
            return true;
        }
        if inner.order.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.set.remove(&oldest);
            }
        }
        inner.set.insert(sig);
        inner.order.push_back(sig);
        false
    }

    pub fn len(&self) -> usize {
        self.seen.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_CAPACITY)
    }
}

/// Validate a single transaction for ingress: must carry at least one
/// signature, and must not duplicate one already seen by `dedup`.
pub fn admit(tx: &Transaction, dedup: &DedupCache) -> Result<(), RejectReason> {
    let Some(sig) = tx.hash() else {
        return Err(RejectReason::Malformed);
    };
    if dedup.check_and_insert(sig) {
        return Err(RejectReason::Duplicate);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(sig: u8) -> Transaction {
        Transaction::new(vec![[sig; 64]], vec![])
    }

    #[test]
    fn rejects_a_transaction_with_no_signatures() {
        let dedup = DedupCache::default();
        let tx = Transaction::new(vec![], vec![]);
        assert_eq!(admit(&tx, &dedup), Err(RejectReason::Malformed));
    }

    #[test]
    fn admits_a_fresh_transaction() {
        let dedup = DedupCache::default();
        assert!(admit(&tx(1), &dedup).is_ok());
    }

    #[test]
    fn rejects_a_duplicate_signature() {
        let dedup = DedupCache::default();
        assert!(admit(&tx(1), &dedup).is_ok());
        assert_eq!(admit(&tx(1), &dedup), Err(RejectReason::Duplicate));
    }

    #[test]
    fn evicts_oldest_entry_once_capacity_is_exceeded() {
        let dedup = DedupCache::new(2);
        assert!(admit(&tx(1), &dedup).is_ok());
        assert!(admit(&tx(2), &dedup).is_ok());
        assert!(admit(&tx(3), &dedup).is_ok());
        // tx(1) was evicted, so it can be re-admitted.
        assert!(admit(&tx(1), &dedup).is_ok());
    }
}
