//! Transaction ordering policies applied ahead of execution.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use shared_types::entities::Transaction;

/// How a batch is reordered before dispatch to account-conflict resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderingPolicy {
    /// Identity; the batch is left as received.
    None,
    /// Stable order, with already-dropped (null) entries removed.
    FairOrdering,
    /// Uniform random permutation of the whole batch.
    Shuffled,
    /// Routed privately; ordered the same as `FairOrdering` here, the
    /// routing difference being external to this crate.
    Private,
}

/// Apply `policy` to `batch`, consuming it.
pub fn apply(policy: OrderingPolicy, batch: Vec<Transaction>) -> Vec<Transaction> {
    match policy {
        OrderingPolicy::None => batch,
        OrderingPolicy::FairOrdering | OrderingPolicy::Private => {
            batch.into_iter().filter(|tx| !tx.signatures.is_empty()).collect()
        }
        OrderingPolicy::Shuffled => {
            let mut batch = batch;
            batch.shuffle(&mut rand::thread_rng());
            batch
        }
    }
}
