//! Final pipeline stage: applies each transaction's outcome atomically and
//! notifies the rest of the validator.
//!
//! Committing is kept free of any async runtime dependency so this stage can
//! run on a plain `std::thread`. Callers that want commits to reach the
//! shared event bus supply an [`EventSink`] adapter that bridges into it.

use shared_bus::ValidatorEvent;

use crate::execution::ExecutedTransaction;

/// Sink for events this stage raises. Implementations may forward to the
/// shared event bus, a metrics recorder, or nothing at all (tests).
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ValidatorEvent);
}

/// An `EventSink` that drops every event; used where no bus is wired up.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: ValidatorEvent) {}
}

/// Callback invoked with every batch this stage commits, so the ledger (or
/// a test harness) can persist the result.
pub trait BlockNotifier: Send + Sync {
    fn notify(&self, committed: &[ExecutedTransaction]);
}

impl<F: Fn(&[ExecutedTransaction]) + Send + Sync> BlockNotifier for F {
    fn notify(&self, committed: &[ExecutedTransaction]) {
        self(committed)
    }
}

fn hex_hash(tx: &shared_types::entities::Transaction) -> String {
    tx.signatures
        .first()
        .map(|sig| sig.iter().map(|b| format!("{b:02x}")).collect())
        .unwrap_or_default()
}

/// Commit every executed transaction: emit a per-transaction event, collect
/// the successes, fire the block notifier over the whole batch, then emit
/// the batch-level summary.
///
/// Faulted transactions are excluded from the committed set; their staged
/// mutations never reach the ledger.
pub fn commit(
    executed: Vec<ExecutedTransaction>,
    sink: &dyn EventSink,
    notifier: &dyn BlockNotifier,
) -> usize {
    use bpf_runtime::TransactionOutcome;

    let mut committed = Vec::with_capacity(executed.len());
    let mut total_compute_units = 0u64;

    for tx in executed {
        match &tx.outcome {
            TransactionOutcome::Success {
                compute_units_consumed,
            } => {
                sink.emit(ValidatorEvent::TransactionCommitted {
                    hash: hex_hash(&tx.transaction),
                    compute_units: *compute_units_consumed,
                });
                total_compute_units += compute_units_consumed;
                committed.push(tx);
            }
            TransactionOutcome::Faulted { fault, .. } => {
                sink.emit(ValidatorEvent::TransactionFaulted {
                    hash: hex_hash(&tx.transaction),
                    reason: fault.to_string(),
                });
            }
        }
    }

    let committed_count = committed.len();
    notifier.notify(&committed);

    sink.emit(ValidatorEvent::BatchCommitted {
        batch_size: committed_count,
        compute_units: total_compute_units,
    });

    committed_count
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpf_runtime::{BpfFault, TransactionOutcome};
    use parking_lot::Mutex;
    use shared_types::entities::Transaction;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<ValidatorEvent>>,
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: ValidatorEvent) {
            self.events.lock().push(event);
        }
    }

    fn tx(sig: u8) -> Transaction {
        Transaction::new(vec![[sig; 64]], vec![])
    }

    #[test]
    fn commits_successful_transactions_and_notifies() {
        let executed = vec![
            ExecutedTransaction {
                transaction: tx(1),
                outcome: TransactionOutcome::Success {
                    compute_units_consumed: 10,
                },
            },
            ExecutedTransaction {
                transaction: tx(2),
                outcome: TransactionOutcome::Faulted {
                    fault: BpfFault::StackUnderflow,
                    compute_units_consumed: 0,
                },
            },
        ];

        let sink = RecordingSink::default();
        let notified = AtomicUsize::new(0);
        let notifier = |committed: &[ExecutedTransaction]| {
            notified.store(committed.len(), Ordering::SeqCst);
        };

        let count = commit(executed, &sink, &notifier);

        assert_eq!(count, 1);
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        let events = sink.events.lock();
        assert!(events
            .iter()
            .any(|e| matches!(e, ValidatorEvent::TransactionCommitted { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, ValidatorEvent::TransactionFaulted { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, ValidatorEvent::BatchCommitted { batch_size: 1, .. })));
    }

    #[test]
    fn null_sink_drops_everything() {
        let sink = NullSink;
        sink.emit(ValidatorEvent::BatchCommitted {
            batch_size: 0,
            compute_units: 0,
        });
    }
}
