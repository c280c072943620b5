//! Dispatches each transaction in a conflict group to the BPF runtime,
//! serially within the group, with disjoint groups running in parallel on
//! the work-stealing pool.

use bpf_runtime::{opcode, BpfFault, BpfRuntime, TransactionOutcome};
use rayon::prelude::*;
use shared_types::entities::Transaction;

use crate::conflict::ConflictGroup;
use crate::errors::RejectReason;

/// Result of executing a single transaction.
pub struct ExecutedTransaction {
    pub transaction: Transaction,
    pub outcome: TransactionOutcome,
}

/// Execute every group, serially within a group, in parallel across groups.
pub fn execute_groups(groups: Vec<ConflictGroup>, compute_budget: u64) -> Vec<ExecutedTransaction> {
    groups
        .into_par_iter()
        .flat_map(|group| {
            group
                .transactions
                .into_iter()
                .map(|tx| execute_one(tx, compute_budget))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// A toy execution model: each byte of the opaque message costs one
/// `ALU_ADD`, with a single `LOAD`/`STORE` pair bracketing it. Enough to
/// exercise the compute-metering and fault paths without a real program
/// loader, which is out of scope for this crate.
fn execute_one(tx: Transaction, compute_budget: u64) -> ExecutedTransaction {
    let mut runtime = BpfRuntime::new(compute_budget);
    let message_len = tx.message.len();

    let outcome = runtime.execute(|rt| {
        rt.charge(opcode::LOAD)?;
        for _ in 0..message_len {
            rt.charge(opcode::ALU_ADD)?;
        }
        rt.charge(opcode::STORE)?;
        Ok::<(), BpfFault>(())
    });

    ExecutedTransaction {
        transaction: tx,
        outcome,
    }
}

/// Translate a fault into the reject reason the commit stage reports.
pub fn reject_reason_for_fault(fault: BpfFault) -> RejectReason {
    RejectReason::ExecutionFault(fault.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpf_runtime::TransactionOutcome;

    fn tx(sig: u8, message_len: usize) -> Transaction {
        Transaction::new(vec![[sig; 64]], vec![0u8; message_len])
    }

    #[test]
    fn executes_a_transaction_within_budget() {
        let groups = vec![crate::conflict::group(vec![tx(1, 10)])]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        let results = execute_groups(groups, 10_000);
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].outcome, TransactionOutcome::Success { .. }));
    }

    #[test]
    fn faults_when_message_exceeds_compute_budget() {
        let groups = crate::conflict::group(vec![tx(1, 1000)]);
        let results = execute_groups(groups, 5);
        assert!(matches!(
            results[0].outcome,
            TransactionOutcome::Faulted { .. }
        ));
    }
}
