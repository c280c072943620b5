//! BPF runtime (C4): composes the memory-region table, call-stack manager
//! and instruction-cost table behind a single compute-metered surface.
//!
//! A fault aborts the in-flight transaction and rolls back every account
//! mutation it staged; no partial state escapes. Callers drive that rollback
//! by discarding the `TransactionOutcome::Faulted` result's accumulated
//! mutations rather than committing them.

use crate::call_stack::{CallStack, Frame};
use crate::cost_table::{opcode, InstructionCostTable};
use crate::errors::BpfFault;
use crate::memory_region::{AddRegionResult, MemoryRegionTable, Permissions};

/// Per-transaction execution budget and sandbox state.
pub struct BpfRuntime {
    regions: MemoryRegionTable,
    call_stack: CallStack,
    costs: InstructionCostTable,
    remaining_budget: u64,
    consumed: u64,
}

/// Outcome of a completed (possibly faulted) transaction execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    Success { compute_units_consumed: u64 },
    Faulted {
        fault: BpfFault,
        compute_units_consumed: u64,
    },
}

impl BpfRuntime {
    pub fn new(compute_budget: u64) -> Self {
        Self {
            regions: MemoryRegionTable::new(),
            call_stack: CallStack::default(),
            costs: InstructionCostTable::new(),
            remaining_budget: compute_budget,
            consumed: 0,
        }
    }

    pub fn with_max_call_depth(compute_budget: u64, max_call_depth: usize) -> Self {
        Self {
            regions: MemoryRegionTable::new(),
            call_stack: CallStack::new(max_call_depth),
            costs: InstructionCostTable::new(),
            remaining_budget: compute_budget,
            consumed: 0,
        }
    }

    pub fn regions(&self) -> &MemoryRegionTable {
        &self.regions
    }

    pub fn map_region(&self, start: u64, size: u64, perms: Permissions, label: &'static str) -> Result<(), BpfFault> {
        match self.regions.add_region(start, size, perms, label) {
            AddRegionResult::Ok => Ok(()),
            AddRegionResult::Full => Err(BpfFault::RegionTableFull),
            AddRegionResult::Invalid => Err(BpfFault::InvalidRegion { start, size }),
        }
    }

    pub fn remaining_budget(&self) -> u64 {
        self.remaining_budget
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn call_depth(&self) -> usize {
        self.call_stack.depth()
    }

    /// Validate a memory access against C1.
    pub fn validate_access(&self, addr: u64, len: u64, perms: Permissions) -> Result<(), BpfFault> {
        if self.regions.validate(addr, len, perms) {
            Ok(())
        } else {
            Err(BpfFault::MemoryAccess { addr, len })
        }
    }

    /// Charge the compute-unit cost of an opcode against the remaining
    /// budget. Faults (without partial deduction) on underflow.
    pub fn charge(&mut self, opcode: u8) -> Result<(), BpfFault> {
        let cost = self.costs.get_cost(opcode);
        if cost > self.remaining_budget {
            return Err(BpfFault::ComputeExhausted {
                needed: cost,
                available: self.remaining_budget,
            });
        }
        self.remaining_budget -= cost;
        self.consumed += cost;
        Ok(())
    }

    /// Charge `CALL` and push a new stack frame.
    pub fn enter_call(&mut self, target_addr: u64, frame_ptr: u64) -> Result<(), BpfFault> {
        self.charge(opcode::CALL)?;
        self.call_stack
            .push(target_addr, frame_ptr, self.consumed)
            .map_err(|_| BpfFault::StackOverflow {
                depth: self.call_stack.depth(),
            })
    }

    /// Pop the current call frame.
    pub fn exit_call(&mut self) -> Result<Frame, BpfFault> {
        self.call_stack.pop().ok_or(BpfFault::StackUnderflow)
    }

    /// Run a single fault-checked step and fold it into a transaction
    /// outcome, for callers that want the whole execution wrapped rather
    /// than handling faults opcode-by-opcode.
    pub fn execute<F>(&mut self, step: F) -> TransactionOutcome
    where
        F: FnOnce(&mut BpfRuntime) -> Result<(), BpfFault>,
    {
        match step(self) {
            Ok(()) => TransactionOutcome::Success {
                compute_units_consumed: self.consumed,
            },
            Err(fault) => TransactionOutcome::Faulted {
                fault,
                compute_units_consumed: self.consumed,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost_table::opcode;

    #[test]
    fn charges_compute_units_for_opcodes() {
        let mut rt = BpfRuntime::new(10);
        rt.charge(opcode::ALU_ADD).unwrap();
        assert_eq!(rt.consumed(), 1);
        assert_eq!(rt.remaining_budget(), 9);
    }

    #[test]
    fn charge_faults_on_budget_exhaustion() {
        let mut rt = BpfRuntime::new(2);
        let err = rt.charge(opcode::CALL).unwrap_err();
        assert!(matches!(err, BpfFault::ComputeExhausted { .. }));
        assert_eq!(rt.consumed(), 0);
    }

    #[test]
    fn enter_and_exit_call_round_trip() {
        let mut rt = BpfRuntime::new(1000);
        rt.enter_call(0x4000, 0x8000).unwrap();
        assert_eq!(rt.call_depth(), 1);
        let frame = rt.exit_call().unwrap();
        assert_eq!(frame.return_addr, 0x4000);
        assert_eq!(rt.call_depth(), 0);
    }

    #[test]
    fn exit_call_underflows_with_no_frames() {
        let mut rt = BpfRuntime::new(1000);
        assert_eq!(rt.exit_call().unwrap_err(), BpfFault::StackUnderflow);
    }

    #[test]
    fn enter_call_overflows_past_max_depth() {
        let mut rt = BpfRuntime::with_max_call_depth(1_000_000, 1);
        rt.enter_call(1, 1).unwrap();
        let err = rt.enter_call(2, 2).unwrap_err();
        assert!(matches!(err, BpfFault::StackOverflow { depth: 1 }));
    }

    #[test]
    fn validate_access_rejects_unmapped_memory() {
        let rt = BpfRuntime::new(1000);
        let err = rt.validate_access(0x1000, 8, Permissions::READ).unwrap_err();
        assert!(matches!(err, BpfFault::MemoryAccess { .. }));
    }

    #[test]
    fn execute_wraps_a_faulting_step() {
        let mut rt = BpfRuntime::new(1);
        let outcome = rt.execute(|rt| rt.charge(opcode::CALL));
        match outcome {
            TransactionOutcome::Faulted {
                fault,
                compute_units_consumed,
            } => {
                assert!(matches!(fault, BpfFault::ComputeExhausted { .. }));
                assert_eq!(compute_units_consumed, 0);
            }
            _ => panic!("expected fault"),
        }
    }
}
