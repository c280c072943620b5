//! Fault types surfaced by the sandboxed runtime.

use thiserror::Error;

/// A fault raised while validating or executing a transaction against the
/// sandbox. Faults abort the current transaction; they are never fatal to
/// the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BpfFault {
    /// Access outside any mapped region, or with insufficient permissions.
    #[error("memory access fault at {addr:#x}, len {len}")]
    MemoryAccess { addr: u64, len: u64 },

    /// Compute-unit budget exhausted mid-instruction.
    #[error("compute budget exhausted: needed {needed}, had {available}")]
    ComputeExhausted { needed: u64, available: u64 },

    /// Call stack pushed past its configured maximum depth.
    #[error("call stack overflow at depth {depth}")]
    StackOverflow { depth: usize },

    /// Return attempted on an empty call stack.
    #[error("call stack underflow")]
    StackUnderflow,

    /// Opcode outside the cost table's populated range.
    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),

    /// Memory-region table is full (`add_region` at capacity).
    #[error("memory region table is full")]
    RegionTableFull,

    /// Region parameters overflow or are otherwise invalid.
    #[error("invalid region: start {start:#x}, size {size}")]
    InvalidRegion { start: u64, size: u64 },
}
