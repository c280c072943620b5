//! Banking stage error types.

use thiserror::Error;

/// Why a transaction was dropped during ingress or verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("malformed transaction: no signatures")]
    Malformed,
    #[error("duplicate of an already-ingested transaction")]
    Duplicate,
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("fee below the deferral threshold")]
    FeeTooLow,
    #[error("flagged by MEV protection: {0}")]
    MevSuspicious(String),
    #[error("execution fault: {0}")]
    ExecutionFault(String),
}

/// Errors surfaced by the pipeline itself, distinct from per-transaction
/// rejections.
#[derive(Debug, Error)]
pub enum BankingStageError {
    #[error("stage channel disconnected")]
    ChannelClosed,
    #[error("configuration error: {0}")]
    Config(String),
}
