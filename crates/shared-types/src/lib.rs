//! # Shared Types
//!
//! Core wire and domain types shared across the validator's subsystem crates.
//!
//! - [`entities`] — transaction and identity types used by the banking
//!   stage, the BPF runtime, and cluster membership alike.
//! - [`wire`] — the binary cluster frame format and its JSON payload bodies
//!   (handshake, ping, block announcement) that cross the QUIC transport.
//! - [`rate_limiter`] — a token-bucket limiter reused by the QUIC transport's
//!   handshake throttling and the banking stage's ingress gate.

pub mod entities;
pub mod errors;
pub mod rate_limiter;
pub mod wire;

pub use entities::{NodeId, PublicKey, Signature, Transaction};
pub use errors::WireError;
pub use rate_limiter::RateLimiter;
pub use wire::{ClusterFrame, ClusterMessageType, VotePayload};
