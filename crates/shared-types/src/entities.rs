//! # Core Domain Entities
//!
//! The small set of types that cross subsystem boundaries: the transaction
//! shape the core treats as opaque, and the identity types used by cluster
//! membership and the QUIC transport.

use serde::{Deserialize, Serialize};

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// A node's string identifier as it appears on the wire, e.g. `"node_1a2b...".`
pub type NodeId = String;

/// A transaction as the core sees it: a list of signatures plus an opaque
/// message body.
///
/// The core never parses `message` — it only reads `message.len()` for the
/// MEV similarity heuristic (§4.6) and treats `signatures[0]` as the
/// transaction's identifying hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Signatures attached to this transaction. Must be non-empty for the
    /// transaction to have a hash.
    pub signatures: Vec<Signature>,
    /// Opaque, serialized message body.
    pub message: Vec<u8>,
}

impl Transaction {
    /// Builds a transaction from its wire parts.
    pub fn new(signatures: Vec<Signature>, message: Vec<u8>) -> Self {
        Self { signatures, message }
    }

    /// The transaction's identifying hash: its first signature.
    ///
    /// Returns `None` for a malformed transaction with no signatures —
    /// callers treat that as an ingress-rejection case (§4.7 stage 1).
    pub fn hash(&self) -> Option<Signature> {
        self.signatures.first().copied()
    }

    /// Length of the opaque message body, used by the MEV similarity
    /// heuristic (§4.6).
    pub fn message_len(&self) -> usize {
        self.message.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_first_signature() {
        let sig0 = [0xAAu8; 64];
        let sig1 = [0xBBu8; 64];
        let tx = Transaction::new(vec![sig0, sig1], vec![1, 2, 3]);
        assert_eq!(tx.hash(), Some(sig0));
        assert_eq!(tx.message_len(), 3);
    }

    #[test]
    fn hash_none_without_signatures() {
        let tx = Transaction::new(vec![], vec![]);
        assert_eq!(tx.hash(), None);
    }
}
