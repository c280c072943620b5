//! Adapts the `crypto-iface` signature-verification boundary to whole
//! transactions.
//!
//! [`shared_types::entities::Transaction`] treats its message body as
//! opaque; this crate's only assumption about its layout is that the first
//! 32 bytes carry the fee payer's Ed25519 public key, which `signatures[0]`
//! signs over the full message. That's the one place the banking stage
//! looks inside the message at all.

use std::sync::Arc;

use crypto_iface::{CryptoError, Ed25519PublicKey, Ed25519Signature, SignatureVerifier};
use shared_types::entities::Transaction;

use crate::errors::RejectReason;

/// Verifies whole transactions by extracting the fee payer's key from the
/// message header and delegating to a [`SignatureVerifier`].
pub struct TransactionVerifier {
    inner: Arc<dyn SignatureVerifier>,
}

impl TransactionVerifier {
    pub fn new(inner: Arc<dyn SignatureVerifier>) -> Self {
        Self { inner }
    }

    pub fn verify(&self, tx: &Transaction) -> Result<(), RejectReason> {
        let Some(sig_bytes) = tx.signatures.first() else {
            return Err(RejectReason::Malformed);
        };
        if tx.message.len() < 32 {
            return Err(RejectReason::Malformed);
        }
        let mut pubkey_bytes = [0u8; 32];
        pubkey_bytes.copy_from_slice(&tx.message[0..32]);

        let public_key = Ed25519PublicKey::from_bytes(pubkey_bytes)
            .map_err(|_: CryptoError| RejectReason::InvalidSignature)?;
        let signature = Ed25519Signature::from_bytes(*sig_bytes);

        self.inner
            .verify(&tx.message, &signature, &public_key)
            .map_err(|_| RejectReason::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_iface::Ed25519KeyPair;

    #[test]
    fn accepts_a_correctly_signed_transaction() {
        let keypair = Ed25519KeyPair::generate();
        let mut message = keypair.public_key().as_bytes().to_vec();
        message.extend_from_slice(b"transfer 10 lamports");
        let signature = keypair.sign(&message);

        let tx = Transaction::new(vec![*signature.as_bytes()], message);
        let verifier = TransactionVerifier::new(Arc::new(crypto_iface::Ed25519Verifier));
        assert!(verifier.verify(&tx).is_ok());
    }

    #[test]
    fn rejects_a_transaction_with_no_signatures() {
        let verifier = TransactionVerifier::new(Arc::new(crypto_iface::Ed25519Verifier));
        let tx = Transaction::new(vec![], vec![0u8; 40]);
        assert_eq!(verifier.verify(&tx), Err(RejectReason::Malformed));
    }

    #[test]
    fn rejects_a_tampered_message() {
        let keypair = Ed25519KeyPair::generate();
        let mut message = keypair.public_key().as_bytes().to_vec();
        message.extend_from_slice(b"transfer 10 lamports");
        let signature = keypair.sign(&message);
        let mut tampered = message.clone();
        tampered[32] ^= 0xFF;

        let tx = Transaction::new(vec![*signature.as_bytes()], tampered);
        let verifier = TransactionVerifier::new(Arc::new(crypto_iface::Ed25519Verifier));
        assert_eq!(verifier.verify(&tx), Err(RejectReason::InvalidSignature));
    }
}
