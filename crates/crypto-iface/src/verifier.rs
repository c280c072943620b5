//! # Signature Verification Boundary
//!
//! The trait the banking stage's ingress pipeline calls against, so it can
//! be tested with a stub verifier without pulling in `ed25519-dalek`.

use crate::{CryptoError, Ed25519PublicKey, Ed25519Signature};

/// Verifies a message/signature/public-key triple.
pub trait SignatureVerifier: Send + Sync {
    /// Returns `Ok(())` if `signature` is a valid Ed25519 signature over
    /// `message` by `public_key`.
    fn verify(
        &self,
        message: &[u8],
        signature: &Ed25519Signature,
        public_key: &Ed25519PublicKey,
    ) -> Result<(), CryptoError>;
}

/// The production verifier: delegates to [`Ed25519PublicKey::verify`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(
        &self,
        message: &[u8],
        signature: &Ed25519Signature,
        public_key: &Ed25519PublicKey,
    ) -> Result<(), CryptoError> {
        public_key.verify(message, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Ed25519KeyPair;

    #[test]
    fn verifies_a_valid_signature() {
        let keypair = Ed25519KeyPair::generate();
        let message = b"transaction payload";
        let signature = keypair.sign(message);

        let verifier = Ed25519Verifier;
        assert!(verifier
            .verify(message, &signature, &keypair.public_key())
            .is_ok());
    }

    #[test]
    fn rejects_a_tampered_message() {
        let keypair = Ed25519KeyPair::generate();
        let signature = keypair.sign(b"original");

        let verifier = Ed25519Verifier;
        assert!(verifier
            .verify(b"tampered", &signature, &keypair.public_key())
            .is_err());
    }
}
