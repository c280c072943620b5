//! Node identity: an Ed25519 keypair loaded from (or generated into) a flat
//! 64-byte file, public key followed by private seed.

use std::fs;
use std::path::Path;

use crypto_iface::Ed25519KeyPair;
use tracing::{info, warn};

const KEYPAIR_FILE_LEN: usize = 64;

pub struct Identity {
    pub keypair: Ed25519KeyPair,
    pub node_id: String,
}

impl Identity {
    /// Loads the keypair at `path`. A missing file, or one that isn't
    /// exactly 64 bytes, triggers generation of a fresh keypair which is
    /// then written back to `path`.
    pub fn load_or_generate(path: &Path) -> anyhow::Result<Self> {
        let keypair = match fs::read(path) {
            Ok(bytes) if bytes.len() == KEYPAIR_FILE_LEN => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&bytes[32..64]);
                info!(path = %path.display(), "loaded identity keypair");
                Ed25519KeyPair::from_seed(seed)
            }
            Ok(bytes) => {
                warn!(
                    path = %path.display(),
                    len = bytes.len(),
                    "identity keypair file has the wrong size, regenerating"
                );
                Self::generate_and_save(path)?
            }
            Err(_) => {
                info!(path = %path.display(), "no identity keypair found, generating one");
                Self::generate_and_save(path)?
            }
        };

        let node_id = format!("node_{}", hex::encode(keypair.public_key().as_bytes()));
        Ok(Self { keypair, node_id })
    }

    fn generate_and_save(path: &Path) -> anyhow::Result<Ed25519KeyPair> {
        let keypair = Ed25519KeyPair::generate();
        let mut bytes = Vec::with_capacity(KEYPAIR_FILE_LEN);
        bytes.extend_from_slice(keypair.public_key().as_bytes());
        bytes.extend_from_slice(&keypair.to_seed());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &bytes)?;
        Ok(keypair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generating_into_a_fresh_path_produces_a_64_byte_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.key");
        let identity = Identity::load_or_generate(&path).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), KEYPAIR_FILE_LEN);
        assert_eq!(&bytes[..32], identity.keypair.public_key().as_bytes());
    }

    #[test]
    fn loading_twice_returns_the_same_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.key");
        let first = Identity::load_or_generate(&path).unwrap();
        let second = Identity::load_or_generate(&path).unwrap();
        assert_eq!(first.node_id, second.node_id);
    }

    #[test]
    fn a_truncated_file_is_regenerated_rather_than_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.key");
        fs::write(&path, vec![0u8; 10]).unwrap();
        let identity = Identity::load_or_generate(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap().len(), KEYPAIR_FILE_LEN);
        assert!(identity.node_id.starts_with("node_"));
    }
}
