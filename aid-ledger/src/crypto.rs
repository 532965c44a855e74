//! Cryptographic operations for the ledger
//!
//! This module provides:
//! - SHA-256 digests rendered as lowercase hex
//! - Ed25519 key pairs for attesting entry hashes
//! - Signature verification against a published public key

use crate::{Error, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest
pub const HASH_HEX_LEN: usize = 64;

/// Ed25519 key pair for signing entry hashes
#[derive(Debug)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self::from_seed(&rand::random::<[u8; 32]>())
    }

    /// Create from seed (32 bytes) - deterministic generation
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Create from a hex-encoded 32-byte seed
    pub fn from_seed_hex(seed_hex: &str) -> Result<Self> {
        let bytes = hex::decode(seed_hex.trim())
            .map_err(|e| Error::Config(format!("Invalid signing seed: {}", e)))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::Config("Signing seed must be 32 bytes".to_string()))?;
        Ok(Self::from_seed(&seed))
    }

    /// Get public key bytes
    pub fn public_key(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Public key as hex, for publishing alongside the ledger
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }

    /// Sign an entry hash, returning the hex signature
    pub fn sign_hash(&self, hash_hex: &str) -> String {
        let signature = self.signing_key.sign(hash_hex.as_bytes());
        hex::encode(signature.to_bytes())
    }
}

/// Verify a hex signature over an entry hash
pub fn verify_hash_signature(hash_hex: &str, signature_hex: &str, public_key: &[u8; 32]) -> bool {
    let Ok(bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(bytes) = <[u8; 64]>::try_from(bytes.as_slice()) else {
        return false;
    };
    let signature = Signature::from_bytes(&bytes);

    let verifying_key = match VerifyingKey::from_bytes(public_key) {
        Ok(key) => key,
        Err(_) => return false,
    };

    verifying_key.verify(hash_hex.as_bytes(), &signature).is_ok()
}

/// Hash arbitrary bytes using SHA-256, hex encoded
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
