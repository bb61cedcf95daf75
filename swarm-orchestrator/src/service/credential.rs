//! Result credentials
//!
//! One-time secrets handed to a client with its run. Only the SHA-256 hex
//! digest is persisted.

use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

const CREDENTIAL_BYTES: usize = 32;

/// A freshly generated credential and the digest to persist
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub plaintext: String,
    pub hash: String,
}

pub fn generate_credential() -> IssuedCredential {
    let mut bytes = [0u8; CREDENTIAL_BYTES];
    OsRng.fill_bytes(&mut bytes);

    let plaintext = hex::encode(bytes);
    let hash = hash_credential(&plaintext);

    IssuedCredential { plaintext, hash }
}

pub fn hash_credential(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}

/// Compare a presented secret against a stored digest
pub fn verify_credential(plaintext: &str, stored_hash: &str) -> bool {
    let computed = hash_credential(plaintext);
    let stored = stored_hash.trim().to_ascii_lowercase();

    computed.len() == stored.len()
        && computed
            .bytes()
            .zip(stored.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
