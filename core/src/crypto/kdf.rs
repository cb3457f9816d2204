// ## src/crypto/kdf.rs

//! crypto/kdf.rs
//! Key derivation: password → wrapping key, and key seed → document key.
//!
//! Design:
//! - PBKDF2-HMAC-SHA256 over a random 32-byte salt for password wrapping.
//! - SHA-256 over the reencryption plaintext for document keys. The seed is
//!   never used as an AES key directly.

use std::fmt;

use pbkdf2::pbkdf2_hmac;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::PBKDF2_SALT_LEN;
use crate::crypto::types::{DocumentKey, KEY_LEN_32};

/// Password-derived wrapping key together with the salt it was derived from.
///
/// Kept after an unwrap so the master key can be re-wrapped (e.g. after a
/// rotation) without asking for the password again.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PasswordDerivedKey {
    key: [u8; KEY_LEN_32],
    salt: [u8; PBKDF2_SALT_LEN],
}

impl PasswordDerivedKey {
    pub fn key(&self) -> &[u8; KEY_LEN_32] {
        &self.key
    }

    pub fn salt(&self) -> &[u8; PBKDF2_SALT_LEN] {
        &self.salt
    }
}

impl fmt::Debug for PasswordDerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordDerivedKey")
            .field("salt", &hex::encode(self.salt))
            .finish_non_exhaustive()
    }
}

/// Derive the 32-byte wrapping key for `password` under `salt`.
pub fn derive_password_key(
    password: &[u8],
    salt: &[u8; PBKDF2_SALT_LEN],
    iterations: u32,
) -> PasswordDerivedKey {
    let mut key = [0u8; KEY_LEN_32];
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key);
    PasswordDerivedKey { key, salt: *salt }
}

/// One-way step from a reencryption plaintext to the AES document key.
pub fn derive_document_key(seed: &[u8]) -> DocumentKey {
    let digest = Sha256::digest(seed);
    let mut key = [0u8; KEY_LEN_32];
    key.copy_from_slice(&digest);
    DocumentKey::from_bytes(key)
}
