//! crypto/nonce.rs
//! Random IV and salt generation.
//!
//! Every envelope and every wrapped key gets a fresh random 96-bit IV from the
//! OS generator. IVs are never derived or reused under the same key.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::constants::PBKDF2_SALT_LEN;
use crate::crypto::types::NONCE_LEN_12;

/// Fresh random 12-byte GCM IV.
pub fn random_iv() -> [u8; NONCE_LEN_12] {
    let mut iv = [0u8; NONCE_LEN_12];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Fresh random 32-byte PBKDF2 salt.
pub fn random_salt() -> [u8; PBKDF2_SALT_LEN] {
    let mut salt = [0u8; PBKDF2_SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}
