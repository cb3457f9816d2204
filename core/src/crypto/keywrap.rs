//! crypto/keywrap.rs
//! Password-based wrapping of a long-lived master private key.
//!
//! Layout: `salt(32) ‖ iv(12) ‖ ciphertext ‖ tag(16)`.
//!
//! A tag failure while unwrapping is reported as `IncorrectPassword`; every
//! other failure keeps its usual kind.

use crate::config::SdkConfig;
use crate::constants::PBKDF2_SALT_LEN;
use crate::crypto::aead::AesGcmCipher;
use crate::crypto::kdf::{derive_password_key, PasswordDerivedKey};
use crate::crypto::nonce::{random_iv, random_salt};
use crate::crypto::types::{CryptoError, NONCE_LEN_12, TAG_LEN};
use crate::types::SdkError;

/// Fixed-size part of a wrapped key (everything except the ciphertext).
pub const WRAPPED_OVERHEAD: usize = PBKDF2_SALT_LEN + NONCE_LEN_12 + TAG_LEN;

/// Master private key encrypted under a password-derived key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedMasterKey {
    pub salt: [u8; PBKDF2_SALT_LEN],
    pub iv: [u8; NONCE_LEN_12],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
}

impl WrappedMasterKey {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(WRAPPED_OVERHEAD + self.ciphertext.len());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.tag);
        out
    }

    /// Slice by fixed offsets: salt first, iv next, tag last.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SdkError> {
        if bytes.len() < WRAPPED_OVERHEAD {
            return Err(SdkError::DecryptFailure(CryptoError::CiphertextTooShort {
                have: bytes.len(),
                need: WRAPPED_OVERHEAD,
            }));
        }
        let (salt, rest) = bytes.split_at(PBKDF2_SALT_LEN);
        let (iv, rest) = rest.split_at(NONCE_LEN_12);
        let (ciphertext, tag) = rest.split_at(rest.len() - TAG_LEN);

        let mut out = Self {
            salt: [0u8; PBKDF2_SALT_LEN],
            iv: [0u8; NONCE_LEN_12],
            ciphertext: ciphertext.to_vec(),
            tag: [0u8; TAG_LEN],
        };
        out.salt.copy_from_slice(salt);
        out.iv.copy_from_slice(iv);
        out.tag.copy_from_slice(tag);
        Ok(out)
    }
}

/// Wrap `master_key` under a key derived from `password` with a fresh salt.
///
/// Returns the derived key as well so callers can cache it for `rewrap`.
pub fn wrap(
    password: &[u8],
    master_key: &[u8],
    config: &SdkConfig,
) -> Result<(WrappedMasterKey, PasswordDerivedKey), SdkError> {
    let derived = derive_password_key(password, &random_salt(), config.pbkdf2_iterations);
    let wrapped = rewrap(master_key, &derived)?;
    Ok((wrapped, derived))
}

/// Recover the master key. Returns it with the derived key that opened it.
pub fn unwrap(
    password: &[u8],
    wrapped: &WrappedMasterKey,
    config: &SdkConfig,
) -> Result<(Vec<u8>, PasswordDerivedKey), SdkError> {
    let derived = derive_password_key(password, &wrapped.salt, config.pbkdf2_iterations);
    let cipher = AesGcmCipher::new(derived.key()).map_err(SdkError::DecryptFailure)?;

    match cipher.open_detached(&wrapped.iv, &wrapped.ciphertext, &wrapped.tag) {
        Ok(master_key) => Ok((master_key, derived)),
        Err(CryptoError::TagMismatch) => Err(SdkError::IncorrectPassword),
        Err(e) => Err(SdkError::DecryptFailure(e)),
    }
}

/// Wrap with an already-derived key and its salt; only the IV is new.
pub fn rewrap(master_key: &[u8], derived: &PasswordDerivedKey) -> Result<WrappedMasterKey, SdkError> {
    let iv = random_iv();
    let cipher = AesGcmCipher::new(derived.key()).map_err(SdkError::EncryptFailure)?;
    let (ciphertext, tag) = cipher.seal_detached(&iv, master_key).map_err(SdkError::EncryptFailure)?;

    Ok(WrappedMasterKey { salt: *derived.salt(), iv, ciphertext, tag })
}
