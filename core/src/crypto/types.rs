// ## 📂 File: `src/crypto/types.rs`

use std::fmt;

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-256 key length.
pub const KEY_LEN_32: usize = 32;

/// GCM IV length (96-bit IV, counter starts at 2).
pub const NONCE_LEN_12: usize = 12;

/// Fixed AEAD tag length (bytes).
pub const TAG_LEN: usize = 16;

/// AES block length.
pub const BLOCK_LEN: usize = 16;

/// Bytes held back by streaming decrypt: last ciphertext block + tag.
pub const TRAILING_WINDOW_LEN: usize = BLOCK_LEN + TAG_LEN;

/// Symmetric key that encrypts one document's content.
///
/// Exists only in memory; wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DocumentKey([u8; KEY_LEN_32]);

impl DocumentKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN_32]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; KEY_LEN_32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLen {
            expected: KEY_LEN_32,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN_32] {
        &self.0
    }
}

impl fmt::Debug for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DocumentKey(<redacted>)")
    }
}

#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid key length provided to cipher.
    #[error("invalid key length: expected={expected}, actual={actual}")]
    InvalidKeyLen { expected: usize, actual: usize },

    /// Nonce length mismatch (must be 12 bytes).
    #[error("invalid nonce length: expected={expected}, actual={actual}")]
    InvalidNonceLen { expected: usize, actual: usize },

    /// Input shorter than the fixed-size fields it must contain.
    #[error("ciphertext too short: {have} < {need}")]
    CiphertextTooShort { have: usize, need: usize },

    /// AEAD tag mismatch (authentication failure).
    #[error("AEAD tag mismatch")]
    TagMismatch,

    /// Keystream for this IV is used up (2^32 blocks).
    #[error("keystream exhausted")]
    KeystreamExhausted,

    /// General runtime error with context.
    #[error("crypto failure: {0}")]
    Failure(String),
}
