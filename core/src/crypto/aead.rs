// ## 📂 File: `src/crypto/aead.rs`

//! src/crypto/aead.rs
//! Whole-buffer AES-256-GCM: the detached seal/open primitive and the
//! envelope-level block codec built on it.
//!
//! Design notes:
//! - 32-byte keys, 12-byte IVs, 16-byte tags, no associated data.
//! - Envelope layout: `header ‖ iv ‖ ciphertext ‖ tag`.
//! - Tag verification fails closed: no plaintext is returned on mismatch.
//! - Cipher errors are wrapped into `EncryptFailure` / `DecryptFailure`.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};

use crate::crypto::nonce::random_iv;
use crate::crypto::types::{CryptoError, DocumentKey, KEY_LEN_32, NONCE_LEN_12, TAG_LEN};
use crate::headers::{decode_header, DocumentHeader, HeaderError};
use crate::types::SdkError;

/// AES-256-GCM with the tag kept separate from the ciphertext.
#[derive(Clone)]
pub struct AesGcmCipher {
    cipher: Aes256Gcm,
}

impl AesGcmCipher {
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLen {
            expected: KEY_LEN_32,
            actual: key.len(),
        })?;
        Ok(Self { cipher })
    }

    /// Encrypt `plaintext`; returns `(ciphertext, tag)`.
    pub fn seal_detached(
        &self,
        iv: &[u8; NONCE_LEN_12],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, [u8; TAG_LEN]), CryptoError> {
        let mut buf = plaintext.to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(iv), &[], &mut buf)
            .map_err(|_| CryptoError::Failure("AES-GCM seal failed".into()))?;
        let mut tag_bytes = [0u8; TAG_LEN];
        tag_bytes.copy_from_slice(&tag);
        Ok((buf, tag_bytes))
    }

    /// Decrypt and verify. The buffer is discarded on tag mismatch.
    pub fn open_detached(
        &self,
        iv: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        if iv.len() != NONCE_LEN_12 {
            return Err(CryptoError::InvalidNonceLen { expected: NONCE_LEN_12, actual: iv.len() });
        }
        if tag.len() != TAG_LEN {
            return Err(CryptoError::CiphertextTooShort { have: tag.len(), need: TAG_LEN });
        }
        let mut buf = ciphertext.to_vec();
        self.cipher
            .decrypt_in_place_detached(Nonce::from_slice(iv), &[], &mut buf, Tag::from_slice(tag))
            .map_err(|_| CryptoError::TagMismatch)?;
        Ok(buf)
    }
}

/// Encrypt a whole document: `header ‖ iv ‖ ciphertext ‖ tag` with a random IV.
///
/// `header` must be a complete, well-formed envelope header.
pub fn block_encrypt(header: &[u8], plaintext: &[u8], key: &DocumentKey) -> Result<Vec<u8>, SdkError> {
    block_encrypt_with_iv(header, plaintext, key, &random_iv())
}

/// As `block_encrypt`, with a caller-chosen IV (deterministic vectors).
pub fn block_encrypt_with_iv(
    header: &[u8],
    plaintext: &[u8],
    key: &DocumentKey,
    iv: &[u8; NONCE_LEN_12],
) -> Result<Vec<u8>, SdkError> {
    let (_, rest) = decode_header(header)?;
    if !rest.is_empty() {
        return Err(SdkError::HeaderParseFailure(HeaderError::TrailingBytes { extra: rest.len() }));
    }

    let cipher = AesGcmCipher::new(key.as_bytes()).map_err(SdkError::EncryptFailure)?;
    let (ciphertext, tag) = cipher.seal_detached(iv, plaintext).map_err(SdkError::EncryptFailure)?;

    let mut out = Vec::with_capacity(header.len() + NONCE_LEN_12 + ciphertext.len() + TAG_LEN);
    out.extend_from_slice(header);
    out.extend_from_slice(iv);
    out.extend_from_slice(&ciphertext);
    out.extend_from_slice(&tag);
    Ok(out)
}

/// Decrypt a whole envelope produced by `block_encrypt` or the stream encryptor.
pub fn block_decrypt(envelope: &[u8], key: &DocumentKey) -> Result<Vec<u8>, SdkError> {
    block_decrypt_with_header(envelope, key).map(|(_, plaintext)| plaintext)
}

/// Decrypt and also return the parsed header.
pub fn block_decrypt_with_header(
    envelope: &[u8],
    key: &DocumentKey,
) -> Result<(DocumentHeader, Vec<u8>), SdkError> {
    let (header, body) = decode_header(envelope)?;

    if body.len() < NONCE_LEN_12 + TAG_LEN {
        return Err(SdkError::DecryptFailure(CryptoError::CiphertextTooShort {
            have: body.len(),
            need: NONCE_LEN_12 + TAG_LEN,
        }));
    }
    let (iv, rest) = body.split_at(NONCE_LEN_12);
    let (ciphertext, tag) = rest.split_at(rest.len() - TAG_LEN);

    let cipher = AesGcmCipher::new(key.as_bytes()).map_err(SdkError::DecryptFailure)?;
    let plaintext = cipher.open_detached(iv, ciphertext, tag).map_err(|e| {
        tracing::debug!(version = header.version(), "envelope failed authentication");
        SdkError::DecryptFailure(e)
    })?;
    Ok((header, plaintext))
}
