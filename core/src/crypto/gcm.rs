//! crypto/gcm.rs
//! Incremental AES-256-GCM for the streaming codec.
//!
//! Design notes:
//! - Assembled from the same parts `aes-gcm` uses: AES-256 in 32-bit
//!   big-endian counter mode and GHASH, so output is byte-identical to
//!   `AesGcmCipher` for the same key and IV.
//! - `J0 = iv ‖ 0x00000001`; the keystream starts at `inc32(J0)`.
//! - Ciphertext is emitted as soon as it is produced. Only a partial GHASH
//!   block (< 16 bytes) is held internally.
//! - No associated data: the length block is `0 ‖ bitlen(C)`.

use aes::cipher::{BlockEncrypt, KeyInit, KeyIvInit, StreamCipher};
use aes::Aes256;
use ghash::universal_hash::UniversalHash;
use ghash::GHash;

use crate::crypto::types::{CryptoError, BLOCK_LEN, KEY_LEN_32, NONCE_LEN_12, TAG_LEN};

type Aes256Ctr32 = ctr::Ctr32BE<Aes256>;

/// One direction of a GCM computation, fed in arbitrary pieces.
pub struct GcmStream {
    keystream: Aes256Ctr32,
    ghash: GHash,
    /// Ciphertext bytes not yet folded into GHASH.
    partial: [u8; BLOCK_LEN],
    partial_len: usize,
    ciphertext_len: u64,
    /// E_K(J0), xored into GHASH output to form the tag.
    tag_mask: [u8; TAG_LEN],
}

impl GcmStream {
    pub fn new(key: &[u8], iv: &[u8; NONCE_LEN_12]) -> Result<Self, CryptoError> {
        let invalid_key = || CryptoError::InvalidKeyLen { expected: KEY_LEN_32, actual: key.len() };

        let block_cipher = Aes256::new_from_slice(key).map_err(|_| invalid_key())?;

        let mut hash_key = aes::Block::default();
        block_cipher.encrypt_block(&mut hash_key);
        let ghash = <GHash as KeyInit>::new(&hash_key);

        let mut j0 = [0u8; BLOCK_LEN];
        j0[..NONCE_LEN_12].copy_from_slice(iv);
        j0[BLOCK_LEN - 1] = 1;

        let mut mask = aes::Block::clone_from_slice(&j0);
        block_cipher.encrypt_block(&mut mask);
        let mut tag_mask = [0u8; TAG_LEN];
        tag_mask.copy_from_slice(&mask);

        let mut counter = j0;
        counter[BLOCK_LEN - 1] = 2;
        let keystream = Aes256Ctr32::new_from_slices(key, &counter).map_err(|_| invalid_key())?;

        Ok(Self {
            keystream,
            ghash,
            partial: [0u8; BLOCK_LEN],
            partial_len: 0,
            ciphertext_len: 0,
            tag_mask,
        })
    }

    /// Encrypt the next plaintext piece.
    pub fn encrypt_update(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut out = plaintext.to_vec();
        self.keystream
            .try_apply_keystream(&mut out)
            .map_err(|_| CryptoError::KeystreamExhausted)?;
        self.absorb(&out);
        Ok(out)
    }

    /// Decrypt the next ciphertext piece. The output is unauthenticated until
    /// `verify_tag` succeeds.
    pub fn decrypt_update(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.absorb(ciphertext);
        let mut out = ciphertext.to_vec();
        self.keystream
            .try_apply_keystream(&mut out)
            .map_err(|_| CryptoError::KeystreamExhausted)?;
        Ok(out)
    }

    /// Tag over everything absorbed so far.
    pub fn finalize_tag(mut self) -> [u8; TAG_LEN] {
        if self.partial_len > 0 {
            let partial = self.partial;
            self.ghash.update_padded(&partial[..self.partial_len]);
        }

        let mut lengths = ghash::Block::default();
        lengths[8..].copy_from_slice(&(self.ciphertext_len * 8).to_be_bytes());
        self.ghash.update(&[lengths]);

        let mask = self.tag_mask;
        let digest = self.ghash.finalize();
        let mut tag = [0u8; TAG_LEN];
        for (i, t) in tag.iter_mut().enumerate() {
            *t = digest[i] ^ mask[i];
        }
        tag
    }

    /// Compare the computed tag with `expected` without early exit.
    pub fn verify_tag(self, expected: &[u8]) -> Result<(), CryptoError> {
        if expected.len() != TAG_LEN {
            return Err(CryptoError::CiphertextTooShort { have: expected.len(), need: TAG_LEN });
        }
        let computed = self.finalize_tag();
        let diff = computed
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));
        if diff == 0 {
            Ok(())
        } else {
            Err(CryptoError::TagMismatch)
        }
    }

    /// Fold ciphertext into GHASH, one whole block at a time.
    fn absorb(&mut self, mut data: &[u8]) {
        self.ciphertext_len += data.len() as u64;

        if self.partial_len > 0 {
            let take = (BLOCK_LEN - self.partial_len).min(data.len());
            self.partial[self.partial_len..self.partial_len + take].copy_from_slice(&data[..take]);
            self.partial_len += take;
            data = &data[take..];
            if self.partial_len < BLOCK_LEN {
                return;
            }
            let block = ghash::Block::clone_from_slice(&self.partial);
            self.ghash.update(&[block]);
            self.partial_len = 0;
        }

        let mut blocks = data.chunks_exact(BLOCK_LEN);
        for block in blocks.by_ref() {
            self.ghash.update(&[ghash::Block::clone_from_slice(block)]);
        }
        let rest = blocks.remainder();
        self.partial[..rest.len()].copy_from_slice(rest);
        self.partial_len = rest.len();
    }
}
