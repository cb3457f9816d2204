//! keys/capability.rs
//! External collaborators, injected as traits.
//!
//! - `AsymmetricReencryption`: the proxy re-encryption primitive.
//! - `Directory`: the backing service that stores public keys, access grants
//!   and rotated key material.
//!
//! Key material crossing these traits is opaque bytes; the core never looks
//! inside it beyond the all-zero check used by rotation.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::WrappedMasterKey;

/// Who a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    User,
    Group,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalId {
    pub id: String,
    pub kind: PrincipalKind,
}

impl PrincipalId {
    pub fn user(id: impl Into<String>) -> Self {
        Self { id: id.into(), kind: PrincipalKind::User }
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self { id: id.into(), kind: PrincipalKind::Group }
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PrincipalKind::User => write!(f, "user:{}", self.id),
            PrincipalKind::Group => write!(f, "group:{}", self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey(pub Vec<u8>);

/// Private key bytes; wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(Vec<u8>);

impl PrivateKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Reencryption plaintext (document key seed, or a group private key being
/// handed to admins); wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Plaintext(Vec<u8>);

impl Plaintext {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Plaintext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Plaintext(<redacted>)")
    }
}

/// Keys used to sign reencryption ciphertexts and transform keys.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningKeys {
    pub public: Vec<u8>,
    private: Vec<u8>,
}

impl SigningKeys {
    pub fn new(public: Vec<u8>, private: Vec<u8>) -> Self {
        Self { public, private }
    }

    pub fn private_bytes(&self) -> &[u8] {
        &self.private
    }
}

impl fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeys")
            .field("public", &hex::encode(&self.public))
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
}

/// Opaque output of `AsymmetricReencryption::encrypt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedValue(pub Vec<u8>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformKey(pub Vec<u8>);

/// Delta between an old and a rotated private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentationFactor(pub Vec<u8>);

/// Result of `rotate_private_key`: `new = current - augmentation_factor`.
#[derive(Debug, Clone)]
pub struct RotatedPrivateKey {
    pub new_private_key: PrivateKey,
    pub augmentation_factor: AugmentationFactor,
}

/// A public key that may receive an encrypted document key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub principal: PrincipalId,
    pub public_key: PublicKey,
}

/// Document key seed encrypted to one principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedAccessKey {
    pub principal: PrincipalId,
    pub encrypted_key: EncryptedValue,
}

/// Key material produced by a rotation, per entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotatedKeyMaterial {
    /// User rotation: new private key wrapped under the existing password key.
    User(WrappedMasterKey),
    /// Group rotation: new private key encrypted to every admin.
    Group(Vec<EncryptedAccessKey>),
}

/// Everything the directory needs to accept a rotation.
#[derive(Debug, Clone)]
pub struct KeyRotationCommit {
    pub entity: PrincipalId,
    /// Version being replaced; the directory rejects stale submissions.
    pub key_version: u64,
    pub material: RotatedKeyMaterial,
    pub augmentation_factor: AugmentationFactor,
}

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("reencryption operation failed: {0}")]
    Failure(String),

    #[error("ciphertext was not encrypted to this key")]
    WrongKey,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("no public key for {0}")]
    KeyNotFound(PrincipalId),

    #[error("stale key version: expected {expected}, directory has {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Proxy re-encryption primitive.
pub trait AsymmetricReencryption {
    fn generate_key_pair(&self) -> Result<KeyPair, CapabilityError>;

    /// Fresh random plaintext suitable as a document key seed.
    fn generate_plaintext(&self) -> Result<Plaintext, CapabilityError>;

    fn encrypt(
        &self,
        plaintext: &Plaintext,
        public_key: &PublicKey,
        signing_keys: &SigningKeys,
    ) -> Result<EncryptedValue, CapabilityError>;

    fn decrypt(
        &self,
        encrypted: &EncryptedValue,
        private_key: &PrivateKey,
    ) -> Result<Plaintext, CapabilityError>;

    fn generate_transform_key(
        &self,
        from_private_key: &PrivateKey,
        to_public_key: &PublicKey,
        signing_keys: &SigningKeys,
    ) -> Result<TransformKey, CapabilityError>;

    fn rotate_private_key(&self, private_key: &PrivateKey) -> Result<RotatedPrivateKey, CapabilityError>;
}

/// Backing key directory.
pub trait Directory {
    /// Ids without a published key are absent from the result.
    fn lookup_public_keys(
        &self,
        ids: &[PrincipalId],
    ) -> Result<HashMap<PrincipalId, PublicKey>, DirectoryError>;

    fn commit_access_grant(
        &self,
        document_id: &str,
        access_keys: &[EncryptedAccessKey],
    ) -> Result<(), DirectoryError>;

    /// Returns the new key version on success.
    fn commit_key_rotation(&self, commit: &KeyRotationCommit) -> Result<u64, DirectoryError>;

    /// Replace an account's wrapped master key (password change).
    fn commit_master_key(
        &self,
        account_id: &str,
        wrapped: &WrappedMasterKey,
    ) -> Result<(), DirectoryError>;
}
