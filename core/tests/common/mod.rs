#![allow(dead_code)]

//! Shared fixtures: an in-memory reencryption capability and key directory.
//!
//! MockRecrypt is not real cryptography. A public key is SHA-256 of the
//! private key; "encryption" prefixes the recipient public key and XORs the
//! plaintext with it, so decrypt can detect the wrong private key.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::sync::Once;

use docseal_core::config::SdkConfig;
use docseal_core::crypto::WrappedMasterKey;
use docseal_core::keys::{
    AccountContext, AsymmetricReencryption, AugmentationFactor, CapabilityError, Directory,
    DirectoryError, EncryptedAccessKey, EncryptedValue, KeyPair, KeyRotationCommit, Plaintext,
    PrincipalId, PrivateKey, PublicKey, RotatedPrivateKey, SigningKeys, TransformKey,
};
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const PASSWORD: &[u8] = b"correct horse battery staple";

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness; `RUST_LOG=docseal_core=debug` to see it.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn public_for(private_key: &PrivateKey) -> PublicKey {
    PublicKey(Sha256::digest(private_key.as_bytes()).to_vec())
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut out);
    out
}

fn xor_with(data: &[u8], key: &[u8]) -> Vec<u8> {
    data.iter().zip(key.iter().cycle()).map(|(d, k)| d ^ k).collect()
}

#[derive(Default)]
pub struct MockRecrypt {
    /// Results handed out by `rotate_private_key` before falling back to random ones.
    pub rotations: RefCell<VecDeque<RotatedPrivateKey>>,
    pub rotate_calls: Cell<usize>,
    pub encrypt_calls: Cell<usize>,
    pub fail_rotation: Cell<bool>,
}

impl MockRecrypt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_rotation(&self, new_private_key: Vec<u8>, augmentation_factor: Vec<u8>) {
        self.rotations.borrow_mut().push_back(RotatedPrivateKey {
            new_private_key: PrivateKey::new(new_private_key),
            augmentation_factor: AugmentationFactor(augmentation_factor),
        });
    }

    pub fn push_degenerate_rotation(&self) {
        self.push_rotation(vec![0u8; 32], vec![0u8; 32]);
    }
}

impl AsymmetricReencryption for MockRecrypt {
    fn generate_key_pair(&self) -> Result<KeyPair, CapabilityError> {
        let private_key = PrivateKey::new(random_bytes(32));
        Ok(KeyPair {
            public_key: public_for(&private_key),
            private_key,
        })
    }

    fn generate_plaintext(&self) -> Result<Plaintext, CapabilityError> {
        Ok(Plaintext::new(random_bytes(64)))
    }

    fn encrypt(
        &self,
        plaintext: &Plaintext,
        public_key: &PublicKey,
        _signing_keys: &SigningKeys,
    ) -> Result<EncryptedValue, CapabilityError> {
        self.encrypt_calls.set(self.encrypt_calls.get() + 1);
        let mut out = public_key.0.clone();
        out.extend(xor_with(plaintext.as_bytes(), &public_key.0));
        Ok(EncryptedValue(out))
    }

    fn decrypt(
        &self,
        encrypted: &EncryptedValue,
        private_key: &PrivateKey,
    ) -> Result<Plaintext, CapabilityError> {
        let public_key = public_for(private_key);
        let n = public_key.0.len();
        if encrypted.0.len() < n || encrypted.0[..n] != public_key.0[..] {
            return Err(CapabilityError::WrongKey);
        }
        Ok(Plaintext::new(xor_with(&encrypted.0[n..], &public_key.0)))
    }

    fn generate_transform_key(
        &self,
        from_private_key: &PrivateKey,
        to_public_key: &PublicKey,
        _signing_keys: &SigningKeys,
    ) -> Result<TransformKey, CapabilityError> {
        let mut hasher = Sha256::new();
        hasher.update(from_private_key.as_bytes());
        hasher.update(&to_public_key.0);
        Ok(TransformKey(hasher.finalize().to_vec()))
    }

    fn rotate_private_key(&self, _private_key: &PrivateKey) -> Result<RotatedPrivateKey, CapabilityError> {
        self.rotate_calls.set(self.rotate_calls.get() + 1);
        if self.fail_rotation.get() {
            return Err(CapabilityError::Failure("rotation unavailable".into()));
        }
        if let Some(next) = self.rotations.borrow_mut().pop_front() {
            return Ok(next);
        }
        Ok(RotatedPrivateKey {
            new_private_key: PrivateKey::new(random_bytes(32)),
            augmentation_factor: AugmentationFactor(random_bytes(32)),
        })
    }
}

#[derive(Default)]
pub struct MockDirectory {
    pub public_keys: RefCell<HashMap<PrincipalId, PublicKey>>,
    pub versions: RefCell<HashMap<PrincipalId, u64>>,
    pub grants: RefCell<Vec<(String, Vec<EncryptedAccessKey>)>>,
    pub rotations: RefCell<Vec<KeyRotationCommit>>,
    pub master_keys: RefCell<Vec<(String, WrappedMasterKey)>>,
    pub lookups: Cell<usize>,
    pub reject_commits: Cell<bool>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, principal: PrincipalId, public_key: PublicKey) {
        self.public_keys.borrow_mut().insert(principal, public_key);
    }

    fn check_accepting(&self) -> Result<(), DirectoryError> {
        if self.reject_commits.get() {
            return Err(DirectoryError::Rejected("directory offline".into()));
        }
        Ok(())
    }
}

impl Directory for MockDirectory {
    fn lookup_public_keys(
        &self,
        ids: &[PrincipalId],
    ) -> Result<HashMap<PrincipalId, PublicKey>, DirectoryError> {
        self.lookups.set(self.lookups.get() + 1);
        let keys = self.public_keys.borrow();
        Ok(ids
            .iter()
            .filter_map(|id| keys.get(id).map(|k| (id.clone(), k.clone())))
            .collect())
    }

    fn commit_access_grant(
        &self,
        document_id: &str,
        access_keys: &[EncryptedAccessKey],
    ) -> Result<(), DirectoryError> {
        self.check_accepting()?;
        self.grants
            .borrow_mut()
            .push((document_id.to_owned(), access_keys.to_vec()));
        Ok(())
    }

    fn commit_key_rotation(&self, commit: &KeyRotationCommit) -> Result<u64, DirectoryError> {
        self.check_accepting()?;
        let mut versions = self.versions.borrow_mut();
        let current = versions.entry(commit.entity.clone()).or_insert(0);
        if *current != commit.key_version {
            return Err(DirectoryError::VersionConflict {
                expected: commit.key_version,
                actual: *current,
            });
        }
        *current += 1;
        self.rotations.borrow_mut().push(commit.clone());
        Ok(*current)
    }

    fn commit_master_key(
        &self,
        account_id: &str,
        wrapped: &WrappedMasterKey,
    ) -> Result<(), DirectoryError> {
        self.check_accepting()?;
        self.master_keys
            .borrow_mut()
            .push((account_id.to_owned(), wrapped.clone()));
        Ok(())
    }
}

pub fn signing_keys() -> SigningKeys {
    SigningKeys::new(vec![7u8; 32], vec![9u8; 64])
}

/// New account with its public key published in `directory`.
pub fn new_account(recrypt: &MockRecrypt, directory: &MockDirectory, id: &str) -> AccountContext {
    init_tracing();
    let account = AccountContext::create(recrypt, id, PASSWORD, signing_keys(), SdkConfig::for_tests())
        .expect("account creation");
    directory.publish(account.principal(), account.public_key().clone());
    account
}
