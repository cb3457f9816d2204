//! keys/session.rs
//! Per-account session state, passed explicitly into every operation.
//!
//! `AccountContext` holds what a signed-in client keeps in memory: its
//! identity, signing keys, and the cached password-wrapped master key with
//! its directory key version. The unwrapped private key is never stored here;
//! `unlock` hands it out for the duration of one operation.

use crate::config::SdkConfig;
use crate::crypto::keywrap::{self, WrappedMasterKey};
use crate::crypto::PasswordDerivedKey;
use crate::keys::capability::{AsymmetricReencryption, Directory, PrincipalId, PrivateKey, PublicKey, SigningKeys};
use crate::types::SdkError;

/// Private key recovered from the wrapped master key, plus the password key
/// that opened it (reused by rotation to re-wrap without the password).
#[derive(Debug)]
pub struct UnlockedAccount {
    pub private_key: PrivateKey,
    pub derived_key: PasswordDerivedKey,
}

#[derive(Debug, Clone)]
pub struct AccountContext {
    account_id: String,
    public_key: PublicKey,
    signing_keys: SigningKeys,
    wrapped_master_key: WrappedMasterKey,
    key_version: u64,
    config: SdkConfig,
}

impl AccountContext {
    /// Context for an existing account, as loaded from the directory.
    pub fn new(
        account_id: impl Into<String>,
        public_key: PublicKey,
        signing_keys: SigningKeys,
        wrapped_master_key: WrappedMasterKey,
        key_version: u64,
        config: SdkConfig,
    ) -> Result<Self, SdkError> {
        config.validate()?;
        Ok(Self {
            account_id: account_id.into(),
            public_key,
            signing_keys,
            wrapped_master_key,
            key_version,
            config,
        })
    }

    /// Generate a key pair for a new account and wrap its private key under
    /// `password`. The returned context starts at key version 0.
    pub fn create<C>(
        recrypt: &C,
        account_id: impl Into<String>,
        password: &[u8],
        signing_keys: SigningKeys,
        config: SdkConfig,
    ) -> Result<Self, SdkError>
    where
        C: AsymmetricReencryption + ?Sized,
    {
        config.validate()?;
        let pair = recrypt.generate_key_pair()?;
        let (wrapped, _) = keywrap::wrap(password, pair.private_key.as_bytes(), &config)?;

        let account_id = account_id.into();
        tracing::debug!(account = %account_id, "created account key pair");
        Self::new(account_id, pair.public_key, signing_keys, wrapped, 0, config)
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn principal(&self) -> PrincipalId {
        PrincipalId::user(self.account_id.clone())
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn signing_keys(&self) -> &SigningKeys {
        &self.signing_keys
    }

    pub fn wrapped_master_key(&self) -> &WrappedMasterKey {
        &self.wrapped_master_key
    }

    pub fn key_version(&self) -> u64 {
        self.key_version
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// Unwrap the master key. A wrong password yields `IncorrectPassword`.
    pub fn unlock(&self, password: &[u8]) -> Result<UnlockedAccount, SdkError> {
        let (master_key, derived_key) = keywrap::unwrap(password, &self.wrapped_master_key, &self.config)?;
        Ok(UnlockedAccount {
            private_key: PrivateKey::new(master_key),
            derived_key,
        })
    }

    /// Re-wrap the master key under `new_password` with a fresh salt.
    ///
    /// The cached wrapped key changes only after the directory accepted the
    /// new one.
    pub fn change_password<D>(
        &mut self,
        directory: &D,
        current_password: &[u8],
        new_password: &[u8],
    ) -> Result<(), SdkError>
    where
        D: Directory + ?Sized,
    {
        let unlocked = self.unlock(current_password)?;
        let (wrapped, _) = keywrap::wrap(new_password, unlocked.private_key.as_bytes(), &self.config)?;

        directory.commit_master_key(&self.account_id, &wrapped)?;
        self.wrapped_master_key = wrapped;

        tracing::debug!(account = %self.account_id, "password changed");
        Ok(())
    }

    /// Swap in the result of an accepted rotation.
    pub(crate) fn replace_master_key(&mut self, wrapped: WrappedMasterKey, key_version: u64) {
        self.wrapped_master_key = wrapped;
        self.key_version = key_version;
    }
}
