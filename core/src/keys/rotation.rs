//! keys/rotation.rs
//! User and group private-key rotation.
//!
//! Steps, shared by both entity kinds:
//! 1. Recover the current private key (password unwrap, or the group key
//!    encrypted to the rotating admin).
//! 2. Ask the capability for `{new_private_key, augmentation_factor}`. An
//!    all-zero value in either is retried once; a second one is fatal.
//! 3. Protect the new key: re-wrap under the cached password key (user) or
//!    encrypt it to every admin (group).
//! 4. Submit to the directory. Local state is replaced only after the
//!    directory accepted the submission, so any failure leaves the old key
//!    usable and the whole rotation safe to retry.

use crate::crypto::keywrap;
use crate::keys::capability::{
    AsymmetricReencryption, Directory, DirectoryError, EncryptedAccessKey, KeyRotationCommit,
    Plaintext, PrincipalId, PrivateKey, Recipient, RotatedKeyMaterial, RotatedPrivateKey,
};
use crate::keys::envelope::KeyEnvelope;
use crate::keys::session::AccountContext;
use crate::types::SdkError;

/// Cached key state of one group, as seen by one of its admins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupKeyState {
    group_id: String,
    key_version: u64,
    admins: Vec<String>,
    /// Group private key encrypted to the local account.
    encrypted_private_key: EncryptedAccessKey,
}

impl GroupKeyState {
    pub fn new(
        group_id: impl Into<String>,
        key_version: u64,
        admins: Vec<String>,
        encrypted_private_key: EncryptedAccessKey,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            key_version,
            admins,
            encrypted_private_key,
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn principal(&self) -> PrincipalId {
        PrincipalId::group(self.group_id.clone())
    }

    pub fn key_version(&self) -> u64 {
        self.key_version
    }

    pub fn admins(&self) -> &[String] {
        &self.admins
    }

    pub fn is_admin(&self, account_id: &str) -> bool {
        self.admins.iter().any(|a| a == account_id)
    }

    pub fn encrypted_private_key(&self) -> &EncryptedAccessKey {
        &self.encrypted_private_key
    }
}

/// What an accepted rotation changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationOutcome {
    pub entity: PrincipalId,
    pub previous_key_version: u64,
    pub new_key_version: u64,
    /// Admin copies of the new group key (always 0 for a user rotation).
    pub resealed_keys: usize,
    /// The first capability result was degenerate.
    pub retried: bool,
}

pub struct RotationProtocol<'a, C: ?Sized, D: ?Sized> {
    recrypt: &'a C,
    directory: &'a D,
}

impl<'a, C, D> RotationProtocol<'a, C, D>
where
    C: AsymmetricReencryption + ?Sized,
    D: Directory + ?Sized,
{
    pub fn new(recrypt: &'a C, directory: &'a D) -> Self {
        Self { recrypt, directory }
    }

    /// Rotate the account's master private key.
    ///
    /// The new key is wrapped under the same password-derived key and salt,
    /// so the password stays valid.
    pub fn rotate_user_key(
        &self,
        account: &mut AccountContext,
        password: &[u8],
    ) -> Result<RotationOutcome, SdkError> {
        let unlocked = account.unlock(password)?;
        let (rotated, retried) = self.rotate_with_retry(&unlocked.private_key)?;
        let wrapped = keywrap::rewrap(rotated.new_private_key.as_bytes(), &unlocked.derived_key)?;

        let previous_key_version = account.key_version();
        let commit = KeyRotationCommit {
            entity: account.principal(),
            key_version: previous_key_version,
            material: RotatedKeyMaterial::User(wrapped.clone()),
            augmentation_factor: rotated.augmentation_factor.clone(),
        };
        let new_key_version = self.submit(&commit)?;

        account.replace_master_key(wrapped, new_key_version);
        tracing::debug!(
            account = %account.account_id(),
            version = new_key_version,
            retried,
            "user key rotated"
        );

        Ok(RotationOutcome {
            entity: commit.entity,
            previous_key_version,
            new_key_version,
            resealed_keys: 0,
            retried,
        })
    }

    /// Rotate a group private key. `account` must be one of the group's admins
    /// and `user_private_key` its unlocked private key.
    pub fn rotate_group_key(
        &self,
        account: &AccountContext,
        user_private_key: &PrivateKey,
        group: &mut GroupKeyState,
    ) -> Result<RotationOutcome, SdkError> {
        if !group.is_admin(account.account_id()) {
            return Err(SdkError::RotationFailure(format!(
                "{} is not an admin of group {}",
                account.account_id(),
                group.group_id()
            )));
        }

        let current = self
            .recrypt
            .decrypt(&group.encrypted_private_key.encrypted_key, user_private_key)?;
        let current = PrivateKey::new(current.as_bytes().to_vec());
        let (rotated, retried) = self.rotate_with_retry(&current)?;

        let recipients = self.admin_recipients(group)?;
        let new_key = Plaintext::new(rotated.new_private_key.as_bytes().to_vec());
        let sealed = KeyEnvelope::new(self.recrypt).seal_to_recipients(
            &new_key,
            &recipients,
            account.signing_keys(),
        )?;

        let own_copy = sealed
            .iter()
            .find(|k| k.principal == account.principal())
            .cloned()
            .ok_or_else(|| SdkError::RotationFailure("no admin copy for the rotating account".into()))?;

        let previous_key_version = group.key_version();
        let resealed_keys = sealed.len();
        let commit = KeyRotationCommit {
            entity: group.principal(),
            key_version: previous_key_version,
            material: RotatedKeyMaterial::Group(sealed),
            augmentation_factor: rotated.augmentation_factor.clone(),
        };
        let new_key_version = self.submit(&commit)?;

        group.encrypted_private_key = own_copy;
        group.key_version = new_key_version;
        tracing::debug!(
            group = %group.group_id(),
            version = new_key_version,
            admins = resealed_keys,
            retried,
            "group key rotated"
        );

        Ok(RotationOutcome {
            entity: commit.entity,
            previous_key_version,
            new_key_version,
            resealed_keys,
            retried,
        })
    }

    /// Capability rotation with one retry on a degenerate result. Capability
    /// errors are not retried.
    fn rotate_with_retry(&self, current: &PrivateKey) -> Result<(RotatedPrivateKey, bool), SdkError> {
        let first = self.recrypt.rotate_private_key(current)?;
        if !is_degenerate(&first) {
            return Ok((first, false));
        }

        tracing::warn!("degenerate rotation result, retrying once");
        let second = self.recrypt.rotate_private_key(current)?;
        if is_degenerate(&second) {
            tracing::warn!("second rotation result was degenerate");
            return Err(SdkError::RotationFailure(
                "capability returned an all-zero key twice".into(),
            ));
        }
        Ok((second, true))
    }

    fn admin_recipients(&self, group: &GroupKeyState) -> Result<Vec<Recipient>, SdkError> {
        let ids: Vec<PrincipalId> = group.admins().iter().map(PrincipalId::user).collect();
        let found = self.directory.lookup_public_keys(&ids)?;

        ids.into_iter()
            .map(|principal| match found.get(&principal) {
                Some(public_key) => Ok(Recipient { public_key: public_key.clone(), principal }),
                None => Err(SdkError::Directory(DirectoryError::KeyNotFound(principal))),
            })
            .collect()
    }

    fn submit(&self, commit: &KeyRotationCommit) -> Result<u64, SdkError> {
        self.directory.commit_key_rotation(commit).map_err(|e| {
            tracing::warn!(entity = %commit.entity, error = %e, "directory rejected key rotation");
            SdkError::Directory(e)
        })
    }
}

fn is_degenerate(rotated: &RotatedPrivateKey) -> bool {
    is_all_zero(rotated.new_private_key.as_bytes()) || is_all_zero(&rotated.augmentation_factor.0)
}

fn is_all_zero(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| *b == 0)
}
