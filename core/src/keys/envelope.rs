//! keys/envelope.rs
//! Multi-recipient document key envelopes.
//!
//! A document is encrypted once under a `DocumentKey`. The key itself is the
//! SHA-256 of a reencryption plaintext ("seed"); the seed is what gets
//! encrypted to every recipient. Granting access later means opening one's own
//! copy of the seed and sealing it again for the new recipients; the document
//! envelope is never touched.

use crate::crypto::{derive_document_key, DocumentKey};
use crate::keys::capability::{
    AsymmetricReencryption, EncryptedAccessKey, Plaintext, PrivateKey, Recipient, SigningKeys,
};
use crate::types::SdkError;

/// Seed plus the AES key derived from it.
#[derive(Debug)]
pub struct OpenedKey {
    pub seed: Plaintext,
    pub key: DocumentKey,
}

impl OpenedKey {
    fn from_seed(seed: Plaintext) -> Self {
        let key = derive_document_key(seed.as_bytes());
        Self { seed, key }
    }
}

pub struct KeyEnvelope<'a, C: ?Sized> {
    recrypt: &'a C,
}

impl<'a, C> KeyEnvelope<'a, C>
where
    C: AsymmetricReencryption + ?Sized,
{
    pub fn new(recrypt: &'a C) -> Self {
        Self { recrypt }
    }

    /// Fresh seed and document key for a new document.
    pub fn generate_document_key(&self) -> Result<OpenedKey, SdkError> {
        let seed = self.recrypt.generate_plaintext()?;
        Ok(OpenedKey::from_seed(seed))
    }

    /// One capability `encrypt` per recipient, in order.
    ///
    /// An empty recipient list yields an empty result.
    pub fn seal_to_recipients(
        &self,
        seed: &Plaintext,
        recipients: &[Recipient],
        signing_keys: &SigningKeys,
    ) -> Result<Vec<EncryptedAccessKey>, SdkError> {
        let mut sealed = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let encrypted_key = self.recrypt.encrypt(seed, &recipient.public_key, signing_keys)?;
            sealed.push(EncryptedAccessKey {
                principal: recipient.principal.clone(),
                encrypted_key,
            });
        }

        tracing::debug!(recipients = sealed.len(), "sealed document key");
        Ok(sealed)
    }

    pub fn open_for(
        &self,
        access_key: &EncryptedAccessKey,
        private_key: &PrivateKey,
    ) -> Result<OpenedKey, SdkError> {
        let seed = self.recrypt.decrypt(&access_key.encrypted_key, private_key)?;
        Ok(OpenedKey::from_seed(seed))
    }

    /// Open `existing` with `private_key` and seal the seed for `new_recipients`.
    pub fn reseal(
        &self,
        existing: &EncryptedAccessKey,
        private_key: &PrivateKey,
        new_recipients: &[Recipient],
        signing_keys: &SigningKeys,
    ) -> Result<Vec<EncryptedAccessKey>, SdkError> {
        if new_recipients.is_empty() {
            return Ok(Vec::new());
        }
        let opened = self.open_for(existing, private_key)?;
        self.seal_to_recipients(&opened.seed, new_recipients, signing_keys)
    }
}
