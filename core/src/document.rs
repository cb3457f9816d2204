//! document.rs
//! End-to-end document flows over the codec and key envelopes.
//!
//! - `encrypt` / `encrypt_stream`: new document key, version-2 envelope, seed
//!   sealed to the author plus every requested principal, grant committed.
//! - `decrypt` / `decrypt_stream`: open an access key, decrypt the envelope.
//! - `grant_access`: reseal an existing access key for more principals.

use std::io::{Read, Write};

use crate::constants::HEADER_PREFIX_V2;
use crate::crypto::{block_decrypt_with_header, block_encrypt};
use crate::headers::{encode_document_header, DocumentHeader, HeaderError};
use crate::keys::capability::{
    AsymmetricReencryption, Directory, DirectoryError, EncryptedAccessKey, Plaintext, PrincipalId,
    PrivateKey, Recipient,
};
use crate::keys::envelope::KeyEnvelope;
use crate::keys::session::AccountContext;
use crate::stream::{decrypt_stream_with, encrypt_stream};
use crate::telemetry::TelemetrySnapshot;
use crate::types::SdkError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedDocument {
    pub document_id: String,
    pub envelope: Vec<u8>,
    /// Author first, then the granted principals in request order.
    pub access_keys: Vec<EncryptedAccessKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedDocument {
    pub header: DocumentHeader,
    pub plaintext: Vec<u8>,
}

pub struct DocumentService<'a, C: ?Sized, D: ?Sized> {
    recrypt: &'a C,
    directory: &'a D,
}

impl<'a, C, D> DocumentService<'a, C, D>
where
    C: AsymmetricReencryption + ?Sized,
    D: Directory + ?Sized,
{
    pub fn new(recrypt: &'a C, directory: &'a D) -> Self {
        Self { recrypt, directory }
    }

    pub fn encrypt(
        &self,
        account: &AccountContext,
        document_id: &str,
        segment_id: u64,
        plaintext: &[u8],
        grant_to: &[PrincipalId],
    ) -> Result<EncryptedDocument, SdkError> {
        let header = document_header(account, document_id, segment_id)?;
        let opened = KeyEnvelope::new(self.recrypt).generate_document_key()?;

        let envelope = block_encrypt(&header, plaintext, &opened.key)?;
        let access_keys = self.seal_and_commit(account, document_id, &opened.seed, grant_to)?;

        tracing::debug!(document = document_id, bytes = plaintext.len(), "document encrypted");
        Ok(EncryptedDocument {
            document_id: document_id.to_owned(),
            envelope,
            access_keys,
        })
    }

    /// Streaming variant of `encrypt`. The grant is committed only after the
    /// whole envelope was written.
    pub fn encrypt_stream<R: Read, W: Write>(
        &self,
        account: &AccountContext,
        document_id: &str,
        segment_id: u64,
        reader: &mut R,
        writer: &mut W,
        grant_to: &[PrincipalId],
    ) -> Result<(Vec<EncryptedAccessKey>, TelemetrySnapshot), SdkError> {
        let header = document_header(account, document_id, segment_id)?;
        let opened = KeyEnvelope::new(self.recrypt).generate_document_key()?;

        let snapshot = encrypt_stream(reader, writer, &header, &opened.key)?;
        let access_keys = self.seal_and_commit(account, document_id, &opened.seed, grant_to)?;
        Ok((access_keys, snapshot))
    }

    pub fn decrypt(
        &self,
        envelope: &[u8],
        access_key: &EncryptedAccessKey,
        private_key: &PrivateKey,
    ) -> Result<DecryptedDocument, SdkError> {
        let opened = KeyEnvelope::new(self.recrypt).open_for(access_key, private_key)?;
        let (header, plaintext) = block_decrypt_with_header(envelope, &opened.key)?;
        Ok(DecryptedDocument { header, plaintext })
    }

    /// Streaming variant of `decrypt`. Output must be discarded unless this
    /// returns `Ok`.
    pub fn decrypt_stream<R: Read, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
        access_key: &EncryptedAccessKey,
        private_key: &PrivateKey,
    ) -> Result<(DocumentHeader, TelemetrySnapshot), SdkError> {
        let envelope = KeyEnvelope::new(self.recrypt);
        decrypt_stream_with(reader, writer, |_header| {
            Ok(envelope.open_for(access_key, private_key)?.key)
        })
    }

    /// Give `grant_to` access to a document the caller can already open.
    ///
    /// The envelope is not touched; only new access keys are committed.
    pub fn grant_access(
        &self,
        account: &AccountContext,
        document_id: &str,
        own_access_key: &EncryptedAccessKey,
        private_key: &PrivateKey,
        grant_to: &[PrincipalId],
    ) -> Result<Vec<EncryptedAccessKey>, SdkError> {
        let recipients = self.resolve_recipients(grant_to)?;
        if recipients.is_empty() {
            return Ok(Vec::new());
        }

        let sealed = KeyEnvelope::new(self.recrypt).reseal(
            own_access_key,
            private_key,
            &recipients,
            account.signing_keys(),
        )?;
        self.directory.commit_access_grant(document_id, &sealed)?;

        tracing::debug!(document = document_id, granted = sealed.len(), "access granted");
        Ok(sealed)
    }

    fn seal_and_commit(
        &self,
        account: &AccountContext,
        document_id: &str,
        seed: &Plaintext,
        grant_to: &[PrincipalId],
    ) -> Result<Vec<EncryptedAccessKey>, SdkError> {
        let own = account.principal();
        let others: Vec<PrincipalId> = grant_to.iter().filter(|p| **p != own).cloned().collect();

        let mut recipients = vec![Recipient {
            principal: own,
            public_key: account.public_key().clone(),
        }];
        recipients.extend(self.resolve_recipients(&others)?);

        let sealed = KeyEnvelope::new(self.recrypt).seal_to_recipients(seed, &recipients, account.signing_keys())?;
        self.directory.commit_access_grant(document_id, &sealed)?;
        Ok(sealed)
    }

    /// Public keys for `ids`, in order. Every id must be known to the directory.
    fn resolve_recipients(&self, ids: &[PrincipalId]) -> Result<Vec<Recipient>, SdkError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found = self.directory.lookup_public_keys(ids)?;

        ids.iter()
            .map(|principal| match found.get(principal) {
                Some(public_key) => Ok(Recipient {
                    principal: principal.clone(),
                    public_key: public_key.clone(),
                }),
                None => Err(SdkError::Directory(DirectoryError::KeyNotFound(principal.clone()))),
            })
            .collect()
    }
}

/// Encoded version-2 header, checked against the account's metadata limit.
fn document_header(account: &AccountContext, document_id: &str, segment_id: u64) -> Result<Vec<u8>, SdkError> {
    let header = encode_document_header(document_id, segment_id)?;
    let len = header.len() - HEADER_PREFIX_V2;
    let max = account.config().max_metadata_len;
    if len > max {
        return Err(SdkError::HeaderParseFailure(HeaderError::MetadataTooLarge { len, max }));
    }
    Ok(header)
}
