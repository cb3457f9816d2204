//! src/headers/encode.rs
//!
//! Header encoding utilities.
//!
//! Design notes:
//! - Version byte first, then (version 2) a big-endian u16 length and the JSON.
//! - Length limits are enforced when the `DocumentHeader` is built, so encoding
//!   itself cannot fail.

use crate::headers::types::{DocumentHeader, DocumentMetadata, HeaderError};

/// Serialize a header into its wire bytes.
pub fn encode_header(h: &DocumentHeader) -> Vec<u8> {
    let mut out = Vec::with_capacity(h.encoded_len());
    out.push(h.version());

    if let Some(meta) = h.raw_metadata() {
        // Checked against MAX_METADATA_LEN in DocumentHeader::from_raw_metadata.
        let len = meta.len() as u16;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(meta);
    }

    debug_assert_eq!(out.len(), h.encoded_len(), "encoding wrote incorrect length");
    out
}

/// Build and encode a version-2 header carrying `{_did_, _sid_}`.
pub fn encode_document_header(document_id: &str, segment_id: u64) -> Result<Vec<u8>, HeaderError> {
    let header = DocumentHeader::with_metadata(&DocumentMetadata::new(document_id, segment_id))?;
    Ok(encode_header(&header))
}
