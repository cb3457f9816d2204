//! headers/types.rs
//! Document header value type, metadata JSON shape and header errors.
//!
//! Wire layout (all integers big-endian):
//! - version 1: `[1]`
//! - version 2: `[2][u16 len][len bytes of JSON]`
//!
//! The metadata block is kept as raw bytes. Codecs only need its length to
//! find the IV; callers that need the document id parse it on demand.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{HEADER_PREFIX_V2, MAX_METADATA_LEN, VERSION_LEGACY, VERSION_METADATA};

/// Identifiers carried in the version-2 metadata block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(rename = "_did_")]
    pub document_id: String,

    #[serde(rename = "_sid_")]
    pub segment_id: u64,

    /// Unknown fields survive a decode/encode cycle.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DocumentMetadata {
    pub fn new(document_id: impl Into<String>, segment_id: u64) -> Self {
        Self {
            document_id: document_id.into(),
            segment_id,
            extra: serde_json::Map::new(),
        }
    }
}

/// Parsed envelope header. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentHeader {
    version: u8,
    metadata: Option<Vec<u8>>,
}

impl DocumentHeader {
    /// Version-1 header: no metadata block.
    pub fn legacy() -> Self {
        Self { version: VERSION_LEGACY, metadata: None }
    }

    /// Version-2 header built from typed metadata.
    pub fn with_metadata(metadata: &DocumentMetadata) -> Result<Self, HeaderError> {
        let json = serde_json::to_vec(metadata).map_err(HeaderError::InvalidJson)?;
        Self::from_raw_metadata(json)
    }

    /// Version-2 header around already-encoded metadata bytes.
    pub fn from_raw_metadata(metadata: Vec<u8>) -> Result<Self, HeaderError> {
        if metadata.len() > MAX_METADATA_LEN {
            return Err(HeaderError::MetadataTooLarge {
                len: metadata.len(),
                max: MAX_METADATA_LEN,
            });
        }
        Ok(Self { version: VERSION_METADATA, metadata: Some(metadata) })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Raw metadata JSON bytes (version 2 only).
    pub fn raw_metadata(&self) -> Option<&[u8]> {
        self.metadata.as_deref()
    }

    /// Total bytes this header occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        match &self.metadata {
            None => 1,
            Some(m) => HEADER_PREFIX_V2 + m.len(),
        }
    }

    /// Parse the metadata JSON. `Ok(None)` for legacy headers.
    pub fn metadata(&self) -> Result<Option<DocumentMetadata>, HeaderError> {
        match &self.metadata {
            None => Ok(None),
            Some(raw) => serde_json::from_slice(raw)
                .map(Some)
                .map_err(HeaderError::InvalidJson),
        }
    }
}

impl fmt::Debug for DocumentHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentHeader")
            .field("version", &self.version)
            .field("metadata", &self.metadata.as_deref().map(fmt_bytes))
            .finish()
    }
}

/// Printable rendering of header bytes: text when it is text, hex otherwise.
pub fn fmt_bytes(b: &[u8]) -> String {
    if b.iter().all(|&c| c.is_ascii_graphic() || c == b' ') {
        format!("b\"{}\"", String::from_utf8_lossy(b))
    } else {
        format!("0x{}", hex::encode(b))
    }
}

#[derive(Debug, Error)]
pub enum HeaderError {
    /// Leading byte is not a known envelope version.
    #[error("unsupported envelope version: 0x{raw:02x}")]
    UnsupportedVersion { raw: u8 },

    /// Buffer ends before the declared header does.
    #[error("header buffer too short: {have} < {need}")]
    BufferTooShort { have: usize, need: usize },

    /// Metadata does not fit the u16 length prefix (or the configured cap).
    #[error("metadata too large: {len} > {max}")]
    MetadataTooLarge { len: usize, max: usize },

    /// Bytes found after a header that was supposed to stand alone.
    #[error("unexpected {extra} bytes after header")]
    TrailingBytes { extra: usize },

    #[error("metadata is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
}
