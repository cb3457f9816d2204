use std::io;

use thiserror::Error;

use crate::{
    crypto::CryptoError,
    headers::HeaderError,
    keys::capability::{CapabilityError, DirectoryError},
};

/// Unified error surfaced by every public operation.
/// - Lower-level `HeaderError` / `CryptoError` values travel as the `source`.
/// - `DecryptFailure` never says whether the key or the tag was wrong.
/// - `From<T>` impls enable `?` across layers.
#[derive(Debug, Error)]
pub enum SdkError {
    /// Leading byte is neither a legacy nor a metadata envelope.
    #[error("unsupported envelope version: {version}")]
    UnsupportedVersion { version: u8 },

    /// Metadata block is truncated, oversized, or not valid JSON.
    #[error("header parse failure")]
    HeaderParseFailure(#[source] HeaderError),

    #[error("encrypt failure")]
    EncryptFailure(#[source] CryptoError),

    /// Bad key, bad tag or malformed ciphertext.
    #[error("decrypt failure")]
    DecryptFailure(#[source] CryptoError),

    /// Password-unwrap path only.
    #[error("incorrect password")]
    IncorrectPassword,

    /// Stream ended (or errored) before a complete IV or trailing window was seen.
    #[error("corrupted or truncated stream: {0}")]
    CorruptedOrTruncatedStream(&'static str),

    /// Key rotation produced two consecutive degenerate results.
    #[error("rotation failure: {0}")]
    RotationFailure(String),

    #[error("reencryption capability error")]
    Capability(#[from] CapabilityError),

    #[error("directory error")]
    Directory(#[from] DirectoryError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<HeaderError> for SdkError {
    fn from(e: HeaderError) -> Self {
        match e {
            HeaderError::UnsupportedVersion { raw } => SdkError::UnsupportedVersion { version: raw },
            other => SdkError::HeaderParseFailure(other),
        }
    }
}

impl SdkError {
    /// True for the two kinds a caller may see when data was tampered with.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            SdkError::DecryptFailure(_) | SdkError::CorruptedOrTruncatedStream(_)
        )
    }
}
