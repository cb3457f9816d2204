//! docseal-core
//!
//! Document envelope codec, streaming AES-256-GCM, multi-recipient key
//! envelopes and key rotation. Synchronous; the reencryption primitive and the
//! key directory are injected as traits.

#![forbid(unsafe_code)]

// Shared and top level
pub mod config;
pub mod constants;
pub mod types;

// Codec
pub mod headers;
pub mod crypto;
pub mod telemetry;

// Stream layer
pub mod stream;

// Key management
pub mod keys;
pub mod document;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::config::SdkConfig;
    pub use crate::crypto::{block_decrypt, block_encrypt, DocumentKey, WrappedMasterKey};
    pub use crate::document::{DecryptedDocument, DocumentService, EncryptedDocument};
    pub use crate::headers::{encode_document_header, DocumentHeader, DocumentMetadata};
    pub use crate::keys::{
        AccountContext, AsymmetricReencryption, Directory, EncryptedAccessKey, GroupKeyState,
        KeyEnvelope, PrincipalId, RotationProtocol,
    };
    pub use crate::stream::{DecryptStream, EncryptStream};
    pub use crate::types::SdkError;
}
