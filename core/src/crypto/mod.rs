pub mod types;
pub mod aead;
pub mod gcm;
pub mod kdf;
pub mod keywrap;
pub mod nonce;

pub use types::*;
pub use aead::*;
pub use gcm::*;
pub use kdf::*;
pub use keywrap::{WrappedMasterKey, WRAPPED_OVERHEAD};
pub use nonce::*;
