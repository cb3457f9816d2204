//! headers/mod.rs
//! Envelope header: version byte plus optional length-prefixed JSON metadata.
//!
//! - Version 1 is the legacy layout with no metadata.
//! - Version 2 carries `{_did_, _sid_}` so a reader can find the document's
//!   access key before it sees any ciphertext.

pub mod types;
pub mod encode;
pub mod decode;

pub use types::*;
pub use encode::*;
pub use decode::*;
