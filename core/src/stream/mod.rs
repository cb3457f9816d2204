//! stream: chunked envelope encryption/decryption.
//!
//! Both transforms are single-pass state machines fed in order by one caller.
//! Separate instances share nothing and may run on separate threads.

pub mod types;
pub mod encrypt;
pub mod decrypt;
pub mod io;

pub use types::{DecryptState, EncryptState};
pub use encrypt::EncryptStream;
pub use decrypt::DecryptStream;
pub use io::{decrypt_stream, decrypt_stream_with, encrypt_stream, read_document_header};
