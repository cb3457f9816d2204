//! stream/types.rs
//! Observable states of the two streaming transforms.

/// Encrypt side: the `header ‖ iv` prefix is emitted on the first input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptState {
    NotStarted,
    Streaming,
    Finished,
    Failed,
}

/// Decrypt side: header, then IV, then ciphertext behind a trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptState {
    AwaitingHeader,
    AwaitingIv,
    Streaming,
    Finished,
    Failed,
}
