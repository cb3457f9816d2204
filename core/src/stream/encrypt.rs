//! stream/encrypt.rs
//! Chunked envelope encryption.
//!
//! Output of one stream, concatenated: `header ‖ iv ‖ ciphertext ‖ tag`,
//! byte-identical to `block_encrypt_with_iv` for the same inputs no matter how
//! the plaintext was split.

use crate::crypto::{random_iv, CryptoError, DocumentKey, GcmStream, NONCE_LEN_12, TAG_LEN};
use crate::headers::{decode_header, HeaderError};
use crate::stream::types::EncryptState;
use crate::telemetry::{Stage, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::types::SdkError;

pub struct EncryptStream {
    state: EncryptState,
    /// `header ‖ iv`, emitted once.
    prefix: Vec<u8>,
    header_len: usize,
    gcm: Option<GcmStream>,
    counters: TelemetryCounters,
    timer: TelemetryTimer,
}

impl EncryptStream {
    /// New transform with a random IV. `header` must be a complete envelope header.
    pub fn new(header: &[u8], key: &DocumentKey) -> Result<Self, SdkError> {
        Self::with_iv(header, key, random_iv())
    }

    /// New transform with a caller-chosen IV.
    pub fn with_iv(header: &[u8], key: &DocumentKey, iv: [u8; NONCE_LEN_12]) -> Result<Self, SdkError> {
        let (_, rest) = decode_header(header)?;
        if !rest.is_empty() {
            return Err(SdkError::HeaderParseFailure(HeaderError::TrailingBytes { extra: rest.len() }));
        }

        let gcm = GcmStream::new(key.as_bytes(), &iv).map_err(SdkError::EncryptFailure)?;

        let mut prefix = Vec::with_capacity(header.len() + NONCE_LEN_12);
        prefix.extend_from_slice(header);
        prefix.extend_from_slice(&iv);

        Ok(Self {
            state: EncryptState::NotStarted,
            prefix,
            header_len: header.len(),
            gcm: Some(gcm),
            counters: TelemetryCounters::default(),
            timer: TelemetryTimer::new(),
        })
    }

    pub fn state(&self) -> EncryptState {
        self.state
    }

    /// Encrypt the next chunk; returns bytes ready to be written downstream.
    pub fn update(&mut self, chunk: &[u8]) -> Result<Vec<u8>, SdkError> {
        self.counters.add_input(chunk.len());
        let mut out = self.take_prefix()?;

        if !chunk.is_empty() {
            let gcm = self.gcm.as_mut().ok_or_else(finished_error)?;
            match self.timer.time(Stage::Encrypt, || gcm.encrypt_update(chunk)) {
                Ok(ciphertext) => {
                    self.counters.add_cipher_bytes(chunk.len(), ciphertext.len());
                    out.extend_from_slice(&ciphertext);
                }
                Err(e) => {
                    self.state = EncryptState::Failed;
                    return Err(SdkError::EncryptFailure(e));
                }
            }
        }

        self.counters.add_output(out.len());
        Ok(out)
    }

    /// End of input: emits the prefix if nothing was written yet, then the tag.
    pub fn finish(&mut self) -> Result<Vec<u8>, SdkError> {
        let mut out = self.take_prefix()?;

        let gcm = self.gcm.take().ok_or_else(finished_error)?;
        let tag = self.timer.time(Stage::Finalize, || gcm.finalize_tag());
        out.extend_from_slice(&tag);

        self.counters.add_tag(TAG_LEN);
        self.counters.add_output(out.len());
        self.state = EncryptState::Finished;
        self.timer.finish();

        tracing::debug!(
            plaintext = self.counters.bytes_plaintext,
            chunks = self.counters.chunks_in,
            "encrypt stream finished"
        );
        Ok(out)
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot::from(&self.counters, &self.timer)
    }

    /// `NotStarted → Streaming`, handing back `header ‖ iv` exactly once.
    fn take_prefix(&mut self) -> Result<Vec<u8>, SdkError> {
        match self.state {
            EncryptState::NotStarted => {
                self.state = EncryptState::Streaming;
                self.counters.add_header(self.header_len, NONCE_LEN_12);
                Ok(std::mem::take(&mut self.prefix))
            }
            EncryptState::Streaming => Ok(Vec::new()),
            EncryptState::Finished | EncryptState::Failed => Err(finished_error()),
        }
    }
}

fn finished_error() -> SdkError {
    SdkError::EncryptFailure(CryptoError::Failure("stream is no longer accepting input".into()))
}
