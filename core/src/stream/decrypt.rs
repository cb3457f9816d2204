//! stream/decrypt.rs
//! Chunked envelope decryption.
//!
//! Design notes:
//! - The header is stripped first, then a possibly split 12-byte IV is
//!   assembled, then ciphertext is decrypted as it arrives.
//! - The last `BLOCK_LEN + TAG_LEN` bytes are always held back: the tag is
//!   only known once the input ends and must never reach the decipher.
//! - The final block's plaintext is released only after the tag verifies.
//! - Any error poisons the transform; later calls fail without output.

use crate::crypto::{
    CryptoError, DocumentKey, GcmStream, NONCE_LEN_12, TAG_LEN, TRAILING_WINDOW_LEN,
};
use crate::headers::{DocumentHeader, HeaderParser, HeaderProgress};
use crate::stream::types::DecryptState;
use crate::telemetry::{Stage, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::types::SdkError;

enum Phase {
    AwaitingHeader(HeaderParser),
    AwaitingIv(Vec<u8>),
    Streaming { gcm: GcmStream, window: Vec<u8> },
    Finished,
    Failed,
}

pub struct DecryptStream {
    phase: Phase,
    key: DocumentKey,
    header: Option<DocumentHeader>,
    counters: TelemetryCounters,
    timer: TelemetryTimer,
}

impl DecryptStream {
    /// Transform that expects the envelope header at the front of the input.
    pub fn new(key: DocumentKey) -> Self {
        Self {
            phase: Phase::AwaitingHeader(HeaderParser::new()),
            key,
            header: None,
            counters: TelemetryCounters::default(),
            timer: TelemetryTimer::new(),
        }
    }

    /// Transform for input whose header the caller already consumed.
    pub fn with_header(header: DocumentHeader, key: DocumentKey) -> Self {
        let mut stream = Self::new(key);
        stream.counters.add_header(header.encoded_len(), 0);
        stream.header = Some(header);
        stream.phase = Phase::AwaitingIv(Vec::with_capacity(NONCE_LEN_12));
        stream
    }

    pub fn state(&self) -> DecryptState {
        match self.phase {
            Phase::AwaitingHeader(_) => DecryptState::AwaitingHeader,
            Phase::AwaitingIv(_) => DecryptState::AwaitingIv,
            Phase::Streaming { .. } => DecryptState::Streaming,
            Phase::Finished => DecryptState::Finished,
            Phase::Failed => DecryptState::Failed,
        }
    }

    /// Parsed header, once it has been seen.
    pub fn header(&self) -> Option<&DocumentHeader> {
        self.header.as_ref()
    }

    /// Bytes currently held back (never more than the trailing window).
    pub fn buffered_len(&self) -> usize {
        match &self.phase {
            Phase::AwaitingIv(iv) => iv.len(),
            Phase::Streaming { window, .. } => window.len(),
            _ => 0,
        }
    }

    /// Feed the next chunk; returns plaintext that is ready to be released.
    pub fn update(&mut self, chunk: &[u8]) -> Result<Vec<u8>, SdkError> {
        self.counters.add_input(chunk.len());
        match self.process(chunk) {
            Ok(out) => {
                self.counters.add_output(out.len());
                Ok(out)
            }
            Err(e) => {
                self.phase = Phase::Failed;
                Err(e)
            }
        }
    }

    /// End of input: checks the trailing window, verifies the tag and releases
    /// the last block.
    pub fn finish(&mut self) -> Result<Vec<u8>, SdkError> {
        let phase = std::mem::replace(&mut self.phase, Phase::Failed);

        let (mut gcm, window) = match phase {
            Phase::Streaming { gcm, window } => (gcm, window),
            Phase::AwaitingHeader(_) => {
                return Err(SdkError::CorruptedOrTruncatedStream("stream ended inside the header"))
            }
            Phase::AwaitingIv(_) => {
                return Err(SdkError::CorruptedOrTruncatedStream("stream ended before the IV was complete"))
            }
            Phase::Finished | Phase::Failed => return Err(no_longer_accepting()),
        };

        if window.len() < TAG_LEN {
            return Err(SdkError::CorruptedOrTruncatedStream("stream ended before the authentication tag"));
        }
        let full_window = window.len() == TRAILING_WINDOW_LEN;
        let (last_block, tag) = window.split_at(window.len() - TAG_LEN);

        let timer = &mut self.timer;
        let last_plain = timer
            .time(Stage::Decrypt, || gcm.decrypt_update(last_block))
            .map_err(SdkError::DecryptFailure)?;

        match timer.time(Stage::Finalize, || gcm.verify_tag(tag)) {
            Ok(()) => {}
            Err(CryptoError::TagMismatch) if !full_window => {
                tracing::warn!(window = window.len(), "short stream failed authentication");
                return Err(SdkError::CorruptedOrTruncatedStream("stream too short to authenticate"));
            }
            Err(e) => {
                tracing::warn!("stream failed authentication");
                return Err(SdkError::DecryptFailure(e));
            }
        }

        self.counters.add_cipher_bytes(last_plain.len(), last_block.len());
        self.counters.add_tag(TAG_LEN);
        self.counters.add_output(last_plain.len());
        self.phase = Phase::Finished;
        self.timer.finish();

        tracing::debug!(
            plaintext = self.counters.bytes_plaintext,
            chunks = self.counters.chunks_in,
            "decrypt stream finished"
        );
        Ok(last_plain)
    }

    /// Upstream failed or closed early: skip the flush and fail the stream.
    pub fn abort(&mut self) -> SdkError {
        self.phase = Phase::Failed;
        SdkError::CorruptedOrTruncatedStream("input ended abnormally")
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot::from(&self.counters, &self.timer)
    }

    fn process(&mut self, mut input: &[u8]) -> Result<Vec<u8>, SdkError> {
        let mut out = Vec::new();

        loop {
            match &mut self.phase {
                Phase::AwaitingHeader(parser) => {
                    let progress = self.timer.time(Stage::Header, || parser.feed(input))?;
                    match progress {
                        HeaderProgress::NeedMore => return Ok(out),
                        HeaderProgress::Complete { header, consumed } => {
                            tracing::debug!(version = header.version(), "stream header parsed");
                            self.counters.add_header(header.encoded_len(), 0);
                            self.header = Some(header);
                            input = &input[consumed..];
                            self.phase = Phase::AwaitingIv(Vec::with_capacity(NONCE_LEN_12));
                        }
                    }
                }

                Phase::AwaitingIv(iv) => {
                    let take = (NONCE_LEN_12 - iv.len()).min(input.len());
                    iv.extend_from_slice(&input[..take]);
                    input = &input[take..];
                    if iv.len() < NONCE_LEN_12 {
                        return Ok(out);
                    }

                    let mut iv_bytes = [0u8; NONCE_LEN_12];
                    iv_bytes.copy_from_slice(iv);
                    let gcm = GcmStream::new(self.key.as_bytes(), &iv_bytes)
                        .map_err(SdkError::DecryptFailure)?;
                    self.counters.add_header(0, NONCE_LEN_12);
                    self.phase = Phase::Streaming {
                        gcm,
                        window: Vec::with_capacity(TRAILING_WINDOW_LEN),
                    };
                }

                Phase::Streaming { gcm, window } => {
                    let total = window.len() + input.len();
                    if total <= TRAILING_WINDOW_LEN {
                        window.extend_from_slice(input);
                        return Ok(out);
                    }

                    // Release everything in front of the last TRAILING_WINDOW_LEN bytes.
                    let release = total - TRAILING_WINDOW_LEN;
                    let from_window = release.min(window.len());
                    let from_input = release - from_window;

                    let timer = &mut self.timer;
                    let plain = timer.time(Stage::Decrypt, || -> Result<Vec<u8>, CryptoError> {
                        let mut plain = gcm.decrypt_update(&window[..from_window])?;
                        plain.extend(gcm.decrypt_update(&input[..from_input])?);
                        Ok(plain)
                    });
                    let plain = plain.map_err(SdkError::DecryptFailure)?;

                    window.drain(..from_window);
                    window.extend_from_slice(&input[from_input..]);
                    debug_assert_eq!(window.len(), TRAILING_WINDOW_LEN);

                    self.counters.add_cipher_bytes(plain.len(), release);
                    out.extend_from_slice(&plain);
                    return Ok(out);
                }

                Phase::Finished | Phase::Failed => return Err(no_longer_accepting()),
            }
        }
    }
}

fn no_longer_accepting() -> SdkError {
    SdkError::CorruptedOrTruncatedStream("stream is no longer accepting input")
}
