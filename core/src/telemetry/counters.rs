//! telemetry/counters.rs
//! Mutable counters used by the streaming transforms.
//!
//! Summary: Collects chunk counts and byte counts during encrypt/decrypt.
//! Converted into an immutable `TelemetrySnapshot` when the stream finishes.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

/// Deterministic counters collected during stream processing.
#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryCounters {
    pub chunks_in: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub bytes_plaintext: u64,
    pub bytes_ciphertext: u64,
    /// Header, IV and tag bytes.
    pub bytes_overhead: u64,
}

impl TelemetryCounters {
    /// Record one chunk handed to a transform.
    pub fn add_input(&mut self, len: usize) {
        self.chunks_in += 1;
        self.bytes_in += len as u64;
    }

    /// Record bytes handed back to the caller.
    pub fn add_output(&mut self, len: usize) {
        self.bytes_out += len as u64;
    }

    /// Record the envelope header and IV as overhead.
    pub fn add_header(&mut self, header_len: usize, iv_len: usize) {
        self.bytes_overhead += (header_len + iv_len) as u64;
    }

    /// Record the trailing tag as overhead.
    pub fn add_tag(&mut self, tag_len: usize) {
        self.bytes_overhead += tag_len as u64;
    }

    /// Record plaintext/ciphertext bytes that passed through the cipher.
    pub fn add_cipher_bytes(&mut self, plaintext_len: usize, ciphertext_len: usize) {
        self.bytes_plaintext += plaintext_len as u64;
        self.bytes_ciphertext += ciphertext_len as u64;
    }

    pub fn merge(&mut self, other: &TelemetryCounters) {
        self.chunks_in += other.chunks_in;
        self.bytes_in += other.bytes_in;
        self.bytes_out += other.bytes_out;
        self.bytes_plaintext += other.bytes_plaintext;
        self.bytes_ciphertext += other.bytes_ciphertext;
        self.bytes_overhead += other.bytes_overhead;
    }
}

impl AddAssign for TelemetryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}
