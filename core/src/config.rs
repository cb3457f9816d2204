//! config.rs
//! Runtime configuration for the codec and key-management layers.
//!
//! Design notes:
//! - `Default` carries production values; tests opt into `for_tests()`.
//! - Deserializable so embedders can load it from their own config files.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PBKDF2_ITERATIONS, MAX_METADATA_LEN, MIN_PRODUCTION_PBKDF2_ITERATIONS};
use crate::types::SdkError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// PBKDF2-HMAC-SHA256 rounds used when wrapping a master key.
    pub pbkdf2_iterations: u32,

    /// Upper bound for the encoded metadata JSON (never above u16::MAX).
    pub max_metadata_len: usize,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
            max_metadata_len: MAX_METADATA_LEN,
        }
    }
}

impl SdkConfig {
    /// Cheap key derivation so password tests finish quickly.
    pub fn for_tests() -> Self {
        Self {
            pbkdf2_iterations: 1_000,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), SdkError> {
        if self.pbkdf2_iterations == 0 {
            return Err(SdkError::Config("pbkdf2_iterations must be non-zero".into()));
        }
        if self.max_metadata_len == 0 || self.max_metadata_len > MAX_METADATA_LEN {
            return Err(SdkError::Config(format!(
                "max_metadata_len must be in 1..={}, got {}",
                MAX_METADATA_LEN, self.max_metadata_len
            )));
        }
        if self.pbkdf2_iterations < MIN_PRODUCTION_PBKDF2_ITERATIONS {
            tracing::warn!(
                iterations = self.pbkdf2_iterations,
                "pbkdf2 iteration count is below the production minimum"
            );
        }
        Ok(())
    }
}
