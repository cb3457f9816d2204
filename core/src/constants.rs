//! Wire-format and key-schedule constants shared by every layer.

/// Legacy envelope: version byte only, no metadata block.
pub const VERSION_LEGACY: u8 = 1;
/// Current envelope: version byte followed by a length-prefixed JSON block.
pub const VERSION_METADATA: u8 = 2;

/// Width of the big-endian metadata length prefix (version 2).
pub const HEADER_LEN_PREFIX: usize = 2;
/// Bytes needed before the metadata length is known: version + prefix.
pub const HEADER_PREFIX_V2: usize = 1 + HEADER_LEN_PREFIX;

/// Defaults when a config value is not provided.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 250_000;
/// Anything below this is only acceptable in test configs.
pub const MIN_PRODUCTION_PBKDF2_ITERATIONS: u32 = 100_000;
/// Metadata JSON must fit the u16 length prefix.
pub const MAX_METADATA_LEN: usize = u16::MAX as usize;

/// Salt used by password-based key wrapping.
pub const PBKDF2_SALT_LEN: usize = 32;

/// Read size used by the stream I/O adapters.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024; // 64 KB
