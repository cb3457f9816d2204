//! telemetry/mod.rs
//! Per-stream counters, stage timers and immutable snapshots.
//!
//! - Counters are plain fields on the transform; no locks or atomics.
//! - A snapshot is taken once the transform finishes and can be serialized.
//! - Never records key material or plaintext, only sizes and durations.

pub mod counters;
pub mod timers;
pub mod snapshot;

pub use counters::*;
pub use timers::*;
pub use snapshot::*;
