//! Engine configuration management.
//!
//! Configuration is plain data passed into the engine at construction; there
//! is no process-wide configuration state.

pub mod engine;

pub use engine::{EngineConfig, DEFAULT_MIN_BAND_WIDTH_PCT, DEFAULT_POLL_INTERVAL_MS};
