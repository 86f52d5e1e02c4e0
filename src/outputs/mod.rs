//! Output generation.
//!
//! # Submodules
//!
//! - [`json`]: Writes the run's `ResultEnvelope` to stdout
//!
//! Human-readable progress goes through `tracing` to stderr; only the
//! envelope is written to stdout.

pub mod json;
