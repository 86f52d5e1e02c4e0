//! JSON envelope output.
//!
//! Stdout carries exactly one compact JSON object per run, followed by a
//! newline, so it can be piped straight into `jq` or a webhook. Logs never
//! go here.

use crate::error::RunError;
use crate::models::ResultEnvelope;
use std::io::Write;
use tracing::{debug, instrument};

/// Serialize `envelope` onto `out` as a single line and flush.
#[instrument(level = "debug", skip_all, fields(success = envelope.is_success()))]
pub fn write_envelope<W: Write>(out: &mut W, envelope: &ResultEnvelope) -> Result<(), RunError> {
    let json = serde_json::to_string(envelope)?;
    writeln!(out, "{json}")?;
    out.flush()?;
    debug!(bytes = json.len(), "Wrote result envelope");
    Ok(())
}
