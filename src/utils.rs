//! Small helpers shared across the pipeline.
//!
//! - Log hygiene: truncation of large bodies and redaction of API tokens
//! - Timestamps in the ISO-8601 form written to state and envelopes
//! - Making sure the state file's directory exists before writing

use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{debug, instrument};

static TOKEN_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([?&]token=)[^&#\s]*").expect("static regex"));

/// Current local time as ISO-8601 with offset.
pub fn now_iso8601() -> String {
    Local::now().to_rfc3339()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes, on a char boundary, with an
/// ellipsis and byte count appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Replace the value of any `token=` query parameter with `***`.
pub fn redact_token(url: &str) -> String {
    TOKEN_PARAM.replace_all(url, "${1}***").into_owned()
}

/// Show only the first few characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    format!("{prefix}...")
}

/// Create the parent directory of `path` if it has one and it is missing.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).await?;
            debug!(dir = %parent.display(), "State directory ready");
            Ok(())
        }
        _ => Ok(()),
    }
}
