//! Typed errors for each stage of a run.
//!
//! Every component returns its own error enum so the orchestrator can tell
//! "nothing to report" apart from "something broke" and pick the matching
//! envelope. None of these ever abort the process except [`ConfigError`],
//! which is raised before any work begins.

use std::path::PathBuf;
use std::time::Duration;

/// Startup failures. These are the only fatal errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DIFFBOT_TOKEN not found in environment variables")]
    MissingToken,

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid {field} url '{value}': {source}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },
}

/// Failures while rendering the index page and reading its top item.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("no element matched '{selector}' within {timeout:?}")]
    Timeout { selector: String, timeout: Duration },

    #[error("no element matched '{selector}'")]
    NoMatch { selector: String },

    #[error("top item is missing its {0}")]
    Incomplete(&'static str),

    #[error("browser error: {0}")]
    Browser(String),
}

/// Failures reading or writing the last-seen state file.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("state file {path} i/o error: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures calling or interpreting the analysis API.
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("analysis request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("analysis API returned HTTP {status}")]
    Status { status: u16, body: String },

    #[error("failed to read analysis response body (HTTP {status}): {source}")]
    Body {
        status: u16,
        #[source]
        source: reqwest::Error,
    },

    #[error("analysis response is not valid JSON: {source}")]
    Parse {
        status: u16,
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("analysis API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("no article data in analysis response")]
    NoArticleData,
}

/// A fault that escaped the orchestrated sequence.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("run task panicked: {0}")]
    Panicked(String),

    #[error("run task was cancelled")]
    Cancelled,

    #[error("failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write envelope: {0}")]
    Output(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token_message() {
        assert_eq!(
            ConfigError::MissingToken.to_string(),
            "DIFFBOT_TOKEN not found in environment variables"
        );
    }

    #[test]
    fn test_timeout_display_names_selector() {
        let err = FetchError::Timeout {
            selector: ".te-stream-title".to_string(),
            timeout: Duration::from_secs(20),
        };
        assert_eq!(err.to_string(), "no element matched '.te-stream-title' within 20s");
    }

    #[test]
    fn test_status_error_hides_body_in_display() {
        let err = EnrichError::Status {
            status: 401,
            body: "secret body".to_string(),
        };
        assert_eq!(err.to_string(), "analysis API returned HTTP 401");
    }
}
