//! Runtime settings.
//!
//! Resolution order, lowest to highest precedence:
//!
//! 1. Built-in defaults (the Trading Economics US stream, Diffbot Analyze)
//! 2. The optional YAML file given with `--config`
//! 3. Command-line flags and their environment variables
//!
//! The Diffbot token has no default. Resolving without one fails with
//! [`ConfigError::MissingToken`] before any browser or network work starts.
//!
//! # YAML format
//!
//! ```yaml
//! index_url: https://tradingeconomics.com/stream?c=united+states
//! selector: .te-stream-title
//! state_file: /var/lib/headline_watch/last_news.json
//! render_timeout_secs: 20
//! request_timeout_secs: 60
//! user_agent: "Mozilla/5.0 ..."
//! window_width: 1920
//! window_height: 1080
//! only_on_change: true
//! ```

use crate::api::DIFFBOT_ANALYZE_URL;
use crate::cli::Cli;
use crate::error::ConfigError;
use crate::scrapers::chrome::BrowserOptions;
use crate::scrapers::tradingeconomics::{RENDER_TIMEOUT, STREAM_URL, TITLE_SELECTOR};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

pub const DEFAULT_STATE_FILE: &str = "last_news.json";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_WINDOW: (u32, u32) = (1920, 1080);

/// Settings as they appear in the YAML file. Everything is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub index_url: Option<String>,
    pub selector: Option<String>,
    pub state_file: Option<PathBuf>,
    pub diffbot_url: Option<String>,
    pub diffbot_token: Option<String>,
    pub render_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub window_width: Option<u32>,
    pub window_height: Option<u32>,
    pub chrome_executable: Option<PathBuf>,
    pub only_on_change: Option<bool>,
}

impl FileSettings {
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: FileSettings =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(?settings.state_file, "Loaded settings file");
        Ok(settings)
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub index_url: Url,
    pub selector: String,
    pub state_file: PathBuf,
    pub diffbot_url: Url,
    pub diffbot_token: String,
    pub render_timeout: Duration,
    pub request_timeout: Duration,
    pub browser: BrowserOptions,
    pub only_on_change: bool,
}

impl Settings {
    /// Resolve settings from the command line and, if given, its config file.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileSettings::load(path)?,
            None => FileSettings::default(),
        };
        Self::merge(cli, file)
    }

    fn merge(cli: &Cli, file: FileSettings) -> Result<Self, ConfigError> {
        let diffbot_token = cli
            .diffbot_token
            .clone()
            .or(file.diffbot_token)
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let index_url = parse_url(
            "index",
            cli.index_url.clone().or(file.index_url).as_deref().unwrap_or(STREAM_URL),
        )?;
        let diffbot_url = parse_url(
            "diffbot",
            cli.diffbot_url
                .clone()
                .or(file.diffbot_url)
                .as_deref()
                .unwrap_or(DIFFBOT_ANALYZE_URL),
        )?;

        let render_timeout = seconds(
            "render_timeout_secs",
            cli.render_timeout_secs.or(file.render_timeout_secs),
            RENDER_TIMEOUT,
        )?;
        let request_timeout = seconds(
            "request_timeout_secs",
            cli.request_timeout_secs.or(file.request_timeout_secs),
            DEFAULT_REQUEST_TIMEOUT,
        )?;

        Ok(Self {
            index_url,
            selector: cli
                .selector
                .clone()
                .or(file.selector)
                .unwrap_or_else(|| TITLE_SELECTOR.to_string()),
            state_file: cli
                .state_file
                .clone()
                .or(file.state_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE)),
            diffbot_url,
            diffbot_token,
            render_timeout,
            request_timeout,
            browser: BrowserOptions {
                user_agent: file
                    .user_agent
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
                window_width: file.window_width.unwrap_or(DEFAULT_WINDOW.0),
                window_height: file.window_height.unwrap_or(DEFAULT_WINDOW.1),
                executable: cli.chrome_executable.clone().or(file.chrome_executable),
            },
            only_on_change: cli.only_on_change || file.only_on_change.unwrap_or(false),
        })
    }
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        source,
    })
}

fn seconds(
    field: &'static str,
    value: Option<u64>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(0) => Err(ConfigError::ZeroTimeout { field }),
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Ok(default),
    }
}
