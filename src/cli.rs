//! Command-line interface definitions for Headline Watch.
//!
//! Every option is optional: a bare `headline_watch` run with `DIFFBOT_TOKEN`
//! in the environment (or a `.env` file) does the whole job with built-in
//! defaults. Flags override values from `--config`.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the Headline Watch application.
///
/// # Examples
///
/// ```sh
/// # Defaults, token from the environment
/// DIFFBOT_TOKEN=... headline_watch
///
/// # Only call Diffbot when the headline changed since the last run
/// headline_watch --only-on-change --state-file /var/lib/headline_watch/last_news.json
///
/// # Settings from a YAML file
/// headline_watch -c ./headline_watch.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file
    #[arg(short, long, env = "HEADLINE_WATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// File holding the last-seen headline
    #[arg(short, long, env = "HEADLINE_WATCH_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// News stream page to watch
    #[arg(long, env = "TARGET_URL")]
    pub index_url: Option<String>,

    /// CSS selector of a headline entry on the stream page
    #[arg(long)]
    pub selector: Option<String>,

    /// Diffbot API token
    #[arg(long, env = "DIFFBOT_TOKEN", hide_env_values = true)]
    pub diffbot_token: Option<String>,

    /// Diffbot Analyze endpoint
    #[arg(long, env = "DIFFBOT_API_URL")]
    pub diffbot_url: Option<String>,

    /// Seconds to wait for the stream to render
    #[arg(long)]
    pub render_timeout_secs: Option<u64>,

    /// Seconds before the Diffbot request is abandoned
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Chrome or Chromium binary (auto-detected when omitted)
    #[arg(long, env = "CHROME")]
    pub chrome_executable: Option<PathBuf>,

    /// Skip enrichment when the top headline matches the stored one
    #[arg(long)]
    pub only_on_change: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_no_arguments() {
        let cli = Cli::parse_from(["headline_watch"]);
        assert!(!cli.only_on_change);
        assert!(cli.index_url.is_none());
        assert!(cli.selector.is_none());
    }

    #[test]
    fn test_cli_long_flags() {
        let cli = Cli::parse_from([
            "headline_watch",
            "--state-file",
            "/tmp/state.json",
            "--index-url",
            "https://example.com/stream",
            "--selector",
            ".headline",
            "--render-timeout-secs",
            "5",
            "--only-on-change",
        ]);

        assert_eq!(cli.state_file, Some(PathBuf::from("/tmp/state.json")));
        assert_eq!(cli.index_url.as_deref(), Some("https://example.com/stream"));
        assert_eq!(cli.selector.as_deref(), Some(".headline"));
        assert_eq!(cli.render_timeout_secs, Some(5));
        assert!(cli.only_on_change);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["headline_watch", "-c", "cfg.yaml", "-s", "state.json"]);

        assert_eq!(cli.config, Some(PathBuf::from("cfg.yaml")));
        assert_eq!(cli.state_file, Some(PathBuf::from("state.json")));
    }

    #[test]
    fn test_cli_environment_fallbacks() {
        let command = Cli::command();
        let env_of = |id: &str| {
            command
                .get_arguments()
                .find(|arg| arg.get_id() == id)
                .and_then(|arg| arg.get_env())
                .map(|env| env.to_string_lossy().into_owned())
        };

        assert_eq!(env_of("index_url").as_deref(), Some("TARGET_URL"));
        assert_eq!(env_of("diffbot_url").as_deref(), Some("DIFFBOT_API_URL"));
        assert_eq!(env_of("diffbot_token").as_deref(), Some("DIFFBOT_TOKEN"));
    }
}
