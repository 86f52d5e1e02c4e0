//! # Headline Watch
//!
//! Watches the Trading Economics news stream for its top headline, enriches
//! the story through the Diffbot Analyze API, and prints one JSON envelope
//! describing the result.
//!
//! ## Usage
//!
//! ```sh
//! DIFFBOT_TOKEN=... headline_watch
//! headline_watch --only-on-change --state-file ./state/last_news.json
//! ```
//!
//! ## Architecture
//!
//! A run is strictly sequential:
//! 1. **Startup**: load `.env`, parse flags, resolve [`config::Settings`]
//!    (fails fast without a token)
//! 2. **Fetch**: render the stream in headless Chrome and read the first
//!    `.te-stream-title`
//! 3. **Compare**: classify the headline against the stored state
//! 4. **Enrich**: one Diffbot call, first object normalized to an article
//! 5. **Output**: one envelope on stdout; state saved only on success
//!
//! Logs go to stderr. Exit status is 0 for a success envelope, 1 for a
//! failure envelope, 2 for a configuration error.

use clap::Parser;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod state;
mod utils;

use api::DiffbotClient;
use cli::Cli;
use config::Settings;
use models::ResultEnvelope;
use outputs::json::write_envelope;
use pipeline::{Monitor, run_guarded};
use scrapers::chrome::ChromeRenderer;
use scrapers::tradingeconomics::PageFetcher;
use state::StateStore;
use utils::mask_secret;

const CONFIG_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Before tracing and clap, so RUST_LOG and DIFFBOT_TOKEN may live in .env
    let dotenv = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("headline_watch starting up");

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Failed to load .env; continuing with process environment"),
    }

    let args = Cli::parse();
    debug!(?args.config, ?args.state_file, args.only_on_change, "Parsed CLI arguments");

    let settings = match Settings::resolve(&args) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            emit(&ResultEnvelope::failure(e.to_string()));
            return ExitCode::from(CONFIG_ERROR);
        }
    };
    info!(
        token = %mask_secret(&settings.diffbot_token),
        index_url = %settings.index_url,
        state_file = %settings.state_file.display(),
        "Loaded configuration"
    );

    let envelope = run(settings).await;
    let emitted = emit(&envelope);
    let code = if envelope.is_success() && emitted {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        success = envelope.is_success(),
        "Execution complete"
    );
    code
}

/// Build the pipeline and run it on its own task, so that a panic anywhere
/// inside still produces an envelope.
async fn run(settings: Settings) -> ResultEnvelope {
    let enricher = match DiffbotClient::new(
        settings.diffbot_url.clone(),
        settings.diffbot_token.clone(),
        settings.request_timeout,
    ) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client");
            return ResultEnvelope::failure(e.to_string());
        }
    };

    let fetcher = PageFetcher::new(
        ChromeRenderer::new(settings.browser.clone()),
        settings.index_url.clone(),
        settings.selector.clone(),
        settings.render_timeout,
    );
    let monitor = Monitor::new(
        fetcher,
        enricher,
        StateStore::new(settings.state_file.clone()),
        settings.only_on_change,
    );

    run_guarded(async move { monitor.run().await }).await
}

/// Write the envelope to stdout. Returns `false` if that failed.
fn emit(envelope: &ResultEnvelope) -> bool {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match write_envelope(&mut out, envelope) {
        Ok(()) => true,
        Err(e) => {
            error!(error = %e, "Failed to write result envelope");
            false
        }
    }
}
