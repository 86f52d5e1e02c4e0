//! Headless Chrome renderer.
//!
//! Launches a fresh browser per call through `chromiumoxide`, navigates,
//! polls for the selector, serializes the DOM and tears everything down.

use crate::error::FetchError;
use crate::scrapers::render::{ExtractedItem, PageRenderer, extract_first_item};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout as with_timeout};
use tracing::{debug, info, instrument, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Launch options for the headless browser.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Sent on every request to look like a desktop browser.
    pub user_agent: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Chrome binary; auto-detected when `None`.
    pub executable: Option<PathBuf>,
}

/// [`PageRenderer`] backed by a real headless Chrome.
///
/// Each call launches its own browser and shuts it down again before
/// returning, whatever the outcome. Nothing is shared between calls.
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    options: BrowserOptions,
}

impl ChromeRenderer {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }

    fn browser_config(&self) -> Result<BrowserConfig, FetchError> {
        let opts = &self.options;
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(opts.window_width, opts.window_height)
            .viewport(Viewport {
                width: opts.window_width,
                height: opts.window_height,
                ..Default::default()
            })
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", opts.user_agent));
        if let Some(path) = &opts.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(FetchError::Launch)
    }
}

impl PageRenderer for ChromeRenderer {
    #[instrument(level = "info", skip(self, timeout))]
    async fn render_and_extract(
        &self,
        url: &str,
        selector: &str,
        timeout: Duration,
    ) -> Result<ExtractedItem, FetchError> {
        let t0 = Instant::now();
        let config = self.browser_config()?;

        info!("Launching headless browser");
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler error");
                }
            }
        });

        let result = load_and_extract(&browser, url, selector, timeout).await;
        shutdown(&mut browser, &handler_task).await;

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Browser session closed"
        );
        result
    }
}

async fn load_and_extract(
    browser: &Browser,
    url: &str,
    selector: &str,
    timeout: Duration,
) -> Result<ExtractedItem, FetchError> {
    info!("Fetching news page");
    let page = browser
        .new_page(url)
        .await
        .map_err(|e| FetchError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!(timeout_secs = timeout.as_secs(), "Waiting for content to load");
    wait_for_selector(&page, selector, timeout).await?;

    let html = page
        .content()
        .await
        .map_err(|e| FetchError::Browser(e.to_string()))?;
    debug!(bytes = html.len(), "Captured rendered DOM");

    extract_first_item(&html, selector)
}

/// The parts of a launched browser that teardown needs.
trait BrowserProcess {
    async fn close_browser(&mut self) -> Result<(), String>;
    async fn reap(&mut self) -> Result<(), String>;
}

impl BrowserProcess for Browser {
    async fn close_browser(&mut self) -> Result<(), String> {
        self.close().await.map(|_| ()).map_err(|e| e.to_string())
    }

    async fn reap(&mut self) -> Result<(), String> {
        self.wait().await.map(|_| ()).map_err(|e| e.to_string())
    }
}

/// Close the browser, reap its process and stop the CDP handler task.
///
/// Every step runs even if an earlier one failed.
async fn shutdown<B: BrowserProcess>(browser: &mut B, handler_task: &JoinHandle<()>) {
    if let Err(e) = browser.close_browser().await {
        warn!(error = %e, "Failed to close browser cleanly");
    }
    if let Err(e) = browser.reap().await {
        warn!(error = %e, "Failed to reap browser process");
    }
    handler_task.abort();
}

/// Poll until `selector` matches at least one element or `timeout` elapses.
async fn wait_for_selector(
    page: &Page,
    selector: &str,
    timeout: Duration,
) -> Result<(), FetchError> {
    let poll = async {
        loop {
            match page.find_elements(selector).await {
                Ok(found) if !found.is_empty() => return found.len(),
                Ok(_) => {}
                Err(e) => debug!(error = %e, "Selector not present yet"),
            }
            sleep(POLL_INTERVAL).await;
        }
    };

    match with_timeout(timeout, poll).await {
        Ok(count) => {
            debug!(count, "Selector matched");
            Ok(())
        }
        Err(_) => Err(FetchError::Timeout {
            selector: selector.to_string(),
            timeout,
        }),
    }
}
