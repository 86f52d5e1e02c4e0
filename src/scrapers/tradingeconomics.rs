//! Trading Economics news stream.
//!
//! The stream at `https://tradingeconomics.com/stream?c=united+states` lists
//! headlines newest first, each as an `a.te-stream-title` with a relative
//! link to the story.

use crate::error::FetchError;
use crate::models::NewsItem;
use crate::scrapers::render::PageRenderer;
use std::time::Duration;
use tracing::{error, info, instrument};
use url::Url;

pub const STREAM_URL: &str = "https://tradingeconomics.com/stream?c=united+states";
pub const TITLE_SELECTOR: &str = ".te-stream-title";
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(20);

/// Reads the top item of a news stream through a [`PageRenderer`].
#[derive(Debug, Clone)]
pub struct PageFetcher<R> {
    renderer: R,
    index_url: Url,
    selector: String,
    timeout: Duration,
}

impl<R: PageRenderer> PageFetcher<R> {
    pub fn new(
        renderer: R,
        index_url: Url,
        selector: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            renderer,
            index_url,
            selector: selector.into(),
            timeout,
        }
    }

    /// Render the stream and return its first headline with an absolute link.
    #[instrument(level = "info", skip_all, fields(index_url = %self.index_url))]
    pub async fn fetch_top_item(&self) -> Result<NewsItem, FetchError> {
        let result = self
            .renderer
            .render_and_extract(self.index_url.as_str(), &self.selector, self.timeout)
            .await
            .and_then(|extracted| {
                if extracted.text.is_empty() {
                    return Err(FetchError::Incomplete("title"));
                }
                let href = extracted.href.ok_or(FetchError::Incomplete("link"))?;
                let url = self
                    .index_url
                    .join(&href)
                    .map_err(|_| FetchError::Incomplete("link"))?;
                Ok(NewsItem {
                    title: extracted.text,
                    url: url.to_string(),
                })
            });

        match &result {
            Ok(item) => info!(title = %item.title, url = %item.url, "Found top news item"),
            Err(e) => error!(error = %e, "Failed to fetch top news item"),
        }
        result
    }
}
