//! One watch run: fetch, compare, enrich, persist.
//!
//! ```text
//! load state ─► fetch_top_item ─► Change::detect ─► enrich ─► save state
//!                  │ Err                             │ Err
//!                  ▼                                 ▼
//!      {"error": "Failed to fetch news"}  {"success": false, ...}
//! ```
//!
//! Every branch ends in exactly one [`ResultEnvelope`]. The state file is only
//! written after enrichment succeeds, so it always describes the last
//! headline that made it all the way through.
//!
//! [`run_guarded`] wraps a run on its own task so that a panic anywhere in it
//! still ends in a failure envelope.

use crate::api::ArticleEnricher;
use crate::error::RunError;
use crate::models::{Metadata, NewsItem, PROCESS_FAILED, PersistedState, ResultEnvelope};
use crate::scrapers::render::PageRenderer;
use crate::scrapers::tradingeconomics::PageFetcher;
use crate::state::{Change, StateStore};
use crate::utils::now_iso8601;
use std::any::Any;
use std::future::Future;
use tracing::{error, info, instrument, warn};

/// One watch run over a renderer `R` and an enricher `E`.
///
/// Owns everything a run touches: the index page fetcher, the analysis
/// client and the state file. [`Monitor::run`] never fails; every outcome is
/// expressed as a [`ResultEnvelope`].
pub struct Monitor<R, E> {
    fetcher: PageFetcher<R>,
    enricher: E,
    state: StateStore,
    only_on_change: bool,
}

impl<R, E> Monitor<R, E>
where
    R: PageRenderer,
    E: ArticleEnricher,
{
    /// # Arguments
    ///
    /// * `fetcher` - Reads the top item off the index page
    /// * `enricher` - Turns the story link into article records
    /// * `state` - Where the last successfully enriched headline lives
    /// * `only_on_change` - Skip enrichment when the headline is unchanged
    pub fn new(
        fetcher: PageFetcher<R>,
        enricher: E,
        state: StateStore,
        only_on_change: bool,
    ) -> Self {
        Self {
            fetcher,
            enricher,
            state,
            only_on_change,
        }
    }

    /// Execute one fetch, compare, enrich and persist cycle.
    ///
    /// # Returns
    ///
    /// - `{"error": ...}` when the index page yielded no usable item
    /// - a success envelope with the articles, or with none when the
    ///   headline was unchanged and `only_on_change` is set
    /// - `{"success": false, ...}` when enrichment failed or found nothing
    #[instrument(level = "info", skip_all, fields(only_on_change = self.only_on_change))]
    pub async fn run(&self) -> ResultEnvelope {
        info!("Starting monitoring process");
        let previous = self.load_previous().await;

        let current = match self.fetcher.fetch_top_item().await {
            Ok(item) => item,
            Err(e) => {
                error!(error = %e, "Failed to fetch current news");
                return ResultEnvelope::fetch_failed();
            }
        };

        let change = Change::detect(previous.as_ref(), &current);
        info!(?change, title = %current.title, "Compared against last saved headline");

        if self.only_on_change && !change.is_new() {
            info!("Headline unchanged; skipping enrichment");
            return ResultEnvelope::success(Vec::new(), metadata(&current, false));
        }

        match self.enricher.enrich(&current.url).await {
            Ok(articles) if !articles.is_empty() => {
                for article in &articles {
                    info!(
                        sentiment = article.sentiment,
                        label = %article.sentiment_label(),
                        "Article enriched"
                    );
                }
                self.persist(&current).await;
                ResultEnvelope::success(articles, metadata(&current, change.is_new()))
            }
            Ok(_) => {
                warn!("Enrichment returned no articles");
                ResultEnvelope::failure(PROCESS_FAILED)
            }
            Err(e) => {
                warn!(error = %e, "Enrichment failed; state left untouched");
                ResultEnvelope::failure(PROCESS_FAILED)
            }
        }
    }

    async fn load_previous(&self) -> Option<PersistedState> {
        match self.state.load().await {
            Ok(previous) => previous,
            Err(e) => {
                warn!(
                    path = %self.state.path().display(),
                    error = %e,
                    "Ignoring unreadable state file"
                );
                None
            }
        }
    }

    async fn persist(&self, current: &NewsItem) {
        if let Err(e) = self.state.save(current).await {
            error!(error = %e, "Error saving news");
        }
    }
}

/// Drive `run` on its own task and turn a panic or cancellation into a
/// failure envelope.
pub async fn run_guarded<F>(run: F) -> ResultEnvelope
where
    F: Future<Output = ResultEnvelope> + Send + 'static,
{
    match tokio::spawn(run).await {
        Ok(envelope) => envelope,
        Err(e) => {
            let err = if e.is_panic() {
                RunError::Panicked(panic_message(e.into_panic()))
            } else {
                RunError::Cancelled
            };
            error!(error = %err, "Run aborted");
            ResultEnvelope::failure(err.to_string())
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn metadata(item: &NewsItem, changed: bool) -> Metadata {
    Metadata {
        timestamp: now_iso8601(),
        source_url: item.url.clone(),
        title: item.title.clone(),
        changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EnrichError, FetchError};
    use crate::models::ArticleRecord;
    use crate::scrapers::render::ExtractedItem;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use url::Url;

    const INDEX: &str = "https://tradingeconomics.com/stream?c=united+states";
    const STORY: &str = "https://tradingeconomics.com/united-states/retail-sales";

    struct StubRenderer(Option<ExtractedItem>);

    impl PageRenderer for StubRenderer {
        async fn render_and_extract(
            &self,
            _url: &str,
            selector: &str,
            timeout: Duration,
        ) -> Result<ExtractedItem, FetchError> {
            self.0.clone().ok_or(FetchError::Timeout {
                selector: selector.to_string(),
                timeout,
            })
        }
    }

    enum Outcome {
        Articles,
        Empty,
        Fail,
    }

    struct StubEnricher {
        outcome: Outcome,
        calls: AtomicUsize,
    }

    impl StubEnricher {
        fn new(outcome: Outcome) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ArticleEnricher for StubEnricher {
        async fn enrich(&self, url: &str) -> Result<Vec<ArticleRecord>, EnrichError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Outcome::Articles => Ok(vec![ArticleRecord {
                    date: Some("2024-01-01".to_string()),
                    sentiment: 0.5,
                    author: "A".to_string(),
                    text: Some("body".to_string()),
                    title: Some("T".to_string()),
                    url: url.to_string(),
                }]),
                Outcome::Empty => Ok(Vec::new()),
                Outcome::Fail => Err(EnrichError::NoArticleData),
            }
        }
    }

    struct PanickingRenderer;

    impl PageRenderer for PanickingRenderer {
        async fn render_and_extract(
            &self,
            _url: &str,
            _selector: &str,
            _timeout: Duration,
        ) -> Result<ExtractedItem, FetchError> {
            panic!("renderer exploded")
        }
    }

    fn headline() -> Option<ExtractedItem> {
        Some(ExtractedItem {
            text: "US Retail Sales Rise".to_string(),
            href: Some("/united-states/retail-sales".to_string()),
        })
    }

    fn monitor(
        rendered: Option<ExtractedItem>,
        outcome: Outcome,
        state: StateStore,
        only_on_change: bool,
    ) -> Monitor<StubRenderer, StubEnricher> {
        let fetcher = PageFetcher::new(
            StubRenderer(rendered),
            Url::parse(INDEX).unwrap(),
            ".te-stream-title",
            Duration::from_secs(1),
        );
        Monitor::new(fetcher, StubEnricher::new(outcome), state, only_on_change)
    }

    fn store() -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("last_news.json"));
        (dir, store)
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_enrichment() {
        let (_dir, state) = store();
        let monitor = monitor(None, Outcome::Articles, state.clone(), false);

        let envelope = monitor.run().await;

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            serde_json::json!({ "error": "Failed to fetch news" })
        );
        assert_eq!(monitor.enricher.calls.load(Ordering::SeqCst), 0);
        assert!(state.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_success_emits_articles_and_saves_state() {
        let (_dir, state) = store();
        let monitor = monitor(headline(), Outcome::Articles, state.clone(), false);

        let envelope = monitor.run().await;

        match &envelope {
            ResultEnvelope::Success {
                success,
                articles,
                metadata,
            } => {
                assert!(*success);
                assert_eq!(articles.len(), 1);
                assert_eq!(articles[0].url, STORY);
                assert_eq!(metadata.source_url, STORY);
                assert_eq!(metadata.title, "US Retail Sales Rise");
                assert!(metadata.changed);
            }
            other => panic!("unexpected envelope: {other:?}"),
        }

        let saved = state.load().await.unwrap().unwrap();
        assert_eq!(saved.title, "US Retail Sales Rise");
        assert_eq!(saved.url, STORY);
    }

    #[tokio::test]
    async fn test_enrichment_failure_leaves_state_untouched() {
        let (_dir, state) = store();
        let monitor = monitor(headline(), Outcome::Fail, state.clone(), false);

        let envelope = monitor.run().await;

        assert_eq!(
            serde_json::to_string(&envelope).unwrap(),
            r#"{"success":false,"error":"Failed to process articles"}"#
        );
        assert!(state.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_articles_is_failure() {
        let (_dir, state) = store();
        let envelope = monitor(headline(), Outcome::Empty, state, false).run().await;
        assert_eq!(envelope, ResultEnvelope::failure(PROCESS_FAILED));
    }

    #[tokio::test]
    async fn test_unchanged_is_still_enriched_by_default() {
        let (_dir, state) = store();
        state
            .save(&NewsItem {
                title: "US Retail Sales Rise".to_string(),
                url: STORY.to_string(),
            })
            .await
            .unwrap();
        let monitor = monitor(headline(), Outcome::Articles, state, false);

        let envelope = monitor.run().await;

        assert_eq!(monitor.enricher.calls.load(Ordering::SeqCst), 1);
        match envelope {
            ResultEnvelope::Success { metadata, .. } => assert!(!metadata.changed),
            other => panic!("unexpected envelope: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_only_on_change_skips_unchanged() {
        let (_dir, state) = store();
        state
            .save(&NewsItem {
                title: "US Retail Sales Rise".to_string(),
                url: STORY.to_string(),
            })
            .await
            .unwrap();
        let monitor = monitor(headline(), Outcome::Articles, state, true);

        let envelope = monitor.run().await;

        assert_eq!(monitor.enricher.calls.load(Ordering::SeqCst), 0);
        match envelope {
            ResultEnvelope::Success {
                articles, metadata, ..
            } => {
                assert!(articles.is_empty());
                assert!(!metadata.changed);
            }
            other => panic!("unexpected envelope: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_only_on_change_enriches_new_headline() {
        let (_dir, state) = store();
        state
            .save(&NewsItem {
                title: "Older headline".to_string(),
                url: "https://tradingeconomics.com/united-states/older".to_string(),
            })
            .await
            .unwrap();
        let monitor = monitor(headline(), Outcome::Articles, state.clone(), true);

        assert!(monitor.run().await.is_success());
        assert_eq!(monitor.enricher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.load().await.unwrap().unwrap().url, STORY);
    }

    #[tokio::test]
    async fn test_corrupt_state_counts_as_first_run() {
        let (_dir, state) = store();
        std::fs::write(state.path(), "garbage").unwrap();
        let monitor = monitor(headline(), Outcome::Articles, state.clone(), true);

        assert!(monitor.run().await.is_success());
        assert_eq!(monitor.enricher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.load().await.unwrap().unwrap().title, "US Retail Sales Rise");
    }

    #[tokio::test]
    async fn test_guarded_run_turns_panic_into_failure() {
        let (_dir, state) = store();
        let fetcher = PageFetcher::new(
            PanickingRenderer,
            Url::parse(INDEX).unwrap(),
            ".te-stream-title",
            Duration::from_secs(1),
        );
        let enricher = StubEnricher::new(Outcome::Articles);
        let monitor = Monitor::new(fetcher, enricher, state.clone(), false);

        let envelope = run_guarded(async move { monitor.run().await }).await;

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            serde_json::json!({
                "success": false,
                "error": "run task panicked: renderer exploded"
            })
        );
        assert!(state.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_guarded_run_passes_envelope_through() {
        let (_dir, state) = store();
        let monitor = monitor(headline(), Outcome::Articles, state, false);

        let envelope = run_guarded(async move { monitor.run().await }).await;
        assert!(envelope.is_success());
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("kaboom"))), "kaboom");
        assert_eq!(panic_message(Box::new(42u32)), "unknown panic");
    }
}
