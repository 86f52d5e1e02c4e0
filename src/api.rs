//! Article enrichment through the Diffbot Analyze API.
//!
//! One GET per call, no retries. The endpoint classifies the page and, with
//! `mode=article`, returns an `objects` array of extracted articles. Only the
//! first object is used.
//!
//! # Architecture
//!
//! - [`ArticleEnricher`]: the seam the pipeline depends on
//! - [`DiffbotClient`]: the HTTP implementation
//!
//! Failures are returned as [`EnrichError`] and logged here with whatever
//! diagnostic detail exists (status code, raw body), so callers only need
//! to pick an envelope.

use crate::error::EnrichError;
use crate::models::{ArticleRecord, DiffbotObject, DiffbotResponse};
use crate::utils::{redact_token, truncate_for_log};
use reqwest::header::CONTENT_TYPE;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

pub const DIFFBOT_ANALYZE_URL: &str = "https://api.diffbot.com/v3/analyze";

/// Maximum body bytes echoed into logs.
const LOG_BODY_LIMIT: usize = 2_000;

/// Turns a story URL into normalized article records.
pub trait ArticleEnricher {
    /// Returns at most one record on success.
    async fn enrich(&self, url: &str) -> Result<Vec<ArticleRecord>, EnrichError>;
}

/// Diffbot Analyze client.
pub struct DiffbotClient {
    http: reqwest::Client,
    endpoint: Url,
    token: String,
}

impl fmt::Debug for DiffbotClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffbotClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("token", &"***")
            .finish()
    }
}

impl DiffbotClient {
    /// Build a client for the Analyze endpoint.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The Analyze URL, usually [`DIFFBOT_ANALYZE_URL`]
    /// * `token` - Diffbot API token, sent as the `token` query parameter
    /// * `request_timeout` - Upper bound for the whole request, body included
    ///
    /// # Returns
    ///
    /// The client, or [`EnrichError::Transport`] if the HTTP client could not
    /// be built (for example when no TLS backend is available).
    pub fn new(
        endpoint: Url,
        token: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, EnrichError> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            endpoint,
            token: token.into(),
        })
    }

    async fn analyze(&self, url: &str) -> Result<Vec<ArticleRecord>, EnrichError> {
        let request = self
            .http
            .get(self.endpoint.clone())
            .query(&[
                ("token", self.token.as_str()),
                ("url", url),
                ("mode", "article"),
            ])
            .header(CONTENT_TYPE, "application/json")
            .build()?;
        info!(request_url = %redact_token(request.url().as_str()), "Calling Diffbot API");

        let response = self.http.execute(request).await?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|source| EnrichError::Body { status, source })?;

        if !(200..300).contains(&status) {
            return Err(EnrichError::Status { status, body });
        }

        let parsed: DiffbotResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(source) => {
                return Err(EnrichError::Parse {
                    status,
                    body,
                    source,
                });
            }
        };
        debug!(body = %truncate_for_log(&body, LOG_BODY_LIMIT), "Diffbot raw response");

        if let Some(code) = parsed.error_code {
            return Err(EnrichError::Api {
                code,
                message: parsed.error.unwrap_or_default(),
            });
        }

        let raw = parsed
            .objects
            .and_then(|objects| objects.into_iter().next())
            .ok_or(EnrichError::NoArticleData)?;
        let first: DiffbotObject = match serde_json::from_value(raw) {
            Ok(first) => first,
            Err(source) => {
                return Err(EnrichError::Parse {
                    status,
                    body,
                    source,
                });
            }
        };

        let record = ArticleRecord::from_object(&first, url);
        debug!(
            kind = first.kind.as_deref().unwrap_or("unknown"),
            title = record.title.as_deref().unwrap_or(""),
            sentiment = %record.sentiment_label(),
            "Processed article"
        );
        Ok(vec![record])
    }
}

impl ArticleEnricher for DiffbotClient {
    #[instrument(level = "info", skip(self))]
    async fn enrich(&self, url: &str) -> Result<Vec<ArticleRecord>, EnrichError> {
        let t0 = Instant::now();
        let result = self.analyze(url).await;
        let elapsed_ms = t0.elapsed().as_millis() as u64;

        match &result {
            Ok(records) => info!(elapsed_ms, count = records.len(), "Diffbot enrichment succeeded"),
            Err(EnrichError::NoArticleData) => {
                warn!(elapsed_ms, "No article data found in Diffbot response")
            }
            Err(
                e @ (EnrichError::Status { status, body }
                | EnrichError::Parse { status, body, .. }),
            ) => error!(
                elapsed_ms,
                status,
                body = %truncate_for_log(body, LOG_BODY_LIMIT),
                error = %e,
                "Error processing with Diffbot"
            ),
            Err(e @ EnrichError::Body { status, .. }) => {
                error!(elapsed_ms, status, error = %e, "Error processing with Diffbot")
            }
            Err(e) => error!(elapsed_ms, error = %e, "Error processing with Diffbot"),
        }
        result
    }
}
