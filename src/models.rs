//! Data models for the headline watch pipeline.
//!
//! - [`NewsItem`]: the top headline read off the index page
//! - [`PersistedState`]: the last-seen headline as stored on disk
//! - [`DiffbotResponse`] / [`DiffbotObject`]: the raw analysis API payload
//! - [`ArticleRecord`]: the normalized article emitted to consumers
//! - [`ResultEnvelope`]: the single JSON object printed per run
//!
//! The Diffbot payload uses camelCase field names, hence the serde renames on
//! the raw types. Everything we emit uses snake_case.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Author attributed to an article when the analysis API returns none.
pub const DEFAULT_AUTHOR: &str = "Trading Economics";

/// Error reported when the top item could not be read off the index page.
pub const FETCH_FAILED: &str = "Failed to fetch news";

/// Error reported when enrichment produced no articles.
pub const PROCESS_FAILED: &str = "Failed to process articles";

/// The top entry of the news stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsItem {
    /// Headline text, trimmed.
    pub title: String,
    /// Absolute link to the story.
    pub url: String,
}

/// The last-seen headline, one record per state file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PersistedState {
    pub title: String,
    pub url: String,
    /// ISO-8601 time of the write.
    pub last_checked: String,
}

impl PersistedState {
    /// Whether this record describes the same headline as `item`.
    pub fn matches(&self, item: &NewsItem) -> bool {
        self.url == item.url && self.title == item.title
    }
}

/// Raw response of the Diffbot Analyze endpoint.
///
/// Only the fields we read are modelled. Diffbot reports API-level failures
/// in the body (`errorCode` + `error`), sometimes with a 200 status.
///
/// `objects` stays untyped: only the first entry is ever decoded into a
/// [`DiffbotObject`], so a malformed trailing object cannot fail the run.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffbotResponse {
    #[serde(default)]
    pub objects: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One extracted object from a Diffbot response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffbotObject {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub estimated_date: Option<String>,
    /// Either a bare score or `{ "score": .., "type": .. }` depending on the
    /// endpoint version, so it is kept loose and read through
    /// [`DiffbotObject::sentiment_score`].
    #[serde(default)]
    pub sentiment: Option<serde_json::Value>,
}

impl DiffbotObject {
    /// Numeric sentiment, or `0.0` when absent or unrecognized.
    pub fn sentiment_score(&self) -> f64 {
        match &self.sentiment {
            Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(serde_json::Value::Object(map)) => map
                .get("score")
                .and_then(serde_json::Value::as_f64)
                .unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

/// A normalized article as emitted in the success envelope.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArticleRecord {
    pub date: Option<String>,
    pub sentiment: f64,
    pub author: String,
    pub text: Option<String>,
    pub title: Option<String>,
    pub url: String,
}

impl ArticleRecord {
    /// Normalize a Diffbot object. `url` is the link we fetched, which wins
    /// over whatever URL the API echoes back.
    pub fn from_object(object: &DiffbotObject, url: &str) -> Self {
        let date = non_empty(&object.estimated_date).or_else(|| non_empty(&object.date));
        let author = non_empty(&object.author).unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

        Self {
            date,
            sentiment: object.sentiment_score(),
            author,
            text: object.text.clone(),
            title: object.title.clone(),
            url: url.to_string(),
        }
    }

    pub fn sentiment_label(&self) -> SentimentLabel {
        SentimentLabel::from_score(self.sentiment)
    }
}

/// Coarse reading of a sentiment score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Scores within `0.1` of zero are neutral.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.1 {
            SentimentLabel::Positive
        } else if score <= -0.1 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}

/// Run metadata attached to a success envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub timestamp: String,
    pub source_url: String,
    pub title: String,
    /// `false` only when the headline matched the stored state.
    pub changed: bool,
}

/// The one JSON object printed to stdout per run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultEnvelope {
    Success {
        success: bool,
        articles: Vec<ArticleRecord>,
        metadata: Metadata,
    },
    Failure {
        success: bool,
        error: String,
    },
    /// Emitted when the index page yielded nothing. Carries no `success`
    /// key, which downstream consumers already rely on.
    FetchFailed { error: String },
}

impl ResultEnvelope {
    pub fn success(articles: Vec<ArticleRecord>, metadata: Metadata) -> Self {
        Self::Success {
            success: true,
            articles,
            metadata,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            success: false,
            error: error.into(),
        }
    }

    pub fn fetch_failed() -> Self {
        Self::FetchFailed {
            error: FETCH_FAILED.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
