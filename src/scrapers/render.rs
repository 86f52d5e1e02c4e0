//! Browser seam and DOM extraction.

use crate::error::FetchError;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

/// Text and link of the first element matching a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedItem {
    pub text: String,
    /// Raw `href`, possibly relative.
    pub href: Option<String>,
}

/// Anything that can load a page, wait for `selector` to show up, and hand
/// back the first match.
///
/// Implementations own the whole browser lifecycle for one call and must
/// release it before returning, whatever the outcome.
pub trait PageRenderer {
    async fn render_and_extract(
        &self,
        url: &str,
        selector: &str,
        timeout: Duration,
    ) -> Result<ExtractedItem, FetchError>;
}

/// Pull the first `selector` match out of a rendered document.
///
/// Whitespace in the text is collapsed. The link is taken from the element
/// itself when it is an anchor, otherwise from its first `a[href]`
/// descendant.
pub fn extract_first_item(html: &str, selector: &str) -> Result<ExtractedItem, FetchError> {
    let item_selector = parse_selector(selector)?;
    let link_selector = parse_selector("a[href]")?;

    let document = Html::parse_document(html);
    let element = document
        .select(&item_selector)
        .next()
        .ok_or_else(|| FetchError::NoMatch {
            selector: selector.to_string(),
        })?;

    Ok(ExtractedItem {
        text: collapse_whitespace(element),
        href: element
            .value()
            .attr("href")
            .or_else(|| {
                element
                    .select(&link_selector)
                    .next()
                    .and_then(|a| a.value().attr("href"))
            })
            .map(str::to_string),
    })
}

fn parse_selector(selector: &str) -> Result<Selector, FetchError> {
    Selector::parse(selector)
        .map_err(|e| FetchError::Browser(format!("invalid selector '{selector}': {e}")))
}

fn collapse_whitespace(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
