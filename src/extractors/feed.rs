//! RSS/Atom feed parsing.
//!
//! A newsletter's feed lists its recent articles. Feeds carry no engagement
//! counts, so entries come out with zeroed comment and like counts and are
//! enriched later from the article page or the metrics API.

use crate::error::ExtractionError;
use crate::fetcher::RawPayload;
use crate::models::EngagementData;
use crate::utils::{clean_summary, word_count};
use feed_rs::model::Entry;
use tracing::{debug, instrument};

/// Parse a fetched feed document into its entries.
#[instrument(level = "debug", skip_all, fields(url = %payload.url))]
pub fn parse_feed(payload: &RawPayload) -> Result<Vec<Entry>, ExtractionError> {
    let feed = feed_rs::parser::parse(payload.body.as_bytes())
        .map_err(|e| ExtractionError::Feed(e.to_string()))?;
    debug!(entries = feed.entries.len(), "Parsed feed");
    Ok(feed.entries)
}

/// Extract the article fields of one feed entry.
///
/// # Errors
///
/// [`ExtractionError::MissingField`] when the entry has no title or no link;
/// such an entry cannot be identified and is dropped by the caller.
pub fn extract_entry(entry: &Entry) -> Result<EngagementData, ExtractionError> {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(ExtractionError::MissingField("title"))?;

    let link = entry
        .links
        .first()
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())
        .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()))
        .ok_or(ExtractionError::MissingField("link"))?;

    let content_html = entry.content.as_ref().and_then(|c| c.body.clone());
    let summary_html = entry.summary.as_ref().map(|s| s.content.clone());

    let body_for_count = content_html
        .as_deref()
        .or(summary_html.as_deref())
        .unwrap_or("");
    let summary = summary_html
        .as_deref()
        .or(content_html.as_deref())
        .map(clean_summary)
        .unwrap_or_default();

    let authors = entry
        .authors
        .iter()
        .map(|p| p.name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    Ok(EngagementData {
        title: Some(title),
        link: Some(link),
        published_at: entry.published.or(entry.updated),
        summary,
        word_count: word_count(body_for_count),
        authors,
        ..EngagementData::default()
    })
}
