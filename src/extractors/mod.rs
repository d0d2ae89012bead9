//! Parsers that turn fetched payloads into [`EngagementData`].
//!
//! Each submodule handles one kind of source:
//!
//! | Source | Module | Yields |
//! |--------|--------|--------|
//! | Feed entry | [`feed`] | title, link, date, summary, word count, bylines |
//! | Article page | [`page`] | comments, likes (`interactionStatistic`, aria-label) |
//! | Metrics API | [`metrics_api`] | comments, likes, restacks, co-author bylines, word count |
//!
//! Missing or unparsable engagement fields default to zero. A payload that
//! cannot be read at all yields an [`ExtractionError`]; the caller decides
//! whether the article survives (see [`crate::acquire`]).

pub mod feed;
pub mod metrics_api;
pub mod page;

use crate::error::ExtractionError;
use crate::fetcher::RawPayload;
use crate::models::EngagementData;
use serde::{Deserialize, Serialize};

/// Where per-article engagement comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricsSource {
    /// Scrape the public article page. No restack counts.
    #[default]
    PageMarkup,
    /// Query the platform's post API. Includes restacks and co-authors.
    Api,
}

impl MetricsSource {
    /// URL to fetch for an article's metrics.
    pub fn target_for(self, article_url: &str) -> Result<String, ExtractionError> {
        match self {
            MetricsSource::PageMarkup => Ok(article_url.to_string()),
            MetricsSource::Api => metrics_api::endpoint_for(article_url),
        }
    }

    /// Parse a metrics payload fetched from [`MetricsSource::target_for`].
    pub fn extract(self, payload: &RawPayload) -> Result<EngagementData, ExtractionError> {
        match self {
            MetricsSource::PageMarkup => Ok(page::extract(payload)),
            MetricsSource::Api => metrics_api::extract(payload),
        }
    }
}

/// Parse an engagement count that may arrive as a number or a string
/// (`"1,204"`). Anything else counts as zero.
pub(crate) fn count_from(value: &serde_json::Value) -> u32 {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(|n| n.min(u32::MAX as u64) as u32)
            .unwrap_or(0),
        serde_json::Value::String(s) => s.trim().replace(',', "").parse().unwrap_or(0),
        _ => 0,
    }
}
