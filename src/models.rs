//! Data models shared by every stage of the digest pipeline.
//!
//! - [`NewsletterEntry`]: one subscribed newsletter from the catalog
//! - [`EngagementData`]: normalized output of the metrics extractors
//! - [`ArticleRecord`]: one article (or one co-author's view of it)
//! - [`ScoredArticle`]: an article with its raw and normalized scores
//! - [`DigestSelection`]: the featured / wildcard / categorized layout

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category assigned to newsletters and articles that do not name one.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// A subscribed newsletter. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsletterEntry {
    /// Display name of the newsletter.
    pub name: String,
    /// RSS/Atom feed URL.
    pub feed_url: String,
    /// Public homepage of the newsletter.
    pub website_url: String,
    /// Digest section the newsletter's articles are grouped under.
    pub category: String,
    /// Partial author name; when set, only matching bylines are kept.
    pub author_filter: Option<String>,
    /// Name used as the author when an article carries no byline.
    pub publisher_name: Option<String>,
}

/// Engagement and content fields recovered from a single payload.
///
/// Every extractor produces this shape; fields a source cannot supply stay at
/// their defaults (zero, empty, or `None`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngagementData {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub summary: String,
    pub word_count: u32,
    pub comment_count: u32,
    pub like_count: u32,
    /// Only the metrics API reports restacks.
    pub restack_count: Option<u32>,
    /// Bylines, in the order the source lists them.
    pub authors: Vec<String>,
}

/// One article as it enters scoring.
///
/// The field order is also the column order of the article CSV, which is the
/// replay-mode input format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub url: String,
    pub newsletter_name: String,
    pub newsletter_url: String,
    pub category: String,
    /// Resolved author; the publisher name when the article has no byline.
    pub author_name: String,
    pub published_at: DateTime<Utc>,
    pub word_count: u32,
    pub comment_count: u32,
    pub like_count: u32,
    pub restack_count: Option<u32>,
    pub summary: String,
}

impl ArticleRecord {
    /// Category used for digest grouping; blank categories fall back to
    /// [`DEFAULT_CATEGORY`].
    pub fn category_or_default(&self) -> &str {
        let category = self.category.trim();
        if category.is_empty() {
            DEFAULT_CATEGORY
        } else {
            category
        }
    }
}

/// An [`ArticleRecord`] with its score. Never mutated after scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredArticle {
    #[serde(flatten)]
    pub article: ArticleRecord,
    pub raw_score: f64,
    /// Rescaled into `[1, 100]`; `None` when normalization was suppressed.
    pub normalized_score: Option<f64>,
    /// Whole days since publication at scoring time.
    pub age_days: i64,
}

impl ScoredArticle {
    /// The score used for ranking and display.
    pub fn score(&self) -> f64 {
        self.normalized_score.unwrap_or(self.raw_score)
    }
}

/// Final layout of the digest.
///
/// Every scored article appears in exactly one of `featured`, `wildcards` or
/// one bucket of `remainder_by_category`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DigestSelection {
    pub featured: Vec<ScoredArticle>,
    pub wildcards: Vec<ScoredArticle>,
    pub remainder_by_category: BTreeMap<String, Vec<ScoredArticle>>,
}

impl DigestSelection {
    /// Total number of articles across all sections.
    pub fn len(&self) -> usize {
        self.featured.len()
            + self.wildcards.len()
            + self.remainder_by_category.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over every article, featured first, then wildcards, then the
    /// category buckets in alphabetical order.
    pub fn iter(&self) -> impl Iterator<Item = &ScoredArticle> {
        self.featured
            .iter()
            .chain(self.wildcards.iter())
            .chain(self.remainder_by_category.values().flatten())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::article;
    use super::*;

    #[test]
    fn test_category_or_default() {
        let mut record = article("Blank Category", 1);
        record.category = "   ".to_string();
        assert_eq!(record.category_or_default(), DEFAULT_CATEGORY);

        record.category = "Science".to_string();
        assert_eq!(record.category_or_default(), "Science");
    }

    #[test]
    fn test_scored_article_prefers_normalized_score() {
        let scored = ScoredArticle {
            article: article("Scored", 2),
            raw_score: 12.5,
            normalized_score: Some(100.0),
            age_days: 2,
        };
        assert_eq!(scored.score(), 100.0);

        let raw_only = ScoredArticle {
            normalized_score: None,
            ..scored
        };
        assert_eq!(raw_only.score(), 12.5);
    }

    #[test]
    fn test_scored_article_serializes_flat() {
        let scored = ScoredArticle {
            article: article("Flat", 1),
            raw_score: 3.0,
            normalized_score: None,
            age_days: 1,
        };
        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["title"], "Flat");
        assert_eq!(json["raw_score"], 3.0);
        assert!(json["normalized_score"].is_null());
    }

    #[test]
    fn test_digest_selection_len_and_iter() {
        let scored = |t: &str| ScoredArticle {
            article: article(t, 1),
            raw_score: 1.0,
            normalized_score: None,
            age_days: 1,
        };
        let mut selection = DigestSelection::default();
        assert!(selection.is_empty());

        selection.featured.push(scored("A"));
        selection.wildcards.push(scored("B"));
        selection
            .remainder_by_category
            .insert("Technology".to_string(), vec![scored("C"), scored("D")]);

        assert_eq!(selection.len(), 4);
        let titles: Vec<&str> = selection.iter().map(|s| s.article.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C", "D"]);
    }
}
