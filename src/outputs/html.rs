//! HTML digest rendering.
//!
//! Produces a single self-contained document with inline styles, so it can
//! be opened in a browser and pasted straight into a newsletter editor.
//!
//! # Layout
//!
//! ```text
//! Newsletter Digest            (date, counts, scoring label, lookback)
//! Featured Articles            numbered, with summaries
//! Wildcard Pick                with summaries
//! <Category>...                alphabetical, at most 10 articles each
//! ```

use crate::error::OutputError;
use crate::models::{DigestSelection, ScoredArticle};
use crate::scoring::ScoringPolicy;
use crate::utils::html_escape;
use chrono::NaiveDate;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Articles shown per category section.
pub const CATEGORY_LIMIT: usize = 10;

const SANS: &str = "-apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif";

const PAGE_STYLE: &str =
    "font-family: Georgia, serif; max-width: 700px; margin: 0 auto; line-height: 1.7; \
     color: #1a1a1a;";
const LINK_STYLE: &str = "color: #1a1a1a; text-decoration: none;";
const SUMMARY_STYLE: &str = "font-size: 17px; line-height: 1.7; color: #1a1a1a; margin-top: 12px;";
const FEATURED_TITLE_STYLE: &str =
    "font-size: 22px; font-weight: 700; line-height: 1.3; margin-bottom: 8px;";
const COMPACT_TITLE_STYLE: &str =
    "font-size: 18px; font-weight: 600; line-height: 1.4; margin-bottom: 5px;";
const TITLE_STYLE: &str = "font-size: 36px; font-weight: 700; color: #1a1a1a; margin: 0 0 10px 0;";
const DATE_STYLE: &str = "font-size: 16px; color: #666; margin-bottom: 8px;";
const COUNTS_STYLE: &str = "font-size: 14px; color: #666; margin-bottom: 8px;";
const POLICY_STYLE: &str = "font-size: 13px; color: #888; font-style: italic;";

/// Run-level facts shown in the digest header.
#[derive(Debug, Clone)]
pub struct DigestMeta {
    pub generated_on: NaiveDate,
    pub policy: ScoringPolicy,
    pub days_back: u32,
    pub newsletter_count: usize,
}

fn section_heading(title: &str) -> String {
    format!(
        "<h2 style=\"font-size: 24px; font-weight: 700; color: #1a1a1a; margin: 40px 0 20px 0; \
         padding-bottom: 8px; border-bottom: 1px solid #eee; font-family: {SANS};\">{}</h2>\n",
        html_escape(title)
    )
}

/// Format an integer with thousands separators.
fn thousands(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Byline, engagement and score lines shared by both entry styles.
fn details(scored: &ScoredArticle) -> String {
    let article = &scored.article;

    let mut first_line = vec![html_escape(&article.newsletter_name)];
    if !article.author_name.trim().is_empty() {
        first_line.push(format!("by {}", html_escape(&article.author_name)));
    }
    first_line.push(format!("{}d ago", scored.age_days));

    let mut metrics = Vec::new();
    if article.comment_count > 0 {
        metrics.push(format!("{} comments", thousands(article.comment_count)));
    }
    if article.like_count > 0 {
        metrics.push(format!("{} likes", thousands(article.like_count)));
    }
    if let Some(restacks) = article.restack_count.filter(|r| *r > 0) {
        metrics.push(format!("{} restacks", thousands(restacks)));
    }

    let mut score_line = format!("Score: {:.1}", scored.score());
    if article.word_count > 0 {
        score_line.push_str(&format!(" • {} words", thousands(article.word_count)));
    }

    let mut html =
        String::from("<div style=\"font-size: 13px; color: #666; line-height: 1.6;\">");
    html.push_str(&format!("<div>{}</div>", first_line.join(" • ")));
    if !metrics.is_empty() {
        html.push_str(&format!("<div>{}</div>", metrics.join(" • ")));
    }
    html.push_str(&format!("<div>{score_line}</div>"));
    html.push_str("</div>");
    html
}

fn featured_entry(scored: &ScoredArticle, label: &str) -> String {
    let article = &scored.article;
    let summary = if article.summary.is_empty() {
        String::new()
    } else {
        format!(
            "<div style=\"{SUMMARY_STYLE}\">{}</div>",
            html_escape(&article.summary)
        )
    };
    format!(
        "<div style=\"margin-bottom: 40px;\">\n\
         <div style=\"{FEATURED_TITLE_STYLE} font-family: {SANS};\">\
         <a href=\"{}\" style=\"{LINK_STYLE}\">{}{}</a></div>\n{}\n{}\n</div>\n",
        html_escape(&article.url),
        label,
        html_escape(&article.title),
        details(scored),
        summary
    )
}

fn compact_entry(scored: &ScoredArticle) -> String {
    let article = &scored.article;
    format!(
        "<div style=\"padding: 15px 0;\">\n\
         <div style=\"{COMPACT_TITLE_STYLE}\">\
         <a href=\"{}\" style=\"{LINK_STYLE}\">{}</a></div>\n{}\n</div>\n",
        html_escape(&article.url),
        html_escape(&article.title),
        details(scored)
    )
}

/// Render the digest document.
pub fn render_digest(selection: &DigestSelection, meta: &DigestMeta) -> String {
    let mut html = format!("<div style=\"{PAGE_STYLE}\">\n");

    html.push_str(&format!(
        "<div style=\"text-align: center; padding: 40px 20px; margin-bottom: 40px;\">\n\
         <h1 style=\"{TITLE_STYLE} font-family: {SANS};\">Newsletter Digest</h1>\n\
         <div style=\"{DATE_STYLE}\">{}</div>\n\
         <div style=\"{COUNTS_STYLE}\">{} Featured • {} Total Articles</div>\n\
         <div style=\"{POLICY_STYLE}\">{} scoring (engagement + length) • \
         {} day lookback • {} newsletters</div>\n\
         </div>\n",
        meta.generated_on.format("%A, %B %d, %Y"),
        selection.featured.len(),
        selection.len(),
        meta.policy.label(),
        meta.days_back,
        meta.newsletter_count,
    ));

    if !selection.featured.is_empty() {
        html.push_str(&section_heading("Featured Articles"));
        for (i, scored) in selection.featured.iter().enumerate() {
            html.push_str(&featured_entry(scored, &format!("{}. ", i + 1)));
        }
    }

    if !selection.wildcards.is_empty() {
        let heading = if selection.wildcards.len() == 1 {
            "Wildcard Pick"
        } else {
            "Wildcard Picks"
        };
        html.push_str(&section_heading(heading));
        for scored in &selection.wildcards {
            html.push_str(&featured_entry(scored, "🎲 "));
        }
    }

    for (category, articles) in &selection.remainder_by_category {
        if articles.is_empty() {
            continue;
        }
        html.push_str(&section_heading(category));
        for scored in articles.iter().take(CATEGORY_LIMIT) {
            html.push_str(&compact_entry(scored));
        }
    }

    html.push_str("</div>\n");
    html
}

/// Render and write the digest to `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_digest(
    selection: &DigestSelection,
    meta: &DigestMeta,
    path: &Path,
) -> Result<(), OutputError> {
    let html = render_digest(selection, meta);
    fs::write(path, html)
        .await
        .map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    info!(articles = selection.len(), "Wrote HTML digest");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::article;

    fn scored(title: &str, category: &str, score: f64) -> ScoredArticle {
        let mut record = article(title, 3);
        record.category = category.to_string();
        record.comment_count = 12;
        record.like_count = 1500;
        ScoredArticle {
            article: record,
            raw_score: score,
            normalized_score: Some(score),
            age_days: 3,
        }
    }

    fn meta() -> DigestMeta {
        DigestMeta {
            generated_on: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
            policy: ScoringPolicy::DailyAverage,
            days_back: 7,
            newsletter_count: 42,
        }
    }

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1500), "1,500");
        assert_eq!(thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_render_sections_and_header() {
        let mut selection = DigestSelection::default();
        selection.featured.push(scored("Top Story", "Tech", 100.0));
        selection.wildcards.push(scored("Lucky Draw", "Tech", 40.0));
        let politics = vec![scored("Remainder", "Politics", 10.0)];
        selection
            .remainder_by_category
            .insert("Politics".to_string(), politics);

        let html = render_digest(&selection, &meta());
        assert!(html.contains("Saturday, May 10, 2025"));
        assert!(html.contains("1 Featured • 3 Total Articles"));
        assert!(html.contains("Daily Average scoring"));
        assert!(html.contains("42 newsletters"));
        assert!(html.contains("Featured Articles"));
        assert!(html.contains("1. Top Story"));
        assert!(html.contains("Wildcard Pick"));
        assert!(html.contains("🎲 Lucky Draw"));
        assert!(html.contains(">Politics</h2>"));
        assert!(html.contains("12 comments • 1,500 likes"));
        assert!(html.contains("by Jane Doe • 3d ago"));
        assert!(html.contains("Score: 100.0 • 1,200 words"));
    }

    #[test]
    fn test_render_escapes_text() {
        let mut selection = DigestSelection::default();
        let hostile = scored("<script>alert('x')</script>", "Tech", 50.0);
        selection.featured.push(hostile);
        let html = render_digest(&selection, &meta());
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_category_sections_limited() {
        let mut selection = DigestSelection::default();
        let many = (0..15)
            .map(|i| scored(&format!("Story {i}"), "Tech", 50.0 - i as f64))
            .collect();
        selection.remainder_by_category.insert("Tech".to_string(), many);
        let html = render_digest(&selection, &meta());
        assert!(html.contains("Story 9<"));
        assert!(!html.contains("Story 10<"));
    }

    #[tokio::test]
    async fn test_write_digest() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("digest.html");
        write_digest(&DigestSelection::default(), &meta(), &path)
            .await
            .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("Newsletter Digest"));
        assert!(!written.contains("Featured Articles"));
    }
}
