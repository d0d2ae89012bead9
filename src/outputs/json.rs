//! JSON dump of the digest selection.
//!
//! Written next to the HTML digest when `json_output` is enabled, for
//! consumption by other tools:
//!
//! ```text
//! output_dir/
//! ├── articles_2025-05-10.csv
//! ├── digest_2025-05-10.html
//! └── digest_2025-05-10.json
//! ```

use crate::error::OutputError;
use crate::models::DigestSelection;
use crate::outputs::html::DigestMeta;
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

#[derive(Debug, Serialize)]
struct DigestDocument<'a> {
    generated_on: String,
    policy: &'static str,
    days_back: u32,
    newsletter_count: usize,
    total_articles: usize,
    #[serde(flatten)]
    selection: &'a DigestSelection,
}

/// Serialize a [`DigestSelection`] with its run metadata.
pub fn to_json(selection: &DigestSelection, meta: &DigestMeta) -> Result<String, OutputError> {
    let document = DigestDocument {
        generated_on: meta.generated_on.to_string(),
        policy: meta.policy.label(),
        days_back: meta.days_back,
        newsletter_count: meta.newsletter_count,
        total_articles: selection.len(),
        selection,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Write the selection as JSON to `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_selection(
    selection: &DigestSelection,
    meta: &DigestMeta,
    path: &Path,
) -> Result<(), OutputError> {
    let json = to_json(selection, meta)?;
    fs::write(path, json)
        .await
        .map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    info!(articles = selection.len(), "Wrote JSON digest");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScoredArticle;
    use crate::models::fixtures::article;
    use crate::scoring::ScoringPolicy;
    use chrono::NaiveDate;

    fn meta() -> DigestMeta {
        DigestMeta {
            generated_on: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
            policy: ScoringPolicy::Standard,
            days_back: 7,
            newsletter_count: 3,
        }
    }

    fn selection() -> DigestSelection {
        let scored = |title: &str, score: f64| ScoredArticle {
            article: article(title, 2),
            raw_score: score,
            normalized_score: Some(score),
            age_days: 2,
        };
        let mut selection = DigestSelection::default();
        selection.featured.push(scored("First", 100.0));
        selection
            .remainder_by_category
            .insert("Technology".to_string(), vec![scored("Second", 1.0)]);
        selection
    }

    #[test]
    fn test_document_shape() {
        let json = to_json(&selection(), &meta()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["generated_on"], "2025-05-10");
        assert_eq!(value["policy"], "Standard");
        assert_eq!(value["total_articles"], 2);
        assert_eq!(value["featured"][0]["title"], "First");
        assert_eq!(value["featured"][0]["normalized_score"], 100.0);
        assert_eq!(value["wildcards"].as_array().unwrap().len(), 0);
        let technology = &value["remainder_by_category"]["Technology"];
        assert_eq!(technology[0]["title"], "Second");
    }

    #[tokio::test]
    async fn test_write_selection() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("digest.json");
        write_selection(&selection(), &meta(), &path).await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let written: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(written["featured"][0]["author_name"], "Jane Doe");
    }

    #[tokio::test]
    async fn test_write_into_missing_dir_fails() {
        let path = Path::new("/nonexistent/dir/digest.json");
        let err = write_selection(&selection(), &meta(), path)
            .await
            .unwrap_err();
        assert!(matches!(err, OutputError::Io { .. }));
    }
}
