//! Text and file-system helpers.
//!
//! - Markup stripping, word counting and summary clipping for feed content
//! - HTML escaping for the digest renderer
//! - String truncation for log lines
//! - Output directory validation

use crate::error::OutputError;
use scraper::Html;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Maximum summary length, in characters, including the ellipsis.
pub const SUMMARY_MAX_CHARS: usize = 150;

/// Strip markup from an HTML fragment, returning its visible text.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment.root_element().text().collect::<Vec<_>>().join(" ")
}

/// Number of whitespace-separated words in an HTML fragment's text.
pub fn word_count(html: &str) -> u32 {
    if html.trim().is_empty() {
        return 0;
    }
    html_to_text(html).split_whitespace().count() as u32
}

/// Clean an HTML summary for display.
///
/// Markup is removed, whitespace collapsed, and text longer than
/// [`SUMMARY_MAX_CHARS`] is cut to 147 characters plus `...`.
pub fn clean_summary(html: &str) -> String {
    let text = html_to_text(html)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if text.chars().count() > SUMMARY_MAX_CHARS {
        let clipped: String = text.chars().take(SUMMARY_MAX_CHARS - 3).collect();
        format!("{}...", clipped.trim_end())
    } else {
        text
    }
}

/// Escape text for inclusion in HTML content or attribute values.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with `"…(+N chars)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", head, total - max)
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), OutputError> {
    fs::create_dir_all(path)
        .await
        .map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path).map_err(|source| OutputError::Io {
        path: probe_path.clone(),
        source,
    })?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
