//! Newsletter catalog loading.
//!
//! The catalog is a CSV export of subscriptions. Only a name and a feed (or
//! website) URL are required:
//!
//! | Column | Aliases | Required |
//! |--------|---------|----------|
//! | `name` | `Newsletter Name`, `Name` | yes |
//! | `feed_url` | `Feed URL`, `RSS URL`, `rss_url` | one of feed/website |
//! | `website_url` | `Website URL`, `url` | one of feed/website |
//! | `category` | `Category` | no, defaults to `Uncategorized` |
//! | `author_filter` | `Author Filter` | no |
//! | `publisher_name` | `Publisher` | no, defaults to the newsletter name |
//!
//! Unrecognised columns are ignored. A newsletter given only a website URL
//! gets `<website>/feed` as its feed.

use crate::error::CatalogError;
use crate::models::{DEFAULT_CATEGORY, NewsletterEntry};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, instrument, warn};
use url::Url;

#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(alias = "Newsletter Name", alias = "Name")]
    name: String,
    #[serde(default, alias = "Feed URL", alias = "RSS URL", alias = "rss_url")]
    feed_url: Option<String>,
    #[serde(default, alias = "Website URL", alias = "url")]
    website_url: Option<String>,
    #[serde(default, alias = "Category")]
    category: Option<String>,
    #[serde(default, alias = "Author Filter")]
    author_filter: Option<String>,
    #[serde(default, alias = "Publisher")]
    publisher_name: Option<String>,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Build the conventional feed URL from a newsletter's website.
///
/// # Arguments
///
/// * `website` - Homepage URL, with or without scheme and trailing slash
///
/// # Returns
///
/// `<website>/feed`, with `https://` added when no scheme was given.
///
/// # Example
///
/// ```ignore
/// assert_eq!(feed_url_for("slowboring.com"), "https://slowboring.com/feed");
/// ```
pub fn feed_url_for(website: &str) -> String {
    let base = website.trim().trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{base}/feed")
    } else {
        format!("https://{base}/feed")
    }
}

/// Homepage of a feed: its scheme and host.
fn website_for(feed_url: &str) -> String {
    Url::parse(feed_url)
        .ok()
        .map(|u| u.origin().ascii_serialization())
        .filter(|origin| origin != "null")
        .unwrap_or_else(|| feed_url.trim_end_matches("/feed").to_string())
}

impl CatalogRow {
    fn into_entry(self) -> Option<NewsletterEntry> {
        let name = self.name.trim().to_string();
        let website = non_blank(self.website_url);
        let feed_url =
            non_blank(self.feed_url).or_else(|| website.as_deref().map(feed_url_for))?;
        if name.is_empty() {
            return None;
        }
        let website_url = match website {
            Some(w) if w.starts_with("http") => w.trim_end_matches('/').to_string(),
            Some(w) => format!("https://{}", w.trim_end_matches('/')),
            None => website_for(&feed_url),
        };
        Some(NewsletterEntry {
            publisher_name: non_blank(self.publisher_name).or_else(|| Some(name.clone())),
            name,
            feed_url,
            website_url,
            category: non_blank(self.category)
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            author_filter: non_blank(self.author_filter),
        })
    }
}

/// Parse catalog rows from any reader. `source` names the input in errors.
pub fn parse_catalog<R: Read>(
    input: R,
    source: &Path,
) -> Result<Vec<NewsletterEntry>, CatalogError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);
    reader.headers()?;

    let mut entries = Vec::new();
    for (line, row) in reader.deserialize::<CatalogRow>().enumerate() {
        match row {
            Ok(row) => match row.into_entry() {
                Some(entry) => entries.push(entry),
                None => warn!(row = line + 1, "Catalog row has no name or URL; skipping"),
            },
            Err(e) => warn!(row = line + 1, error = %e, "Malformed catalog row; skipping"),
        }
    }

    if entries.is_empty() {
        return Err(CatalogError::Empty {
            path: source.to_path_buf(),
        });
    }
    Ok(entries)
}

/// Load the newsletter catalog from a CSV file.
///
/// # Errors
///
/// Fails when the file cannot be opened or no row yields a usable newsletter.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_catalog(path: &Path) -> Result<Vec<NewsletterEntry>, CatalogError> {
    let file = File::open(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let entries = parse_catalog(file, path)?;
    info!(count = entries.len(), "Loaded newsletters from catalog");
    Ok(entries)
}
