//! Output generation for the article dump and the digest.
//!
//! # Submodules
//!
//! - [`csv`]: flat dump of every [`crate::models::ArticleRecord`], also the
//!   replay-mode input
//! - [`html`]: the human-facing digest
//! - [`json`]: the digest selection for other tools
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── articles_2025-05-10.csv
//! ├── digest_2025-05-10.html
//! └── digest_2025-05-10.json   # with --json
//! ```

pub mod csv;
pub mod html;
pub mod json;

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Path of the article CSV for a run.
///
/// # Arguments
///
/// * `output_dir` - Directory every artifact is written to
/// * `date` - Run date, embedded in the file name
///
/// # Returns
///
/// `<output_dir>/articles_<YYYY-MM-DD>.csv`, which is also what `--replay`
/// expects.
///
/// # Example
///
/// ```ignore
/// let path = articles_path(Path::new("./digests"), today);
/// csv::write_records(&records, &path).await?;
/// ```
pub fn articles_path(output_dir: &Path, date: NaiveDate) -> PathBuf {
    output_dir.join(format!("articles_{date}.csv"))
}

pub fn digest_html_path(output_dir: &Path, date: NaiveDate) -> PathBuf {
    output_dir.join(format!("digest_{date}.html"))
}

pub fn digest_json_path(output_dir: &Path, date: NaiveDate) -> PathBuf {
    output_dir.join(format!("digest_{date}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_paths() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        let dir = Path::new("/tmp/out");
        assert_eq!(
            articles_path(dir, date),
            PathBuf::from("/tmp/out/articles_2025-05-10.csv")
        );
        assert_eq!(
            digest_html_path(dir, date),
            PathBuf::from("/tmp/out/digest_2025-05-10.html")
        );
        assert_eq!(
            digest_json_path(dir, date),
            PathBuf::from("/tmp/out/digest_2025-05-10.json")
        );
    }
}
