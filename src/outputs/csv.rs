//! Flat CSV dump of article records.
//!
//! Written after every fresh acquisition, this file doubles as the replay-mode
//! cache: [`read_records`] turns it back into exactly the records that were
//! written, so scoring cannot tell a replayed run from a fresh one.
//!
//! Columns follow the field order of [`ArticleRecord`]. `published_at` is
//! RFC 3339 with full precision and `restack_count` is empty when the metrics
//! source did not report restacks.

use crate::error::OutputError;
use crate::models::ArticleRecord;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Serialize records to CSV bytes.
pub fn to_csv(records: &[ArticleRecord]) -> Result<Vec<u8>, OutputError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| OutputError::Csv(e.into_error().into()))
}

/// Parse records from CSV bytes.
pub fn from_csv(bytes: &[u8]) -> Result<Vec<ArticleRecord>, OutputError> {
    let mut reader = csv::Reader::from_reader(bytes);
    let records = reader
        .deserialize()
        .collect::<Result<Vec<ArticleRecord>, _>>()?;
    Ok(records)
}

/// Write every article record to `path`.
#[instrument(
    level = "info",
    skip_all,
    fields(path = %path.display(), count = records.len())
)]
pub async fn write_records(records: &[ArticleRecord], path: &Path) -> Result<(), OutputError> {
    let bytes = to_csv(records)?;
    fs::write(path, bytes)
        .await
        .map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    info!("Wrote article CSV");
    Ok(())
}

/// Load article records written by [`write_records`].
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_records(path: &Path) -> Result<Vec<ArticleRecord>, OutputError> {
    let bytes = fs::read(path)
        .await
        .map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let records = from_csv(&bytes)?;
    info!(count = records.len(), "Loaded article CSV");
    Ok(records)
}
