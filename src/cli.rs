//! Command-line interface definitions for the newsletter digest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every tunable can also come from an environment variable or a YAML file
//! passed with `--config`; flags win over the file, the file wins over the
//! built-in defaults.

use crate::config::DigestConfig;
use crate::error::ConfigError;
use crate::scoring::ScoringPolicy;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the newsletter digest.
///
/// # Examples
///
/// ```sh
/// # Weekly digest from the default catalog
/// newsletter_digest
///
/// # Favor recent articles, pull restacks from the metrics API
/// newsletter_digest --policy daily-average --use-metrics-api -o ./digests
///
/// # Re-score last run's articles without touching the network
/// newsletter_digest --replay ./digests/articles_2025-05-10.csv --featured 10
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a config.yaml file
    #[arg(short, long, env = "DIGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Newsletter catalog CSV
    #[arg(long, env = "DIGEST_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Output directory for the digest, article CSV and JSON
    #[arg(short, long, env = "DIGEST_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Lookback window in days
    #[arg(short, long, env = "DIGEST_DAYS_BACK")]
    pub days_back: Option<u32>,

    /// Number of featured articles (0 = none)
    #[arg(long = "featured", env = "DIGEST_FEATURED")]
    pub featured_count: Option<usize>,

    /// Number of wildcard picks (0 = none)
    #[arg(long = "wildcards", env = "DIGEST_WILDCARDS")]
    pub wildcard_count: Option<usize>,

    /// Scoring policy
    #[arg(long, value_enum, env = "DIGEST_POLICY")]
    pub policy: Option<ScoringPolicy>,

    /// Retries after the first attempt for every network read
    #[arg(long, env = "DIGEST_MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Keep only the N most recent articles per author and newsletter (0 = unlimited)
    #[arg(long, env = "DIGEST_MAX_PER_AUTHOR")]
    pub max_articles_per_author: Option<usize>,

    /// Stop fetching new newsletters after this many seconds
    #[arg(long, env = "DIGEST_MAX_RUNTIME_SECS")]
    pub max_runtime_secs: Option<u64>,

    /// Reuse a previously written article CSV instead of fetching
    #[arg(long, value_name = "CSV")]
    pub replay: Option<PathBuf>,

    /// Read engagement from the metrics API (adds restacks and co-authors)
    #[arg(long)]
    pub use_metrics_api: bool,

    /// Use capped raw scores instead of rescaling to 1-100
    #[arg(long)]
    pub no_normalize: bool,

    /// Ignore per-newsletter author filters
    #[arg(long)]
    pub no_author_match: bool,

    /// Emit one entry per co-author
    #[arg(long)]
    pub expand_coauthors: bool,

    /// Also write the selection as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Layer these arguments over the config file (if any) and the defaults.
    ///
    /// Boolean flags only ever switch a behavior away from its default, so an
    /// absent flag leaves the file's value in place.
    pub fn into_config(self) -> Result<DigestConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => DigestConfig::from_file(path)?,
            None => DigestConfig::default(),
        };

        if let Some(catalog) = self.catalog {
            config.catalog = catalog;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(days_back) = self.days_back {
            config.days_back = days_back;
        }
        if let Some(featured_count) = self.featured_count {
            config.featured_count = featured_count;
        }
        if let Some(wildcard_count) = self.wildcard_count {
            config.wildcard_count = wildcard_count;
        }
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(max) = self.max_articles_per_author {
            config.max_articles_per_author = max;
        }
        if let Some(secs) = self.max_runtime_secs {
            config.max_runtime_secs = Some(secs);
        }
        if let Some(replay) = self.replay {
            config.replay = Some(replay);
        }

        config.use_metrics_api |= self.use_metrics_api;
        config.expand_coauthors |= self.expand_coauthors;
        config.json_output |= self.json;
        if self.no_normalize {
            config.normalize = false;
        }
        if self.no_author_match {
            config.match_authors = false;
        }

        Ok(config)
    }
}
