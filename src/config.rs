//! Run configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! command-line flags and environment variables (see [`crate::cli`]). Every
//! YAML key is optional:
//!
//! ```yaml
//! catalog: my_newsletters.csv
//! output_dir: ./digests
//! days_back: 7
//! featured_count: 5
//! wildcard_count: 1
//! policy: daily-average
//! weights:
//!   restack: 3.0
//!   comment: 2.0
//!   like: 1.0
//!   length: 0.05
//! max_retries: 3
//! use_metrics_api: true
//! ```
//!
//! [`DigestConfig::validate`] runs before any network access.

use crate::acquire::AcquisitionConfig;
use crate::error::ConfigError;
use crate::extractors::MetricsSource;
use crate::scoring::{ScoringPolicy, ScoringWeights};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

/// Upper bound on `max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Every tunable of a digest run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DigestConfig {
    pub catalog: PathBuf,
    pub output_dir: PathBuf,
    pub days_back: u32,
    pub featured_count: usize,
    /// Values above the wildcard window are clamped by the selector.
    pub wildcard_count: usize,
    pub policy: ScoringPolicy,
    pub weights: ScoringWeights,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub request_timeout_secs: u64,
    /// Per (newsletter, author) cap; 0 is unlimited.
    pub max_articles_per_author: usize,
    pub use_metrics_api: bool,
    pub normalize: bool,
    pub match_authors: bool,
    pub expand_coauthors: bool,
    /// Article CSV to replay instead of fetching.
    pub replay: Option<PathBuf>,
    pub max_runtime_secs: Option<u64>,
    pub json_output: bool,
    pub user_agent: String,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from("my_newsletters.csv"),
            output_dir: PathBuf::from("."),
            days_back: 7,
            featured_count: 5,
            wildcard_count: 1,
            policy: ScoringPolicy::default(),
            weights: ScoringWeights::default(),
            max_retries: 3,
            retry_base_delay_ms: 500,
            request_timeout_secs: 10,
            max_articles_per_author: 0,
            use_metrics_api: false,
            normalize: true,
            match_authors: true,
            expand_coauthors: false,
            replay: None,
            max_runtime_secs: None,
            json_output: false,
            user_agent: "Mozilla/5.0 (compatible; DigestBot/1.0)".to_string(),
        }
    }
}

impl DigestConfig {
    /// Parse a YAML document. Missing keys keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a YAML configuration file.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&yaml)?;
        debug!(?config, "Loaded configuration file");
        Ok(config)
    }

    /// Reject invalid tunable combinations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.days_back < 1 {
            return Err(ConfigError::invalid("days_back", "must be at least 1"));
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::invalid(
                "max_retries",
                format!("must be at most {MAX_RETRIES_LIMIT}, got {}", self.max_retries),
            ));
        }
        if self.request_timeout_secs < 1 {
            return Err(ConfigError::invalid(
                "request_timeout_secs",
                "must be at least 1",
            ));
        }
        for (field, weight) in [
            ("weights.restack", self.weights.restack),
            ("weights.comment", self.weights.comment),
            ("weights.like", self.weights.like),
            ("weights.length", self.weights.length),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::invalid(
                    field,
                    format!("must be a finite non-negative number, got {weight}"),
                ));
            }
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::invalid("user_agent", "must not be empty"));
        }
        if let Some(replay) = &self.replay
            && !replay.is_file()
        {
            return Err(ConfigError::invalid(
                "replay",
                format!("{} does not exist", replay.display()),
            ));
        }
        Ok(())
    }

    pub fn metrics_source(&self) -> MetricsSource {
        if self.use_metrics_api {
            MetricsSource::Api
        } else {
            MetricsSource::PageMarkup
        }
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Settings consumed by the acquisition pipeline.
    pub fn acquisition(&self) -> AcquisitionConfig {
        AcquisitionConfig {
            days_back: self.days_back,
            max_articles_per_author: self.max_articles_per_author,
            metrics: self.metrics_source(),
            match_authors: self.match_authors,
            expand_coauthors: self.expand_coauthors,
            max_runtime: self.max_runtime_secs.map(Duration::from_secs),
        }
    }
}
