//! Error taxonomy for the digest pipeline.
//!
//! Errors fall into two groups. Per-target failures ([`FetchError`],
//! [`ExtractionError`]) are recovered locally by the acquisition pipeline: the
//! newsletter or article is skipped and the run continues. Run-level failures
//! ([`ConfigError`], [`CatalogError`], [`OutputError`]) are fatal and surface
//! from `main`.
//!
//! Author rejection is not an error; see [`crate::authors::Resolution`].

use std::path::PathBuf;
use thiserror::Error;

/// Why a single fetch attempt failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Non-success HTTP status, or a transport error when `status` is `None`.
    #[error("HTTP error{}: {message}", .status.map(|s| format!(" {s}")).unwrap_or_default())]
    HttpError {
        status: Option<u16>,
        message: String,
    },

    /// The target does not exist (HTTP 404).
    #[error("not found")]
    NotFound,

    /// A response arrived but its body could not be read for parsing.
    #[error("response body unavailable: {0}")]
    ParseUnavailable(String),
}

impl FetchFailure {
    /// Whether another attempt may succeed.
    ///
    /// Timeouts, transport errors, server errors and rate limiting are
    /// transient. A 404, other 4xx statuses and unreadable bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchFailure::Timeout => true,
            FetchFailure::HttpError { status, .. } => {
                status.is_none_or(|s| s == 429 || s >= 500)
            }
            FetchFailure::NotFound | FetchFailure::ParseUnavailable(_) => false,
        }
    }

    /// Classify a reqwest transport error.
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchFailure::Timeout
        } else {
            FetchFailure::HttpError {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            }
        }
    }
}

/// Terminal fetch failure, after retries were exhausted or a
/// non-transient failure was seen.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("fetch of {target} failed after {attempts} attempt(s): {reason}")]
pub struct FetchError {
    pub target: String,
    pub attempts: u32,
    pub reason: FetchFailure,
}

/// A payload was fetched but could not be turned into article data.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The feed document could not be parsed as RSS, Atom or JSON Feed.
    #[error("failed to parse feed: {0}")]
    Feed(String),

    /// A field needed to identify the article was absent.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The metrics API returned something that is not JSON.
    #[error("invalid metrics JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// No metrics endpoint can be derived for the article URL.
    #[error("cannot derive metrics endpoint from {0}")]
    UnsupportedUrl(String),
}

/// Invalid tunables. Reported before any network access.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },

    #[error("failed to read configuration from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl ConfigError {
    /// Build an [`ConfigError::Invalid`] for one tunable.
    ///
    /// # Arguments
    ///
    /// * `field` - Config key as written in YAML, e.g. `weights.like`
    /// * `message` - What the value must satisfy
    ///
    /// # Example
    ///
    /// ```ignore
    /// return Err(ConfigError::invalid("days_back", "must be at least 1"));
    /// ```
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// The newsletter catalog could not be loaded at all.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog: {0}")]
    Csv(#[from] csv::Error),

    #[error("catalog {path:?} contains no usable newsletters")]
    Empty { path: PathBuf },
}

/// Writing or reading a digest artifact failed.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: Option<u16>) -> FetchFailure {
        FetchFailure::HttpError {
            status,
            message: String::new(),
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(FetchFailure::Timeout.is_transient());
        assert!(http(None).is_transient());
        assert!(http(Some(503)).is_transient());
        assert!(http(Some(429)).is_transient());
        assert!(!http(Some(403)).is_transient());
        assert!(!FetchFailure::NotFound.is_transient());
        assert!(!FetchFailure::ParseUnavailable("eof".into()).is_transient());
    }

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError {
            target: "https://example.substack.com/feed".to_string(),
            attempts: 4,
            reason: FetchFailure::HttpError {
                status: Some(502),
                message: "Bad Gateway".into(),
            },
        };
        let text = err.to_string();
        assert!(text.contains("example.substack.com"));
        assert!(text.contains("4 attempt(s)"));
        assert!(text.contains("HTTP error 502"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("days_back", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid value for days_back: must be at least 1"
        );
    }
}
