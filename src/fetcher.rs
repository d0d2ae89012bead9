//! Network reads with bounded retry and exponential backoff.
//!
//! Every external read (feed, article page, metrics endpoint) goes through
//! this module. It is the failure-isolation unit of the pipeline: a target
//! that cannot be read yields a typed [`FetchError`] instead of aborting the
//! run.
//!
//! # Architecture
//!
//! - [`FetchAsync`]: one attempt at reading a target
//! - [`HttpFetcher`]: the reqwest-backed implementation
//! - [`RetryFetch`]: decorator adding retry with backoff to any [`FetchAsync`]
//!
//! # Retry Strategy
//!
//! - `max_retries` retries after the first attempt (3 by default)
//! - delay before retry `n` is `base_delay * 2^(n-1)` plus up to
//!   `base_delay / 4` of jitter, so the delay grows strictly with each retry
//! - only transient failures are retried (see [`FetchFailure::is_transient`])

use crate::error::{FetchError, FetchFailure};
use rand::{Rng, rng};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Body of a successful read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload {
    /// The URL that was read.
    pub url: String,
    pub body: String,
    /// Attempts it took, 1 when no retry was needed.
    pub attempts: u32,
}

/// A single attempt at reading a network target.
pub trait FetchAsync {
    async fn fetch(&self, url: &str) -> Result<String, FetchFailure>;
}

/// HTTP implementation of [`FetchAsync`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client with the given per-request timeout and User-Agent.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Upper bound for a single request, connect through body
    /// * `user_agent` - Sent with every request
    ///
    /// # Errors
    ///
    /// Returns the reqwest error when the TLS backend cannot be initialized.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let http = HttpFetcher::new(Duration::from_secs(30), "DigestBot/1.0")?;
    /// ```
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

impl FetchAsync for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<String, FetchFailure> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchFailure::from_reqwest(&e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchFailure::NotFound);
        }
        if !status.is_success() {
            return Err(FetchFailure::HttpError {
                status: Some(status.as_u16()),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchFailure::Timeout
            } else {
                FetchFailure::ParseUnavailable(e.to_string())
            }
        })
    }
}

/// Adds retry with exponential backoff to any [`FetchAsync`] implementation.
///
/// Holds no state between calls; each target is retried independently.
pub struct RetryFetch<T> {
    inner: T,
    max_retries: u32,
    base_delay: Duration,
}

impl<T> RetryFetch<T>
where
    T: FetchAsync,
{
    /// Create a new retry wrapper around an existing [`FetchAsync`] implementation.
    ///
    /// # Arguments
    ///
    /// * `inner` - The fetcher that performs single attempts
    /// * `max_retries` - Retries allowed after the first attempt (3 by default)
    /// * `base_delay` - Delay before the first retry, doubled for each further one
    ///
    /// # Example
    ///
    /// ```ignore
    /// let http = HttpFetcher::new(Duration::from_secs(30), "DigestBot/1.0")?;
    /// let fetcher = RetryFetch::new(http, 3, Duration::from_millis(500));
    /// let payload = fetcher.fetch("https://example.substack.com/feed").await?;
    /// ```
    pub fn new(inner: T, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
        }
    }

    #[cfg(test)]
    pub(crate) fn inner(&self) -> &T {
        &self.inner
    }

    /// Backoff before retry number `retry` (1-based), without jitter.
    ///
    /// # Arguments
    ///
    /// * `retry` - 1 for the first retry, 2 for the second, and so on
    ///
    /// # Returns
    ///
    /// `base_delay * 2^(retry - 1)`, saturating on overflow.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(20);
        self.base_delay.saturating_mul(1 << exponent)
    }

    fn jitter(&self) -> Duration {
        let max_ms = (self.base_delay.as_millis() / 4) as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng().random_range(0..max_ms))
    }

    /// Read `url`, retrying transient failures.
    ///
    /// # Arguments
    ///
    /// * `url` - The feed, article page or metrics endpoint to read
    ///
    /// # Returns
    ///
    /// The body together with the number of attempts it took.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] once retries are exhausted or as soon as a
    /// non-transient failure (e.g. 404) is seen.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn fetch(&self, url: &str) -> Result<RawPayload, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let attempt_t0 = Instant::now();
            match self.inner.fetch(url).await {
                Ok(body) => {
                    if attempt > 1 {
                        debug!(attempt, "fetch succeeded after retry");
                    }
                    return Ok(RawPayload {
                        url: url.to_string(),
                        body,
                        attempts: attempt,
                    });
                }
                Err(reason) => {
                    let retries_used = attempt - 1;
                    if !reason.is_transient() || retries_used >= self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %reason,
                            transient = reason.is_transient(),
                            "fetch gave up"
                        );
                        return Err(FetchError {
                            target: url.to_string(),
                            attempts: attempt,
                            reason,
                        });
                    }

                    let delay = self.backoff_delay(attempt) + self.jitter();
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_t0.elapsed().as_millis() as u64,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                        ?delay,
                        error = %reason,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .finish()
    }
}
