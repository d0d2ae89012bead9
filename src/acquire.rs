//! Article acquisition.
//!
//! Turns the newsletter catalog into [`ArticleRecord`]s, or reloads the
//! records of a previous run.
//!
//! # Pipeline
//!
//! For each newsletter, one at a time:
//!
//! 1. Fetch and parse the feed
//! 2. Keep entries published within the lookback window
//! 3. Reject entries whose byline fails the newsletter's author filter
//! 4. Fetch engagement from the article page or the metrics API
//! 5. Resolve the author(s), materializing one record per resolved author
//! 6. Apply the per-author cap
//!
//! Newsletters and articles are processed sequentially so no more than one
//! request is ever in flight. A failure confined to one newsletter or one
//! article is logged and counted in that newsletter's [`NewsletterReport`];
//! it never aborts the run.
//!
//! # Replay
//!
//! [`ArticleSource::Replay`] reads the article CSV written by a previous
//! fresh run instead. No network access happens and the records are
//! identical to the ones that were written.

use crate::authors::{AuthorPolicy, Resolution, resolve};
use crate::error::OutputError;
use crate::extractors::{MetricsSource, feed};
use crate::fetcher::{FetchAsync, RetryFetch};
use crate::models::{ArticleRecord, EngagementData, NewsletterEntry};
use crate::outputs::csv::read_records;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use itertools::Itertools;
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Acquisition settings derived from the run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionConfig {
    pub days_back: u32,
    /// 0 is unlimited.
    pub max_articles_per_author: usize,
    pub metrics: MetricsSource,
    /// Apply per-newsletter author filters.
    pub match_authors: bool,
    pub expand_coauthors: bool,
    /// Checked between newsletters; newsletters not yet started when it runs
    /// out are reported as skipped.
    pub max_runtime: Option<Duration>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            days_back: 7,
            max_articles_per_author: 0,
            metrics: MetricsSource::default(),
            match_authors: true,
            expand_coauthors: false,
            max_runtime: None,
        }
    }
}

/// Per-newsletter outcome, reported at the end of acquisition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsletterReport {
    pub name: String,
    /// Records produced.
    pub fetched: usize,
    /// Entries dropped because they were malformed or their metrics could
    /// not be fetched.
    pub skipped: usize,
    /// Entries excluded by the author filter.
    pub rejected: usize,
    /// Records dropped by the per-author cap.
    pub capped: usize,
    /// Retries spent across every request for this newsletter.
    pub retries: u32,
    /// Set when the newsletter contributed nothing because of a failure.
    pub failure: Option<String>,
}

impl NewsletterReport {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// Outcome of a whole fresh acquisition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub reports: Vec<NewsletterReport>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn total_retries(&self) -> u32 {
        self.reports.iter().map(|r| r.retries).sum()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| r.failure.is_some()).count()
    }

    /// Log one line per newsletter and a closing total.
    pub fn log(&self) {
        for report in &self.reports {
            let marker = if report.retries > 0 {
                " [retried]"
            } else {
                ""
            };
            match &report.failure {
                Some(reason) => warn!(
                    newsletter = %report.name,
                    retries = report.retries,
                    reason = %reason,
                    "Newsletter skipped{marker}"
                ),
                None => info!(
                    newsletter = %report.name,
                    fetched = report.fetched,
                    skipped = report.skipped,
                    rejected = report.rejected,
                    capped = report.capped,
                    retries = report.retries,
                    "Newsletter acquired{marker}"
                ),
            }
        }
        info!(
            newsletters = self.reports.len(),
            articles = self.reports.iter().map(|r| r.fetched).sum::<usize>(),
            failed = self.failed(),
            retries = self.total_retries(),
            elapsed = ?self.elapsed,
            "Acquisition complete"
        );
    }
}

/// Records ready for scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    pub records: Vec<ArticleRecord>,
    /// Newsletters the records were drawn from.
    pub newsletter_count: usize,
    /// `None` for replayed runs.
    pub summary: Option<RunSummary>,
}

/// Where a run's articles come from.
///
/// # Example
///
/// ```ignore
/// let source: ArticleSource<'_, HttpFetcher> = ArticleSource::Replay { path };
/// let acquisition = source.load(Utc::now()).await?;
/// ```
pub enum ArticleSource<'a, F> {
    FreshAcquisition {
        catalog: &'a [NewsletterEntry],
        config: &'a AcquisitionConfig,
        fetcher: &'a RetryFetch<F>,
    },
    Replay {
        path: &'a Path,
    },
}

impl<F: FetchAsync> ArticleSource<'_, F> {
    /// Produce the records to score, regardless of source.
    ///
    /// # Errors
    ///
    /// Only replay can fail, when the article CSV cannot be read.
    pub async fn load(self, now: DateTime<Utc>) -> Result<Acquisition, OutputError> {
        match self {
            ArticleSource::FreshAcquisition {
                catalog,
                config,
                fetcher,
            } => Ok(acquire(catalog, config, fetcher, now).await),
            ArticleSource::Replay { path } => replay(path).await,
        }
    }
}

/// Reload the records of a previous run.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn replay(path: &Path) -> Result<Acquisition, OutputError> {
    let records = read_records(path).await?;
    let newsletter_count = records
        .iter()
        .map(|r| r.newsletter_name.as_str())
        .unique()
        .count();
    info!(
        articles = records.len(),
        newsletters = newsletter_count,
        "Replaying previous run"
    );
    Ok(Acquisition {
        records,
        newsletter_count,
        summary: None,
    })
}

/// Fetch every newsletter in the catalog.
#[instrument(
    level = "info",
    skip_all,
    fields(newsletters = catalog.len(), days_back = config.days_back)
)]
pub async fn acquire<F: FetchAsync>(
    catalog: &[NewsletterEntry],
    config: &AcquisitionConfig,
    fetcher: &RetryFetch<F>,
    now: DateTime<Utc>,
) -> Acquisition {
    let started = Instant::now();
    let cutoff = now - ChronoDuration::days(i64::from(config.days_back));
    let mut records = Vec::new();
    let mut reports = Vec::with_capacity(catalog.len());

    for (i, newsletter) in catalog.iter().enumerate() {
        if let Some(budget) = config.max_runtime
            && started.elapsed() >= budget
        {
            warn!(
                ?budget,
                remaining = catalog.len() - i,
                "Runtime budget exhausted; skipping remaining newsletters"
            );
            reports.extend(catalog[i..].iter().map(|n| NewsletterReport {
                failure: Some("runtime budget exhausted".to_string()),
                ..NewsletterReport::new(&n.name)
            }));
            break;
        }

        info!(
            index = i + 1,
            total = catalog.len(),
            newsletter = %newsletter.name,
            "Processing newsletter"
        );
        let (found, report) = acquire_newsletter(newsletter, config, fetcher, cutoff).await;
        records.extend(found);
        reports.push(report);
    }

    let summary = RunSummary {
        reports,
        elapsed: started.elapsed(),
    };
    Acquisition {
        records,
        newsletter_count: catalog.len(),
        summary: Some(summary),
    }
}

#[instrument(level = "info", skip_all, fields(newsletter = %newsletter.name))]
async fn acquire_newsletter<F: FetchAsync>(
    newsletter: &NewsletterEntry,
    config: &AcquisitionConfig,
    fetcher: &RetryFetch<F>,
    cutoff: DateTime<Utc>,
) -> (Vec<ArticleRecord>, NewsletterReport) {
    let mut report = NewsletterReport::new(&newsletter.name);

    let payload = match fetcher.fetch(&newsletter.feed_url).await {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Feed unavailable; skipping newsletter");
            report.retries += e.attempts.saturating_sub(1);
            report.failure = Some(e.to_string());
            return (Vec::new(), report);
        }
    };
    report.retries += payload.attempts.saturating_sub(1);

    let entries = match feed::parse_feed(&payload) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Feed unparsable; skipping newsletter");
            report.failure = Some(e.to_string());
            return (Vec::new(), report);
        }
    };

    let policy = AuthorPolicy {
        filter: newsletter
            .author_filter
            .as_deref()
            .filter(|_| config.match_authors),
        publisher_fallback: newsletter.publisher_name.as_deref(),
        expand_coauthors: config.expand_coauthors,
    };

    let mut records = Vec::new();
    for entry in &entries {
        let data = match feed::extract_entry(entry) {
            Ok(data) => data,
            Err(e) => {
                warn!(entry = %entry.id, error = %e, "Malformed feed entry; skipping");
                report.skipped += 1;
                continue;
            }
        };
        let (Some(title), Some(link), Some(published_at)) =
            (data.title.clone(), data.link.clone(), data.published_at)
        else {
            debug!(entry = %entry.id, "Feed entry has no publication date; skipping");
            report.skipped += 1;
            continue;
        };
        if published_at < cutoff {
            debug!(%title, %published_at, "Outside lookback window");
            continue;
        }

        let candidate = (!data.authors.is_empty()).then(|| data.authors.join(" & "));
        if resolve(candidate.as_deref(), &[], &policy).is_rejected() {
            debug!(%title, byline = ?candidate, "Byline does not match author filter");
            report.rejected += 1;
            continue;
        }

        let Some(metrics) = fetch_metrics(config.metrics, &link, fetcher, &mut report).await
        else {
            report.skipped += 1;
            continue;
        };
        let merged = merge(data, metrics);

        let names = match resolve(candidate.as_deref(), &merged.authors, &policy) {
            Resolution::Accepted(names) => names,
            Resolution::Rejected => {
                debug!(%title, "Co-author bylines do not match author filter");
                report.rejected += 1;
                continue;
            }
        };

        for author_name in names {
            records.push(ArticleRecord {
                title: title.clone(),
                url: link.clone(),
                newsletter_name: newsletter.name.clone(),
                newsletter_url: newsletter.website_url.clone(),
                category: newsletter.category.clone(),
                author_name,
                published_at,
                word_count: merged.word_count,
                comment_count: merged.comment_count,
                like_count: merged.like_count,
                restack_count: merged.restack_count,
                summary: merged.summary.clone(),
            });
        }
    }

    let records: Vec<ArticleRecord> = records
        .into_iter()
        .unique_by(|r| (r.url.clone(), r.author_name.clone()))
        .collect();
    let before_cap = records.len();
    let records = cap_per_author(records, config.max_articles_per_author);
    report.capped = before_cap - records.len();
    report.fetched = records.len();

    (records, report)
}

/// Fetch and parse an article's engagement.
///
/// `None` when the metrics target cannot be read; the article is dropped. A
/// payload that was read but cannot be parsed yields zero engagement instead.
async fn fetch_metrics<F: FetchAsync>(
    source: MetricsSource,
    article_url: &str,
    fetcher: &RetryFetch<F>,
    report: &mut NewsletterReport,
) -> Option<EngagementData> {
    let target = match source.target_for(article_url) {
        Ok(target) => target,
        Err(e) => {
            warn!(
                url = %article_url,
                error = %e,
                "No metrics target; keeping article with zero engagement"
            );
            return Some(EngagementData::default());
        }
    };

    let payload = match fetcher.fetch(&target).await {
        Ok(payload) => payload,
        Err(e) => {
            warn!(url = %article_url, error = %e, "Metrics unavailable; dropping article");
            report.retries += e.attempts.saturating_sub(1);
            return None;
        }
    };
    report.retries += payload.attempts.saturating_sub(1);

    match source.extract(&payload) {
        Ok(metrics) => Some(metrics),
        Err(e) => {
            warn!(
                url = %article_url,
                error = %e,
                "Unreadable metrics; keeping article with zero engagement"
            );
            Some(EngagementData::default())
        }
    }
}

/// Combine feed fields with engagement counts. The feed stays authoritative
/// for identity and text; the metrics source's word count wins when it has one.
fn merge(feed: EngagementData, metrics: EngagementData) -> EngagementData {
    EngagementData {
        word_count: if metrics.word_count > 0 {
            metrics.word_count
        } else {
            feed.word_count
        },
        comment_count: metrics.comment_count,
        like_count: metrics.like_count,
        restack_count: metrics.restack_count,
        authors: metrics.authors,
        ..feed
    }
}

/// Keep the `max` most recent records per author; 0 keeps everything.
///
/// Records come from a single newsletter, so the author alone identifies the
/// (newsletter, author) pair. Survivors keep their original relative order.
fn cap_per_author(records: Vec<ArticleRecord>, max: usize) -> Vec<ArticleRecord> {
    if max == 0 {
        return records;
    }

    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(records[i].published_at));

    let mut per_author: HashMap<&str, usize> = HashMap::new();
    let mut keep = vec![false; records.len()];
    for i in order {
        let seen = per_author.entry(records[i].author_name.as_str()).or_insert(0);
        if *seen < max {
            *seen += 1;
            keep[i] = true;
        }
    }

    records
        .into_iter()
        .zip(keep)
        .filter_map(|(r, k)| k.then_some(r))
        .collect()
}
