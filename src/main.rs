//! # Newsletter Digest
//!
//! Aggregates the feeds of subscribed newsletters, ranks recent articles by
//! reader engagement and recency, and assembles an HTML digest.
//!
//! ## Features
//!
//! - Reads RSS and Atom feeds listed in a newsletter catalog CSV
//! - Scrapes engagement (likes, comments) from article pages, or reads
//!   likes, comments, restacks and co-authors from the platform's post API
//! - Per-newsletter author filters and per-author article caps
//! - Two scoring policies, total engagement and engagement per day
//! - Featured articles, random wildcard picks and per-category sections
//! - Replay mode: re-score a previous run's article CSV without network access
//!
//! ## Usage
//!
//! ```sh
//! newsletter_digest --catalog my_newsletters.csv -o ./digests
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Acquisition**: fetch feeds and engagement one newsletter at a time,
//!    with retry and backoff on every request (or replay a previous CSV)
//! 2. **Scoring**: compute and normalize a score for every article
//! 3. **Selection**: pick featured and wildcard articles, group the rest
//! 4. **Output**: write the article CSV, the HTML digest and optional JSON

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod acquire;
mod authors;
mod catalog;
mod cli;
mod config;
mod error;
mod extractors;
mod fetcher;
mod models;
mod outputs;
mod scoring;
mod selector;
mod utils;

use acquire::ArticleSource;
use cli::Cli;
use fetcher::{HttpFetcher, RetryFetch};
use models::ScoredArticle;
use outputs::html::DigestMeta;
use outputs::{csv, html, json};
use utils::{ensure_writable_dir, truncate_for_log};

/// Articles listed in the closing ranking log.
const TOP_LOGGED: usize = 5;

fn log_top_articles(scored: &[ScoredArticle]) {
    let mut ranked: Vec<&ScoredArticle> = scored.iter().collect();
    ranked.sort_by(|a, b| selector::rank_order(a, b));
    for (rank, s) in ranked.iter().take(TOP_LOGGED).enumerate() {
        info!(
            rank = rank + 1,
            title = %truncate_for_log(&s.article.title, 80),
            newsletter = %s.article.newsletter_name,
            score = s.score(),
            comments = s.article.comment_count,
            likes = s.article.like_count,
            restacks = ?s.article.restack_count,
            words = s.article.word_count,
            age_days = s.age_days,
            "Top article"
        );
    }
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("newsletter_digest starting up");

    // Parse CLI and layer it over the config file
    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }
    debug!(?config, "Resolved configuration");

    // Early check: ensure the output dir is writable
    if let Err(e) = ensure_writable_dir(&config.output_dir).await {
        error!(
            path = %config.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let now = Utc::now();
    let today = now.date_naive();

    // ---- Acquire articles ----
    let acquisition = match &config.replay {
        Some(path) => {
            let source: ArticleSource<'_, HttpFetcher> = ArticleSource::Replay { path };
            source.load(now).await?
        }
        None => {
            let catalog = match catalog::load_catalog(&config.catalog) {
                Ok(catalog) => catalog,
                Err(e) => {
                    error!(
                        path = %config.catalog.display(),
                        error = %e,
                        "Failed to load newsletter catalog"
                    );
                    return Err(e.into());
                }
            };
            let http = HttpFetcher::new(config.request_timeout(), &config.user_agent)?;
            let fetcher = RetryFetch::new(http, config.max_retries, config.retry_base_delay());
            let acquisition_config = config.acquisition();

            let acquisition = ArticleSource::FreshAcquisition {
                catalog: &catalog,
                config: &acquisition_config,
                fetcher: &fetcher,
            }
            .load(now)
            .await?;
            if let Some(summary) = &acquisition.summary {
                summary.log();
            }

            let csv_path = outputs::articles_path(&config.output_dir, today);
            if let Err(e) = csv::write_records(&acquisition.records, &csv_path).await {
                error!(path = %csv_path.display(), error = %e, "Failed to write article CSV");
            }
            acquisition
        }
    };
    info!(
        articles = acquisition.records.len(),
        newsletters = acquisition.newsletter_count,
        replay = config.replay.is_some(),
        "Articles ready for scoring"
    );

    // ---- Score and select ----
    let scored = scoring::score(
        acquisition.records,
        config.policy,
        &config.weights,
        config.normalize,
        now,
    );
    log_top_articles(&scored);

    let selection = selector::select(
        scored,
        config.featured_count,
        config.wildcard_count,
        &mut rand::rng(),
    );

    // ---- Output ----
    let meta = DigestMeta {
        generated_on: today,
        policy: config.policy,
        days_back: config.days_back,
        newsletter_count: acquisition.newsletter_count,
    };

    let html_path = outputs::digest_html_path(&config.output_dir, today);
    html::write_digest(&selection, &meta, &html_path).await?;

    if config.json_output {
        let json_path = outputs::digest_json_path(&config.output_dir, today);
        if let Err(e) = json::write_selection(&selection, &meta, &json_path).await {
            error!(error = %e, "Failed to write JSON digest");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        featured = selection.featured.len(),
        wildcards = selection.wildcards.len(),
        total = selection.len(),
        "Execution complete"
    );

    Ok(())
}
