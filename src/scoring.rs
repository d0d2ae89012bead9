//! Article scoring.
//!
//! Both policies share the same engagement and length terms:
//!
//! ```text
//! engagement   = restacks * W_r + comments * W_c + likes * W_l
//! length_bonus = (word_count / 100) * W_len
//! ```
//!
//! - [`ScoringPolicy::Standard`]: `engagement + length_bonus`
//! - [`ScoringPolicy::DailyAverage`]: `engagement / max(age_days, 1) + length_bonus`
//!
//! Raw scores are then rescaled across the whole set into `[1, 100]`, or,
//! with normalization suppressed, capped at 100.

use crate::models::{ArticleRecord, ScoredArticle};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Upper bound of the display range, and cap for unnormalized scores.
pub const MAX_SCORE: f64 = 100.0;
/// Lower bound of the normalized range.
pub const MIN_SCORE: f64 = 1.0;

/// How raw engagement is turned into a score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringPolicy {
    /// Total engagement. Favors articles with the most engagement overall.
    #[default]
    Standard,
    /// Engagement per day since publication. Favors recent articles.
    #[serde(alias = "daily_average")]
    DailyAverage,
}

impl ScoringPolicy {
    /// Human-readable policy name shown in the digest header.
    ///
    /// # Returns
    ///
    /// `"Standard"` or `"Daily Average"`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// assert_eq!(ScoringPolicy::DailyAverage.label(), "Daily Average");
    /// ```
    pub fn label(self) -> &'static str {
        match self {
            ScoringPolicy::Standard => "Standard",
            ScoringPolicy::DailyAverage => "Daily Average",
        }
    }
}

/// Multipliers for each engagement signal and for article length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub restack: f64,
    pub comment: f64,
    pub like: f64,
    /// Bonus per 100 words.
    pub length: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            restack: 3.0,
            comment: 2.0,
            like: 1.0,
            length: 0.05,
        }
    }
}

impl ScoringWeights {
    /// Weighted engagement. Articles without restack data contribute no
    /// restack term.
    ///
    /// # Arguments
    ///
    /// * `article` - Record carrying the comment, like and restack counts
    ///
    /// # Returns
    ///
    /// `restacks * restack + comments * comment + likes * like`
    pub fn engagement(&self, article: &ArticleRecord) -> f64 {
        article.restack_count.unwrap_or(0) as f64 * self.restack
            + article.comment_count as f64 * self.comment
            + article.like_count as f64 * self.like
    }

    /// Bonus proportional to article length, `length` per 100 words.
    pub fn length_bonus(&self, article: &ArticleRecord) -> f64 {
        (article.word_count as f64 / 100.0) * self.length
    }
}

/// Whole days between publication and `now`; future dates count as 0.
///
/// # Arguments
///
/// * `article` - Record whose `published_at` is measured
/// * `now` - Reference instant for the run
///
/// # Returns
///
/// Age in whole days, never negative.
pub fn age_days(article: &ArticleRecord, now: DateTime<Utc>) -> i64 {
    (now - article.published_at).num_days().max(0)
}

/// Raw score of one article under `policy`.
///
/// # Arguments
///
/// * `article` - The record to score
/// * `policy` - Total engagement or engagement per day
/// * `weights` - Signal multipliers
/// * `now` - Reference instant for the age used by the daily average
///
/// # Returns
///
/// The unnormalized score; the daily average divides engagement by
/// `max(age_days, 1)` before the length bonus is added.
///
/// # Example
///
/// ```ignore
/// let raw = raw_score(&record, ScoringPolicy::Standard, &ScoringWeights::default(), Utc::now());
/// ```
pub fn raw_score(
    article: &ArticleRecord,
    policy: ScoringPolicy,
    weights: &ScoringWeights,
    now: DateTime<Utc>,
) -> f64 {
    let engagement = weights.engagement(article);
    let engagement = match policy {
        ScoringPolicy::Standard => engagement,
        ScoringPolicy::DailyAverage => {
            engagement / age_days(article, now).max(1) as f64
        }
    };
    engagement + weights.length_bonus(article)
}

/// Score every record.
///
/// Normalized scores depend on the whole set: the lowest raw score maps to 1
/// and the highest to 100. A set whose raw scores are all equal (including a
/// single record) maps every article to 100. With `normalize` off,
/// `normalized_score` is `None` and `raw_score` is capped at 100.
///
/// # Arguments
///
/// * `records` - Every acquired or replayed article
/// * `policy` - Scoring policy for the run
/// * `weights` - Signal multipliers
/// * `normalize` - Rescale into `[1, 100]` when `true`, cap at 100 otherwise
/// * `now` - Reference instant for ages
///
/// # Returns
///
/// One [`ScoredArticle`] per record, in input order.
///
/// # Example
///
/// ```ignore
/// let scored = score(records, config.policy, &config.weights, config.normalize, now);
/// ```
#[instrument(
    level = "info",
    skip_all,
    fields(count = records.len(), ?policy, normalize = normalize)
)]
pub fn score(
    records: Vec<ArticleRecord>,
    policy: ScoringPolicy,
    weights: &ScoringWeights,
    normalize: bool,
    now: DateTime<Utc>,
) -> Vec<ScoredArticle> {
    let raws: Vec<f64> = records
        .iter()
        .map(|r| raw_score(r, policy, weights, now))
        .collect();
    let min = raws.iter().copied().fold(f64::INFINITY, f64::min);
    let max = raws.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    let scored: Vec<ScoredArticle> = records
        .into_iter()
        .zip(raws)
        .map(|(article, raw)| {
            let age_days = age_days(&article, now);
            if normalize {
                let normalized = if range > f64::EPSILON {
                    MIN_SCORE + (raw - min) / range * (MAX_SCORE - MIN_SCORE)
                } else {
                    MAX_SCORE
                };
                ScoredArticle {
                    article,
                    raw_score: raw,
                    normalized_score: Some(normalized.clamp(MIN_SCORE, MAX_SCORE)),
                    age_days,
                }
            } else {
                ScoredArticle {
                    article,
                    raw_score: raw.min(MAX_SCORE),
                    normalized_score: None,
                    age_days,
                }
            }
        })
        .collect();

    info!(scored = scored.len(), "Scored articles");
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{article, now};

    fn engaged(
        title: &str,
        days_old: i64,
        comments: u32,
        likes: u32,
        restacks: Option<u32>,
    ) -> ArticleRecord {
        ArticleRecord {
            comment_count: comments,
            like_count: likes,
            restack_count: restacks,
            ..article(title, days_old)
        }
    }

    #[test]
    fn test_default_weights() {
        let w = ScoringWeights::default();
        assert_eq!(w.restack, 3.0);
        assert_eq!(w.comment, 2.0);
        assert_eq!(w.like, 1.0);
        assert_eq!(w.length, 0.05);
    }

    #[test]
    fn test_standard_formula() {
        let record = ArticleRecord {
            word_count: 2000,
            ..engaged("A", 3, 4, 10, Some(2))
        };
        // 2*3 + 4*2 + 10*1 = 24, plus 20 * 0.05 = 1
        let w = ScoringWeights::default();
        let raw = raw_score(&record, ScoringPolicy::Standard, &w, now());
        assert!((raw - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_engagement_still_gets_length_bonus() {
        let record = engaged("Quiet", 2, 0, 0, None);
        let w = ScoringWeights::default();
        assert_eq!(w.engagement(&record), 0.0);
        assert!(w.length_bonus(&record) > 0.0);
        assert!(raw_score(&record, ScoringPolicy::Standard, &w, now()) > 0.0);
    }

    #[test]
    fn test_policies_agree_at_one_day_and_diverge_later() {
        let w = ScoringWeights::default();
        let fresh = engaged("Fresh", 1, 5, 20, None);
        assert_eq!(
            raw_score(&fresh, ScoringPolicy::Standard, &w, now()),
            raw_score(&fresh, ScoringPolicy::DailyAverage, &w, now())
        );

        let older = engaged("Older", 4, 5, 20, None);
        let standard = raw_score(&older, ScoringPolicy::Standard, &w, now());
        let daily = raw_score(&older, ScoringPolicy::DailyAverage, &w, now());
        assert!(daily < standard);
        // 30 / 4 + 0.6
        assert!((daily - 8.1).abs() < 1e-9);
    }

    #[test]
    fn test_same_day_age_floored_to_one() {
        let w = ScoringWeights::default();
        let today = engaged("Today", 0, 1, 1, None);
        assert_eq!(age_days(&today, now()), 0);
        assert_eq!(
            raw_score(&today, ScoringPolicy::DailyAverage, &w, now()),
            raw_score(&today, ScoringPolicy::Standard, &w, now())
        );
    }

    #[test]
    fn test_normalized_scores_within_range() {
        let records = vec![
            engaged("Low", 2, 0, 0, None),
            engaged("Mid", 2, 3, 10, Some(1)),
            engaged("High", 2, 40, 300, Some(25)),
        ];
        let w = ScoringWeights::default();
        let scored = score(records, ScoringPolicy::Standard, &w, true, now());
        for s in &scored {
            let n = s.normalized_score.unwrap();
            assert!((MIN_SCORE..=MAX_SCORE).contains(&n), "{n} out of range");
        }
        assert_eq!(scored[0].normalized_score, Some(MIN_SCORE));
        assert_eq!(scored[2].normalized_score, Some(MAX_SCORE));
    }

    #[test]
    fn test_single_record_normalizes_to_fixed_point() {
        let records = vec![engaged("Only", 1, 2, 2, None)];
        let w = ScoringWeights::default();
        let scored = score(records, ScoringPolicy::Standard, &w, true, now());
        assert_eq!(scored[0].normalized_score, Some(MAX_SCORE));
    }

    #[test]
    fn test_equal_scores_normalize_to_fixed_point() {
        let records = vec![engaged("A", 1, 2, 2, None), engaged("B", 1, 2, 2, None)];
        let w = ScoringWeights::default();
        let scored = score(records, ScoringPolicy::Standard, &w, true, now());
        assert!(scored.iter().all(|s| s.normalized_score == Some(MAX_SCORE)));
    }

    #[test]
    fn test_unnormalized_scores_capped_not_floored() {
        let records = vec![
            engaged("Viral", 1, 500, 5000, Some(100)),
            engaged("Quiet", 1, 0, 0, None),
        ];
        let w = ScoringWeights::default();
        let scored = score(records, ScoringPolicy::Standard, &w, false, now());
        assert_eq!(scored[0].raw_score, MAX_SCORE);
        assert!(scored[0].normalized_score.is_none());
        assert!((scored[1].raw_score - 0.6).abs() < 1e-9);
        for s in &scored {
            assert!((0.0..=MAX_SCORE).contains(&s.raw_score));
        }
    }

    #[test]
    fn test_empty_input() {
        let w = ScoringWeights::default();
        let scored = score(Vec::new(), ScoringPolicy::DailyAverage, &w, true, now());
        assert!(scored.is_empty());
    }

    #[test]
    fn test_policy_labels_and_serde() {
        assert_eq!(ScoringPolicy::DailyAverage.label(), "Daily Average");
        let parsed: ScoringPolicy = serde_yaml::from_str("daily-average").unwrap();
        assert_eq!(parsed, ScoringPolicy::DailyAverage);
        let parsed: ScoringPolicy = serde_yaml::from_str("daily_average").unwrap();
        assert_eq!(parsed, ScoringPolicy::DailyAverage);
    }
}
