//! Digest layout selection.
//!
//! Scored articles are ranked by score (ties broken by the more recent
//! publication), then split into:
//!
//! 1. **Featured**: the top `featured_count` articles
//! 2. **Wildcards**: `wildcard_count` articles drawn at random from the
//!    [`WILDCARD_WINDOW`] articles just below the featured cut
//! 3. **Categories**: everything else, grouped by category in rank order

use crate::models::{DigestSelection, ScoredArticle};
use itertools::Itertools;
use rand::Rng;
use rand::seq::index;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Number of articles below the featured cut that wildcards are drawn from.
pub const WILDCARD_WINDOW: usize = 10;

/// Ranking order: higher score first, then more recent first.
pub fn rank_order(a: &ScoredArticle, b: &ScoredArticle) -> Ordering {
    b.score()
        .total_cmp(&a.score())
        .then_with(|| b.article.published_at.cmp(&a.article.published_at))
}

/// Partition scored articles into featured, wildcard and categorized sets.
///
/// Every input article lands in exactly one section. Wildcards keep their
/// rank order. When fewer than `wildcard_count` articles sit below the cut,
/// all of them become wildcards.
#[instrument(
    level = "info",
    skip_all,
    fields(
        total = scored.len(),
        featured_count = featured_count,
        wildcard_count = wildcard_count
    )
)]
pub fn select<R: Rng + ?Sized>(
    mut scored: Vec<ScoredArticle>,
    featured_count: usize,
    wildcard_count: usize,
    rng: &mut R,
) -> DigestSelection {
    scored.sort_by(rank_order);

    let cut = featured_count.min(scored.len());
    let mut rest = scored.split_off(cut);
    let featured = scored;

    let window = rest.len().min(WILDCARD_WINDOW);
    let picks = wildcard_count.min(window);
    let mut chosen = index::sample(rng, window, picks).into_vec();
    chosen.sort_unstable();

    // Remove from the back so earlier indices stay valid.
    let mut wildcards: Vec<ScoredArticle> =
        chosen.iter().rev().map(|&i| rest.remove(i)).collect();
    wildcards.reverse();

    let remainder_by_category: BTreeMap<String, Vec<ScoredArticle>> = rest
        .into_iter()
        .into_group_map_by(|s| s.article.category_or_default().to_string())
        .into_iter()
        .collect();

    debug!(
        featured = featured.len(),
        wildcards = wildcards.len(),
        categories = remainder_by_category.len(),
        "Selected digest layout"
    );

    DigestSelection {
        featured,
        wildcards,
        remainder_by_category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::article;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn scored(title: &str, score: f64, days_old: i64, category: &str) -> ScoredArticle {
        let mut record = article(title, days_old);
        record.category = category.to_string();
        ScoredArticle {
            article: record,
            raw_score: score,
            normalized_score: Some(score),
            age_days: days_old,
        }
    }

    fn sample(n: usize) -> Vec<ScoredArticle> {
        (0..n)
            .map(|i| {
                let category = ["Technology", "Politics", ""][i % 3];
                scored(&format!("Article {i}"), 100.0 - i as f64, 1, category)
            })
            .collect()
    }

    fn titles(articles: &[ScoredArticle]) -> Vec<String> {
        articles.iter().map(|s| s.article.title.clone()).collect()
    }

    fn assert_partition(input: &[ScoredArticle], selection: &DigestSelection) {
        let expected: HashSet<String> = input.iter().map(|s| s.article.title.clone()).collect();
        let seen: Vec<String> = selection
            .iter()
            .map(|s| s.article.title.clone())
            .collect();
        let unique: HashSet<String> = seen.iter().cloned().collect();
        assert_eq!(seen.len(), unique.len(), "an article appears twice");
        assert_eq!(unique, expected, "articles lost or invented");
    }

    #[test]
    fn test_partition_for_all_count_combinations() {
        let input = sample(17);
        for featured in [0, 1, 5, 17, 30] {
            for wildcards in [0, 1, 3, 10] {
                let mut rng = StdRng::seed_from_u64(7);
                let selection = select(input.clone(), featured, wildcards, &mut rng);
                assert_partition(&input, &selection);
                assert_eq!(selection.featured.len(), featured.min(17));
            }
        }
    }

    #[test]
    fn test_featured_are_top_ranked() {
        let mut input = sample(8);
        input.reverse();
        let mut rng = StdRng::seed_from_u64(1);
        let selection = select(input, 3, 0, &mut rng);
        assert_eq!(
            titles(&selection.featured),
            vec!["Article 0", "Article 1", "Article 2"]
        );
    }

    #[test]
    fn test_ties_broken_by_recency() {
        let input = vec![scored("Old", 50.0, 5, "A"), scored("New", 50.0, 1, "A")];
        let mut rng = StdRng::seed_from_u64(1);
        let selection = select(input, 1, 0, &mut rng);
        assert_eq!(titles(&selection.featured), vec!["New"]);
    }

    #[test]
    fn test_wildcards_drawn_from_window_below_cut() {
        let input = sample(30);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let selection = select(input.clone(), 5, 2, &mut rng);
            assert_eq!(selection.wildcards.len(), 2);
            for w in &selection.wildcards {
                let rank: usize = w
                    .article
                    .title
                    .trim_start_matches("Article ")
                    .parse()
                    .unwrap();
                assert!((5..15).contains(&rank), "wildcard rank {rank}");
            }
            let [first, second] = &selection.wildcards[..] else {
                panic!("expected two wildcards");
            };
            assert!(rank_order(first, second).is_le());
        }
    }

    #[test]
    fn test_small_window_limits_wildcards() {
        // featured_count = 3 with 5 articles left: at most those 5 are candidates.
        let input = sample(8);
        let mut rng = StdRng::seed_from_u64(3);
        let selection = select(input.clone(), 3, 10, &mut rng);
        assert_eq!(selection.wildcards.len(), 5);
        assert!(selection.remainder_by_category.is_empty());
        assert_partition(&input, &selection);
    }

    #[test]
    fn test_remainder_grouped_by_category_in_rank_order() {
        let input = sample(9);
        let mut rng = StdRng::seed_from_u64(11);
        let selection = select(input, 0, 0, &mut rng);
        let keys: Vec<&str> = selection
            .remainder_by_category
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["Politics", "Technology", "Uncategorized"]);
        assert_eq!(
            titles(&selection.remainder_by_category["Technology"]),
            vec!["Article 0", "Article 3", "Article 6"]
        );
        assert_eq!(selection.remainder_by_category["Uncategorized"].len(), 3);
    }

    #[test]
    fn test_empty_input() {
        let mut rng = StdRng::seed_from_u64(0);
        let selection = select(Vec::new(), 5, 1, &mut rng);
        assert!(selection.is_empty());
    }
}
