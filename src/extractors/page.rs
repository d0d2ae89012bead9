//! Engagement scraping from article page markup.
//!
//! Article pages embed schema.org `interactionStatistic` data, either as a
//! `<meta property="interactionStatistic">` whose content is JSON or inside a
//! JSON-LD script block. When that yields nothing, the counts shown on the
//! like and comment buttons (`aria-label="Like (12)"`,
//! `aria-label="View comments (3)"`) are used instead.
//!
//! Pages never expose restacks.

use super::count_from;
use crate::fetcher::RawPayload;
use crate::models::EngagementData;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, instrument};

static INTERACTION_META: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"meta[property="interactionStatistic"], meta[itemprop="interactionStatistic"]"#,
    )
    .expect("valid interactionStatistic selector")
});
static JSON_LD: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid JSON-LD selector")
});
static ARIA_LABELLED: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("button[aria-label], a[aria-label]").expect("valid aria-label selector")
});

static LIKE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Like \((\d[\d,]*)\)").expect("valid like regex"));
static COMMENT_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"View comments \((\d[\d,]*)\)").expect("valid comment regex")
});

/// Scrape comment and like counts from an article page.
///
/// Never fails: a page without recognisable markup yields zero counts.
#[instrument(level = "debug", skip_all, fields(url = %payload.url))]
pub fn extract(payload: &RawPayload) -> EngagementData {
    let document = Html::parse_document(&payload.body);
    let mut data = EngagementData::default();

    for meta in document.select(&INTERACTION_META) {
        if let Some(content) = meta.value().attr("content")
            && let Ok(stats) = serde_json::from_str::<Value>(content)
        {
            apply_statistics(&stats, &mut data);
        }
    }

    for script in document.select(&JSON_LD) {
        let raw = script.text().collect::<String>();
        if let Ok(value) = serde_json::from_str::<Value>(&raw) {
            apply_json_ld(&value, &mut data);
        }
    }

    if data.like_count == 0 || data.comment_count == 0 {
        for element in document.select(&ARIA_LABELLED) {
            let Some(label) = element.value().attr("aria-label") else {
                continue;
            };
            if data.like_count == 0
                && let Some(n) = capture_count(&LIKE_LABEL, label)
            {
                data.like_count = n;
            }
            if data.comment_count == 0
                && let Some(n) = capture_count(&COMMENT_LABEL, label)
            {
                data.comment_count = n;
            }
        }
    }

    debug!(
        likes = data.like_count,
        comments = data.comment_count,
        "Scraped page engagement"
    );
    data
}

fn capture_count(pattern: &Regex, label: &str) -> Option<u32> {
    pattern
        .captures(label)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
}

/// Walk a JSON-LD value looking for `interactionStatistic` blocks.
fn apply_json_ld(value: &Value, data: &mut EngagementData) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| apply_json_ld(item, data)),
        Value::Object(map) => {
            if let Some(stats) = map.get("interactionStatistic") {
                apply_statistics(stats, data);
            }
            if let Some(graph) = map.get("@graph") {
                apply_json_ld(graph, data);
            }
        }
        _ => {}
    }
}

/// Apply one `InteractionCounter` or a list of them.
fn apply_statistics(stats: &Value, data: &mut EngagementData) {
    match stats {
        Value::Array(items) => items.iter().for_each(|item| apply_statistics(item, data)),
        Value::Object(map) => {
            let kind = match map.get("interactionType") {
                Some(Value::String(s)) => s.as_str(),
                Some(Value::Object(t)) => {
                    t.get("@type").and_then(Value::as_str).unwrap_or("")
                }
                _ => "",
            };
            let count = map.get("userInteractionCount").map(count_from).unwrap_or(0);
            if kind.ends_with("LikeAction") {
                data.like_count = data.like_count.max(count);
            } else if kind.ends_with("CommentAction") {
                data.comment_count = data.comment_count.max(count);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(body: &str) -> RawPayload {
        RawPayload {
            url: "https://example.substack.com/p/post".to_string(),
            body: body.to_string(),
            attempts: 1,
        }
    }

    #[test]
    fn test_meta_interaction_statistic() {
        let html = r#"<html><head>
            <meta property="interactionStatistic" content='[
                {"@type":"InteractionCounter",
                 "interactionType":"https://schema.org/LikeAction",
                 "userInteractionCount":42},
                {"@type":"InteractionCounter",
                 "interactionType":"https://schema.org/CommentAction",
                 "userInteractionCount":7}]'>
        </head><body></body></html>"#;
        let data = extract(&payload(html));
        assert_eq!(data.like_count, 42);
        assert_eq!(data.comment_count, 7);
        assert_eq!(data.restack_count, None);
    }

    #[test]
    fn test_json_ld_interaction_statistic() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@context":"https://schema.org","@type":"NewsArticle",
             "interactionStatistic":[
                {"interactionType":{"@type":"LikeAction"},"userInteractionCount":"1,204"},
                {"interactionType":"http://schema.org/CommentAction","userInteractionCount":15}]}
        </script></head><body></body></html>"#;
        let data = extract(&payload(html));
        assert_eq!(data.like_count, 1204);
        assert_eq!(data.comment_count, 15);
    }

    #[test]
    fn test_aria_label_fallback() {
        let html = r#"<html><body>
            <button aria-label="Like (12)">12</button>
            <a aria-label="View comments (3)" href="/comments">3</a>
        </body></html>"#;
        let data = extract(&payload(html));
        assert_eq!(data.like_count, 12);
        assert_eq!(data.comment_count, 3);
    }

    #[test]
    fn test_malformed_statistics_default_to_zero() {
        let html = r#"<html><head>
            <meta property="interactionStatistic" content="{not json">
        </head><body><p>No counts here</p></body></html>"#;
        let data = extract(&payload(html));
        assert_eq!(data.like_count, 0);
        assert_eq!(data.comment_count, 0);
    }
}
