//! Engagement from the platform's post API.
//!
//! For an article at `https://host/p/<slug>` the post endpoint is
//! `https://host/api/v1/posts/<slug>`. Unlike the page markup it reports
//! restacks and every co-author byline.

use super::count_from;
use crate::error::ExtractionError;
use crate::fetcher::RawPayload;
use crate::models::EngagementData;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

/// Derive the post API endpoint for an article URL.
pub fn endpoint_for(article_url: &str) -> Result<String, ExtractionError> {
    let unsupported = || ExtractionError::UnsupportedUrl(article_url.to_string());
    let url = Url::parse(article_url).map_err(|_| unsupported())?;
    let host = url.host_str().ok_or_else(unsupported)?;

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    let slug = segments
        .iter()
        .position(|s| *s == "p")
        .and_then(|i| segments.get(i + 1))
        .ok_or_else(unsupported)?;
    let slug = urlencoding::decode(slug)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| slug.to_string());

    let authority = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    Ok(format!(
        "{}://{}/api/v1/posts/{}",
        url.scheme(),
        authority,
        urlencoding::encode(&slug)
    ))
}

/// Parse a post API response.
///
/// # Errors
///
/// [`ExtractionError::InvalidJson`] when the body is not JSON and
/// [`ExtractionError::MissingField`] when it is not a JSON object. Individual
/// fields that are missing or malformed default to zero.
#[instrument(level = "debug", skip_all, fields(url = %payload.url))]
pub fn extract(payload: &RawPayload) -> Result<EngagementData, ExtractionError> {
    let value: Value = serde_json::from_str(&payload.body)?;
    let post = value.as_object().ok_or(ExtractionError::MissingField("post"))?;

    let like_count = match post.get("reaction_count") {
        Some(v) if !v.is_null() => count_from(v),
        _ => post
            .get("reactions")
            .and_then(Value::as_object)
            .map(|reactions| {
                reactions
                    .values()
                    .map(count_from)
                    .fold(0u32, u32::saturating_add)
            })
            .unwrap_or(0),
    };

    let authors = post
        .get("publishedBylines")
        .and_then(Value::as_array)
        .map(|bylines| {
            bylines
                .iter()
                .filter_map(|b| b.get("name").and_then(Value::as_str))
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let data = EngagementData {
        title: post.get("title").and_then(Value::as_str).map(str::to_string),
        link: post
            .get("canonical_url")
            .and_then(Value::as_str)
            .map(str::to_string),
        published_at: post
            .get("post_date")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        summary: String::new(),
        word_count: post.get("wordcount").map(count_from).unwrap_or(0),
        comment_count: post.get("comment_count").map(count_from).unwrap_or(0),
        like_count,
        restack_count: Some(post.get("restacks").map(count_from).unwrap_or(0)),
        authors,
    };
    debug!(
        likes = data.like_count,
        comments = data.comment_count,
        restacks = ?data.restack_count,
        coauthors = data.authors.len(),
        "Parsed post metrics"
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(body: &str) -> RawPayload {
        RawPayload {
            url: "https://example.substack.com/api/v1/posts/hello".to_string(),
            body: body.to_string(),
            attempts: 1,
        }
    }

    #[test]
    fn test_endpoint_for_substack_post() {
        assert_eq!(
            endpoint_for("https://example.substack.com/p/hello-world?utm_source=rss").unwrap(),
            "https://example.substack.com/api/v1/posts/hello-world"
        );
        assert_eq!(
            endpoint_for("https://www.custom-domain.com/p/caf%C3%A9-notes").unwrap(),
            "https://www.custom-domain.com/api/v1/posts/caf%C3%A9-notes"
        );
    }

    #[test]
    fn test_endpoint_for_unsupported_url() {
        for url in ["https://example.com/about", "not a url"] {
            let err = endpoint_for(url).unwrap_err();
            assert!(matches!(err, ExtractionError::UnsupportedUrl(_)), "{url}");
        }
    }

    #[test]
    fn test_extract_full_response() {
        let body = r#"{
            "title": "Hello",
            "canonical_url": "https://example.substack.com/p/hello",
            "post_date": "2025-05-08T12:00:00.000Z",
            "comment_count": 9,
            "reaction_count": 120,
            "restacks": 4,
            "wordcount": 1850,
            "publishedBylines": [{"name": "Ann Author"}, {"name": "Bob Writer"}]
        }"#;
        let data = extract(&payload(body)).unwrap();
        assert_eq!(data.comment_count, 9);
        assert_eq!(data.like_count, 120);
        assert_eq!(data.restack_count, Some(4));
        assert_eq!(data.word_count, 1850);
        assert_eq!(data.authors, vec!["Ann Author", "Bob Writer"]);
        assert!(data.published_at.is_some());
    }

    #[test]
    fn test_reactions_map_is_summed() {
        let data = extract(&payload(r#"{"reactions": {"❤": 10, "👍": 5}}"#)).unwrap();
        assert_eq!(data.like_count, 15);
        assert_eq!(data.comment_count, 0);
        assert_eq!(data.restack_count, Some(0));
    }

    #[test]
    fn test_invalid_json() {
        let err = extract(&payload("<html>rate limited</html>")).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidJson(_)));

        let err = extract(&payload("[1, 2]")).unwrap_err();
        assert!(matches!(err, ExtractionError::MissingField("post")));
    }
}
