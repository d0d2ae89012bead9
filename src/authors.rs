//! Author identity resolution.
//!
//! Matches an article's byline against the newsletter's optional author
//! filter, substitutes the publisher name when no byline exists, and fans a
//! co-authored article out into one author per byline when requested.
//!
//! Matching is a case-insensitive substring test: filter `"Smith"` accepts
//! `"John Smith-Jones"` and rejects `"Jon Smyth"`.
//!
//! # Byline Sources
//!
//! The byline is taken from the first source that has one:
//! 1. The feed entry's authors
//! 2. The co-author bylines reported by the metrics source, joined with `" & "`
//! 3. The publisher fallback, which is never filtered

use itertools::Itertools;

/// Outcome of resolving an article's author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The article is kept; one record is materialized per name.
    Accepted(Vec<String>),
    /// A filter is configured and the byline does not match it.
    Rejected,
}

impl Resolution {
    /// Whether the article is excluded.
    ///
    /// # Returns
    ///
    /// `true` for [`Resolution::Rejected`], `false` when at least one name
    /// was accepted.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// assert!(Resolution::Rejected.is_rejected());
    /// assert!(!Resolution::Accepted(vec!["Ann".into()]).is_rejected());
    /// ```
    pub fn is_rejected(&self) -> bool {
        matches!(self, Resolution::Rejected)
    }
}

/// Inputs to [`resolve`] that come from the newsletter and run configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorPolicy<'a> {
    /// Partial name every kept byline must contain. Blank disables matching.
    pub filter: Option<&'a str>,
    /// Substituted when the article carries no byline.
    pub publisher_fallback: Option<&'a str>,
    /// Emit one name per co-author instead of a single byline.
    pub expand_coauthors: bool,
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Resolve the author(s) of one article.
///
/// With a filter configured, an article whose byline does not contain the
/// filter is rejected. The filter applies the same way whether or not
/// co-authors are expanded; expansion only decides how many names come out.
/// When co-authors are expanded under a filter, only matching co-authors are
/// emitted.
///
/// # Arguments
///
/// * `candidate` - The byline the feed exposes, possibly several names joined
///   by `" & "`
/// * `coauthors` - Individual bylines reported by the metrics source, empty
///   when it reports none
/// * `policy` - The newsletter's filter and fallback plus the expansion toggle
///
/// # Returns
///
/// [`Resolution::Accepted`] with one name, or one per co-author when
/// expanding, or [`Resolution::Rejected`] when the byline fails the filter.
///
/// # Examples
///
/// ```ignore
/// let policy = AuthorPolicy { filter: Some("Smith"), ..Default::default() };
/// assert!(!resolve(Some("John Smith-Jones"), &[], &policy).is_rejected());
/// assert!(resolve(Some("Jon Smyth"), &[], &policy).is_rejected());
/// ```
pub fn resolve(
    candidate: Option<&str>,
    coauthors: &[String],
    policy: &AuthorPolicy<'_>,
) -> Resolution {
    let filter = non_blank(policy.filter);
    let coauthors: Vec<&str> = coauthors
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .unique()
        .collect();

    let byline = match non_blank(candidate) {
        Some(byline) => byline.to_string(),
        None if !coauthors.is_empty() => coauthors.join(" & "),
        None => {
            let fallback = non_blank(policy.publisher_fallback).unwrap_or_default();
            return Resolution::Accepted(vec![fallback.to_string()]);
        }
    };

    if let Some(filter) = filter
        && !contains_ignore_case(&byline, filter)
    {
        return Resolution::Rejected;
    }

    if policy.expand_coauthors && !coauthors.is_empty() {
        let names: Vec<String> = coauthors
            .iter()
            .filter(|name| filter.is_none_or(|f| contains_ignore_case(name, f)))
            .map(|name| name.to_string())
            .collect();
        if !names.is_empty() {
            return Resolution::Accepted(names);
        }
    }

    Resolution::Accepted(vec![byline])
}
