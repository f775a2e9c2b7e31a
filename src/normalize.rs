//! Source normalization.
//!
//! Canonicalizes raw fetch results into `Source` records. The canonical
//! dedupe key is lower-cased host + path with the query string and fragment
//! stripped for web documents, and the absolute path verbatim for local
//! ones. Canonicalization is deliberately lossy: two URLs that differ only
//! in tracking parameters are the same source.
//!
//! A malformed locator is never fatal: the source is kept with
//! `domain = "unknown"`, which forces tier T6 downstream.

use crate::source::{OriginTag, RawDocument, Source, SourceId};
use crate::tier::Tier;

/// Domain value assigned when no host can be extracted.
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// Canonical dedupe key plus the extracted domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalKey {
    /// The dedupe key.
    pub key: String,
    /// Lower-cased host, or [`UNKNOWN_DOMAIN`].
    pub domain: String,
}

/// Computes the canonical key for a locator.
#[must_use]
pub fn canonical_key(locator: &str, origin: OriginTag) -> CanonicalKey {
    if origin == OriginTag::LocalCode {
        return CanonicalKey {
            key: locator.trim().to_string(),
            domain: "local".to_string(),
        };
    }

    let trimmed = locator.trim();
    // Strip scheme if present.
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);

    // Strip query string and fragment.
    let without_query = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or(without_scheme);

    let (host, path) = match without_query.split_once('/') {
        Some((h, p)) => (h, p),
        None => (without_query, ""),
    };

    if !is_plausible_host(host) {
        // Malformed locator: keep the source, flag the domain. Forces T6.
        return CanonicalKey {
            key: trimmed.to_ascii_lowercase(),
            domain: UNKNOWN_DOMAIN.to_string(),
        };
    }

    let host = host.to_ascii_lowercase();
    let path = path.trim_end_matches('/');
    let key = if path.is_empty() {
        host.clone()
    } else {
        format!("{host}/{path}")
    };

    CanonicalKey { key, domain: host }
}

/// A host is plausible when it has at least one dot, no spaces, and only
/// hostname characters.
fn is_plausible_host(host: &str) -> bool {
    !host.is_empty()
        && host.contains('.')
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == ':')
}

/// Canonicalizes raw fetch results into `Source` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct Normalizer;

impl Normalizer {
    /// Builds an unclassified `Source` from a raw document.
    ///
    /// `inserted_at` is the session insertion index, used as the final
    /// ordering tie-break in reports.
    #[must_use]
    pub fn normalize(doc: RawDocument, inserted_at: usize) -> Source {
        let canonical = canonical_key(&doc.locator, doc.origin);
        Source {
            id: SourceId::from_canonical_key(&canonical.key),
            url: doc.locator,
            title: doc.title,
            domain: canonical.domain,
            published: doc.published,
            origin: doc.origin,
            tier: Tier::Unclassified,
            raw_text: doc.text,
            claims: Vec::new(),
            dimensions: None,
            final_score: None,
            quality_band: None,
            below_threshold: false,
            replaced: false,
            discard_reason: None,
            byline: doc.byline,
            engagement: doc.engagement,
            purpose: doc.purpose,
            markers: doc.markers,
            inserted_at,
        }
    }

    /// Merges a newly normalized duplicate into an existing source with the
    /// same canonical key: keep the richer text and the earliest-seen title.
    pub fn merge_duplicate(existing: &mut Source, duplicate: Source) {
        if duplicate.raw_text.len() > existing.raw_text.len() {
            existing.raw_text = duplicate.raw_text;
        }
        if existing.published.is_none() {
            existing.published = duplicate.published;
        }
        if existing.byline.is_none() {
            existing.byline = duplicate.byline;
        }
        if existing.engagement.is_none() {
            existing.engagement = duplicate.engagement;
        }
        for marker in duplicate.markers {
            if !existing.markers.contains(&marker) {
                existing.markers.push(marker);
            }
        }
    }
}
