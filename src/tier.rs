//! Authority tiers and the tier classification rule table.
//!
//! Tiers are assigned by rule, not by score: a deterministic table evaluated
//! in order, first match wins. The tier feeds the authority dimension of the
//! reliability score and the conflict-resolution rules, and it never changes
//! after classification.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::UNKNOWN_DOMAIN;
use crate::source::{DocumentMarker, OriginTag, Source};

/// Discrete authority classification. T1 is most authoritative, T6 least.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Not yet classified. Sources leave the normalizer in this state.
    Unclassified,

    /// Local-codebase source. Bypasses tiering: always primary for
    /// relevance, excluded from authority aggregation.
    Local,

    /// Official documentation, specifications, standards.
    T1,
    /// Source repositories: release notes, changelogs, VCS hosts.
    T2,
    /// Recognized experts: maintainer or known-author bylines.
    T3,
    /// Community-curated content with a real engagement signal.
    T4,
    /// Any other web source with extractable text.
    T5,
    /// Unknown domain, machine-generated, or stale without corroboration.
    T6,
}

impl Tier {
    /// Authority base for the score engine (0-100).
    ///
    /// `Local` and `Unclassified` answer "is this already solved here", not
    /// "is this true" — they carry no web authority.
    #[must_use]
    pub const fn authority_base(self) -> f32 {
        match self {
            Self::T1 => 100.0,
            Self::T2 => 85.0,
            Self::T3 => 70.0,
            Self::T4 => 50.0,
            Self::T5 => 30.0,
            Self::T6 => 10.0,
            Self::Local | Self::Unclassified => 0.0,
        }
    }

    /// Ordering rank: lower is more authoritative. Local and unclassified
    /// sources rank below T6 for conflict purposes.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::T1 => 1,
            Self::T2 => 2,
            Self::T3 => 3,
            Self::T4 => 4,
            Self::T5 => 5,
            Self::T6 => 6,
            Self::Local | Self::Unclassified => 7,
        }
    }

    /// Returns true for the two top tiers used by the cross-verification
    /// rule.
    #[must_use]
    pub const fn is_top_tier(self) -> bool {
        matches!(self, Self::T1 | Self::T2)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unclassified => write!(f, "unclassified"),
            Self::Local => write!(f, "t-local"),
            Self::T1 => write!(f, "t1"),
            Self::T2 => write!(f, "t2"),
            Self::T3 => write!(f, "t3"),
            Self::T4 => write!(f, "t4"),
            Self::T5 => write!(f, "t5"),
            Self::T6 => write!(f, "t6"),
        }
    }
}

/// Rule data consulted by the classifier. Editable by the caller; the
/// defaults cover common specification hosts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierRules {
    /// Hosts treated as specification/standard publishers (T1).
    pub spec_hosts: Vec<String>,

    /// Known maintainer/author bylines (T3 when matched).
    pub known_authors: Vec<String>,

    /// Minimum engagement for community-curated content to earn T4.
    pub engagement_threshold: u32,

    /// Age in months past which an uncorroborated source is demoted to T6.
    pub stale_after_months: i64,
}

impl Default for TierRules {
    fn default() -> Self {
        Self {
            spec_hosts: [
                "w3.org",
                "ietf.org",
                "rfc-editor.org",
                "iso.org",
                "ecma-international.org",
                "whatwg.org",
                "developer.mozilla.org",
                "doc.rust-lang.org",
                "docs.rs",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            known_authors: Vec::new(),
            engagement_threshold: 10,
            stale_after_months: 24,
        }
    }
}

impl TierRules {
    /// Adds a known author byline.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.known_authors.push(author.into());
        self
    }

    /// Adds a specification host.
    #[must_use]
    pub fn with_spec_host(mut self, host: impl Into<String>) -> Self {
        self.spec_hosts.push(host.into());
        self
    }

    fn is_spec_host(&self, domain: &str) -> bool {
        self.spec_hosts
            .iter()
            .any(|h| domain == h || domain.ends_with(&format!(".{h}")))
    }

    fn is_known_author(&self, byline: Option<&str>) -> bool {
        byline.is_some_and(|b| {
            self.known_authors
                .iter()
                .any(|a| a.eq_ignore_ascii_case(b.trim()))
        })
    }

    fn is_stale(&self, published: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        published.is_some_and(|p| now - p > Duration::days(self.stale_after_months * 30))
    }
}

/// Deterministic tier classifier.
///
/// Rule order, first match wins:
/// 1. local-code origin bypasses tiering entirely (T-local)
/// 2. official-docs origin or a known specification host: T1
/// 3. source-repo origin: T2
/// 4. recognized-expert origin with a byline on the known-authors list: T3
/// 5. community-curated origin with engagement above threshold: T4
/// 6. demotions: unknown domain, AI-generated marker, or older than the
///    staleness window with no corroboration: T6
/// 7. any other web source with extractable text: T5
/// 8. nothing matched (`ClassificationAmbiguous`): T6, never fatal
#[derive(Debug, Default, Clone)]
pub struct TierClassifier {
    rules: TierRules,
}

impl TierClassifier {
    /// Creates a classifier with the given rule data.
    #[must_use]
    pub fn new(rules: TierRules) -> Self {
        Self { rules }
    }

    /// Returns the rule data.
    #[must_use]
    pub fn rules(&self) -> &TierRules {
        &self.rules
    }

    /// Classifies a normalized source. `now` is the session evaluation
    /// clock, so classification is deterministic for a fixed source set.
    #[must_use]
    pub fn classify(&self, source: &Source, now: DateTime<Utc>) -> Tier {
        if source.origin == OriginTag::LocalCode {
            return Tier::Local;
        }

        if source.origin == OriginTag::OfficialDocs || self.rules.is_spec_host(&source.domain) {
            return Tier::T1;
        }

        if source.origin == OriginTag::SourceRepo {
            return Tier::T2;
        }

        if source.origin == OriginTag::RecognizedExpert
            && self.rules.is_known_author(source.byline.as_deref())
        {
            return Tier::T3;
        }

        if source.origin == OriginTag::CommunityCurated
            && source.engagement.unwrap_or(0) >= self.rules.engagement_threshold
        {
            return Tier::T4;
        }

        if source.domain == UNKNOWN_DOMAIN
            || source.has_marker(DocumentMarker::AiGenerated)
            || self.rules.is_stale(source.published, now)
        {
            return Tier::T6;
        }

        if !source.raw_text.trim().is_empty() {
            return Tier::T5;
        }

        Tier::T6
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;
    use crate::source::RawDocument;

    fn classify(doc: RawDocument) -> Tier {
        let source = Normalizer::normalize(doc, 0);
        TierClassifier::default().classify(&source, Utc::now())
    }

    #[test]
    fn test_official_docs_is_t1() {
        let doc = RawDocument::web("https://react.dev/reference", "Docs", "text")
            .with_origin(OriginTag::OfficialDocs);
        assert_eq!(classify(doc), Tier::T1);
    }

    #[test]
    fn test_spec_host_is_t1_regardless_of_origin() {
        let doc = RawDocument::web("https://www.w3.org/TR/webrtc/", "WebRTC", "text");
        assert_eq!(classify(doc), Tier::T1);
    }

    #[test]
    fn test_source_repo_is_t2() {
        let doc = RawDocument::web("https://github.com/facebook/react/releases", "Releases", "text")
            .with_origin(OriginTag::SourceRepo);
        assert_eq!(classify(doc), Tier::T2);
    }

    #[test]
    fn test_recognized_expert_requires_known_byline() {
        let classifier = TierClassifier::new(TierRules::default().with_author("Dan Abramov"));
        let now = Utc::now();

        let matched = Normalizer::normalize(
            RawDocument::web("https://overreacted.io/post", "Post", "text")
                .with_origin(OriginTag::RecognizedExpert)
                .with_byline("Dan Abramov"),
            0,
        );
        assert_eq!(classifier.classify(&matched, now), Tier::T3);

        // Tagged expert but unmatched byline falls through to T5.
        let unmatched = Normalizer::normalize(
            RawDocument::web("https://overreacted.io/post", "Post", "text")
                .with_origin(OriginTag::RecognizedExpert)
                .with_byline("Somebody Else"),
            0,
        );
        assert_eq!(classifier.classify(&unmatched, now), Tier::T5);
    }

    #[test]
    fn test_community_curated_needs_engagement() {
        let hot = RawDocument::web("https://stackoverflow.com/q/1", "Q", "text")
            .with_origin(OriginTag::CommunityCurated)
            .with_engagement(50);
        assert_eq!(classify(hot), Tier::T4);

        let cold = RawDocument::web("https://stackoverflow.com/q/2", "Q", "text")
            .with_origin(OriginTag::CommunityCurated)
            .with_engagement(1);
        assert_eq!(classify(cold), Tier::T5);
    }

    #[test]
    fn test_unknown_domain_forces_t6() {
        let doc = RawDocument::web("not a url", "Mystery", "text");
        assert_eq!(classify(doc), Tier::T6);
    }

    #[test]
    fn test_ai_generated_marker_forces_t6() {
        let doc = RawDocument::web("https://content-farm.example.com/a", "A", "text")
            .with_marker(DocumentMarker::AiGenerated);
        assert_eq!(classify(doc), Tier::T6);
    }

    #[test]
    fn test_stale_source_is_t6() {
        let doc = RawDocument::web("https://old-blog.example.com/a", "A", "text")
            .with_published(Utc::now() - Duration::days(30 * 30));
        assert_eq!(classify(doc), Tier::T6);
    }

    #[test]
    fn test_stale_spec_host_stays_t1() {
        // Higher rules win: first match is T1, staleness is never reached.
        let doc = RawDocument::web("https://www.ietf.org/rfc/rfc2616", "RFC", "text")
            .with_published(Utc::now() - Duration::days(30 * 30));
        assert_eq!(classify(doc), Tier::T1);
    }

    #[test]
    fn test_plain_web_source_is_t5() {
        let doc = RawDocument::web("https://some-blog.example.com/post", "Post", "real text");
        assert_eq!(classify(doc), Tier::T5);
    }

    #[test]
    fn test_empty_text_is_t6() {
        let doc = RawDocument::web("https://some-blog.example.com/post", "Post", "   ");
        assert_eq!(classify(doc), Tier::T6);
    }

    #[test]
    fn test_local_code_bypasses_tiering() {
        let doc = RawDocument::local("/repo/src/cache.rs", "fn get() {}");
        assert_eq!(classify(doc), Tier::Local);
    }

    #[test]
    fn test_authority_bases() {
        assert_eq!(Tier::T1.authority_base(), 100.0);
        assert_eq!(Tier::T2.authority_base(), 85.0);
        assert_eq!(Tier::T3.authority_base(), 70.0);
        assert_eq!(Tier::T4.authority_base(), 50.0);
        assert_eq!(Tier::T5.authority_base(), 30.0);
        assert_eq!(Tier::T6.authority_base(), 10.0);
        assert_eq!(Tier::Local.authority_base(), 0.0);
    }

    #[test]
    fn test_top_tier() {
        assert!(Tier::T1.is_top_tier());
        assert!(Tier::T2.is_top_tier());
        assert!(!Tier::T3.is_top_tier());
        assert!(!Tier::Local.is_top_tier());
    }
}
