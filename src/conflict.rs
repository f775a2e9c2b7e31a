//! Contradiction detection and resolution.
//!
//! After extraction, claims sharing a subject key with opposing polarity form
//! a contradiction group. Each group is classified into exactly one category
//! and resolved by that category's rule; a group that resists classification
//! stays unresolved and is surfaced as a knowledge gap rather than silently
//! picking a winner. Neutral claims never participate.
//!
//! Groups are disjoint by construction: one subject key, one group.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::claim::{Claim, ClaimId, Polarity};
use crate::source::Source;
use crate::tier::Tier;

/// Unique identifier for a contradiction group, derived from the subject key
/// so the same disagreement always gets the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(Uuid);

impl GroupId {
    /// Derives the group id from the disputed subject key.
    #[must_use]
    pub fn derive(subject: &str) -> Self {
        let name = format!("contradiction:{subject}");
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why the sources disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// The claims describe different points in time; newer information
    /// supersedes older.
    VersionBased,

    /// Both sides are correct within different scopes; the disagreement is
    /// preserved, not adjudicated.
    ContextBased,

    /// Attributed judgment calls by named individuals.
    OpinionBased,

    /// A lower-tier source contradicts an official one.
    FactualError,

    /// None of the rules fit. Unresolved; reported as a knowledge gap.
    Unclassifiable,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VersionBased => write!(f, "version_based"),
            Self::ContextBased => write!(f, "context_based"),
            Self::OpinionBased => write!(f, "opinion_based"),
            Self::FactualError => write!(f, "factual_error"),
            Self::Unclassifiable => write!(f, "unclassifiable"),
        }
    }
}

/// The outcome of resolving one contradiction group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Claims that prevailed. Empty when the group is unresolved.
    pub winning_claims: Vec<ClaimId>,

    /// Human-readable explanation of the outcome.
    pub rationale: String,

    /// True when no winner was picked. Holds exactly for context-based and
    /// unclassifiable groups.
    pub unresolved: bool,
}

/// A set of claims on one subject with opposing polarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContradictionGroup {
    /// Deterministic group id.
    pub id: GroupId,

    /// The disputed subject key.
    pub subject: String,

    /// Every supporting and refuting claim on the subject.
    pub claim_ids: Vec<ClaimId>,

    /// Which rule the group fell under.
    pub classification: Classification,

    /// Resolution outcome.
    pub resolution: Resolution,

    /// When the group was detected.
    pub detected_at: DateTime<Utc>,
}

impl ContradictionGroup {
    /// True when the group remains unresolved and should be surfaced as a
    /// knowledge gap.
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        self.resolution.unresolved
    }
}

/// Scope-qualifier cues that mark a claim as conditional on its context.
const SCOPE_CUES: &[&str] = &[
    "when ",
    "only ",
    "unless ",
    "in production",
    "in development",
    "in dev",
    "depends",
    " mode",
    "if ",
    "for large",
    "for small",
    "at scale",
];

/// Detects and resolves contradiction groups across a session's sources.
#[derive(Debug, Clone)]
pub struct ContradictionResolver {
    currency_window: Duration,
}

/// One claim paired with a view of its owning source.
struct Party<'a> {
    claim: &'a Claim,
    source: &'a Source,
}

impl ContradictionResolver {
    /// Creates a resolver. Disagreements between sources published further
    /// apart than the window are treated as version-based.
    #[must_use]
    pub fn new(currency_window_days: i64) -> Self {
        Self {
            currency_window: Duration::days(currency_window_days),
        }
    }

    /// Finds every subject with both supporting and refuting claims among
    /// usable sources, classifies each group, and resolves it.
    ///
    /// Groups come out in first-encounter order of their subject, so the
    /// output is stable for a fixed source list.
    #[must_use]
    pub fn detect(&self, sources: &[Source], detected_at: DateTime<Utc>) -> Vec<ContradictionGroup> {
        let mut subjects: Vec<String> = Vec::new();
        let mut parties: Vec<Party<'_>> = Vec::new();

        for source in sources {
            if source.replaced || source.is_discarded() {
                continue;
            }
            for claim in &source.claims {
                if claim.polarity == Polarity::Neutral {
                    continue;
                }
                if !subjects.contains(&claim.subject) {
                    subjects.push(claim.subject.clone());
                }
                parties.push(Party { claim, source });
            }
        }

        subjects
            .iter()
            .filter_map(|subject| {
                let group: Vec<&Party<'_>> =
                    parties.iter().filter(|p| &p.claim.subject == subject).collect();
                let conflicted = group.iter().any(|p| p.claim.polarity == Polarity::Supports)
                    && group.iter().any(|p| p.claim.polarity == Polarity::Refutes);
                if !conflicted {
                    return None;
                }
                Some(self.resolve_group(subject, &group, detected_at))
            })
            .collect()
    }

    fn resolve_group(
        &self,
        subject: &str,
        group: &[&Party<'_>],
        detected_at: DateTime<Utc>,
    ) -> ContradictionGroup {
        let claim_ids: Vec<ClaimId> = group.iter().map(|p| p.claim.id).collect();

        let (classification, resolution) = self
            .try_version_based(group)
            .or_else(|| Self::try_context_based(group))
            .or_else(|| Self::try_opinion_based(group))
            .or_else(|| Self::try_factual_error(group))
            .unwrap_or_else(|| {
                (
                    Classification::Unclassifiable,
                    Resolution {
                        winning_claims: Vec::new(),
                        rationale: format!(
                            "conflicting evidence on '{subject}' fits no resolution rule"
                        ),
                        unresolved: true,
                    },
                )
            });

        ContradictionGroup {
            id: GroupId::derive(subject),
            subject: subject.to_string(),
            claim_ids,
            classification,
            resolution,
            detected_at,
        }
    }

    /// Version-based: the two sides were published further apart than the
    /// currency window. The newer side wins.
    fn try_version_based(&self, group: &[&Party<'_>]) -> Option<(Classification, Resolution)> {
        let newest_of = |polarity: Polarity| -> Option<DateTime<Utc>> {
            group
                .iter()
                .filter(|p| p.claim.polarity == polarity)
                .filter_map(|p| p.source.published)
                .max()
        };
        let supports = newest_of(Polarity::Supports)?;
        let refutes = newest_of(Polarity::Refutes)?;

        let (winner, newer, older) = if supports >= refutes {
            (Polarity::Supports, supports, refutes)
        } else {
            (Polarity::Refutes, refutes, supports)
        };
        if newer - older <= self.currency_window {
            return None;
        }

        let winning_claims = claims_of(group, winner);
        Some((
            Classification::VersionBased,
            Resolution {
                winning_claims,
                rationale: format!(
                    "superseded by newer source: {} vs {}",
                    newer.format("%Y-%m-%d"),
                    older.format("%Y-%m-%d")
                ),
                unresolved: false,
            },
        ))
    }

    /// Context-based: every source is reputable (T1-T3) and at least one
    /// side hedges with a scope qualifier. A plain claim does not contradict
    /// a scoped one outside its scope, so a cue on either side is enough.
    /// Both positions are preserved verbatim.
    fn try_context_based(group: &[&Party<'_>]) -> Option<(Classification, Resolution)> {
        let reputable = group.iter().all(|p| p.source.tier.rank() <= Tier::T3.rank());
        if !reputable {
            return None;
        }
        if !group.iter().any(|p| has_scope_cue(&p.claim.text)) {
            return None;
        }

        let pick = |polarity: Polarity| {
            group
                .iter()
                .find(|p| p.claim.polarity == polarity)
                .map_or(String::new(), |p| p.claim.text.clone())
        };
        Some((
            Classification::ContextBased,
            Resolution {
                winning_claims: Vec::new(),
                rationale: format!(
                    "both correct in different contexts: \"{}\" / \"{}\"",
                    pick(Polarity::Supports),
                    pick(Polarity::Refutes)
                ),
                unresolved: true,
            },
        ))
    }

    /// Opinion-based: every claim is attributed to a named individual and no
    /// official source is involved. The higher-authority author prevails;
    /// engagement breaks ties.
    fn try_opinion_based(group: &[&Party<'_>]) -> Option<(Classification, Resolution)> {
        let attributed = group
            .iter()
            .all(|p| p.source.byline.is_some() && p.source.tier != Tier::T1);
        if !attributed {
            return None;
        }

        let authority =
            |p: &Party<'_>| p.source.dimensions.map_or(0.0, |d| d.authority);
        let engagement = |p: &Party<'_>| p.source.engagement.unwrap_or(0);

        let best = group.iter().copied().reduce(|a, b| {
            if authority(b) > authority(a)
                || (authority(b) == authority(a) && engagement(b) > engagement(a))
            {
                b
            } else {
                a // earlier party wins exact ties
            }
        })?;

        let byline = best.source.byline.clone().unwrap_or_default();
        let winning_claims = claims_of(group, best.claim.polarity);
        Some((
            Classification::OpinionBased,
            Resolution {
                winning_claims,
                rationale: format!("higher-authority opinion prevails ({byline})"),
                unresolved: false,
            },
        ))
    }

    /// Factual error: one side carries an official (T1/T2) source and the
    /// other side has none. The official side wins unconditionally.
    fn try_factual_error(group: &[&Party<'_>]) -> Option<(Classification, Resolution)> {
        let top_tier = |polarity: Polarity| {
            group
                .iter()
                .filter(|p| p.claim.polarity == polarity)
                .any(|p| p.source.tier.is_top_tier())
        };
        let supports_top = top_tier(Polarity::Supports);
        let refutes_top = top_tier(Polarity::Refutes);
        let winner = match (supports_top, refutes_top) {
            (true, false) => Polarity::Supports,
            (false, true) => Polarity::Refutes,
            _ => return None,
        };

        let winning_claims = claims_of(group, winner);
        Some((
            Classification::FactualError,
            Resolution {
                winning_claims,
                rationale: "official source contradicts lower-tier claims".to_string(),
                unresolved: false,
            },
        ))
    }
}

fn claims_of(group: &[&Party<'_>], polarity: Polarity) -> Vec<ClaimId> {
    group
        .iter()
        .filter(|p| p.claim.polarity == polarity)
        .map(|p| p.claim.id)
        .collect()
}

fn has_scope_cue(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    SCOPE_CUES.iter().any(|cue| lower.contains(cue))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;
    use crate::score::score_source;
    use crate::source::{OriginTag, RawDocument};

    fn source_with_claim(
        url: &str,
        tier: Tier,
        subject: &str,
        text: &str,
        polarity: Polarity,
        published: Option<DateTime<Utc>>,
        inserted_at: usize,
    ) -> Source {
        let mut doc = RawDocument::web(url, "T", "body").with_origin(OriginTag::Web);
        doc.published = published;
        let mut source = Normalizer::normalize(doc, inserted_at);
        source.assign_tier(tier);
        score_source(&mut source, 80.0, Utc::now()).unwrap();
        source.claims.push(
            Claim::builder()
                .source(source.id)
                .subject(subject)
                .text(text)
                .polarity(polarity)
                .build()
                .unwrap(),
        );
        source
    }

    #[test]
    fn test_no_conflict_without_opposing_polarity() {
        let now = Utc::now();
        let sources = vec![
            source_with_claim("https://a.example.org/1", Tier::T2, "s", "X holds.", Polarity::Supports, None, 0),
            source_with_claim("https://b.example.org/2", Tier::T2, "s", "X holds indeed.", Polarity::Supports, None, 1),
            source_with_claim("https://c.example.org/3", Tier::T2, "s", "X might hold.", Polarity::Neutral, None, 2),
        ];
        let groups = ContradictionResolver::new(183).detect(&sources, now);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_version_based_newer_wins() {
        let now = Utc::now();
        let old = now - Duration::days(800);
        let new = now - Duration::days(30);
        let sources = vec![
            source_with_claim("https://a.example.org/1", Tier::T2, "ssr-default", "SSR is not enabled by default.", Polarity::Refutes, Some(old), 0),
            source_with_claim("https://b.other.net/2", Tier::T2, "ssr-default", "SSR is enabled by default.", Polarity::Supports, Some(new), 1),
        ];

        let groups = ContradictionResolver::new(183).detect(&sources, now);
        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.classification, Classification::VersionBased);
        assert!(!group.is_unresolved());
        assert_eq!(group.resolution.winning_claims, vec![sources[1].claims[0].id]);
        assert!(group.resolution.rationale.contains("superseded"));
    }

    #[test]
    fn test_dates_inside_window_are_not_version_based() {
        let now = Utc::now();
        let sources = vec![
            source_with_claim("https://a.example.org/1", Tier::T5, "s", "X is fast.", Polarity::Supports, Some(now - Duration::days(40)), 0),
            source_with_claim("https://b.other.net/2", Tier::T5, "s", "X is not fast.", Polarity::Refutes, Some(now - Duration::days(10)), 1),
        ];
        let groups = ContradictionResolver::new(183).detect(&sources, now);
        assert_eq!(groups.len(), 1);
        assert_ne!(groups[0].classification, Classification::VersionBased);
    }

    #[test]
    fn test_context_based_stays_unresolved() {
        let now = Utc::now();
        let sources = vec![
            source_with_claim(
                "https://docs.example.org/1",
                Tier::T1,
                "hydration",
                "Streaming hydration is faster when pages are large.",
                Polarity::Supports,
                Some(now - Duration::days(10)),
                0,
            ),
            source_with_claim(
                "https://repo.other.net/2",
                Tier::T2,
                "hydration",
                "Streaming hydration is not faster for small pages.",
                Polarity::Refutes,
                Some(now - Duration::days(12)),
                1,
            ),
        ];

        let groups = ContradictionResolver::new(183).detect(&sources, now);
        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.classification, Classification::ContextBased);
        assert!(group.is_unresolved());
        assert!(group.resolution.winning_claims.is_empty());
        // Both positions preserved verbatim.
        assert!(group.resolution.rationale.contains("when pages are large"));
        assert!(group.resolution.rationale.contains("for small pages"));
    }

    #[test]
    fn test_context_based_cue_on_one_side_suffices() {
        let now = Utc::now();
        // Only the supporting claim carries a scope qualifier; the refuting
        // one is phrased flat. Still a context dispute among reputable
        // sources, not a factual error.
        let sources = vec![
            source_with_claim(
                "https://docs.example.org/1",
                Tier::T1,
                "hydration",
                "Streaming hydration is faster when pages are large.",
                Polarity::Supports,
                Some(now - Duration::days(10)),
                0,
            ),
            source_with_claim(
                "https://repo.other.net/2",
                Tier::T2,
                "hydration",
                "Streaming hydration is not faster.",
                Polarity::Refutes,
                Some(now - Duration::days(12)),
                1,
            ),
        ];

        let groups = ContradictionResolver::new(183).detect(&sources, now);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].classification, Classification::ContextBased);
        assert!(groups[0].is_unresolved());
        assert!(groups[0].resolution.winning_claims.is_empty());
    }

    #[test]
    fn test_opinion_based_higher_authority_wins() {
        let now = Utc::now();
        let mut a = source_with_claim(
            "https://blog.alice.dev/1",
            Tier::T3,
            "style",
            "Hooks beat classes.",
            Polarity::Supports,
            Some(now - Duration::days(5)),
            0,
        );
        a.byline = Some("Alice".to_string());
        let mut b = source_with_claim(
            "https://forum.example.net/2",
            Tier::T5,
            "style",
            "Hooks do not beat classes.",
            Polarity::Refutes,
            Some(now - Duration::days(6)),
            1,
        );
        b.byline = Some("Bob".to_string());

        let expected = a.claims[0].id;
        let groups = ContradictionResolver::new(183).detect(&[a, b], now);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].classification, Classification::OpinionBased);
        assert_eq!(groups[0].resolution.winning_claims, vec![expected]);
        assert!(groups[0].resolution.rationale.contains("Alice"));
    }

    #[test]
    fn test_factual_error_official_source_wins() {
        let now = Utc::now();
        let sources = vec![
            source_with_claim(
                "https://spec.example.org/1",
                Tier::T1,
                "api-removed",
                "The legacy API was removed.",
                Polarity::Refutes,
                Some(now - Duration::days(20)),
                0,
            ),
            source_with_claim(
                "https://randomblog.net/2",
                Tier::T5,
                "api-removed",
                "The legacy API still works fine.",
                Polarity::Supports,
                Some(now - Duration::days(15)),
                1,
            ),
        ];

        let expected = sources[0].claims[0].id;
        let groups = ContradictionResolver::new(183).detect(&sources, now);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].classification, Classification::FactualError);
        assert_eq!(groups[0].resolution.winning_claims, vec![expected]);
    }

    #[test]
    fn test_unclassifiable_is_unresolved() {
        let now = Utc::now();
        // Same tier, no dates, no bylines, no scope cues: nothing fits.
        let sources = vec![
            source_with_claim("https://a.example.org/1", Tier::T5, "s", "X is true.", Polarity::Supports, None, 0),
            source_with_claim("https://b.other.net/2", Tier::T5, "s", "X is false.", Polarity::Refutes, None, 1),
        ];
        let groups = ContradictionResolver::new(183).detect(&sources, now);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].classification, Classification::Unclassifiable);
        assert!(groups[0].is_unresolved());
    }

    #[test]
    fn test_unresolved_iff_context_or_unclassifiable() {
        let now = Utc::now();
        let old = now - Duration::days(800);
        let new = now - Duration::days(30);
        let sources = vec![
            source_with_claim("https://a.example.org/1", Tier::T2, "s1", "A holds.", Polarity::Supports, Some(new), 0),
            source_with_claim("https://b.other.net/2", Tier::T2, "s1", "A does not hold.", Polarity::Refutes, Some(old), 1),
            source_with_claim("https://c.example.org/3", Tier::T5, "s2", "B is true.", Polarity::Supports, None, 2),
            source_with_claim("https://d.other.net/4", Tier::T5, "s2", "B is false.", Polarity::Refutes, None, 3),
        ];
        for group in ContradictionResolver::new(183).detect(&sources, now) {
            let expect_unresolved = matches!(
                group.classification,
                Classification::ContextBased | Classification::Unclassifiable
            );
            assert_eq!(group.is_unresolved(), expect_unresolved);
        }
    }

    #[test]
    fn test_groups_are_disjoint_and_deterministic() {
        let now = Utc::now();
        let sources = vec![
            source_with_claim("https://a.example.org/1", Tier::T5, "s1", "A is true.", Polarity::Supports, None, 0),
            source_with_claim("https://b.other.net/2", Tier::T5, "s1", "A is false.", Polarity::Refutes, None, 1),
            source_with_claim("https://c.example.org/3", Tier::T5, "s2", "B is true.", Polarity::Supports, None, 2),
            source_with_claim("https://d.other.net/4", Tier::T5, "s2", "B is false.", Polarity::Refutes, None, 3),
        ];

        let resolver = ContradictionResolver::new(183);
        let first = resolver.detect(&sources, now);
        let second = resolver.detect(&sources, now);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_ne!(first[0].id, first[1].id);

        // Each claim appears in at most one group.
        let mut seen: Vec<ClaimId> = Vec::new();
        for group in &first {
            for id in &group.claim_ids {
                assert!(!seen.contains(id));
                seen.push(*id);
            }
        }
    }

    #[test]
    fn test_replaced_sources_do_not_conflict() {
        let now = Utc::now();
        let mut stale = source_with_claim("https://a.example.org/1", Tier::T5, "s", "A is false.", Polarity::Refutes, None, 0);
        stale.mark_replaced();
        let fresh = source_with_claim("https://b.other.net/2", Tier::T5, "s", "A is true.", Polarity::Supports, None, 1);

        let groups = ContradictionResolver::new(183).detect(&[stale, fresh], now);
        assert!(groups.is_empty());
    }
}
