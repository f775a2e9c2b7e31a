//! CRAAP+ reliability scoring.
//!
//! Five weighted dimensions, each 0-100, combined into a cached final score:
//!
//! ```text
//! final = 0.20*currency + 0.25*relevance + 0.25*authority
//!       + 0.20*accuracy + 0.10*purpose
//! ```
//!
//! Scoring is a pure function of its inputs: identical dimensions always
//! produce the identical final score and quality band. The accuracy and
//! authority dimensions are revisited once claims exist (cross-verification
//! pass); everything else is fixed at first scoring.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::claim::Polarity;
use crate::depth::Depth;
use crate::error::ValidationError;
use crate::source::{DocumentMarker, QualityBand, Source};
use crate::tier::Tier;

/// Dimension weights. They sum to 1.0.
pub const WEIGHT_CURRENCY: f32 = 0.20;
/// Relevance weight.
pub const WEIGHT_RELEVANCE: f32 = 0.25;
/// Authority weight.
pub const WEIGHT_AUTHORITY: f32 = 0.25;
/// Accuracy weight.
pub const WEIGHT_ACCURACY: f32 = 0.20;
/// Purpose weight.
pub const WEIGHT_PURPOSE: f32 = 0.10;

/// Quality floor: a source scoring below this triggers the replacement loop.
pub const QUALITY_FLOOR: f32 = 50.0;

/// The five score dimensions, each validated to [0.0, 100.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreDimensions {
    /// How recent the source is.
    pub currency: f32,
    /// How relevant it is to the query (injected collaborator).
    pub relevance: f32,
    /// Tier base plus modifiers.
    pub authority: f32,
    /// Verification state of its claims.
    pub accuracy: f32,
    /// Why the document was written.
    pub purpose: f32,
}

impl ScoreDimensions {
    /// Creates validated dimensions.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ScoreOutOfRange` naming the first dimension
    /// outside [0.0, 100.0].
    pub fn new(
        currency: f32,
        relevance: f32,
        authority: f32,
        accuracy: f32,
        purpose: f32,
    ) -> Result<Self, ValidationError> {
        for (dimension, value) in [
            ("currency", currency),
            ("relevance", relevance),
            ("authority", authority),
            ("accuracy", accuracy),
            ("purpose", purpose),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ValidationError::ScoreOutOfRange { dimension, value });
            }
        }
        Ok(Self {
            currency,
            relevance,
            authority,
            accuracy,
            purpose,
        })
    }

    /// Combines the dimensions into the weighted final score.
    #[must_use]
    pub fn combine(&self) -> f32 {
        WEIGHT_CURRENCY * self.currency
            + WEIGHT_RELEVANCE * self.relevance
            + WEIGHT_AUTHORITY * self.authority
            + WEIGHT_ACCURACY * self.accuracy
            + WEIGHT_PURPOSE * self.purpose
    }
}

/// Currency score from publication age.
///
/// Unknown dates are treated as 1-2 years old: conservative, never rewarded
/// for missing metadata.
#[must_use]
pub fn currency_score(published: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f32 {
    let Some(published) = published else {
        return 40.0;
    };
    let age = now - published;
    if age < Duration::days(90) {
        100.0
    } else if age < Duration::days(365) {
        70.0
    } else if age < Duration::days(730) {
        40.0
    } else {
        10.0
    }
}

/// Verification state feeding the accuracy dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verification {
    /// Cross-verified by at least one independent T1/T2 source.
    CrossVerified,
    /// Single source, no corroboration either way.
    SingleUnverified,
    /// Contradicted by a higher-tier source.
    ContradictedByHigherTier,
}

/// Accuracy score from verification state.
#[must_use]
pub const fn accuracy_score(verification: Verification) -> f32 {
    match verification {
        Verification::CrossVerified => 100.0,
        Verification::SingleUnverified => 60.0,
        Verification::ContradictedByHigherTier => 30.0,
    }
}

/// Authority score: tier base plus modifiers, clamped to [0, 100].
#[must_use]
pub fn authority_score(tier: Tier, markers: &[DocumentMarker], cross_verified: bool) -> f32 {
    let mut score = tier.authority_base();
    if markers.contains(&DocumentMarker::CoreMaintainer) {
        score += 10.0;
    }
    if cross_verified {
        score += 10.0;
    }
    if markers.contains(&DocumentMarker::VendorSelfPraise) {
        score -= 5.0;
    }
    if markers.contains(&DocumentMarker::Sponsored) {
        score -= 15.0;
    }
    score.clamp(0.0, 100.0)
}

/// Scores a classified source and caches the result on it.
///
/// `relevance` comes from the injected relevance collaborator; accuracy
/// starts as single-unverified and is revisited by [`cross_verify`] once
/// claims exist. Local-codebase sources bypass scoring entirely: they are
/// always primary-band for relevance purposes but carry no web authority.
///
/// # Errors
///
/// Returns `ValidationError::ScoreOutOfRange` if `relevance` is outside
/// [0.0, 100.0].
pub fn score_source(
    source: &mut Source,
    relevance: f32,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if source.tier == Tier::Local {
        source.final_score = Some(100.0);
        source.quality_band = Some(QualityBand::Primary);
        return Ok(());
    }

    let dimensions = ScoreDimensions::new(
        currency_score(source.published, now),
        relevance,
        authority_score(source.tier, &source.markers, false),
        accuracy_score(Verification::SingleUnverified),
        source.purpose.score(),
    )?;

    apply(source, dimensions);
    Ok(())
}

fn apply(source: &mut Source, dimensions: ScoreDimensions) {
    let final_score = dimensions.combine();
    source.dimensions = Some(dimensions);
    source.final_score = Some(final_score);
    source.quality_band = Some(QualityBand::from_score(final_score));
}

/// Cross-verification rescore pass, run after claim extraction.
///
/// For each scored web source: if any of its claims is corroborated by an
/// agreeing claim from an independent T1/T2 source (different registrable
/// domain), accuracy becomes 100 and the authority cross-verified modifier
/// applies; otherwise, if a higher-tier source contradicts one of its
/// claims, accuracy drops to 30. The final score is recomputed only for
/// sources whose dimensions actually changed.
pub fn cross_verify(sources: &mut [Source]) {
    #[derive(Clone)]
    struct Sibling {
        domain: String,
        tier: Tier,
        subject: String,
        polarity: Polarity,
    }

    let siblings: Vec<Sibling> = sources
        .iter()
        .filter(|s| s.tier != Tier::Local && !s.replaced)
        .flat_map(|s| {
            s.claims.iter().map(|c| Sibling {
                domain: s.registrable_domain(),
                tier: s.tier,
                subject: c.subject.clone(),
                polarity: c.polarity,
            })
        })
        .collect();

    for source in sources.iter_mut() {
        if source.tier == Tier::Local || source.replaced {
            continue;
        }
        let Some(current) = source.dimensions else {
            continue;
        };
        let own_domain = source.registrable_domain();

        let corroborated = source.claims.iter().any(|c| {
            siblings.iter().any(|s| {
                s.tier.is_top_tier()
                    && s.domain != own_domain
                    && s.subject == c.subject
                    && s.polarity == c.polarity
            })
        });

        let contradicted = source.claims.iter().any(|c| {
            siblings.iter().any(|s| {
                s.tier.rank() < source.tier.rank()
                    && s.domain != own_domain
                    && s.subject == c.subject
                    && s.polarity.conflicts_with(c.polarity)
            })
        });

        let verification = if corroborated {
            Verification::CrossVerified
        } else if contradicted {
            Verification::ContradictedByHigherTier
        } else {
            Verification::SingleUnverified
        };

        let mut dimensions = current;
        dimensions.accuracy = accuracy_score(verification);
        dimensions.authority = authority_score(source.tier, &source.markers, corroborated);

        if dimensions != current {
            apply(source, dimensions);
        }
    }
}

/// Bounded retry budget for the quality-replacement loop.
///
/// Modeled as a counter rather than recursion so termination is guaranteed:
/// once the budget is exhausted the low-quality source is kept and flagged,
/// never refetched again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplacementBudget {
    remaining: u32,
}

impl ReplacementBudget {
    /// Budget for one source slot at the given depth.
    #[must_use]
    pub const fn for_depth(depth: Depth) -> Self {
        Self {
            remaining: depth.replacement_retries(),
        }
    }

    /// Consumes one retry. Returns false when the budget is exhausted.
    pub fn try_consume(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    /// Remaining retries.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;
    use crate::source::{OriginTag, Purpose, RawDocument};

    #[test]
    fn test_weights_sum_to_one() {
        let sum = WEIGHT_CURRENCY + WEIGHT_RELEVANCE + WEIGHT_AUTHORITY + WEIGHT_ACCURACY + WEIGHT_PURPOSE;
        assert!((sum - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_combine_is_deterministic() {
        let dims = ScoreDimensions::new(100.0, 70.0, 85.0, 60.0, 80.0).unwrap();
        assert_eq!(dims.combine(), dims.combine());
    }

    #[test]
    fn test_dimensions_validated() {
        let err = ScoreDimensions::new(100.0, 120.0, 85.0, 60.0, 80.0).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::ScoreOutOfRange {
                dimension: "relevance",
                ..
            }
        ));
    }

    #[test]
    fn test_currency_buckets() {
        let now = Utc::now();
        assert_eq!(currency_score(Some(now - Duration::days(10)), now), 100.0);
        assert_eq!(currency_score(Some(now - Duration::days(200)), now), 70.0);
        assert_eq!(currency_score(Some(now - Duration::days(500)), now), 40.0);
        assert_eq!(currency_score(Some(now - Duration::days(913)), now), 10.0);
        assert_eq!(currency_score(None, now), 40.0);
    }

    #[test]
    fn test_authority_modifiers() {
        assert_eq!(authority_score(Tier::T1, &[], false), 100.0);
        // Clamped at 100 even with bonuses.
        assert_eq!(
            authority_score(Tier::T1, &[DocumentMarker::CoreMaintainer], true),
            100.0
        );
        assert_eq!(
            authority_score(Tier::T5, &[DocumentMarker::CoreMaintainer], false),
            40.0
        );
        assert_eq!(
            authority_score(Tier::T5, &[DocumentMarker::VendorSelfPraise], false),
            25.0
        );
        assert_eq!(
            authority_score(Tier::T6, &[DocumentMarker::Sponsored], false),
            0.0
        );
    }

    #[test]
    fn test_accuracy_values() {
        assert_eq!(accuracy_score(Verification::CrossVerified), 100.0);
        assert_eq!(accuracy_score(Verification::SingleUnverified), 60.0);
        assert_eq!(accuracy_score(Verification::ContradictedByHigherTier), 30.0);
    }

    #[test]
    fn test_worked_example_single_stale_t1() {
        // T1 source, 30 months old, single unverified, relevance 100,
        // educational purpose: final = 2 + 25 + 25 + 12 + 10 = 74.
        let now = Utc::now();
        let doc = RawDocument::web("https://spec.example.org/v1", "Spec", "text")
            .with_origin(OriginTag::OfficialDocs)
            .with_published(now - Duration::days(913))
            .with_purpose(Purpose::Educational);
        let mut source = Normalizer::normalize(doc, 0);
        source.assign_tier(Tier::T1);

        score_source(&mut source, 100.0, now).unwrap();

        let final_score = source.final_score.unwrap();
        assert!((final_score - 74.0).abs() < 0.001, "got {final_score}");
        assert_eq!(source.quality_band, Some(QualityBand::Supporting));
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let now = Utc::now();
        let doc = RawDocument::web("https://example.org/a", "A", "text");
        let mut source = Normalizer::normalize(doc, 0);
        source.assign_tier(Tier::T5);

        score_source(&mut source, 70.0, now).unwrap();
        let first = (source.final_score, source.quality_band);
        score_source(&mut source, 70.0, now).unwrap();
        assert_eq!(first, (source.final_score, source.quality_band));
    }

    #[test]
    fn test_local_source_is_primary() {
        let mut source = Normalizer::normalize(RawDocument::local("/repo/a.rs", "code"), 0);
        source.assign_tier(Tier::Local);
        score_source(&mut source, 0.0, Utc::now()).unwrap();
        assert_eq!(source.quality_band, Some(QualityBand::Primary));
        assert!(source.dimensions.is_none());
    }

    #[test]
    fn test_cross_verify_upgrades_accuracy() {
        use crate::claim::Claim;

        let now = Utc::now();
        let mut docs = vec![
            RawDocument::web("https://spec-a.example.org/x", "A", "text")
                .with_origin(OriginTag::OfficialDocs),
            RawDocument::web("https://blog.other.net/x", "B", "text"),
        ];
        docs[0].published = Some(now - Duration::days(10));
        docs[1].published = Some(now - Duration::days(10));

        let mut a = Normalizer::normalize(docs.remove(0), 0);
        a.assign_tier(Tier::T1);
        score_source(&mut a, 100.0, now).unwrap();
        a.claims.push(
            Claim::builder()
                .source(a.id)
                .subject("x-subject")
                .text("X is true.")
                .polarity(Polarity::Supports)
                .build()
                .unwrap(),
        );

        let mut b = Normalizer::normalize(docs.remove(0), 1);
        b.assign_tier(Tier::T5);
        score_source(&mut b, 100.0, now).unwrap();
        b.claims.push(
            Claim::builder()
                .source(b.id)
                .subject("x-subject")
                .text("X is true.")
                .polarity(Polarity::Supports)
                .build()
                .unwrap(),
        );

        let before = b.final_score.unwrap();
        let mut sources = vec![a, b];
        cross_verify(&mut sources);

        let b = &sources[1];
        assert_eq!(b.dimensions.unwrap().accuracy, 100.0);
        // +10 cross-verified authority modifier on top of the T5 base.
        assert_eq!(b.dimensions.unwrap().authority, 40.0);
        assert!(b.final_score.unwrap() > before);
    }

    #[test]
    fn test_cross_verify_downgrades_contradicted() {
        use crate::claim::Claim;

        let now = Utc::now();
        let mut a = Normalizer::normalize(
            RawDocument::web("https://spec-a.example.org/x", "A", "text")
                .with_origin(OriginTag::OfficialDocs),
            0,
        );
        a.assign_tier(Tier::T1);
        score_source(&mut a, 100.0, now).unwrap();
        a.claims.push(
            Claim::builder()
                .source(a.id)
                .subject("x-subject")
                .polarity(Polarity::Refutes)
                .build()
                .unwrap(),
        );

        let mut b = Normalizer::normalize(
            RawDocument::web("https://blog.other.net/x", "B", "text"),
            1,
        );
        b.assign_tier(Tier::T5);
        score_source(&mut b, 100.0, now).unwrap();
        b.claims.push(
            Claim::builder()
                .source(b.id)
                .subject("x-subject")
                .polarity(Polarity::Supports)
                .build()
                .unwrap(),
        );

        let mut sources = vec![a, b];
        cross_verify(&mut sources);
        assert_eq!(sources[1].dimensions.unwrap().accuracy, 30.0);
        // The T1 source itself stays single-unverified: nothing top-tier
        // and independent agrees with it.
        assert_eq!(sources[0].dimensions.unwrap().accuracy, 60.0);
    }

    #[test]
    fn test_replacement_budget_terminates() {
        let mut budget = ReplacementBudget::for_depth(Depth::Quick);
        assert!(budget.try_consume());
        assert!(budget.try_consume());
        assert!(!budget.try_consume());
        assert_eq!(budget.remaining(), 0);
    }
}
