//! Synthesis: calibrated confidence, knowledge gaps, and the recommendation.
//!
//! Confidence follows the cross-verification rule and is never upgraded to
//! compensate for sparse data — insufficient evidence yields `LOW` plus an
//! explicit knowledge-gap entry, not an omission. The recommendation lines
//! (do / don't / consider) are tagged with the source ids supporting them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::claim::Polarity;
use crate::conflict::ContradictionGroup;
use crate::session::Hypothesis;
use crate::source::{QualityBand, Source, SourceId};
use crate::tier::Tier;

/// Calibrated confidence label for the whole report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLevel {
    /// At least two independent T1/T2 sources agree, with zero unresolved
    /// contradictions at that level.
    High,
    /// At least one T1-T3 source stands uncontradicted by a higher tier.
    Medium,
    /// Everything else, including sparse evidence.
    Low,
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "HIGH"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

/// The actionable outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// What to do.
    #[serde(rename = "do")]
    pub do_line: String,

    /// What to avoid.
    pub dont: String,

    /// What to evaluate in the reader's own context.
    pub consider: String,

    /// Sources backing the recommendation, strongest first.
    pub supporting_source_ids: Vec<SourceId>,
}

/// Applies the cross-verification rule.
///
/// `HIGH` requires two usable T1/T2 sources from different registrable
/// domains agreeing on at least one claim, and no unresolved contradiction
/// touching a T1/T2 claim. `MEDIUM` requires one usable T1-T3 source whose
/// accuracy was not downgraded by a higher tier. Otherwise `LOW`.
#[must_use]
pub fn assess_confidence(
    sources: &[Source],
    contradictions: &[ContradictionGroup],
) -> ConfidenceLevel {
    let usable: Vec<&Source> = sources.iter().filter(|s| s.is_usable()).collect();

    let top_tier_agreement = usable.iter().any(|a| {
        a.tier.is_top_tier()
            && a.claims.iter().any(|ca| {
                ca.polarity != Polarity::Neutral
                    && usable.iter().any(|b| {
                        b.tier.is_top_tier()
                            && b.registrable_domain() != a.registrable_domain()
                            && b.claims
                                .iter()
                                .any(|cb| cb.subject == ca.subject && cb.polarity == ca.polarity)
                    })
            })
    });

    let unresolved_at_top = contradictions.iter().any(|group| {
        group.is_unresolved()
            && usable.iter().any(|s| {
                s.tier.is_top_tier() && s.claims.iter().any(|c| group.claim_ids.contains(&c.id))
            })
    });

    if top_tier_agreement && !unresolved_at_top {
        return ConfidenceLevel::High;
    }

    let reputable_standing = usable.iter().any(|s| {
        s.tier != Tier::Local
            && s.tier.rank() <= Tier::T3.rank()
            && s.dimensions.is_some_and(|d| d.accuracy > 30.0)
    });
    if reputable_standing {
        return ConfidenceLevel::Medium;
    }

    ConfidenceLevel::Low
}

/// Fills each hypothesis's supporting and counter claim lists from usable
/// sources and recalibrates its confidence percentage.
pub fn update_hypotheses(hypotheses: &mut [Hypothesis], sources: &[Source]) {
    for hypothesis in hypotheses.iter_mut() {
        hypothesis.supporting_claims.clear();
        hypothesis.counter_claims.clear();

        for source in sources.iter().filter(|s| s.is_usable()) {
            for claim in &source.claims {
                if claim.subject != hypothesis.subject {
                    continue;
                }
                match claim.polarity {
                    Polarity::Supports => hypothesis.supporting_claims.push(claim.id),
                    Polarity::Refutes => hypothesis.counter_claims.push(claim.id),
                    Polarity::Neutral => {}
                }
            }
        }

        let supporting = hypothesis.supporting_claims.len();
        let total = supporting + hypothesis.counter_claims.len();
        hypothesis.confidence_percent = if total == 0 {
            0
        } else {
            // Integer math keeps this reproducible across platforms.
            ((supporting * 100) / total) as u8
        };
    }
}

/// Enumerates knowledge gaps: unresolved contradictions verbatim, plus any
/// hypothesis with no evidence either way, plus an entry when the whole run
/// produced no usable sources.
#[must_use]
pub fn knowledge_gaps(
    hypotheses: &[Hypothesis],
    sources: &[Source],
    contradictions: &[ContradictionGroup],
) -> Vec<String> {
    let mut gaps = Vec::new();

    for group in contradictions.iter().filter(|g| g.is_unresolved()) {
        gaps.push(format!(
            "unresolved contradiction on '{}': {}",
            group.subject, group.resolution.rationale
        ));
    }

    for hypothesis in hypotheses {
        if hypothesis.supporting_claims.is_empty() && hypothesis.counter_claims.is_empty() {
            gaps.push(format!("no evidence found for '{}'", hypothesis.statement));
        }
    }

    if !sources.iter().any(Source::is_usable) {
        gaps.push("no usable sources survived quality filtering".to_string());
    }

    gaps
}

/// Builds the recommendation from the calibrated state.
///
/// Every line is deterministic for a fixed session: hypotheses are walked in
/// order and supporting sources are listed strongest first.
#[must_use]
pub fn synthesize_recommendation(
    hypotheses: &[Hypothesis],
    sources: &[Source],
    contradictions: &[ContradictionGroup],
    confidence: ConfidenceLevel,
) -> Recommendation {
    let mut supporting: Vec<&Source> = sources
        .iter()
        .filter(|s| {
            s.is_usable()
                && matches!(
                    s.quality_band,
                    Some(QualityBand::Primary | QualityBand::Supporting)
                )
        })
        .collect();
    supporting.sort_by(|a, b| {
        b.final_score
            .unwrap_or(0.0)
            .total_cmp(&a.final_score.unwrap_or(0.0))
            .then(b.published.cmp(&a.published))
            .then(a.inserted_at.cmp(&b.inserted_at))
    });
    let supporting_source_ids: Vec<SourceId> = supporting.iter().map(|s| s.id).collect();

    let endorsed = hypotheses
        .iter()
        .find(|h| h.confidence_percent >= 70 && !h.supporting_claims.is_empty());
    let do_line = match (confidence, endorsed) {
        (ConfidenceLevel::Low, _) | (_, None) => {
            "defer action until stronger evidence is available".to_string()
        }
        (_, Some(h)) => format!("proceed: {}", h.statement),
    };

    let refuted = hypotheses
        .iter()
        .find(|h| h.confidence_percent <= 30 && !h.counter_claims.is_empty());
    let dont = match refuted {
        Some(h) => format!("avoid relying on: {}", h.statement),
        None => "do not treat single-source claims as settled".to_string(),
    };

    let unresolved_subjects: Vec<&str> = contradictions
        .iter()
        .filter(|g| g.is_unresolved())
        .map(|g| g.subject.as_str())
        .collect();
    let consider = if unresolved_subjects.is_empty() {
        match confidence {
            ConfidenceLevel::High => "monitor official release notes for changes".to_string(),
            _ => "re-run at deep depth for broader coverage".to_string(),
        }
    } else {
        format!(
            "validate in your own context: {}",
            unresolved_subjects.join(", ")
        )
    };

    Recommendation {
        do_line,
        dont,
        consider,
        supporting_source_ids,
    }
}
