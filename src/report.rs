//! The final structured report.
//!
//! The report is the engine's sole machine-readable boundary. Every source
//! seen during the run appears in it — weak, replaced, and timed-out
//! evidence is labeled, never dropped. Ordering is deterministic: final
//! score descending, then publication date descending, then insertion
//! order, so building the report twice from the same finalized session is
//! byte-identical.

use serde::{Deserialize, Serialize};

use chrono::{DateTime, Utc};

use crate::claim::Polarity;
use crate::conflict::{Classification, ContradictionGroup, Resolution};
use crate::session::{ResearchSession, SaturationSummary};
use crate::source::{DiscardReason, QualityBand, Source, SourceId};
use crate::synthesis::{ConfidenceLevel, Recommendation};
use crate::tier::Tier;

/// One row of the evidence hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Stable source id.
    pub id: SourceId,
    /// Original URL or local path.
    pub url: String,
    /// Document title.
    pub title: String,
    /// Authority tier.
    pub tier: Tier,
    /// Weighted final score, when the source was scored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<f32>,
    /// Score-derived band.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_band: Option<QualityBand>,
    /// Publication date, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    /// Kept despite scoring below the quality floor.
    pub below_threshold: bool,
    /// Superseded by a replacement fetch.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub replaced: bool,
    /// Why the source was discarded, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discard_reason: Option<DiscardReason>,
}

/// One surviving claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimEntry {
    /// Subject key.
    pub subject: String,
    /// Claim text.
    pub text: String,
    /// Polarity relative to the working hypothesis.
    pub polarity: Polarity,
    /// Owning source.
    pub source_id: SourceId,
}

/// One resolved (or explicitly unresolved) contradiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContradictionEntry {
    /// The disputed subject key.
    pub subject: String,
    /// Which resolution rule applied.
    pub classification: Classification,
    /// The resolution outcome.
    pub resolution: Resolution,
    /// Mirror of `resolution.unresolved` for flat consumers.
    pub unresolved: bool,
}

/// The structured report for one research run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// The original query.
    pub query: String,

    /// Calibrated confidence label.
    pub confidence: ConfidenceLevel,

    /// Evidence hierarchy, strongest first.
    pub sources: Vec<SourceEntry>,

    /// Claims from usable sources, in evidence order.
    pub claims: Vec<ClaimEntry>,

    /// Contradiction groups and their outcomes.
    pub contradictions: Vec<ContradictionEntry>,

    /// Explicit gaps in the evidence.
    pub knowledge_gaps: Vec<String>,

    /// The do / don't / consider lines.
    pub recommendation: Recommendation,

    /// How and when collection stopped.
    pub saturation: SaturationSummary,
}

impl Report {
    /// Serializes the report as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Assembles the report from a finalized session.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportBuilder;

impl ReportBuilder {
    /// Builds the report.
    ///
    /// The session must already carry its contradictions and final
    /// confidence; knowledge gaps and the recommendation come from the
    /// synthesizer. Source ordering is final score descending, publication
    /// date descending, then insertion order.
    #[must_use]
    pub fn build(
        session: &ResearchSession,
        knowledge_gaps: Vec<String>,
        recommendation: Recommendation,
    ) -> Report {
        let mut ordered: Vec<&Source> = session.sources.iter().collect();
        ordered.sort_by(|a, b| {
            b.final_score
                .unwrap_or(0.0)
                .total_cmp(&a.final_score.unwrap_or(0.0))
                .then(b.published.cmp(&a.published))
                .then(a.inserted_at.cmp(&b.inserted_at))
        });

        let sources: Vec<SourceEntry> = ordered
            .iter()
            .map(|s| SourceEntry {
                id: s.id,
                url: s.url.clone(),
                title: s.title.clone(),
                tier: s.tier,
                final_score: s.final_score,
                quality_band: s.quality_band,
                published: s.published,
                below_threshold: s.below_threshold,
                replaced: s.replaced,
                discard_reason: s.discard_reason,
            })
            .collect();

        let claims: Vec<ClaimEntry> = ordered
            .iter()
            .filter(|s| s.is_usable())
            .flat_map(|s| {
                s.claims.iter().map(|c| ClaimEntry {
                    subject: c.subject.clone(),
                    text: c.text.clone(),
                    polarity: c.polarity,
                    source_id: c.source_id,
                })
            })
            .collect();

        let contradictions: Vec<ContradictionEntry> = session
            .contradictions
            .iter()
            .map(|g: &ContradictionGroup| ContradictionEntry {
                subject: g.subject.clone(),
                classification: g.classification,
                resolution: g.resolution.clone(),
                unresolved: g.is_unresolved(),
            })
            .collect();

        Report {
            query: session.config.query.clone(),
            confidence: session.final_confidence.unwrap_or(ConfidenceLevel::Low),
            sources,
            claims,
            contradictions,
            knowledge_gaps,
            recommendation,
            saturation: session.saturation.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::claim::Claim;
    use crate::normalize::Normalizer;
    use crate::score::score_source;
    use crate::session::SessionConfig;
    use crate::source::{OriginTag, RawDocument};

    fn recommendation() -> Recommendation {
        Recommendation {
            do_line: "proceed".to_string(),
            dont: "avoid".to_string(),
            consider: "consider".to_string(),
            supporting_source_ids: Vec::new(),
        }
    }

    fn session_with_sources() -> ResearchSession {
        let now = Utc::now();
        let config = SessionConfig::builder("adopt react 19 ssr")
            .now(now)
            .build()
            .unwrap();
        let mut session = ResearchSession::new(config, Vec::new());

        for (i, (url, tier, days)) in [
            ("https://weak.example.net/a", Tier::T5, 600),
            ("https://docs.alpha.org/b", Tier::T1, 10),
            ("https://repo.beta.org/c", Tier::T2, 10),
        ]
        .iter()
        .enumerate()
        {
            let doc = RawDocument::web(*url, "T", "body")
                .with_origin(OriginTag::Web)
                .with_published(now - Duration::days(*days));
            let mut source = Normalizer::normalize(doc, i);
            source.assign_tier(*tier);
            score_source(&mut source, 80.0, now).unwrap();
            source.claims.push(
                Claim::builder()
                    .source(source.id)
                    .subject("x")
                    .text("X holds true here.")
                    .polarity(Polarity::Supports)
                    .build()
                    .unwrap(),
            );
            session.admit_source(source).unwrap();
        }
        session
    }

    #[test]
    fn test_sources_ordered_by_score_then_date() {
        let mut session = session_with_sources();
        session.finalize();
        let report = ReportBuilder::build(&session, Vec::new(), recommendation());

        let scores: Vec<f32> = report.sources.iter().filter_map(|s| s.final_score).collect();
        let mut sorted = scores.clone();
        sorted.sort_by(|a, b| b.total_cmp(a));
        assert_eq!(scores, sorted);
        assert_eq!(report.sources[0].tier, Tier::T1);
    }

    #[test]
    fn test_report_is_byte_identical_across_builds() {
        let mut session = session_with_sources();
        session.finalize();

        let a = ReportBuilder::build(&session, vec!["gap".to_string()], recommendation());
        let b = ReportBuilder::build(&session, vec!["gap".to_string()], recommendation());
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }

    #[test]
    fn test_flagged_sources_are_labeled_not_dropped() {
        let now = Utc::now();
        let mut session = session_with_sources();

        let mut timed_out =
            Normalizer::normalize(RawDocument::web("https://slow.example.net/z", "Z", ""), 3);
        timed_out.mark_timed_out();
        session.admit_source(timed_out).unwrap();

        let doc = RawDocument::web("https://thin.example.net/w", "W", "body");
        let mut weak = Normalizer::normalize(doc, 4);
        weak.assign_tier(Tier::T6);
        score_source(&mut weak, 10.0, now).unwrap();
        weak.below_threshold = true;
        session.admit_source(weak).unwrap();

        session.finalize();
        let report = ReportBuilder::build(&session, Vec::new(), recommendation());

        assert_eq!(report.sources.len(), 5);
        assert!(report
            .sources
            .iter()
            .any(|s| s.discard_reason == Some(DiscardReason::Timeout)));
        assert!(report.sources.iter().any(|s| s.below_threshold));
        // Discarded sources contribute no claims.
        assert_eq!(report.claims.len(), 3);
    }

    #[test]
    fn test_confidence_defaults_to_low() {
        let mut session = session_with_sources();
        session.finalize();
        let report = ReportBuilder::build(&session, Vec::new(), recommendation());
        assert_eq!(report.confidence, ConfidenceLevel::Low);
    }

    #[test]
    fn test_report_round_trips_through_json() {
        let mut session = session_with_sources();
        session.finalize();
        let report = ReportBuilder::build(&session, vec!["gap".to_string()], recommendation());
        let json = report.to_json().unwrap();
        let back: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(report, back);
    }
}
