//! Claim extraction.
//!
//! Segments a source's text into candidate factual statements and turns the
//! ones that match a working hypothesis into claims. A statement with no
//! assignable subject contributes no signal and is dropped without being
//! reported. When a summarization collaborator is available it supplies the
//! candidate statements; the post-processing contract (subject, polarity,
//! extraction confidence) always belongs to this module.

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::claim::{Claim, Polarity};
use crate::session::Hypothesis;
use crate::source::SourceId;

/// Sentence-level claim extractor.
#[derive(Debug, Clone)]
pub struct ClaimExtractor {
    sentence_re: Regex,
    negation_re: Regex,
    hedge_re: Regex,
}

impl Default for ClaimExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimExtractor {
    /// Creates an extractor with the default cue patterns.
    ///
    /// # Panics
    ///
    /// The built-in patterns are valid; construction cannot fail.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sentence_re: Regex::new(r"[^.!?\n]+[.!?]?").expect("valid sentence pattern"),
            negation_re: Regex::new(
                r"(?i)\b(not|no longer|never|isn't|aren't|doesn't|don't|won't|cannot|can't|deprecated|removed|avoid|without)\b",
            )
            .expect("valid negation pattern"),
            hedge_re: Regex::new(
                r"(?i)\b(may|might|could|unclear|depends|sometimes|arguably|possibly)\b",
            )
            .expect("valid hedge pattern"),
        }
    }

    /// Splits text into candidate statements. Used when no summarization
    /// collaborator supplies them.
    #[must_use]
    pub fn segment(&self, text: &str) -> Vec<String> {
        self.sentence_re
            .find_iter(text)
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| s.split_whitespace().count() >= 3)
            .collect()
    }

    /// Extracts claims from candidate statements.
    ///
    /// Each claim carries the subject of the best-matching hypothesis and a
    /// polarity relative to it. Output order follows statement order, and
    /// claim ids are derived from `(source, subject, ordinal)`, so identical
    /// inputs yield identical claims.
    #[must_use]
    pub fn extract(
        &self,
        source_id: SourceId,
        statements: &[String],
        hypotheses: &[Hypothesis],
        extracted_at: DateTime<Utc>,
    ) -> Vec<Claim> {
        let mut claims = Vec::new();
        for statement in statements {
            let Some((hypothesis, confidence)) = self.match_hypothesis(statement, hypotheses)
            else {
                continue; // no assignable subject: contributes no signal
            };

            let polarity = self.polarity_of(statement);
            let claim = Claim::builder()
                .source(source_id)
                .subject(&hypothesis.subject)
                .text(statement.clone())
                .polarity(polarity)
                .extraction_confidence(confidence)
                .ordinal(claims.len())
                .extracted_at(extracted_at)
                .build();

            // Only an empty subject can fail the build, and matched
            // hypotheses always carry one.
            if let Ok(claim) = claim {
                claims.push(claim);
            }
        }
        claims
    }

    /// Finds the hypothesis with the strongest vocabulary overlap. Requires
    /// at least half of the hypothesis terms (minimum one) to appear.
    fn match_hypothesis<'h>(
        &self,
        statement: &str,
        hypotheses: &'h [Hypothesis],
    ) -> Option<(&'h Hypothesis, f32)> {
        let tokens: Vec<String> = statement
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();

        let mut best: Option<(&Hypothesis, f32)> = None;
        for hypothesis in hypotheses {
            if hypothesis.terms.is_empty() {
                continue;
            }
            let overlap = hypothesis
                .terms
                .iter()
                .filter(|t| tokens.contains(t))
                .count();
            let required = (hypothesis.terms.len() + 1) / 2;
            if overlap < required.max(1) {
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let ratio = overlap as f32 / hypothesis.terms.len() as f32;
            // First hypothesis wins ties: deterministic for fixed input.
            if best.map_or(true, |(_, r)| ratio > r) {
                best = Some((hypothesis, ratio));
            }
        }
        best
    }

    /// Polarity relative to the hypothesis: negation cues refute, hedging
    /// cues are neutral, anything else supports.
    fn polarity_of(&self, statement: &str) -> Polarity {
        if self.negation_re.is_match(statement) {
            Polarity::Refutes
        } else if self.hedge_re.is_match(statement) {
            Polarity::Neutral
        } else {
            Polarity::Supports
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid() -> SourceId {
        SourceId::from_canonical_key("example.org/a")
    }

    fn hypothesis() -> Hypothesis {
        Hypothesis::new("React 19 enables SSR by default", "react-19-ssr-default").unwrap()
    }

    #[test]
    fn test_segment_splits_sentences() {
        let extractor = ClaimExtractor::new();
        let statements =
            extractor.segment("React 19 enables SSR by default. It also ships new hooks! Short.");
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("React 19"));
    }

    #[test]
    fn test_segment_drops_fragments() {
        let extractor = ClaimExtractor::new();
        let statements = extractor.segment("Yes. No. React 19 enables streaming SSR.");
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_extract_supporting_claim() {
        let extractor = ClaimExtractor::new();
        let statements = vec!["React 19 enables SSR by default.".to_string()];
        let claims = extractor.extract(sid(), &statements, &[hypothesis()], Utc::now());

        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].subject, "react-19-ssr-default");
        assert_eq!(claims[0].polarity, Polarity::Supports);
        assert!(claims[0].extraction_confidence > 0.5);
    }

    #[test]
    fn test_extract_refuting_claim() {
        let extractor = ClaimExtractor::new();
        let statements = vec!["React 19 does not enable SSR by default.".to_string()];
        let claims = extractor.extract(sid(), &statements, &[hypothesis()], Utc::now());

        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].polarity, Polarity::Refutes);
    }

    #[test]
    fn test_extract_neutral_claim() {
        let extractor = ClaimExtractor::new();
        let statements = vec!["React 19 might enable SSR by default in some setups.".to_string()];
        let claims = extractor.extract(sid(), &statements, &[hypothesis()], Utc::now());

        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].polarity, Polarity::Neutral);
    }

    #[test]
    fn test_unmatched_statement_is_dropped() {
        let extractor = ClaimExtractor::new();
        let statements = vec!["Postgres 17 improved vacuum throughput.".to_string()];
        let claims = extractor.extract(sid(), &statements, &[hypothesis()], Utc::now());
        assert!(claims.is_empty());
    }

    #[test]
    fn test_no_hypotheses_yields_no_claims() {
        let extractor = ClaimExtractor::new();
        let statements = vec!["React 19 enables SSR by default.".to_string()];
        let claims = extractor.extract(sid(), &statements, &[], Utc::now());
        assert!(claims.is_empty());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = ClaimExtractor::new();
        let at = Utc::now();
        let statements = vec![
            "React 19 enables SSR by default.".to_string(),
            "React 19 does not enable SSR by default.".to_string(),
        ];
        let a = extractor.extract(sid(), &statements, &[hypothesis()], at);
        let b = extractor.extract(sid(), &statements, &[hypothesis()], at);
        assert_eq!(a, b);
        assert_ne!(a[0].id, a[1].id);
    }

    #[test]
    fn test_best_overlap_wins() {
        let extractor = ClaimExtractor::new();
        let broad = Hypothesis::new("React SSR is fast and enables streaming hydration", "react-ssr-speed")
            .unwrap();
        let narrow = hypothesis();
        let statements = vec!["React 19 enables SSR by default.".to_string()];

        let claims = extractor.extract(sid(), &statements, &[broad, narrow], Utc::now());
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].subject, "react-19-ssr-default");
    }
}
