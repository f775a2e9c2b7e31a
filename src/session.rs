//! Research sessions — the unit of work for one query.
//!
//! A session is created at query start, mutated by each pipeline stage from
//! a single writer (the engine thread), and finalized once the report is
//! built. Nothing persists beyond the run except an opaque resume token for
//! deep mode.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::claim::ClaimId;
use crate::conflict::ContradictionGroup;
use crate::depth::Depth;
use crate::error::ValidationError;
use crate::normalize::{canonical_key, Normalizer};
use crate::saturation::StopReason;
use crate::source::{RawDocument, Source, SourceId};
use crate::synthesis::ConfidenceLevel;

/// A working hypothesis the extractor scores claims against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    /// The hypothesis statement.
    pub statement: String,

    /// Normalized subject key, e.g. "react-19-ssr-default".
    pub subject: String,

    /// Vocabulary used to match statements to this hypothesis.
    pub terms: Vec<String>,

    /// Calibrated support estimate (0-100), updated by the synthesizer.
    pub confidence_percent: u8,

    /// Claims supporting this hypothesis.
    #[serde(default)]
    pub supporting_claims: Vec<ClaimId>,

    /// Claims countering this hypothesis.
    #[serde(default)]
    pub counter_claims: Vec<ClaimId>,
}

impl Hypothesis {
    /// Creates a hypothesis, deriving the match vocabulary from the
    /// statement (stopwords removed).
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyStatement` if the statement is blank.
    pub fn new(
        statement: impl Into<String>,
        subject: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let statement = statement.into();
        if statement.trim().is_empty() {
            return Err(ValidationError::EmptyStatement);
        }
        let subject = subject.into();
        if subject.trim().is_empty() {
            return Err(ValidationError::EmptySubject);
        }
        let terms = derive_terms(&statement);
        Ok(Self {
            statement,
            subject,
            terms,
            confidence_percent: 0,
            supporting_claims: Vec::new(),
            counter_claims: Vec::new(),
        })
    }

    /// Overrides the derived match vocabulary.
    #[must_use]
    pub fn with_terms(mut self, terms: Vec<String>) -> Self {
        self.terms = terms;
        self
    }
}

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "by", "of", "in", "on", "to",
    "for", "with", "and", "or", "it", "its", "this", "that", "as", "at", "from", "not",
];

fn derive_terms(statement: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for token in statement.split(|c: char| !c.is_ascii_alphanumeric()) {
        let token = token.to_ascii_lowercase();
        if token.len() > 1 && !STOPWORDS.contains(&token.as_str()) && !terms.contains(&token) {
            terms.push(token);
        }
    }
    terms
}

/// Caller-facing configuration for one research run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// The natural-language query.
    pub query: String,

    /// Research depth.
    pub depth: Depth,

    /// Window beyond which dated disagreements are version-based
    /// contradictions. Default ~6 months.
    pub currency_window_days: i64,

    /// Per-source task deadline. None disables the deadline.
    #[serde(skip)]
    pub per_source_timeout: Option<Duration>,

    /// Evaluation clock. Defaults to the wall clock at run start; fixing it
    /// makes a run reproducible in tests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now: Option<DateTime<Utc>>,
}

impl SessionConfig {
    /// Starts building a config for the given query.
    #[must_use]
    pub fn builder(query: impl Into<String>) -> SessionConfigBuilder {
        SessionConfigBuilder::new(query)
    }
}

/// Builder for [`SessionConfig`]. Validates at `build()`.
#[derive(Debug, Clone)]
pub struct SessionConfigBuilder {
    query: String,
    depth: Depth,
    currency_window_days: i64,
    per_source_timeout: Option<Duration>,
    now: Option<DateTime<Utc>>,
}

impl SessionConfigBuilder {
    fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            depth: Depth::default(),
            currency_window_days: 183,
            per_source_timeout: None,
            now: None,
        }
    }

    /// Sets the research depth.
    #[must_use]
    pub fn depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self
    }

    /// Sets the currency window in days.
    #[must_use]
    pub fn currency_window_days(mut self, days: i64) -> Self {
        self.currency_window_days = days;
        self
    }

    /// Sets the per-source deadline.
    #[must_use]
    pub fn per_source_timeout(mut self, timeout: Duration) -> Self {
        self.per_source_timeout = Some(timeout);
        self
    }

    /// Fixes the evaluation clock.
    #[must_use]
    pub fn now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Builds the config.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyQuery` if the query is blank.
    pub fn build(self) -> Result<SessionConfig, ValidationError> {
        if self.query.trim().is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        Ok(SessionConfig {
            query: self.query,
            depth: self.depth,
            currency_window_days: self.currency_window_days,
            per_source_timeout: self.per_source_timeout,
            now: self.now,
        })
    }
}

/// Saturation outcome recorded on the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaturationSummary {
    /// Why collection stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<StopReason>,

    /// Source count when collection stopped.
    pub stopped_at_source_count: usize,

    /// Whether the depth minimum was met before stopping.
    pub minimum_met: bool,

    /// Saturation signals observed before the minimum was met (recorded,
    /// not acted upon).
    pub signals_before_minimum: u32,
}

/// The unit of work for one query.
///
/// Shared-mutation discipline: the session is the only shared state in the
/// pipeline, and it is mutated exclusively by the engine thread. Worker
/// tasks build sources privately and hand them over a channel; writers
/// append, never mutate another task's source in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchSession {
    /// Session id.
    pub id: Uuid,

    /// Run configuration.
    pub config: SessionConfig,

    /// Working hypotheses.
    pub hypotheses: Vec<Hypothesis>,

    /// All sources seen this run, including flagged ones (audit trail).
    pub sources: Vec<Source>,

    /// Canonical key -> index into `sources`.
    #[serde(skip)]
    dedupe_index: HashMap<String, usize>,

    /// Saturation outcome.
    pub saturation: SaturationSummary,

    /// Resolved contradiction groups.
    #[serde(default)]
    pub contradictions: Vec<ContradictionGroup>,

    /// Final calibrated confidence. Set only by the synthesizer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_confidence: Option<ConfidenceLevel>,

    /// When the session started.
    pub started_at: DateTime<Utc>,

    /// Set once the report builder has run; the session is immutable after.
    #[serde(default)]
    finalized: bool,
}

impl ResearchSession {
    /// Creates a session.
    #[must_use]
    pub fn new(config: SessionConfig, hypotheses: Vec<Hypothesis>) -> Self {
        let started_at = config.now.unwrap_or_else(Utc::now);
        Self {
            id: Uuid::new_v4(),
            config,
            hypotheses,
            sources: Vec::new(),
            dedupe_index: HashMap::new(),
            saturation: SaturationSummary::default(),
            contradictions: Vec::new(),
            final_confidence: None,
            started_at,
            finalized: false,
        }
    }

    /// The evaluation clock for this run.
    #[must_use]
    pub fn clock(&self) -> DateTime<Utc> {
        self.config.now.unwrap_or(self.started_at)
    }

    /// Returns true once the report builder has run.
    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Marks the session immutable.
    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    /// Admits a processed source, merging if its canonical key was already
    /// seen this session. Returns the index of the stored source.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::SessionFinalized` after finalization.
    pub fn admit_source(&mut self, source: Source) -> Result<usize, ValidationError> {
        if self.finalized {
            return Err(ValidationError::SessionFinalized);
        }
        let key = canonical_key(&source.url, source.origin).key;
        if let Some(&idx) = self.dedupe_index.get(&key) {
            Normalizer::merge_duplicate(&mut self.sources[idx], source);
            return Ok(idx);
        }
        let idx = self.sources.len();
        self.dedupe_index.insert(key, idx);
        self.sources.push(source);
        Ok(idx)
    }

    /// Returns true if a raw document's canonical key is already in the
    /// session (used to skip resumed source ids).
    #[must_use]
    pub fn has_seen(&self, doc: &RawDocument) -> bool {
        let key = canonical_key(&doc.locator, doc.origin).key;
        self.dedupe_index.contains_key(&key)
    }

    /// Sources kept despite scoring below the quality floor.
    #[must_use]
    pub fn below_threshold_sources(&self) -> Vec<&Source> {
        self.sources.iter().filter(|s| s.below_threshold).collect()
    }

    /// Sources superseded by replacement fetches (audit trail).
    #[must_use]
    pub fn replaced_sources(&self) -> Vec<&Source> {
        self.sources.iter().filter(|s| s.replaced).collect()
    }

    /// Opaque resume token for deep mode: the source ids already in flight,
    /// so a follow-up session can seed its dedupe table.
    #[must_use]
    pub fn resume_token(&self) -> String {
        let ids: Vec<String> = self.sources.iter().map(|s| s.id.to_string()).collect();
        serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string())
    }

    /// Parses a resume token back into source ids.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidResumeToken` if the token does not
    /// parse.
    pub fn parse_resume_token(token: &str) -> Result<Vec<SourceId>, ValidationError> {
        let ids: Vec<String> =
            serde_json::from_str(token).map_err(|e| ValidationError::InvalidResumeToken {
                reason: e.to_string(),
            })?;
        ids.into_iter()
            .map(|s| {
                SourceId::try_from(s).map_err(|reason| ValidationError::InvalidResumeToken { reason })
            })
            .collect()
    }
}
