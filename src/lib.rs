//! # Dossier - Multi-Source Research Synthesis Engine
//!
//! Dossier turns a research question and a stream of raw candidate sources
//! into a reliability-ranked, contradiction-resolved, saturation-bounded
//! report. It does not crawl, fetch, or call a language model: collectors,
//! relevance scoring, and summarization are injected collaborators, and the
//! engine owns everything between them and the final structured report.
//!
//! ## Core Concepts
//!
//! - **Source**: one fetched document or local-code snippet, normalized,
//!   tier-classified, and scored on five weighted dimensions
//! - **Tier**: discrete authority classification (T1 official docs .. T6
//!   unverifiable), assigned by rule, never by score
//! - **Claim**: an atomic, attributable assertion with a subject key and a
//!   polarity relative to the session's working hypotheses
//! - **ContradictionGroup**: claims on one subject that disagree, classified
//!   and resolved by an explicit rule table
//! - **Report**: the structured output, with calibrated confidence and every
//!   weak or discarded source labeled rather than dropped
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dossier::{
//!     Depth, Hypothesis, QueueCollector, ResearchEngine, SessionConfig,
//! };
//!
//! let collector = Arc::new(QueueCollector::new(candidates));
//! let engine = ResearchEngine::new(collector);
//!
//! let config = SessionConfig::builder("should we adopt react 19 ssr")
//!     .depth(Depth::Standard)
//!     .build()?;
//! let hypotheses = vec![Hypothesis::new(
//!     "React 19 enables SSR by default",
//!     "react-19-ssr-default",
//! )?];
//!
//! let report = engine.run(config, hypotheses)?;
//! println!("{}", report.to_json_pretty()?);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Evidence model
pub mod claim;
pub mod error;
pub mod normalize;
pub mod score;
pub mod source;
pub mod tier;

// Pipeline stages
pub mod conflict;
pub mod extract;
pub mod report;
pub mod saturation;
pub mod synthesis;

// Session and orchestration
pub mod depth;
pub mod engine;
pub mod providers;
pub mod session;

// Re-export primary types at crate root for convenience
pub use claim::{Claim, ClaimBuilder, ClaimId, Polarity};
pub use conflict::{
    Classification, ContradictionGroup, ContradictionResolver, GroupId, Resolution,
};
pub use depth::Depth;
pub use engine::runtime::{PipelineContext, TaskHandle, WorkerPool};
pub use engine::ResearchEngine;
pub use error::{EngineError, EngineResult, PipelineError, ValidationError};
pub use extract::ClaimExtractor;
pub use normalize::{canonical_key, CanonicalKey, Normalizer};
pub use providers::{
    LexicalRelevance, QueueCollector, RelevanceModel, SourceCollector, Summarizer,
};
pub use report::{ClaimEntry, ContradictionEntry, Report, ReportBuilder, SourceEntry};
pub use saturation::{CollectionState, SaturationDetector, StopReason};
pub use score::{
    accuracy_score, authority_score, cross_verify, currency_score, score_source,
    ReplacementBudget, ScoreDimensions, Verification, QUALITY_FLOOR,
};
pub use session::{
    Hypothesis, ResearchSession, SaturationSummary, SessionConfig, SessionConfigBuilder,
};
pub use source::{
    DiscardReason, DocumentMarker, OriginTag, Purpose, QualityBand, RawDocument, Source, SourceId,
};
pub use synthesis::{
    assess_confidence, knowledge_gaps, synthesize_recommendation, update_hypotheses,
    ConfidenceLevel, Recommendation,
};
pub use tier::{Tier, TierClassifier, TierRules};
