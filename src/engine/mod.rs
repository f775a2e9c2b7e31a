//! The research engine: orchestrates one run end to end.
//!
//! Collection fans per-source tasks out over the worker pool and fans the
//! results back into the session, which is mutated only from this thread.
//! Saturation is a cooperative cancellation signal: in-flight tasks finish
//! and are admitted, but no new fetch requests are issued. Once collection
//! stops, the sequential stages run over the whole source set and the report
//! is built from the finalized session.

/// Bounded worker pool and the per-source pipeline context.
pub mod runtime;

use std::sync::Arc;

use crate::conflict::ContradictionResolver;
use crate::error::{EngineError, EngineResult, PipelineError};
use crate::extract::ClaimExtractor;
use crate::normalize::Normalizer;
use crate::providers::{LexicalRelevance, RelevanceModel, SourceCollector, Summarizer};
use crate::report::{Report, ReportBuilder};
use crate::saturation::SaturationDetector;
use crate::score::{cross_verify, ReplacementBudget, QUALITY_FLOOR};
use crate::session::{Hypothesis, ResearchSession, SessionConfig};
use crate::source::{DiscardReason, Source, SourceId};
use crate::synthesis::{assess_confidence, knowledge_gaps, synthesize_recommendation, update_hypotheses};
use crate::tier::{TierClassifier, TierRules};

use self::runtime::{PipelineContext, WorkerPool};

const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// The multi-source research synthesis engine.
///
/// Owns the collaborator handles and the tier rule table; each call to
/// [`ResearchEngine::run`] is an independent session.
pub struct ResearchEngine {
    collector: Arc<dyn SourceCollector>,
    relevance: Arc<dyn RelevanceModel>,
    summarizer: Option<Arc<dyn Summarizer>>,
    tier_rules: TierRules,
    resume_ids: Vec<SourceId>,
    queue_capacity: usize,
}

impl ResearchEngine {
    /// Creates an engine over the given collector, with the lexical
    /// relevance fallback and default tier rules.
    #[must_use]
    pub fn new(collector: Arc<dyn SourceCollector>) -> Self {
        Self {
            collector,
            relevance: Arc::new(LexicalRelevance),
            summarizer: None,
            tier_rules: TierRules::default(),
            resume_ids: Vec::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Injects a relevance model.
    #[must_use]
    pub fn with_relevance(mut self, relevance: Arc<dyn RelevanceModel>) -> Self {
        self.relevance = relevance;
        self
    }

    /// Injects a summarization collaborator.
    #[must_use]
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Overrides the tier rule table.
    #[must_use]
    pub fn with_tier_rules(mut self, rules: TierRules) -> Self {
        self.tier_rules = rules;
        self
    }

    /// Seeds the run with source ids from a previous session's resume
    /// token; matching candidates are skipped instead of re-processed.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidResumeToken` if the token does not
    /// parse.
    pub fn with_resume_token(mut self, token: &str) -> EngineResult<Self> {
        self.resume_ids = ResearchSession::parse_resume_token(token)?;
        Ok(self)
    }

    /// Runs one research session and returns the report.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed inputs and a pipeline error
    /// if the worker pool fails. Degraded sources (timeouts, low scores) are
    /// recorded in the report, never returned as errors.
    pub fn run(
        &self,
        config: SessionConfig,
        hypotheses: Vec<Hypothesis>,
    ) -> EngineResult<Report> {
        self.run_session(config, hypotheses).map(|(report, _)| report)
    }

    /// Runs one research session and returns the report together with the
    /// finalized session (for its resume token and audit trail).
    ///
    /// # Errors
    ///
    /// See [`ResearchEngine::run`].
    pub fn run_session(
        &self,
        config: SessionConfig,
        hypotheses: Vec<Hypothesis>,
    ) -> EngineResult<(Report, ResearchSession)> {
        let depth = config.depth;
        let mut session = ResearchSession::new(config, hypotheses);
        let clock = session.clock();

        tracing::info!(
            session = %session.id,
            query = %session.config.query,
            depth = %depth,
            "starting research session"
        );

        let context = Arc::new(PipelineContext {
            query: session.config.query.clone(),
            hypotheses: session.hypotheses.clone(),
            classifier: TierClassifier::new(self.tier_rules.clone()),
            relevance: Arc::clone(&self.relevance),
            summarizer: self.summarizer.clone(),
            extractor: ClaimExtractor::new(),
            clock,
        });
        let pool = WorkerPool::start(depth.worker_cap(), self.queue_capacity, Arc::clone(&context));
        let mut detector = SaturationDetector::new(depth);
        let mut next_insert = 0usize;

        while detector.should_request_more() {
            // Fan out one batch, bounded by the worker cap.
            let mut handles = Vec::new();
            let mut exhausted = false;
            while handles.len() < depth.worker_cap() {
                let Some(doc) = self.collector.next_candidate() else {
                    exhausted = true;
                    break;
                };
                if self.skip_resumed(&session, &doc) {
                    continue;
                }
                handles.push(pool.try_submit(doc, next_insert)?);
                next_insert += 1;
            }

            if handles.is_empty() {
                if exhausted {
                    detector.mark_collector_exhausted();
                }
                break;
            }

            // Fan back in, in submission order, so admission is
            // deterministic regardless of worker interleaving.
            for handle in handles {
                let inserted_at = handle.inserted_at();
                let doc = handle.doc().clone();
                match handle.join_deadline(session.config.per_source_timeout) {
                    Ok(source) => {
                        self.admit(&mut session, &mut detector, &context, source, &mut next_insert)?;
                    }
                    Err(EngineError::Pipeline(PipelineError::SourceTimeout { duration_ms })) => {
                        tracing::warn!(locator = %doc.locator, duration_ms, "per-source task timed out");
                        let mut source = Normalizer::normalize(doc, inserted_at);
                        source.mark_timed_out();
                        session.admit_source(source)?;
                    }
                    Err(err) => return Err(err),
                }
            }

            if exhausted && detector.should_request_more() {
                detector.mark_collector_exhausted();
            }
        }

        drop(pool);
        session.saturation = detector.summary();
        tracing::debug!(
            sources = session.sources.len(),
            reason = ?session.saturation.reason,
            "collection stopped"
        );

        // Sequential, whole-set stages.
        cross_verify(&mut session.sources);
        session.contradictions = ContradictionResolver::new(session.config.currency_window_days)
            .detect(&session.sources, clock);
        update_hypotheses(&mut session.hypotheses, &session.sources);

        let confidence = assess_confidence(&session.sources, &session.contradictions);
        session.final_confidence = Some(confidence);
        let gaps = knowledge_gaps(&session.hypotheses, &session.sources, &session.contradictions);
        let recommendation = synthesize_recommendation(
            &session.hypotheses,
            &session.sources,
            &session.contradictions,
            confidence,
        );

        session.finalize();
        let report = ReportBuilder::build(&session, gaps, recommendation);
        tracing::info!(
            session = %session.id,
            confidence = %report.confidence,
            sources = report.sources.len(),
            contradictions = report.contradictions.len(),
            "research session complete"
        );
        Ok((report, session))
    }

    /// Admits one processed source, running the bounded replacement loop if
    /// it scored below the quality floor.
    fn admit(
        &self,
        session: &mut ResearchSession,
        detector: &mut SaturationDetector,
        context: &PipelineContext,
        source: Source,
        next_insert: &mut usize,
    ) -> EngineResult<()> {
        let mut current = source;
        let mut budget = ReplacementBudget::for_depth(session.config.depth);
        let refined = self.refined_terms(session);

        while below_floor(&current) {
            if !budget.try_consume() {
                // Budget exhausted: kept and flagged, never refetched again.
                current.below_threshold = true;
                break;
            }
            let Some(replacement) = self.collector.fetch_replacement(&refined) else {
                current.below_threshold = true;
                break;
            };
            if session.has_seen(&replacement) || self.skip_resumed(session, &replacement) {
                continue; // consumed one retry, nothing admitted
            }

            tracing::debug!(
                replaced = %current.url,
                with = %replacement.locator,
                remaining = budget.remaining(),
                "replacing below-floor source"
            );
            current.mark_replaced();
            current.discard_reason = Some(DiscardReason::LowScore);
            session.admit_source(current)?;

            current = context.process(replacement, *next_insert)?;
            *next_insert += 1;
        }

        current.claims = detector.dedupe_claims(std::mem::take(&mut current.claims));
        let claims = current.claims.clone();
        let text = current.raw_text.clone();
        let observe = !current.replaced && !current.is_discarded();
        // A candidate merged into an already-seen source is not a new
        // source; it must not count toward the depth minimum.
        let before = session.sources.len();
        session.admit_source(current)?;
        if observe && session.sources.len() > before {
            detector.observe_source(&claims, &text);
        }
        Ok(())
    }

    fn skip_resumed(&self, session: &ResearchSession, doc: &crate::source::RawDocument) -> bool {
        if session.has_seen(doc) {
            return true;
        }
        if self.resume_ids.is_empty() {
            return false;
        }
        let key = crate::normalize::canonical_key(&doc.locator, doc.origin).key;
        self.resume_ids.contains(&SourceId::from_canonical_key(&key))
    }

    fn refined_terms(&self, session: &ResearchSession) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        for hypothesis in &session.hypotheses {
            for term in &hypothesis.terms {
                if !terms.contains(term) {
                    terms.push(term.clone());
                }
            }
        }
        terms
    }
}

fn below_floor(source: &Source) -> bool {
    !source.replaced
        && source.discard_reason.is_none()
        && source.final_score.is_some_and(|s| s < QUALITY_FLOOR)
}
