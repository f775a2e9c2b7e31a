//! Parallel per-source pipeline runtime.
//!
//! One task per candidate source, fanned out over a bounded, thread-based
//! worker pool and fanned back into the single session-mutation point in the
//! engine. A worker runs the per-source stages in their only legal order:
//! normalize, classify, score, extract. Everything global (deduplication,
//! contradiction resolution, synthesis) stays out of the pool.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::error::{EngineError, EngineResult, PipelineError};
use crate::extract::ClaimExtractor;
use crate::normalize::Normalizer;
use crate::providers::{RelevanceModel, Summarizer};
use crate::score::score_source;
use crate::session::Hypothesis;
use crate::source::{QualityBand, RawDocument, Source};
use crate::tier::TierClassifier;

/// Read-only state shared by all worker tasks for one run.
pub struct PipelineContext {
    /// The session query, fed to the relevance model.
    pub query: String,

    /// Working hypotheses for claim extraction.
    pub hypotheses: Vec<Hypothesis>,

    /// Tier rule table.
    pub classifier: TierClassifier,

    /// Injected relevance collaborator.
    pub relevance: Arc<dyn RelevanceModel>,

    /// Optional summarization collaborator.
    pub summarizer: Option<Arc<dyn Summarizer>>,

    /// Claim extractor.
    pub extractor: ClaimExtractor,

    /// The session evaluation clock. Fixed per run, so scoring and
    /// classification are deterministic.
    pub clock: DateTime<Utc>,
}

impl PipelineContext {
    /// Runs the per-source pipeline on one raw document.
    ///
    /// Sources in the discard band skip extraction: their claims would never
    /// reach synthesis.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the relevance collaborator violates the
    /// 0-100 contract.
    pub fn process(&self, doc: RawDocument, inserted_at: usize) -> EngineResult<Source> {
        let relevance = self.relevance.relevance(&self.query, &doc);

        let statements = match &self.summarizer {
            Some(summarizer) => Some(summarizer.key_statements(&doc)),
            None => None,
        };

        let mut source = Normalizer::normalize(doc, inserted_at);
        let tier = self.classifier.classify(&source, self.clock);
        source.assign_tier(tier);
        score_source(&mut source, relevance, self.clock)?;

        if source.quality_band != Some(QualityBand::Discard) {
            let statements =
                statements.unwrap_or_else(|| self.extractor.segment(&source.raw_text));
            source.claims =
                self.extractor
                    .extract(source.id, &statements, &self.hypotheses, self.clock);
        }

        Ok(source)
    }
}

enum Job {
    Process {
        doc: RawDocument,
        inserted_at: usize,
        reply: Sender<EngineResult<Source>>,
    },
}

/// Handle for one in-flight per-source task.
pub struct TaskHandle {
    rx: Receiver<EngineResult<Source>>,
    doc: RawDocument,
    inserted_at: usize,
}

impl TaskHandle {
    /// The raw document this task is processing. Used to record a timed-out
    /// source instead of silently dropping it.
    #[must_use]
    pub fn doc(&self) -> &RawDocument {
        &self.doc
    }

    /// Insertion order assigned at submission.
    #[must_use]
    pub const fn inserted_at(&self) -> usize {
        self.inserted_at
    }

    /// Waits for the task to complete.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Disconnected` if the pool shut down before
    /// replying.
    pub fn join(self) -> EngineResult<Source> {
        self.rx
            .recv()
            .map_err(|_| EngineError::Pipeline(PipelineError::Disconnected))?
    }

    /// Waits for the task with an optional deadline. `None` waits forever.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::SourceTimeout` when the deadline elapses and
    /// `PipelineError::Disconnected` if the pool shut down.
    pub fn join_deadline(self, deadline: Option<Duration>) -> EngineResult<Source> {
        let Some(deadline) = deadline else {
            return self.join();
        };
        self.rx.recv_timeout(deadline).map_err(|err| match err {
            RecvTimeoutError::Timeout => EngineError::Pipeline(PipelineError::SourceTimeout {
                duration_ms: deadline.as_millis().min(u128::from(u64::MAX)) as u64,
            }),
            RecvTimeoutError::Disconnected => EngineError::Pipeline(PipelineError::Disconnected),
        })?
    }
}

/// Bounded thread pool running per-source tasks.
///
/// Dropping the pool closes the channel; workers drain queued jobs and exit,
/// and their threads are joined.
pub struct WorkerPool {
    tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    queue_capacity: usize,
}

impl WorkerPool {
    /// Starts `workers` threads sharing one bounded job queue.
    #[must_use]
    pub fn start(workers: usize, queue_capacity: usize, context: Arc<PipelineContext>) -> Self {
        let workers = workers.max(1);
        let queue_capacity = queue_capacity.max(1);
        let (tx, rx) = bounded::<Job>(queue_capacity);

        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let rx: Receiver<Job> = rx.clone();
            let context = Arc::clone(&context);
            let thread_name = format!("dossier-worker-{idx}");
            let builder = thread::Builder::new().name(thread_name);
            match builder.spawn(move || {
                while let Ok(Job::Process {
                    doc,
                    inserted_at,
                    reply,
                }) = rx.recv()
                {
                    let result = context.process(doc, inserted_at);
                    let _ = reply.send(result);
                }
            }) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    tracing::error!(error = %err, "failed to spawn worker thread");
                }
            }
        }

        Self {
            tx: Some(tx),
            workers: handles,
            queue_capacity,
        }
    }

    /// Submits one document without blocking.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::QueueFull` when the queue is at capacity and
    /// `PipelineError::Disconnected` when all workers have exited.
    pub fn try_submit(&self, doc: RawDocument, inserted_at: usize) -> EngineResult<TaskHandle> {
        let tx = self
            .tx
            .as_ref()
            .ok_or(EngineError::Pipeline(PipelineError::Disconnected))?;
        let (reply, rx) = bounded::<EngineResult<Source>>(1);
        let job = Job::Process {
            doc: doc.clone(),
            inserted_at,
            reply,
        };
        match tx.try_send(job) {
            Ok(()) => Ok(TaskHandle {
                rx,
                doc,
                inserted_at,
            }),
            Err(TrySendError::Full(_)) => {
                Err(EngineError::Pipeline(PipelineError::QueueFull {
                    capacity: self.queue_capacity,
                }))
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(EngineError::Pipeline(PipelineError::Disconnected))
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Close the channel so workers exit after draining the queue.
        self.tx.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
