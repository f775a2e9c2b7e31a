//! Error types for the synthesis engine.
//!
//! All errors are strongly typed using thiserror. Note that most degraded
//! conditions in the pipeline (a source that times out, a claim extraction
//! that yields nothing, a contradiction that cannot be classified) are *not*
//! errors: they are recorded on the affected record and surfaced in the final
//! report. The variants here cover API misuse and runtime plumbing failures,
//! the only things that can actually stop a run.

use thiserror::Error;

/// Validation errors that occur while constructing inputs.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Query cannot be empty")]
    EmptyQuery,

    #[error("Claim subject cannot be empty")]
    EmptySubject,

    #[error("Hypothesis statement cannot be empty")]
    EmptyStatement,

    #[error("Score dimension '{dimension}' value {value} is out of range [0.0, 100.0]")]
    ScoreOutOfRange {
        dimension: &'static str,
        value: f32,
    },

    #[error("Invalid resume token: {reason}")]
    InvalidResumeToken {
        reason: String,
    },

    #[error("Session is finalized and can no longer be mutated")]
    SessionFinalized,
}

/// Runtime errors from the worker pool and channel plumbing.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Worker queue is full (capacity: {capacity})")]
    QueueFull {
        capacity: usize,
    },

    #[error("Worker pool disconnected before replying")]
    Disconnected,

    #[error("Per-source task exceeded its deadline of {duration_ms}ms")]
    SourceTimeout {
        duration_ms: u64,
    },
}

/// Top-level error type for the synthesis engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl EngineError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a pipeline error.
    #[must_use]
    pub const fn is_pipeline(&self) -> bool {
        matches!(self, Self::Pipeline(_))
    }

    /// Returns true if retrying the same call could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false, // Validation errors won't change on retry
            Self::Pipeline(e) => matches!(
                e,
                PipelineError::QueueFull { .. } | PipelineError::SourceTimeout { .. }
            ),
            Self::Internal { .. } => false,
        }
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
