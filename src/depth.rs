//! Research depth levels and their resource budgets.
//!
//! Depth is chosen by the caller at session start and fixes every budget the
//! engine consults: how many sources must be collected before saturation may
//! stop the run, how many replacement fetches a low-quality slot is allowed,
//! and how wide the per-source worker pool fans out.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How thorough a research run should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Depth {
    /// Fast answer from a handful of sources.
    Quick,

    /// Default depth for most queries.
    Standard,

    /// Exhaustive run with keyword-expansion rounds.
    Deep,
}

impl Default for Depth {
    fn default() -> Self {
        Self::Standard
    }
}

impl Depth {
    /// Minimum number of sources that must be collected before a
    /// saturation signal is allowed to stop the run.
    #[must_use]
    pub const fn minimum_sources(self) -> usize {
        match self {
            Self::Quick => 5,
            Self::Standard => 10,
            Self::Deep => 15,
        }
    }

    /// Replacement fetches allowed per below-threshold source slot.
    #[must_use]
    pub const fn replacement_retries(self) -> u32 {
        match self {
            Self::Quick => 2,
            Self::Standard => 4,
            Self::Deep => 8,
        }
    }

    /// Upper bound on concurrently processed sources.
    #[must_use]
    pub const fn worker_cap(self) -> usize {
        match self {
            Self::Quick => 3,
            Self::Standard => 5,
            Self::Deep => 7,
        }
    }

    /// Whether term-level novelty is tracked in addition to subject-level
    /// novelty. Only deep mode runs keyword-expansion rounds.
    #[must_use]
    pub const fn tracks_lexical_novelty(self) -> bool {
        matches!(self, Self::Deep)
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quick => write!(f, "quick"),
            Self::Standard => write!(f, "standard"),
            Self::Deep => write!(f, "deep"),
        }
    }
}
