//! Claim deduplication and the saturation stopping rule.
//!
//! The detector watches information gain as sources arrive: consecutive
//! sources that contribute zero new subject keys (or, in deep mode, zero new
//! vocabulary terms) drive a streak counter, and three in a row stop further
//! collection — provided the depth-dependent minimum source count has been
//! met. Before the minimum, signals are recorded but never acted upon.
//!
//! The state machine is monotonic: `Collecting -> Saturable -> Saturated`,
//! and it never leaves `Saturated`.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::claim::Claim;
use crate::depth::Depth;
use crate::session::SaturationSummary;

/// Consecutive no-new-information sources required to saturate.
pub const NO_NEW_INFORMATION_STREAK: u32 = 3;

/// Why source collection stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Consecutive sources added no new subject keys.
    Thematic,
    /// Consecutive sources added no new vocabulary (deep mode only).
    Lexical,
    /// The collector ran out of candidates before saturation.
    CollectorExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thematic => write!(f, "thematic"),
            Self::Lexical => write!(f, "lexical"),
            Self::CollectorExhausted => write!(f, "collector_exhausted"),
        }
    }
}

/// Collection state. Transitions only move rightward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionState {
    /// Below the depth minimum; saturation signals are recorded only.
    Collecting,
    /// Minimum met; a saturation signal may now stop the run.
    Saturable,
    /// Terminal. No new fetch requests are issued.
    Saturated,
}

impl fmt::Display for CollectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collecting => write!(f, "collecting"),
            Self::Saturable => write!(f, "saturable"),
            Self::Saturated => write!(f, "saturated"),
        }
    }
}

/// Deduplicates claims and decides when to stop requesting sources.
#[derive(Debug)]
pub struct SaturationDetector {
    depth: Depth,
    state: CollectionState,
    reason: Option<StopReason>,
    thematic_streak: u32,
    lexical_streak: u32,
    signals_before_minimum: u32,
    observed: usize,
    seen_subjects: HashSet<String>,
    seen_terms: HashSet<String>,
}

impl SaturationDetector {
    /// Creates a detector for the given depth.
    #[must_use]
    pub fn new(depth: Depth) -> Self {
        Self {
            depth,
            state: CollectionState::Collecting,
            reason: None,
            thematic_streak: 0,
            lexical_streak: 0,
            signals_before_minimum: 0,
            observed: 0,
            seen_subjects: HashSet::new(),
            seen_terms: HashSet::new(),
        }
    }

    /// Current collection state.
    #[must_use]
    pub const fn state(&self) -> CollectionState {
        self.state
    }

    /// Stop reason, once one exists.
    #[must_use]
    pub const fn reason(&self) -> Option<StopReason> {
        self.reason
    }

    /// True while new fetch requests should still be issued.
    #[must_use]
    pub fn should_request_more(&self) -> bool {
        self.state != CollectionState::Saturated
    }

    /// Removes near-duplicate claims within one source's batch: same
    /// subject, same polarity, same word set. The first occurrence survives.
    ///
    /// Deduplication is deliberately per-source: the same assertion from a
    /// *different* source is corroboration, which the cross-verification
    /// pass must still see.
    #[must_use]
    pub fn dedupe_claims(&mut self, claims: Vec<Claim>) -> Vec<Claim> {
        let mut seen: HashSet<[u8; 32]> = HashSet::new();
        claims
            .into_iter()
            .filter(|claim| seen.insert(fingerprint(claim)))
            .collect()
    }

    /// Observes one admitted source: its surviving claims and raw text.
    /// Updates streaks and returns the (possibly advanced) state.
    pub fn observe_source(&mut self, claims: &[Claim], text: &str) -> CollectionState {
        self.observed += 1;

        let mut new_subjects = 0usize;
        for claim in claims {
            if self.seen_subjects.insert(claim.subject.clone()) {
                new_subjects += 1;
            }
        }
        if new_subjects == 0 {
            self.thematic_streak += 1;
        } else {
            self.thematic_streak = 0;
        }

        if self.depth.tracks_lexical_novelty() {
            let mut new_terms = 0usize;
            for token in text
                .split(|c: char| !c.is_ascii_alphanumeric())
                .filter(|t| t.len() > 3)
            {
                if self.seen_terms.insert(token.to_ascii_lowercase()) {
                    new_terms += 1;
                }
            }
            if new_terms == 0 {
                self.lexical_streak += 1;
            } else {
                self.lexical_streak = 0;
            }
        }

        self.advance();
        self.state
    }

    /// Records that the collector ran out of candidates. Terminal, like
    /// saturation, but reported with its own reason.
    pub fn mark_collector_exhausted(&mut self) {
        if self.state != CollectionState::Saturated {
            self.state = CollectionState::Saturated;
            self.reason = Some(StopReason::CollectorExhausted);
        }
    }

    fn advance(&mut self) {
        if self.state == CollectionState::Saturated {
            return; // terminal, never reverts
        }

        let minimum_met = self.observed >= self.depth.minimum_sources();
        let signal = if self.thematic_streak >= NO_NEW_INFORMATION_STREAK {
            Some(StopReason::Thematic)
        } else if self.lexical_streak >= NO_NEW_INFORMATION_STREAK {
            Some(StopReason::Lexical)
        } else {
            None
        };

        if !minimum_met {
            if signal.is_some() {
                self.signals_before_minimum += 1;
            }
            return;
        }

        self.state = CollectionState::Saturable;
        if let Some(reason) = signal {
            self.state = CollectionState::Saturated;
            self.reason = Some(reason);
        }
    }

    /// Snapshot for the session record.
    #[must_use]
    pub fn summary(&self) -> SaturationSummary {
        SaturationSummary {
            reason: self.reason,
            stopped_at_source_count: self.observed,
            minimum_met: self.observed >= self.depth.minimum_sources(),
            signals_before_minimum: self.signals_before_minimum,
        }
    }
}

fn fingerprint(claim: &Claim) -> [u8; 32] {
    let mut tokens: Vec<String> = claim
        .text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    tokens.sort_unstable();
    tokens.dedup();

    let mut hasher = blake3::Hasher::new();
    hasher.update(claim.subject.as_bytes());
    hasher.update(&[claim.polarity as u8]);
    hasher.update(tokens.join(" ").as_bytes());
    *hasher.finalize().as_bytes()
}
