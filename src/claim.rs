//! Claims — atomic, attributable assertions extracted from sources.
//!
//! A claim is not free text: it carries a normalized subject key used for
//! grouping, a polarity relative to the session's working hypotheses, and an
//! extraction confidence separate from the reliability of its source. The
//! source owns the claim; the claim only points back.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::source::SourceId;

/// Unique identifier for a claim.
///
/// Derived (uuid v5) from the owning source id, the subject key, and the
/// extraction ordinal, so identical inputs always yield identical ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(Uuid);

impl ClaimId {
    /// Derives a deterministic claim id.
    #[must_use]
    pub fn derive(source_id: SourceId, subject: &str, ordinal: usize) -> Self {
        let name = format!("{source_id}:{subject}:{ordinal}");
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Polarity of a claim relative to the working hypothesis on its subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Agrees with the hypothesis.
    Supports,
    /// Disagrees with the hypothesis.
    Refutes,
    /// Neither agrees nor disagrees (hedged or descriptive).
    Neutral,
}

impl Polarity {
    /// Returns true if two polarities actually disagree. Neutral claims
    /// never conflict with anything.
    #[must_use]
    pub const fn conflicts_with(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Supports, Self::Refutes) | (Self::Refutes, Self::Supports)
        )
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Supports => write!(f, "supports"),
            Self::Refutes => write!(f, "refutes"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

/// An atomic, attributable assertion extracted from one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    /// Deterministic claim id.
    pub id: ClaimId,

    /// Back-reference to the owning source (not ownership).
    pub source_id: SourceId,

    /// Normalized topic key used for grouping, e.g. "react-19-ssr-default".
    pub subject: String,

    /// The claim text as extracted.
    pub text: String,

    /// Polarity relative to the working hypothesis.
    pub polarity: Polarity,

    /// Confidence in the extraction itself (0.0-1.0). Separate from source
    /// reliability.
    pub extraction_confidence: f32,

    /// When the claim was extracted.
    pub extracted_at: DateTime<Utc>,
}

impl Claim {
    /// Starts building a claim.
    #[must_use]
    pub fn builder() -> ClaimBuilder {
        ClaimBuilder::default()
    }
}

impl PartialEq for Claim {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Claim {}

/// Builder for claims. Validates the subject at `build()`.
#[derive(Debug, Default)]
pub struct ClaimBuilder {
    source_id: Option<SourceId>,
    subject: Option<String>,
    text: Option<String>,
    polarity: Option<Polarity>,
    extraction_confidence: Option<f32>,
    ordinal: usize,
    extracted_at: Option<DateTime<Utc>>,
}

impl ClaimBuilder {
    /// Sets the owning source.
    #[must_use]
    pub fn source(mut self, source_id: SourceId) -> Self {
        self.source_id = Some(source_id);
        self
    }

    /// Sets the subject key.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the claim text.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the polarity.
    #[must_use]
    pub fn polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = Some(polarity);
        self
    }

    /// Sets the extraction confidence (clamped to [0.0, 1.0]).
    #[must_use]
    pub fn extraction_confidence(mut self, confidence: f32) -> Self {
        self.extraction_confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    /// Sets the extraction ordinal within the source (id derivation input).
    #[must_use]
    pub fn ordinal(mut self, ordinal: usize) -> Self {
        self.ordinal = ordinal;
        self
    }

    /// Sets the extraction timestamp (defaults to now).
    #[must_use]
    pub fn extracted_at(mut self, at: DateTime<Utc>) -> Self {
        self.extracted_at = Some(at);
        self
    }

    /// Builds the claim.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptySubject` if the subject key is missing
    /// or blank — a claim with no assignable subject contributes no signal
    /// and must be dropped by the caller, not built.
    pub fn build(self) -> Result<Claim, ValidationError> {
        let subject = self
            .subject
            .filter(|s| !s.trim().is_empty())
            .ok_or(ValidationError::EmptySubject)?;
        let source_id = self.source_id.ok_or(ValidationError::EmptySubject)?;

        Ok(Claim {
            id: ClaimId::derive(source_id, &subject, self.ordinal),
            source_id,
            subject,
            text: self.text.unwrap_or_default(),
            polarity: self.polarity.unwrap_or(Polarity::Neutral),
            extraction_confidence: self.extraction_confidence.unwrap_or(1.0),
            extracted_at: self.extracted_at.unwrap_or_else(Utc::now),
        })
    }
}
