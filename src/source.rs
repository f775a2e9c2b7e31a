//! Source records and provenance.
//!
//! Every piece of evidence the engine reasons about is a `Source`: one
//! fetched web document or one local-code snippet. Knowing where information
//! comes from is critical for tier classification, conflict resolution, and
//! the audit trail — discarded sources are never deleted, only flagged.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::claim::Claim;
use crate::score::ScoreDimensions;
use crate::tier::Tier;

/// Stable identifier for a source: a blake3 hash of the canonical dedupe
/// key. Identical canonical keys always produce identical ids, which is what
/// makes reports reproducible across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SourceId([u8; 16]);

impl SourceId {
    /// Derives the id from a canonical dedupe key.
    #[must_use]
    pub fn from_canonical_key(key: &str) -> Self {
        let hash = blake3::hash(key.as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash.as_bytes()[..16]);
        Self(bytes)
    }

    /// Returns the raw id bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl From<SourceId> for String {
    fn from(id: SourceId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for SourceId {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.len() != 32 {
            return Err(format!("source id must be 32 hex chars, got {}", s.len()));
        }
        let mut bytes = [0u8; 16];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let hi = (chunk[0] as char)
                .to_digit(16)
                .ok_or_else(|| format!("invalid hex in source id: {s}"))?;
            let lo = (chunk[1] as char)
                .to_digit(16)
                .ok_or_else(|| format!("invalid hex in source id: {s}"))?;
            bytes[i] = ((hi << 4) | lo) as u8;
        }
        Ok(Self(bytes))
    }
}

/// Where a raw document came from, as tagged by the (external) collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginTag {
    /// Official documentation or a specification/standard host.
    OfficialDocs,

    /// Release notes, changelogs, VCS hosts.
    SourceRepo,

    /// Maintainer or recognized-author byline.
    RecognizedExpert,

    /// Community-curated content (Q&A, curated lists).
    CommunityCurated,

    /// Any other web source.
    Web,

    /// A snippet from the local codebase under research.
    LocalCode,
}

impl fmt::Display for OriginTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OfficialDocs => write!(f, "official-docs"),
            Self::SourceRepo => write!(f, "source-repo"),
            Self::RecognizedExpert => write!(f, "recognized-expert"),
            Self::CommunityCurated => write!(f, "community-curated"),
            Self::Web => write!(f, "web"),
            Self::LocalCode => write!(f, "local-code"),
        }
    }
}

/// Content markers detected upstream (by the fetcher or an annotator) that
/// feed the tier rules and authority modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentMarker {
    /// The document appears machine-generated.
    AiGenerated,

    /// A vendor praising its own product.
    VendorSelfPraise,

    /// Sponsored content or a competitive-bias marker.
    Sponsored,

    /// Byline matches a core maintainer of the subject project.
    CoreMaintainer,
}

/// Why a document was written. Feeds the purpose score dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// Teaches or explains.
    Educational,
    /// Reports or documents.
    Informational,
    /// Sells or promotes.
    Commercial,
}

impl Default for Purpose {
    fn default() -> Self {
        Self::Informational
    }
}

impl Purpose {
    /// The purpose dimension score (0-100).
    #[must_use]
    pub const fn score(self) -> f32 {
        match self {
            Self::Educational => 100.0,
            Self::Informational => 80.0,
            Self::Commercial => 40.0,
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Educational => write!(f, "educational"),
            Self::Informational => write!(f, "informational"),
            Self::Commercial => write!(f, "commercial"),
        }
    }
}

/// One raw fetch result, exactly as handed over by the collector.
///
/// The engine does not crawl or fetch; this tuple is its entire view of the
/// outside world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    /// URL for web documents, absolute path for local ones.
    pub locator: String,

    /// Document title.
    pub title: String,

    /// Full extracted text.
    pub text: String,

    /// Publication date, if known. Unknown-date sources are scored
    /// conservatively, never rewarded for missing metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,

    /// Collector-assigned origin tag.
    pub origin: OriginTag,

    /// Author byline, if one was extracted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byline: Option<String>,

    /// Engagement signal (votes, stars, reactions), if available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement: Option<u32>,

    /// Why the document was written.
    #[serde(default)]
    pub purpose: Purpose,

    /// Upstream content markers.
    #[serde(default)]
    pub markers: Vec<DocumentMarker>,
}

impl RawDocument {
    /// Creates a web document with the given origin tag.
    #[must_use]
    pub fn web(locator: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            title: title.into(),
            text: text.into(),
            published: None,
            origin: OriginTag::Web,
            byline: None,
            engagement: None,
            purpose: Purpose::default(),
            markers: Vec::new(),
        }
    }

    /// Creates a local-code document.
    #[must_use]
    pub fn local(path: impl Into<String>, text: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            locator: path.clone(),
            title: path,
            text: text.into(),
            published: None,
            origin: OriginTag::LocalCode,
            byline: None,
            engagement: None,
            purpose: Purpose::default(),
            markers: Vec::new(),
        }
    }

    /// Sets the origin tag.
    #[must_use]
    pub fn with_origin(mut self, origin: OriginTag) -> Self {
        self.origin = origin;
        self
    }

    /// Sets the publication date.
    #[must_use]
    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }

    /// Sets the byline.
    #[must_use]
    pub fn with_byline(mut self, byline: impl Into<String>) -> Self {
        self.byline = Some(byline.into());
        self
    }

    /// Sets the engagement signal.
    #[must_use]
    pub fn with_engagement(mut self, engagement: u32) -> Self {
        self.engagement = Some(engagement);
        self
    }

    /// Sets the purpose.
    #[must_use]
    pub fn with_purpose(mut self, purpose: Purpose) -> Self {
        self.purpose = purpose;
        self
    }

    /// Adds a content marker.
    #[must_use]
    pub fn with_marker(mut self, marker: DocumentMarker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Returns true if the given marker is present.
    #[must_use]
    pub fn has_marker(&self, marker: DocumentMarker) -> bool {
        self.markers.contains(&marker)
    }
}

/// Score-derived display bucket for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityBand {
    /// Final score >= 85.
    Primary,
    /// Final score 70-84.
    Supporting,
    /// Final score 50-69.
    Supplementary,
    /// Final score < 50.
    Discard,
}

impl QualityBand {
    /// Derives the band from a final score. Pure function of the score.
    #[must_use]
    pub fn from_score(score: f32) -> Self {
        if score >= 85.0 {
            Self::Primary
        } else if score >= 70.0 {
            Self::Supporting
        } else if score >= 50.0 {
            Self::Supplementary
        } else {
            Self::Discard
        }
    }
}

impl fmt::Display for QualityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Supporting => write!(f, "supporting"),
            Self::Supplementary => write!(f, "supplementary"),
            Self::Discard => write!(f, "discard"),
        }
    }
}

/// Why a source was discarded without contributing evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// The per-source task exceeded its deadline.
    Timeout,
    /// The final score fell below the quality floor.
    LowScore,
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::LowScore => write!(f, "low_score"),
        }
    }
}

/// One fetched or local document, normalized and (eventually) scored.
///
/// A Source owns its Claims; claims never outlive their source. The tier is
/// assigned once by the classifier and is immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Stable hash of the canonical dedupe key.
    pub id: SourceId,

    /// Original URL or local path.
    pub url: String,

    /// Title (earliest seen wins on merge).
    pub title: String,

    /// Lower-cased host, or `"unknown"` for malformed locators.
    pub domain: String,

    /// Publication date, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,

    /// Collector origin tag.
    pub origin: OriginTag,

    /// Authority tier. Assigned once; see [`Source::assign_tier`].
    pub tier: Tier,

    /// Full extracted text.
    pub raw_text: String,

    /// Claims extracted from this source.
    #[serde(default)]
    pub claims: Vec<Claim>,

    /// Score dimensions, once the score engine has run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<ScoreDimensions>,

    /// Cached weighted final score (0-100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<f32>,

    /// Band derived from the final score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_band: Option<QualityBand>,

    /// Kept despite scoring below the quality floor (replacement budget
    /// exhausted). Surfaced in the report so weak evidence is labeled.
    #[serde(default)]
    pub below_threshold: bool,

    /// Superseded by a replacement fetch. Kept for the audit trail.
    #[serde(default)]
    pub replaced: bool,

    /// Why the source was discarded, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discard_reason: Option<DiscardReason>,

    /// Author byline, if extracted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byline: Option<String>,

    /// Engagement signal, if available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement: Option<u32>,

    /// Document purpose.
    pub purpose: Purpose,

    /// Upstream content markers.
    #[serde(default)]
    pub markers: Vec<DocumentMarker>,

    /// Insertion order within the session. Final tie-break for report
    /// ordering.
    pub inserted_at: usize,
}

impl Source {
    /// Assigns the tier. Only takes effect while the source is still
    /// unclassified; the tier is immutable after classification.
    pub fn assign_tier(&mut self, tier: Tier) {
        if self.tier == Tier::Unclassified {
            self.tier = tier;
        }
    }

    /// Returns true if the source carries a usable quality band other than
    /// discard.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.replaced
            && self.discard_reason.is_none()
            && matches!(
                self.quality_band,
                Some(QualityBand::Primary | QualityBand::Supporting | QualityBand::Supplementary)
            )
    }

    /// Returns true if the source was discarded (timeout or low score).
    #[must_use]
    pub fn is_discarded(&self) -> bool {
        self.discard_reason.is_some() || self.quality_band == Some(QualityBand::Discard)
    }

    /// Returns true if the given marker is present.
    #[must_use]
    pub fn has_marker(&self, marker: DocumentMarker) -> bool {
        self.markers.contains(&marker)
    }

    /// Marks this source as superseded by a replacement fetch.
    pub fn mark_replaced(&mut self) {
        self.replaced = true;
    }

    /// Records a timed-out source so it is never silently dropped.
    pub fn mark_timed_out(&mut self) {
        self.discard_reason = Some(DiscardReason::Timeout);
        self.quality_band = Some(QualityBand::Discard);
    }

    /// The registrable domain (last two labels of the host), used to judge
    /// source independence for cross-verification.
    #[must_use]
    pub fn registrable_domain(&self) -> String {
        let labels: Vec<&str> = self.domain.rsplit('.').take(2).collect();
        labels.into_iter().rev().collect::<Vec<_>>().join(".")
    }
}

impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Source {}

impl std::hash::Hash for Source {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
