//! Collaborator interfaces.
//!
//! The engine does not crawl, fetch, or call a language model. Everything it
//! consumes from the outside world arrives through these traits: a source
//! collector supplying raw documents, a relevance model scoring a
//! `(query, document)` pair on the 0-100 contract, and an optional
//! summarizer supplying candidate statements for extraction. All three must
//! be `Send + Sync` because worker tasks call them concurrently.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::source::RawDocument;

/// Supplies candidate sources and replacement fetches.
pub trait SourceCollector: Send + Sync {
    /// Returns the next candidate, or `None` when the collector is
    /// exhausted.
    fn next_candidate(&self) -> Option<RawDocument>;

    /// Fetches a replacement for a below-floor source using refined search
    /// terms. `None` means no replacement could be found.
    fn fetch_replacement(&self, refined_terms: &[String]) -> Option<RawDocument>;
}

/// Scores how relevant a document is to the query, 0-100.
pub trait RelevanceModel: Send + Sync {
    /// Returns the relevance dimension for a `(query, document)` pair.
    fn relevance(&self, query: &str, doc: &RawDocument) -> f32;
}

/// Optional summarization collaborator: supplies candidate factual
/// statements for a document. When absent, the extractor segments the raw
/// text itself.
pub trait Summarizer: Send + Sync {
    /// Returns candidate statements for the document.
    fn key_statements(&self, doc: &RawDocument) -> Vec<String>;
}

/// Default relevance model: token overlap between the query and the
/// document's title and text, bucketed onto the 0-100 contract.
///
/// Deliberately coarse. It exists so the engine runs without an external
/// semantic scorer; production callers inject their own model.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalRelevance;

impl LexicalRelevance {
    fn tokens(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| t.len() > 1)
            .map(str::to_ascii_lowercase)
            .collect()
    }
}

impl RelevanceModel for LexicalRelevance {
    fn relevance(&self, query: &str, doc: &RawDocument) -> f32 {
        let query_tokens = Self::tokens(query);
        if query_tokens.is_empty() {
            return 0.0;
        }
        let doc_tokens = Self::tokens(&format!("{} {}", doc.title, doc.text));

        let mut matched = 0usize;
        let mut counted: Vec<&str> = Vec::new();
        for token in &query_tokens {
            if !counted.contains(&token.as_str()) && doc_tokens.contains(token) {
                matched += 1;
                counted.push(token);
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let ratio = matched as f32 / query_tokens.len() as f32;
        if ratio >= 0.75 {
            100.0
        } else if ratio >= 0.35 {
            70.0
        } else if ratio > 0.0 {
            30.0
        } else {
            0.0
        }
    }
}

/// In-memory collector backed by two queues. Used in tests and demos; a
/// real deployment wraps its search infrastructure instead.
#[derive(Debug, Default)]
pub struct QueueCollector {
    candidates: Mutex<VecDeque<RawDocument>>,
    replacements: Mutex<VecDeque<RawDocument>>,
}

impl QueueCollector {
    /// Creates a collector that will hand out the given candidates in
    /// order.
    #[must_use]
    pub fn new(candidates: Vec<RawDocument>) -> Self {
        Self {
            candidates: Mutex::new(candidates.into()),
            replacements: Mutex::new(VecDeque::new()),
        }
    }

    /// Queues replacement documents for below-floor refetches.
    #[must_use]
    pub fn with_replacements(self, replacements: Vec<RawDocument>) -> Self {
        Self {
            candidates: self.candidates,
            replacements: Mutex::new(replacements.into()),
        }
    }
}

impl SourceCollector for QueueCollector {
    fn next_candidate(&self) -> Option<RawDocument> {
        self.candidates.lock().ok()?.pop_front()
    }

    fn fetch_replacement(&self, _refined_terms: &[String]) -> Option<RawDocument> {
        self.replacements.lock().ok()?.pop_front()
    }
}
