//! Provider trait seams.
//!
//! The pipeline only ever talks to these traits; production impls live in
//! this crate next to deterministic sims. Futures are `Send` so callers
//! can fan out freely.

use orgscout_shared::{Firmographics, LedgerEntry, Result, Segment};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One search engine result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// A fetched page with its extracted plain text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPage {
    pub status_code: u16,
    pub raw_html: String,
    pub extracted_text: String,
}

/// LLM completion with its metered token usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmReply {
    pub content: String,
    pub tokens_used: u64,
}

/// Counts from a ledger upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub added: usize,
    pub updated: usize,
}

impl UpsertOutcome {
    pub fn upserted(&self) -> usize {
        self.added + self.updated
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Web search transport.
pub trait SearchProvider: Send + Sync {
    /// Run one query, optionally restricted to a site, returning at most
    /// `max_results` hits.
    fn search(
        &self,
        query: &str,
        max_results: usize,
        site: Option<&str>,
    ) -> impl Future<Output = Result<Vec<SearchHit>>> + Send;
}

/// Page fetch transport.
pub trait FetchProvider: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedPage>> + Send;
}

/// Third-party firmographic enrichment. `Ok(None)` means the service had
/// no data for the organization; that is not an error.
pub trait EnrichProvider: Send + Sync {
    fn enrich(
        &self,
        company: &str,
        domain: Option<&str>,
    ) -> impl Future<Output = Result<Option<Firmographics>>> + Send;
}

/// LLM-backed extraction helper.
pub trait LlmExtract: Send + Sync {
    fn extract(
        &self,
        prompt: &str,
        max_tokens: u64,
    ) -> impl Future<Output = Result<LlmReply>> + Send;
}

/// Cross-run organization ledger.
pub trait LedgerStore: Send + Sync {
    /// All entries recorded for a segment; empty when the segment has
    /// never been written.
    fn load(&self, segment: Segment) -> impl Future<Output = Result<Vec<LedgerEntry>>> + Send;

    /// Insert or update entries keyed by normalized organization name.
    /// `FirstAdded` survives updates; `LastValidated` is refreshed.
    fn upsert(
        &self,
        entries: &[LedgerEntry],
    ) -> impl Future<Output = Result<UpsertOutcome>> + Send;
}
