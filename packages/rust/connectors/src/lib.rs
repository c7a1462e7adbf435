//! External-world connectors for OrgScout: web search, page fetch,
//! firmographic enrichment, the JSON ledger store, and the optional
//! language-model assist.
//!
//! Every provider sits behind a trait so the pipeline never talks to the
//! network directly. The metered wrappers in this crate own the
//! cross-cutting rules: cache before budget, budget before the wire,
//! retry on transport errors only. The `sim` module supplies seeded
//! in-process providers for offline runs and tests.

pub mod enrich;
pub mod fetch;
pub mod gateway;
pub mod ledger;
pub mod llm;
pub mod search;
pub mod sim;
pub mod traits;

pub use enrich::{HttpEnrichClient, MeteredEnrich, region_from_country};
pub use fetch::{HttpFetcher, extract_page_text};
pub use gateway::{FetchDecision, WebGateway};
pub use ledger::JsonLedgerStore;
pub use llm::{LlmAssist, NullLlm};
pub use search::DuckDuckGoSearch;
pub use sim::{SimEnrich, SimFetch, SimLlm, SimOrg, SimSearch, corpus};
pub use traits::{
    EnrichProvider, FetchProvider, FetchedPage, LedgerStore, LlmExtract, LlmReply, SearchHit,
    SearchProvider, UpsertOutcome,
};
