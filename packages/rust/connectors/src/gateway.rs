//! Metered web gateway.
//!
//! Wraps the raw search and fetch providers with the cross-cutting rules
//! every caller must obey: cache lookup before budget, budget reservation
//! before the network, allowlist and per-domain ceilings on fetches, and
//! the shared retry policy on transport errors. Cached responses cost no
//! budget, which is what makes resumed runs cheap.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, instrument};
use url::Url;

use orgscout_runtime::{Budget, BudgetKind, CacheStack, RetryPolicy, cache_key};
use orgscout_shared::{Result, TransportConfig};

use crate::traits::{FetchProvider, FetchedPage, SearchHit, SearchProvider};

/// Outcome of a gated fetch. Only `Fetched` carries page content; the
/// other variants tell the caller why the page was skipped.
#[derive(Debug)]
pub enum FetchDecision {
    Fetched(FetchedPage),
    /// The global fetch budget is spent; stop fetching this run.
    BudgetExhausted,
    /// This domain reached its per-run ceiling; skip the URL.
    DomainCapped(String),
    /// The domain is outside the configured allowlist; skip the URL.
    NotAllowed(String),
}

/// Budget- and cache-aware front end over search and fetch providers.
pub struct WebGateway<S, F> {
    search: S,
    fetch: F,
    budget: Arc<Budget>,
    cache: Arc<CacheStack>,
    retry: RetryPolicy,
    allowlist: Vec<String>,
    per_domain_cap: u64,
    domain_counts: Mutex<HashMap<String, u64>>,
}

impl<S, F> WebGateway<S, F>
where
    S: SearchProvider,
    F: FetchProvider,
{
    pub fn new(
        search: S,
        fetch: F,
        budget: Arc<Budget>,
        cache: Arc<CacheStack>,
        transport: &TransportConfig,
    ) -> Self {
        Self {
            search,
            fetch,
            budget,
            cache,
            retry: RetryPolicy::from_transport(transport),
            allowlist: transport.allowlist.clone(),
            per_domain_cap: transport.per_domain_cap,
            domain_counts: Mutex::new(HashMap::new()),
        }
    }

    /// Run a search. `Ok(None)` means the search budget is exhausted;
    /// cached results return without touching the budget.
    #[instrument(skip_all, fields(query = %query))]
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
        site: Option<&str>,
    ) -> Result<Option<Vec<SearchHit>>> {
        let max = max_results.to_string();
        let key = cache_key(
            "search",
            &[
                ("query", query),
                ("max", &max),
                ("site", site.unwrap_or("")),
            ],
        );

        if let Some(hits) = self.cache.get_as::<Vec<SearchHit>>(&key) {
            return Ok(Some(hits));
        }
        if !self.budget.reserve(BudgetKind::Searches, 1) {
            return Ok(None);
        }

        let hits = self
            .retry
            .run("search", || self.search.search(query, max_results, site))
            .await?;
        self.cache.set_value(&key, &hits);
        Ok(Some(hits))
    }

    /// Fetch a page through the allowlist, per-domain ceiling, and fetch
    /// budget. Cached pages return without consuming anything.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<FetchDecision> {
        let key = cache_key("fetch", &[("url", url)]);
        if let Some(page) = self.cache.get_as::<FetchedPage>(&key) {
            return Ok(FetchDecision::Fetched(page));
        }

        let domain = domain_of(url);
        if !self.domain_allowed(&domain) {
            debug!(%domain, "domain not in allowlist");
            return Ok(FetchDecision::NotAllowed(domain));
        }
        if self.domain_capped(&domain) {
            debug!(%domain, cap = self.per_domain_cap, "per-domain cap reached");
            return Ok(FetchDecision::DomainCapped(domain));
        }
        if !self.budget.reserve(BudgetKind::Fetches, 1) {
            return Ok(FetchDecision::BudgetExhausted);
        }

        let page = self.retry.run("fetch", || self.fetch.fetch(url)).await?;
        self.cache.set_value(&key, &page);
        self.record_domain(&domain);
        Ok(FetchDecision::Fetched(page))
    }

    fn domain_allowed(&self, domain: &str) -> bool {
        self.allowlist.is_empty() || self.allowlist.iter().any(|d| d == domain)
    }

    fn domain_capped(&self, domain: &str) -> bool {
        if self.per_domain_cap == 0 || domain.is_empty() {
            return false;
        }
        let Ok(counts) = self.domain_counts.lock() else {
            return false;
        };
        counts.get(domain).copied().unwrap_or(0) >= self.per_domain_cap
    }

    fn record_domain(&self, domain: &str) {
        if domain.is_empty() {
            return;
        }
        if let Ok(mut counts) = self.domain_counts.lock() {
            *counts.entry(domain.to_string()).or_insert(0) += 1;
        }
    }
}

/// Lowercased host of a URL, empty when unparseable.
fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .unwrap_or_default()
}
