//! Optional language-model assist for name canonicalization.
//!
//! The model is only consulted when a token budget has been granted;
//! with the default budget of zero every call short-circuits to `None`
//! and the heuristic extractors carry the run alone. Model failures are
//! never fatal for the same reason.

use std::sync::Arc;

use tracing::{debug, warn};

use orgscout_runtime::{Budget, BudgetKind, CacheStack, RetryPolicy, cache_key};
use orgscout_shared::{OrgScoutError, Result, Segment};

use crate::traits::LlmExtract;

/// Sentinel the model returns when a title is a news article about
/// organizations rather than an organization's own page.
const ARTICLE_SENTINEL: &str = "ARTICLE_ABOUT_ORGS";

/// Hard per-call ceiling; prompts are shortened rather than exceed it.
const MAX_TOKENS_PER_CALL: u64 = 800;

/// Completion cap for a canonicalized name.
const NAME_MAX_TOKENS: u64 = 60;

/// Provider used when no model is wired up. Always fails, which the
/// wrapper downgrades to "no assist".
pub struct NullLlm;

impl LlmExtract for NullLlm {
    async fn extract(&self, _prompt: &str, _max_tokens: u64) -> Result<crate::traits::LlmReply> {
        Err(OrgScoutError::Transport(
            "no language model configured".into(),
        ))
    }
}

/// Budget- and cache-aware front end over a language model.
pub struct LlmAssist<M> {
    model: M,
    budget: Arc<Budget>,
    cache: Arc<CacheStack>,
    retry: RetryPolicy,
}

impl<M: LlmExtract> LlmAssist<M> {
    pub fn new(model: M, budget: Arc<Budget>, cache: Arc<CacheStack>, retry: RetryPolicy) -> Self {
        Self {
            model,
            budget,
            cache,
            retry,
        }
    }

    /// Ask the model for the canonical organization name behind a noisy
    /// page title. Returns `None` when the budget is spent, the model
    /// fails, or the title turns out to be an article about other
    /// organizations.
    pub async fn canonicalize_org_name(
        &self,
        title: &str,
        url: &str,
        segment: Segment,
    ) -> Option<String> {
        let key = cache_key(
            "llm_canonicalize",
            &[("title", title), ("url", url), ("segment", segment.as_str())],
        );
        if let Some(content) = self.cache.get_as::<String>(&key) {
            return interpret_name(&content);
        }

        let mut prompt = name_prompt(title, url, segment);
        let mut estimate = estimate_tokens(&prompt);
        if estimate > MAX_TOKENS_PER_CALL {
            let short: String = title.chars().take(200).collect();
            prompt = name_prompt(&short, "", segment);
            estimate = estimate_tokens(&prompt);
        }

        if !self.budget.reserve(BudgetKind::LlmTokens, estimate) {
            debug!(segment = %segment, "token budget spent, skipping model assist");
            return None;
        }

        let reply = match self
            .retry
            .run("llm_canonicalize", || {
                self.model.extract(&prompt, NAME_MAX_TOKENS)
            })
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "name canonicalization failed");
                return None;
            }
        };

        let content = reply.content.trim().to_string();
        self.cache.set_value(&key, &content);
        interpret_name(&content)
    }
}

/// Prompt-length heuristic plus a fixed request overhead.
fn estimate_tokens(prompt: &str) -> u64 {
    (prompt.len() as u64) / 4 + 80
}

fn name_prompt(title: &str, url: &str, segment: Segment) -> String {
    let hint = match segment {
        Segment::Healthcare => {
            "Extract the hospital or health system name that provides patient care, \
             not the publication or website name."
        }
        Segment::Corporate => {
            "Extract the company name that runs the corporate academy, \
             not the LMS vendor or training provider."
        }
        Segment::Providers => {
            "Extract the training company name that provides the courses, \
             not their client companies."
        }
    };
    format!(
        "{hint} Title: '{title}' URL: {url}. If this is a news article ABOUT \
         organizations, return '{ARTICLE_SENTINEL}'. Otherwise return only the \
         organization name."
    )
}

/// Turn a raw model reply into a usable name, if it is one.
fn interpret_name(content: &str) -> Option<String> {
    let name = content.trim().trim_matches(['"', '\'']).trim();
    if name.is_empty() || name.contains(ARTICLE_SENTINEL) || name.contains('\n') {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use orgscout_runtime::{BudgetCeilings, MemoryCache};
    use orgscout_shared::{BudgetConfig, Mode};

    use crate::traits::LlmReply;

    struct CannedLlm {
        reply: &'static str,
        calls: AtomicU32,
    }

    impl LlmExtract for CannedLlm {
        async fn extract(&self, _prompt: &str, max_tokens: u64) -> Result<LlmReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(LlmReply {
                content: self.reply.to_string(),
                tokens_used: max_tokens,
            })
        }
    }

    fn assist(reply: &'static str, max_llm_tokens: u64) -> LlmAssist<CannedLlm> {
        let budget_cfg = BudgetConfig {
            max_llm_tokens,
            ..BudgetConfig::default()
        };
        LlmAssist::new(
            CannedLlm {
                reply,
                calls: AtomicU32::new(0),
            },
            Arc::new(Budget::new(BudgetCeilings::for_mode(&budget_cfg, Mode::Fast))),
            Arc::new(CacheStack::new(vec![Arc::new(MemoryCache::new(16))])),
            RetryPolicy::default(),
        )
    }

    #[tokio::test]
    async fn zero_token_budget_never_calls_the_model() {
        let assist = assist("Mercy Health", 0);
        let name = assist
            .canonicalize_org_name("Mercy Health | Careers", "https://mercy.example", Segment::Healthcare)
            .await;
        assert!(name.is_none());
        assert_eq!(assist.model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn canonicalized_name_is_cached() {
        let assist = assist("\"Mercy Health\"", 10_000);
        let first = assist
            .canonicalize_org_name("Mercy Health | Epic Go-Live", "https://mercy.example", Segment::Healthcare)
            .await;
        assert_eq!(first.as_deref(), Some("Mercy Health"));

        let second = assist
            .canonicalize_org_name("Mercy Health | Epic Go-Live", "https://mercy.example", Segment::Healthcare)
            .await;
        assert_eq!(second.as_deref(), Some("Mercy Health"));
        assert_eq!(assist.model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn article_sentinel_means_no_name() {
        let assist = assist(ARTICLE_SENTINEL, 10_000);
        let name = assist
            .canonicalize_org_name("Top 10 Hospital Epic Go-Lives of 2024", "", Segment::Healthcare)
            .await;
        assert!(name.is_none());
    }

    #[tokio::test]
    async fn model_failure_is_not_fatal() {
        let budget_cfg = BudgetConfig {
            max_llm_tokens: 10_000,
            ..BudgetConfig::default()
        };
        let assist = LlmAssist::new(
            NullLlm,
            Arc::new(Budget::new(BudgetCeilings::for_mode(&budget_cfg, Mode::Fast))),
            Arc::new(CacheStack::new(vec![Arc::new(MemoryCache::new(16))])),
            RetryPolicy {
                attempts: 1,
                ..RetryPolicy::default()
            },
        );
        let name = assist
            .canonicalize_org_name("Acme Corporate University", "", Segment::Corporate)
            .await;
        assert!(name.is_none());
    }

    #[test]
    fn oversized_titles_shorten_the_prompt() {
        let long_title = "x".repeat(4000);
        let full = name_prompt(&long_title, "https://example.com", Segment::Providers);
        assert!(estimate_tokens(&full) > MAX_TOKENS_PER_CALL);
        let short: String = long_title.chars().take(200).collect();
        assert!(estimate_tokens(&name_prompt(&short, "", Segment::Providers)) <= MAX_TOKENS_PER_CALL);
    }
}
