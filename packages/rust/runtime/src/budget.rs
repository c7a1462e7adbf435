//! Budget ledger: hard ceilings on external operations.
//!
//! Four monotonic counters (searches, fetches, enrich, llm_tokens) with an
//! atomic check-and-increment. Exhaustion is a `false` return, never an
//! error; callers skip the operation and continue toward output.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use orgscout_shared::{Mode, config::BudgetConfig};

/// The metered resource categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetKind {
    Searches,
    Fetches,
    Enrich,
    LlmTokens,
}

impl BudgetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Searches => "searches",
            Self::Fetches => "fetches",
            Self::Enrich => "enrich",
            Self::LlmTokens => "llm_tokens",
        }
    }
}

impl std::fmt::Display for BudgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Ceilings
// ---------------------------------------------------------------------------

/// Per-run ceilings with the mode multiplier already applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetCeilings {
    pub searches: u64,
    pub fetches: u64,
    pub enrich: u64,
    pub llm_tokens: u64,
}

impl BudgetCeilings {
    /// Apply the mode multiplier to the configured base ceilings.
    /// This happens exactly once, at run-config construction; ceilings
    /// never change mid-run.
    ///
    /// `deep` doubles searches and fetches and grants 1.5x enrich;
    /// `strict` halves searches, fetches, and enrich. The LLM token
    /// ceiling is never scaled.
    pub fn for_mode(base: &BudgetConfig, mode: Mode) -> Self {
        let (searches, fetches, enrich) = match mode {
            Mode::Fast => (base.max_searches, base.max_fetches, base.max_enrich),
            Mode::Deep => (
                base.max_searches * 2,
                base.max_fetches * 2,
                base.max_enrich * 3 / 2,
            ),
            Mode::Strict => (
                base.max_searches / 2,
                base.max_fetches / 2,
                base.max_enrich / 2,
            ),
        };
        Self {
            searches,
            fetches,
            enrich,
            llm_tokens: base.max_llm_tokens,
        }
    }
}

// ---------------------------------------------------------------------------
// Budget
// ---------------------------------------------------------------------------

struct Counter {
    used: AtomicU64,
    max: u64,
}

impl Counter {
    fn new(max: u64) -> Self {
        Self {
            used: AtomicU64::new(0),
            max,
        }
    }

    fn with_used(max: u64, used: u64) -> Self {
        Self {
            used: AtomicU64::new(used.min(max)),
            max,
        }
    }

    /// Atomic check-and-increment. On `false` nothing mutates.
    fn reserve(&self, amount: u64) -> bool {
        self.used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                let next = used.checked_add(amount)?;
                (next <= self.max).then_some(next)
            })
            .is_ok()
    }

    fn used(&self) -> u64 {
        self.used.load(Ordering::SeqCst)
    }
}

/// The run-scoped budget ledger. Safe to share across concurrent tasks;
/// all operations go through atomics, no lock is held.
pub struct Budget {
    searches: Counter,
    fetches: Counter,
    enrich: Counter,
    llm_tokens: Counter,
}

impl Budget {
    pub fn new(ceilings: BudgetCeilings) -> Self {
        Self {
            searches: Counter::new(ceilings.searches),
            fetches: Counter::new(ceilings.fetches),
            enrich: Counter::new(ceilings.enrich),
            llm_tokens: Counter::new(ceilings.llm_tokens),
        }
    }

    /// Rebuild a budget from a checkpoint snapshot, used counts preloaded.
    pub fn from_snapshot(snapshot: &BudgetSnapshot) -> Self {
        Self {
            searches: Counter::with_used(snapshot.searches.max, snapshot.searches.used),
            fetches: Counter::with_used(snapshot.fetches.max, snapshot.fetches.used),
            enrich: Counter::with_used(snapshot.enrich.max, snapshot.enrich.used),
            llm_tokens: Counter::with_used(snapshot.llm_tokens.max, snapshot.llm_tokens.used),
        }
    }

    fn counter(&self, kind: BudgetKind) -> &Counter {
        match kind {
            BudgetKind::Searches => &self.searches,
            BudgetKind::Fetches => &self.fetches,
            BudgetKind::Enrich => &self.enrich,
            BudgetKind::LlmTokens => &self.llm_tokens,
        }
    }

    /// Try to reserve `amount` units of `kind`. Returns `false` when the
    /// ceiling would be exceeded; no counter mutates in that case.
    pub fn reserve(&self, kind: BudgetKind, amount: u64) -> bool {
        let granted = self.counter(kind).reserve(amount);
        if !granted {
            tracing::debug!(kind = %kind, amount, "budget reservation denied");
        }
        granted
    }

    pub fn used(&self, kind: BudgetKind) -> u64 {
        self.counter(kind).used()
    }

    pub fn max(&self, kind: BudgetKind) -> u64 {
        self.counter(kind).max
    }

    pub fn remaining(&self, kind: BudgetKind) -> u64 {
        let c = self.counter(kind);
        c.max.saturating_sub(c.used())
    }

    /// Whether `kind` has no capacity left for even a single unit.
    pub fn exhausted(&self, kind: BudgetKind) -> bool {
        self.remaining(kind) == 0
    }

    pub fn snapshot(&self) -> BudgetSnapshot {
        BudgetSnapshot {
            searches: CounterSnapshot {
                used: self.searches.used(),
                max: self.searches.max,
            },
            fetches: CounterSnapshot {
                used: self.fetches.used(),
                max: self.fetches.max,
            },
            enrich: CounterSnapshot {
                used: self.enrich.used(),
                max: self.enrich.max,
            },
            llm_tokens: CounterSnapshot {
                used: self.llm_tokens.used(),
                max: self.llm_tokens.max,
            },
        }
    }
}

impl std::fmt::Debug for Budget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Budget")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Used/max for one counter at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub used: u64,
    pub max: u64,
}

/// Point-in-time view of all four counters. Serialized into checkpoints
/// and the final run result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    pub searches: CounterSnapshot,
    pub fetches: CounterSnapshot,
    pub enrich: CounterSnapshot,
    pub llm_tokens: CounterSnapshot,
}

impl BudgetSnapshot {
    /// Summary lines for the run report.
    pub fn report_lines(&self) -> Vec<String> {
        [
            ("searches", self.searches),
            ("fetches", self.fetches),
            ("enrich", self.enrich),
            ("llm_tokens", self.llm_tokens),
        ]
        .iter()
        .map(|(name, c)| format!("budget {name}: {}/{}", c.used, c.max))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ceilings(searches: u64, fetches: u64, enrich: u64, llm_tokens: u64) -> BudgetCeilings {
        BudgetCeilings {
            searches,
            fetches,
            enrich,
            llm_tokens,
        }
    }

    #[test]
    fn reserve_up_to_ceiling_then_deny() {
        let budget = Budget::new(ceilings(0, 3, 0, 0));

        for _ in 0..3 {
            assert!(budget.reserve(BudgetKind::Fetches, 1));
        }
        assert!(!budget.reserve(BudgetKind::Fetches, 1));
        // Denied reservation leaves the counter untouched.
        assert_eq!(budget.used(BudgetKind::Fetches), 3);
        assert!(budget.exhausted(BudgetKind::Fetches));
    }

    #[test]
    fn zero_ceiling_denies_immediately() {
        let budget = Budget::new(ceilings(5, 5, 5, 0));
        assert!(!budget.reserve(BudgetKind::LlmTokens, 1));
        assert_eq!(budget.used(BudgetKind::LlmTokens), 0);
    }

    #[test]
    fn multi_unit_reservation_is_all_or_nothing() {
        let budget = Budget::new(ceilings(0, 0, 0, 100));
        assert!(budget.reserve(BudgetKind::LlmTokens, 60));
        assert!(!budget.reserve(BudgetKind::LlmTokens, 60));
        assert_eq!(budget.used(BudgetKind::LlmTokens), 60);
        assert!(budget.reserve(BudgetKind::LlmTokens, 40));
        assert_eq!(budget.remaining(BudgetKind::LlmTokens), 0);
    }

    #[test]
    fn concurrent_reservers_never_exceed_ceiling() {
        use std::sync::Arc;

        let budget = Arc::new(Budget::new(ceilings(0, 500, 0, 0)));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let budget = Arc::clone(&budget);
            handles.push(std::thread::spawn(move || {
                let mut granted = 0u64;
                while budget.reserve(BudgetKind::Fetches, 1) {
                    granted += 1;
                }
                granted
            }));
        }

        let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 500);
        assert_eq!(budget.used(BudgetKind::Fetches), 500);
    }

    #[test]
    fn mode_multipliers_apply_once() {
        let base = BudgetConfig {
            max_searches: 120,
            max_fetches: 150,
            max_enrich: 80,
            max_llm_tokens: 1000,
        };

        let fast = BudgetCeilings::for_mode(&base, Mode::Fast);
        assert_eq!((fast.searches, fast.fetches, fast.enrich), (120, 150, 80));

        let deep = BudgetCeilings::for_mode(&base, Mode::Deep);
        assert_eq!((deep.searches, deep.fetches, deep.enrich), (240, 300, 120));
        assert_eq!(deep.llm_tokens, 1000);

        let strict = BudgetCeilings::for_mode(&base, Mode::Strict);
        assert_eq!((strict.searches, strict.fetches, strict.enrich), (60, 75, 40));
        assert_eq!(strict.llm_tokens, 1000);
    }

    #[test]
    fn snapshot_restores_used_counts() {
        let budget = Budget::new(ceilings(10, 10, 10, 0));
        assert!(budget.reserve(BudgetKind::Searches, 4));
        assert!(budget.reserve(BudgetKind::Fetches, 7));

        let snap = budget.snapshot();
        let restored = Budget::from_snapshot(&snap);
        assert_eq!(restored.used(BudgetKind::Searches), 4);
        assert_eq!(restored.remaining(BudgetKind::Fetches), 3);
        assert!(restored.reserve(BudgetKind::Fetches, 3));
        assert!(!restored.reserve(BudgetKind::Fetches, 1));
    }

    #[test]
    fn snapshot_serializes() {
        let budget = Budget::new(ceilings(1, 2, 3, 4));
        let json = serde_json::to_string(&budget.snapshot()).expect("serialize");
        let parsed: BudgetSnapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.enrich.max, 3);
        assert!(parsed.report_lines()[0].contains("searches"));
    }
}
