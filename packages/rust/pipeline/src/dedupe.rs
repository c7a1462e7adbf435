//! Organization dedup by exact normalized name.
//!
//! Matching is deliberately strict: trim, casefold, collapse inner
//! whitespace, nothing fuzzier. A miss here costs one duplicate row; a
//! false merge silently drops a real organization.

use std::collections::HashSet;

/// Canonical comparison key for an organization name.
pub fn normalize_org_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Tracks names already known to the ledger and names admitted earlier in
/// the same run.
#[derive(Debug, Default)]
pub struct Deduper {
    known: HashSet<String>,
    seen: HashSet<String>,
}

impl Deduper {
    /// Seed the ledger snapshot for one segment.
    pub fn new(ledger_names: impl IntoIterator<Item = String>) -> Self {
        Self {
            known: ledger_names
                .into_iter()
                .map(|n| normalize_org_name(&n))
                .collect(),
            seen: HashSet::new(),
        }
    }

    /// Pre-load names handled by an earlier attempt of this run.
    pub fn with_seen(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.seen
            .extend(names.into_iter().map(|n| normalize_org_name(&n)));
        self
    }

    /// Admit a name if it is new to both the ledger and this run.
    /// Admission marks the name seen.
    pub fn admit(&mut self, name: &str) -> bool {
        let key = normalize_org_name(name);
        if self.known.contains(&key) || self.seen.contains(&key) {
            return false;
        }
        self.seen.insert(key);
        true
    }
}
