//! JSON-file ledger store.
//!
//! Each segment lives in its own `ledger_<segment>.json`, a flat array
//! of entries with the frozen ledger header names. Upserts are keyed by
//! the trimmed, lowercased organization name, so "Acme Corp" and
//! " ACME CORP " are the same organization.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use orgscout_shared::{LedgerEntry, OrgScoutError, Result, Segment};

use crate::traits::{LedgerStore, UpsertOutcome};

fn org_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Ledger persisted as per-segment JSON files under one directory.
pub struct JsonLedgerStore {
    dir: PathBuf,
}

impl JsonLedgerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, segment: Segment) -> PathBuf {
        self.dir.join(format!("ledger_{segment}.json"))
    }

    fn read_entries(path: &Path) -> Result<Vec<LedgerEntry>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(path).map_err(|e| OrgScoutError::io(path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| OrgScoutError::Ledger(format!("parse {}: {e}", path.display())))
    }

    fn upsert_segment(&self, segment: Segment, incoming: &[&LedgerEntry]) -> Result<UpsertOutcome> {
        let path = self.path_for(segment);
        let mut existing = Self::read_entries(&path)?;
        let mut index: HashMap<String, usize> = existing
            .iter()
            .enumerate()
            .map(|(i, e)| (org_key(&e.organization), i))
            .collect();

        let mut outcome = UpsertOutcome::default();
        for entry in incoming {
            let key = org_key(&entry.organization);
            match index.get(&key) {
                Some(&i) => {
                    let mut updated = (*entry).clone();
                    updated.first_added = existing[i].first_added;
                    existing[i] = updated;
                    outcome.updated += 1;
                }
                None => {
                    index.insert(key, existing.len());
                    existing.push((*entry).clone());
                    outcome.added += 1;
                }
            }
        }

        std::fs::create_dir_all(&self.dir).map_err(|e| OrgScoutError::io(&self.dir, e))?;
        let json = serde_json::to_string_pretty(&existing)
            .map_err(|e| OrgScoutError::Ledger(format!("serialize {}: {e}", path.display())))?;
        std::fs::write(&path, json).map_err(|e| OrgScoutError::io(&path, e))?;
        Ok(outcome)
    }
}

impl LedgerStore for JsonLedgerStore {
    async fn load(&self, segment: Segment) -> Result<Vec<LedgerEntry>> {
        Self::read_entries(&self.path_for(segment))
    }

    #[instrument(skip_all, fields(entries = entries.len()))]
    async fn upsert(&self, entries: &[LedgerEntry]) -> Result<UpsertOutcome> {
        let mut outcome = UpsertOutcome::default();
        for segment in [Segment::Healthcare, Segment::Corporate, Segment::Providers] {
            let batch: Vec<&LedgerEntry> =
                entries.iter().filter(|e| e.segment == segment).collect();
            if batch.is_empty() {
                continue;
            }
            let partial = self.upsert_segment(segment, &batch)?;
            outcome.added += partial.added;
            outcome.updated += partial.updated;
        }
        debug!(added = outcome.added, updated = outcome.updated, "ledger upsert");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn temp_store(tag: &str) -> JsonLedgerStore {
        let dir = std::env::temp_dir().join(format!(
            "orgscout-ledger-{tag}-{}",
            uuid::Uuid::now_v7()
        ));
        JsonLedgerStore::new(dir)
    }

    fn entry(name: &str, segment: Segment, score: u32) -> LedgerEntry {
        LedgerEntry {
            organization: name.into(),
            segment,
            region: "NA".into(),
            status: "Confirmed".into(),
            score,
            first_added: Utc::now(),
            last_validated: Utc::now(),
            evidence_url: "https://example.com/evidence".into(),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let store = temp_store("missing");
        let entries = store.load(Segment::Healthcare).await.expect("load");
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn upsert_then_load_roundtrip() {
        let store = temp_store("roundtrip");
        let outcome = store
            .upsert(&[
                entry("Mercy Health", Segment::Healthcare, 95),
                entry("Baptist Health", Segment::Healthcare, 75),
            ])
            .await
            .expect("upsert");
        assert_eq!(outcome.added, 2);
        assert_eq!(outcome.updated, 0);

        let entries = store.load(Segment::Healthcare).await.expect("load");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].organization, "Mercy Health");
        assert_eq!(entries[1].score, 75);
    }

    #[tokio::test]
    async fn update_preserves_first_added() {
        let store = temp_store("update");
        let mut original = entry("Acme Corp", Segment::Corporate, 80);
        original.first_added = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        original.last_validated = original.first_added;
        store.upsert(&[original.clone()]).await.expect("first upsert");

        // Same organization, different case and whitespace.
        let mut revalidated = entry("  ACME CORP  ", Segment::Corporate, 95);
        revalidated.status = "Confirmed".into();
        let outcome = store.upsert(&[revalidated]).await.expect("second upsert");
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.updated, 1);

        let entries = store.load(Segment::Corporate).await.expect("load");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].first_added, original.first_added);
        assert!(entries[0].last_validated > original.last_validated);
        assert_eq!(entries[0].score, 95);
    }

    #[tokio::test]
    async fn segments_live_in_separate_files() {
        let store = temp_store("segments");
        store
            .upsert(&[
                entry("Mercy Health", Segment::Healthcare, 95),
                entry("Acme Corp", Segment::Corporate, 90),
            ])
            .await
            .expect("upsert");

        let healthcare = store.load(Segment::Healthcare).await.expect("load");
        assert_eq!(healthcare.len(), 1);
        assert_eq!(healthcare[0].organization, "Mercy Health");

        let corporate = store.load(Segment::Corporate).await.expect("load");
        assert_eq!(corporate.len(), 1);
        assert_eq!(corporate[0].organization, "Acme Corp");
    }

    #[tokio::test]
    async fn empty_upsert_writes_nothing() {
        let store = temp_store("empty");
        let outcome = store.upsert(&[]).await.expect("upsert");
        assert_eq!(outcome.upserted(), 0);
        assert!(!store.path_for(Segment::Healthcare).exists());
    }
}
