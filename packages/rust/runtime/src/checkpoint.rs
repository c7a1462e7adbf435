//! Append-only run checkpoints.
//!
//! Each record is a standalone JSON file addressed by run id, batch index,
//! and timestamp; records are never rewritten. Resume loads the newest
//! record for a run, restores budget counters and the seen-name set, and
//! continues from the first unprocessed chunk.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orgscout_shared::{OrgScoutError, Result, RunId, Segment, StageError};

use crate::budget::BudgetSnapshot;

/// Reduced projection of the run state, enough to resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub run_id: RunId,
    pub segment: Segment,
    /// Index of the last completed batch chunk.
    pub batch_index: u32,
    /// Candidates fully processed so far.
    pub processed: usize,
    /// Candidates the run had in total when this record was written.
    pub total: usize,
    pub budget: BudgetSnapshot,
    /// Normalized organization names already handled this run.
    pub seen_orgs: Vec<String>,
    pub errors: Vec<StageError>,
    pub created_at: DateTime<Utc>,
}

impl CheckpointRecord {
    /// A completed checkpoint has nothing left to process; replaying it
    /// is a no-op.
    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

/// File-backed checkpoint store.
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_name(record: &CheckpointRecord) -> String {
        format!(
            "checkpoint_{}_{:04}_{}.json",
            record.run_id.0.simple(),
            record.batch_index,
            record.created_at.timestamp_millis(),
        )
    }

    /// Persist a record as a new file. Existing records are never touched.
    pub fn write(&self, record: &CheckpointRecord) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| OrgScoutError::io(&self.dir, e))?;

        let path = self.dir.join(Self::file_name(record));
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| OrgScoutError::parse(format!("checkpoint serialize: {e}")))?;
        std::fs::write(&path, json).map_err(|e| OrgScoutError::io(&path, e))?;

        tracing::debug!(?path, batch = record.batch_index, processed = record.processed,
            "checkpoint written");
        Ok(path)
    }

    /// Load one record from a specific path.
    pub fn load(&self, path: &Path) -> Result<CheckpointRecord> {
        let content = std::fs::read_to_string(path).map_err(|e| OrgScoutError::io(path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| OrgScoutError::parse(format!("checkpoint parse {}: {e}", path.display())))
    }

    /// Newest record for a run, by batch index then timestamp. `None` when
    /// the run has no checkpoints yet.
    pub fn latest_for_run(&self, run_id: &RunId) -> Result<Option<CheckpointRecord>> {
        let prefix = format!("checkpoint_{}_", run_id.0.simple());
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(OrgScoutError::io(&self.dir, e)),
        };

        let mut latest: Option<CheckpointRecord> = None;
        for entry in entries {
            let entry = entry.map_err(|e| OrgScoutError::io(&self.dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(&prefix) || !name.ends_with(".json") {
                continue;
            }

            let record = match self.load(&entry.path()) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(path = ?entry.path(), error = %e, "skipping unreadable checkpoint");
                    continue;
                }
            };

            let newer = match &latest {
                None => true,
                Some(current) => {
                    (record.batch_index, record.created_at)
                        > (current.batch_index, current.created_at)
                }
            };
            if newer {
                latest = Some(record);
            }
        }
        Ok(latest)
    }
}
