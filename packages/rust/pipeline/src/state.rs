//! Run configuration, in-flight state, and the terminal result.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use orgscout_extract::HealthcareEntities;
use orgscout_runtime::{BudgetSnapshot, CheckpointRecord};
use orgscout_scoring::{Evidence, ScoreOutcome};
use orgscout_shared::{
    AppConfig, Firmographics, Mode, OrgScoutError, Region, Result, RunId, Segment, StageError,
};

use crate::allocate::RegionMix;
use crate::output::OutputRow;

/// Parameters for one discovery run. Budget ceilings, cache TTL, and
/// transport limits are applied when the collaborators are built; this
/// struct carries only what the pipeline itself reads.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub run_id: RunId,
    pub segment: Segment,
    pub region: Region,
    pub target_count: usize,
    pub mode: Mode,
    /// NA share of the output quota when the run targets both regions.
    pub region_ratio: f64,
    /// Fan-out width for harvest fetches and enrichment lookups.
    pub concurrency: u32,
    /// Checkpoint every this many enrichment chunks.
    pub checkpoint_interval: u32,
    /// Stage failure share that short-circuits the run to output.
    pub error_tolerance: f64,
    pub output_dir: PathBuf,
    pub checkpoint_dir: PathBuf,
}

impl RunConfig {
    /// Build a validated config from the app settings.
    pub fn from_app(
        app: &AppConfig,
        segment: Segment,
        region: Region,
        target_count: usize,
        mode: Mode,
    ) -> Result<Self> {
        let config = Self {
            run_id: RunId::new(),
            segment,
            region,
            target_count,
            mode,
            region_ratio: app.discovery.region_ratio,
            concurrency: app.discovery.concurrency,
            checkpoint_interval: app.discovery.checkpoint_interval,
            error_tolerance: app.discovery.error_tolerance,
            output_dir: PathBuf::from(&app.discovery.output_dir),
            checkpoint_dir: PathBuf::from(&app.discovery.checkpoint_dir),
        };
        config.validate()?;
        Ok(config)
    }

    /// The only pre-execution abort: invalid parameters never reach the
    /// network.
    pub fn validate(&self) -> Result<()> {
        if self.target_count == 0 {
            return Err(OrgScoutError::config("target_count must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.region_ratio) {
            return Err(OrgScoutError::config(format!(
                "region_ratio must be within 0.0..=1.0, got {}",
                self.region_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.error_tolerance) {
            return Err(OrgScoutError::config(format!(
                "error_tolerance must be within 0.0..=1.0, got {}",
                self.error_tolerance
            )));
        }
        if self.concurrency == 0 {
            return Err(OrgScoutError::config("concurrency must be at least 1"));
        }
        if self.checkpoint_interval == 0 {
            return Err(OrgScoutError::config(
                "checkpoint_interval must be at least 1",
            ));
        }
        Ok(())
    }
}

/// One organization moving through the stages. Harvest fills the identity
/// fields, extract the evidence, score the outcome, enrich the
/// firmographics.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub title: String,
    pub url: String,
    /// Extracted page text, already clipped.
    pub page_text: String,
    pub region: Option<Region>,
    pub entities: Option<HealthcareEntities>,
    pub evidence: Evidence,
    pub outcome: Option<ScoreOutcome>,
    pub firmographics: Option<Firmographics>,
}

impl Candidate {
    pub fn new(
        segment: Segment,
        name: String,
        title: String,
        url: String,
        page_text: String,
    ) -> Self {
        Self {
            name,
            title,
            url,
            page_text,
            region: None,
            entities: None,
            evidence: Evidence::new(segment),
            outcome: None,
            firmographics: None,
        }
    }

    /// Whether the candidate survived scoring with a non-rejected tier.
    pub fn in_play(&self) -> bool {
        self.outcome
            .as_ref()
            .is_none_or(|o| o.tier != orgscout_scoring::Tier::Rejected)
    }
}

/// Mutable run state. Only the stage currently executing touches it;
/// fan-out inside a stage works on borrowed snapshots and merges its
/// results back before the stage returns.
#[derive(Debug, Default)]
pub struct RunState {
    pub queries: Vec<String>,
    pub candidates: Vec<Candidate>,
    /// Normalized names handled by an earlier attempt of this run,
    /// restored from a checkpoint.
    pub prior_orgs: HashSet<String>,
    /// Normalized names whose enrichment chunk completed in this attempt.
    pub processed_orgs: Vec<String>,
    pub errors: Vec<StageError>,
    /// Enrichment chunk counter, monotonic across resume attempts.
    pub batch_index: u32,
    /// Candidates enriched so far in this attempt.
    pub processed: usize,
    /// A budget category ran dry while work remained.
    pub budget_hit: bool,
    /// A stage breached the error tolerance and the run jumped to output.
    pub short_circuited: bool,
}

impl RunState {
    pub fn fresh() -> Self {
        Self::default()
    }

    /// Rebuild resumable state from a checkpoint record. Candidates are
    /// not persisted; earlier stages re-run from cache and the restored
    /// seen-set keeps already-handled organizations out.
    pub fn from_checkpoint(record: &CheckpointRecord) -> Self {
        Self {
            prior_orgs: record.seen_orgs.iter().cloned().collect(),
            errors: record.errors.clone(),
            batch_index: record.batch_index,
            ..Self::default()
        }
    }

    /// The seen-set to persist: prior attempts plus this one.
    pub fn seen_for_checkpoint(&self) -> Vec<String> {
        let mut seen: Vec<String> = self
            .prior_orgs
            .iter()
            .cloned()
            .chain(self.processed_orgs.iter().cloned())
            .collect();
        seen.sort();
        seen.dedup();
        seen
    }
}

/// How the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// All stages ran with no budget breach.
    Completed,
    /// A budget category was exhausted mid-run or a stage breached the
    /// error tolerance; partial output was still written.
    PartiallyCompleted,
    /// Cancelled on request.
    Aborted,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "Completed",
            Self::PartiallyCompleted => "PartiallyCompleted",
            Self::Aborted => "Aborted",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal record of one run: always produced, even under partial
/// failure.
#[derive(Debug)]
pub struct RunResult {
    pub run_id: RunId,
    pub status: RunStatus,
    pub rows: Vec<OutputRow>,
    pub achieved_mix: RegionMix,
    pub budget: BudgetSnapshot,
    pub errors: Vec<StageError>,
    /// Run directory, when artifacts were written.
    pub artifacts_dir: Option<PathBuf>,
    pub elapsed: std::time::Duration,
}

/// Cooperative cancellation handle, settable from any task. The run
/// honors it at stage boundaries and between enrichment chunks.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
