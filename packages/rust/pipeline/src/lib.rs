//! Run orchestration and domain logic for OrgScout.
//!
//! This crate ties search, extraction, scoring, enrichment, and output
//! together into end-to-end discovery runs (see [`runner::Runner`]),
//! with checkpointed resume and regional quota allocation.

pub mod allocate;
pub mod dedupe;
pub mod output;
pub mod queries;
pub mod runner;
pub mod state;

pub use runner::{RunProgress, Runner, SilentProgress};
pub use state::{CancelFlag, RunConfig, RunResult, RunStatus};
