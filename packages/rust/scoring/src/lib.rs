//! Tiered evidence scoring.
//!
//! A segment's evidence maps to a score, a tier, and the list of missing
//! MUST-have signals. Scoring is pure and deterministic so any candidate
//! can be re-scored from its stored evidence for audits.

pub mod evidence;
pub mod scorer;
pub mod tables;

pub use evidence::{Detection, Evidence};
pub use scorer::{ScoreOutcome, Tier, score};
pub use tables::{SignalSpec, max_score, table_for};
