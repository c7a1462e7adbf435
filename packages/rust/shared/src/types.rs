//! Core domain types shared across the OrgScout crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OrgScoutError;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Short prefix used in artifact directory names.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Segment / Mode / Region
// ---------------------------------------------------------------------------

/// Discovery segment: which ideal-customer profile a run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    Healthcare,
    Corporate,
    Providers,
}

impl Segment {
    /// Lowercase machine name, used in file names and cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthcare => "healthcare",
            Self::Corporate => "corporate",
            Self::Providers => "providers",
        }
    }

    /// Capitalized label for summaries and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Healthcare => "Healthcare",
            Self::Corporate => "Corporate",
            Self::Providers => "Providers",
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Segment {
    type Err = OrgScoutError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "healthcare" => Ok(Self::Healthcare),
            "corporate" => Ok(Self::Corporate),
            "providers" => Ok(Self::Providers),
            other => Err(OrgScoutError::config(format!(
                "unsupported segment: {other} (expected healthcare, corporate, or providers)"
            ))),
        }
    }
}

/// Run mode. Scales the budget ceilings once at config construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Fast,
    Deep,
    Strict,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Deep => "deep",
            Self::Strict => "strict",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = OrgScoutError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "deep" => Ok(Self::Deep),
            "strict" => Ok(Self::Strict),
            other => Err(OrgScoutError::config(format!(
                "unsupported mode: {other} (expected fast, deep, or strict)"
            ))),
        }
    }
}

/// Geographic scope of a run, and the classification attached to candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Na,
    Emea,
    #[default]
    Both,
}

impl Region {
    /// Label used in output rows and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Na => "NA",
            Self::Emea => "EMEA",
            Self::Both => "Both",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Region {
    type Err = OrgScoutError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "na" => Ok(Self::Na),
            "emea" => Ok(Self::Emea),
            "both" => Ok(Self::Both),
            other => Err(OrgScoutError::config(format!(
                "unsupported region: {other} (expected na, emea, or both)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// StageError
// ---------------------------------------------------------------------------

/// A stage-local error captured into the run record instead of aborting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageError {
    /// Stage name the error was caught in.
    pub stage: String,
    pub message: String,
}

impl StageError {
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

// ---------------------------------------------------------------------------
// Firmographics
// ---------------------------------------------------------------------------

/// Enrichment result for one organization or domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Firmographics {
    /// Employee count band as reported by the provider (e.g. "5001-10000").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_range: Option<String>,
    /// Headquarters country.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Industry label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    /// Canonical website.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl Firmographics {
    /// Whether the reported employee band indicates a large organization
    /// (5001+ employees).
    pub fn is_large_scale(&self) -> bool {
        matches!(
            self.employee_range.as_deref(),
            Some("10001+") | Some("5001-10000")
        )
    }
}

// ---------------------------------------------------------------------------
// LedgerEntry
// ---------------------------------------------------------------------------

/// One row of the persistent organization ledger.
///
/// Field names serialize to the ledger's frozen header names so the JSON
/// store and any sheet export agree column-for-column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(rename = "Organization")]
    pub organization: String,
    #[serde(rename = "Segment")]
    pub segment: Segment,
    #[serde(rename = "Region")]
    pub region: String,
    /// Tier at last validation (Confirmed, Probable, ...).
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Score")]
    pub score: u32,
    /// Set when the organization first enters the ledger; never overwritten.
    #[serde(rename = "FirstAdded")]
    pub first_added: DateTime<Utc>,
    /// Refreshed on every upsert.
    #[serde(rename = "LastValidated")]
    pub last_validated: DateTime<Utc>,
    #[serde(rename = "EvidenceURL1", default)]
    pub evidence_url: String,
    #[serde(rename = "Notes", default)]
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        let parsed: RunId = s.parse().expect("parse RunId");
        assert_eq!(id, parsed);
        assert_eq!(id.short().len(), 8);
    }

    #[test]
    fn segment_parse_and_display() {
        let s: Segment = "Healthcare".parse().expect("parse segment");
        assert_eq!(s, Segment::Healthcare);
        assert_eq!(s.to_string(), "healthcare");
        assert_eq!(s.label(), "Healthcare");
        assert!("payers".parse::<Segment>().is_err());
    }

    #[test]
    fn region_labels() {
        assert_eq!(Region::Na.label(), "NA");
        assert_eq!(Region::Emea.label(), "EMEA");
        assert_eq!("BOTH".parse::<Region>().expect("parse"), Region::Both);
    }

    #[test]
    fn large_scale_bands() {
        let mut f = Firmographics::default();
        assert!(!f.is_large_scale());
        f.employee_range = Some("5001-10000".into());
        assert!(f.is_large_scale());
        f.employee_range = Some("10001+".into());
        assert!(f.is_large_scale());
        f.employee_range = Some("201-500".into());
        assert!(!f.is_large_scale());
    }

    #[test]
    fn ledger_entry_header_names() {
        let entry = LedgerEntry {
            organization: "Acme Corp".into(),
            segment: Segment::Corporate,
            region: "NA".into(),
            status: "Confirmed".into(),
            score: 95,
            first_added: Utc::now(),
            last_validated: Utc::now(),
            evidence_url: "https://acme.example/academy".into(),
            notes: String::new(),
        };

        let json = serde_json::to_string(&entry).expect("serialize");
        assert!(json.contains("\"Organization\""));
        assert!(json.contains("\"FirstAdded\""));
        assert!(json.contains("\"EvidenceURL1\""));

        let parsed: LedgerEntry = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.organization, "Acme Corp");
        assert_eq!(parsed.score, 95);
    }
}
