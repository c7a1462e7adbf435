//! Output artifacts: frozen CSV schemas, regional quota selection, and
//! the run directory layout.
//!
//! Column lists are contracts shared with downstream sheet tooling. Any
//! change here is a schema break, so rows are arity-checked before they
//! ship and violations are excluded rather than written.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use orgscout_runtime::{BudgetSnapshot, CacheStatsSnapshot};
use orgscout_scoring::Tier;
use orgscout_shared::{OrgScoutError, Region, Result, RunId, Segment, StageError};

use crate::allocate::{self, RegionMix};
use crate::state::Candidate;

pub const HEALTHCARE_COLUMNS: &[&str] = &[
    "Organization",
    "Region",
    "Type",
    "Facilities",
    "EHR_Vendor",
    "EHR_Lifecycle_Phase",
    "GoLive_Date",
    "Training_Model",
    "VILT_Evidence",
    "Web_Conferencing",
    "LMS",
    "Tier",
    "Confidence",
    "Evidence_URLs",
    "Notes",
];

pub const CORPORATE_COLUMNS: &[&str] = &[
    "Organization",
    "Region",
    "Type",
    "Training_Program",
    "Employee_Focus",
    "Structured_Learning",
    "Large_Scale",
    "Tier",
    "Confidence",
    "Evidence_URLs",
    "Notes",
];

pub const PROVIDER_COLUMNS: &[&str] = &[
    "Organization",
    "Region",
    "Type",
    "Training_Provider",
    "Corporate_Focus",
    "Service_Offering",
    "Client_Services",
    "Virtual_Capability",
    "Tier",
    "Confidence",
    "Evidence_URLs",
    "Notes",
];

/// The frozen column list for a segment's CSV.
pub fn columns_for(segment: Segment) -> &'static [&'static str] {
    match segment {
        Segment::Healthcare => HEALTHCARE_COLUMNS,
        Segment::Corporate => CORPORATE_COLUMNS,
        Segment::Providers => PROVIDER_COLUMNS,
    }
}

/// One emitted row: the CSV cells plus the fields the ledger upsert
/// needs without reaching back into the candidate.
#[derive(Debug, Clone, Serialize)]
pub struct OutputRow {
    pub organization: String,
    pub region: Option<Region>,
    pub tier: Tier,
    pub score: u32,
    /// First evidence URL, for the ledger's EvidenceURL1 column.
    pub evidence_url: String,
    pub notes: String,
    pub cells: Vec<String>,
}

/// Result of the output stage's selection and row building.
#[derive(Debug, Default)]
pub struct Emitted {
    pub rows: Vec<OutputRow>,
    pub mix: RegionMix,
    pub errors: Vec<StageError>,
}

impl Emitted {
    fn default_with_capacity(n: usize) -> Self {
        Self {
            rows: Vec::with_capacity(n),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// The quota side a candidate fills. Unknown and `Both` classifications
/// fall back to the run's region; under a `both` run they stay flexible
/// and count toward neither side of the achieved mix.
fn quota_side(candidate_region: Option<Region>, run_region: Region) -> Option<Region> {
    match candidate_region {
        Some(Region::Na) => Some(Region::Na),
        Some(Region::Emea) => Some(Region::Emea),
        Some(Region::Both) | None => match run_region {
            Region::Na => Some(Region::Na),
            Region::Emea => Some(Region::Emea),
            Region::Both => None,
        },
    }
}

/// Select reportable candidates under the regional quotas and build their
/// rows. Shortfall on one side backfills from the other; flexible
/// candidates top up whatever quota remains; the total never exceeds
/// `target_count`. Schema violations are excluded and recorded.
pub fn emit_rows(
    candidates: &[Candidate],
    run_region: Region,
    target_count: usize,
    na_ratio: f64,
) -> Emitted {
    let reportable: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            c.outcome
                .as_ref()
                .is_some_and(|o| o.tier.is_reportable())
        })
        .map(|(i, _)| i)
        .collect();

    let mut available = RegionMix::default();
    for &i in &reportable {
        match quota_side(candidates[i].region, run_region) {
            Some(Region::Na) => available.na += 1,
            Some(Region::Emea) => available.emea += 1,
            _ => {}
        }
    }

    let base = allocate::targets_for(run_region, target_count, na_ratio);
    let quota = allocate::backfill(base, available);

    let mut na_left = quota.na;
    let mut emea_left = quota.emea;
    let mut picks: Vec<(usize, Option<Region>)> = Vec::new();

    // Definite regions claim their side first.
    for &i in &reportable {
        match quota_side(candidates[i].region, run_region) {
            Some(Region::Na) if na_left > 0 => {
                na_left -= 1;
                picks.push((i, Some(Region::Na)));
            }
            Some(Region::Emea) if emea_left > 0 => {
                emea_left -= 1;
                picks.push((i, Some(Region::Emea)));
            }
            _ => {}
        }
    }

    // Flexible candidates fill whatever total quota remains.
    for &i in &reportable {
        if picks.len() >= target_count {
            break;
        }
        if quota_side(candidates[i].region, run_region).is_none()
            && !picks.iter().any(|(p, _)| *p == i)
        {
            picks.push((i, None));
        }
    }

    picks.sort_by_key(|(i, _)| *i);

    let mut emitted = Emitted::default_with_capacity(picks.len());
    for (i, side) in picks {
        let candidate = &candidates[i];
        match build_row(candidate) {
            Ok(row) => {
                match side {
                    Some(Region::Na) => emitted.mix.na += 1,
                    Some(Region::Emea) => emitted.mix.emea += 1,
                    _ => {}
                }
                emitted.rows.push(row);
            }
            Err(e) => {
                warn!(org = %candidate.name, error = %e, "row excluded");
                emitted
                    .errors
                    .push(StageError::new("output", format!("{}: {e}", candidate.name)));
            }
        }
    }
    emitted
}

// ---------------------------------------------------------------------------
// Row building
// ---------------------------------------------------------------------------

fn yes_no(value: bool) -> String {
    if value { "Yes" } else { "No" }.to_string()
}

fn display_flag(flags: &[(&'static str, bool)], name: &str) -> bool {
    flags
        .iter()
        .find(|(flag, _)| *flag == name)
        .is_some_and(|(_, hit)| *hit)
}

fn detection_snippet(candidate: &Candidate, signal: &str) -> String {
    candidate
        .evidence
        .detection(signal)
        .map(|d| d.snippet.clone())
        .unwrap_or_default()
}

/// Build one candidate's row against its segment schema. Unknown cells
/// are empty strings; the arity check is the schema contract.
pub fn build_row(candidate: &Candidate) -> Result<OutputRow> {
    let outcome = candidate
        .outcome
        .as_ref()
        .ok_or_else(|| OrgScoutError::schema(format!("{}: unscored candidate", candidate.name)))?;

    let segment = candidate.evidence.segment();
    let region_label = candidate
        .region
        .map(|r| r.label().to_string())
        .unwrap_or_default();
    let evidence_urls = candidate.evidence.source_urls();
    let evidence_joined = evidence_urls.join("|");
    let evidence_first = evidence_urls
        .first()
        .map(|u| (*u).to_string())
        .unwrap_or_else(|| candidate.url.clone());
    let notes = outcome.notes();

    let cells = match segment {
        Segment::Healthcare => {
            let entities = candidate.entities.clone().unwrap_or_default();
            vec![
                candidate.name.clone(),
                region_label,
                entities.org_type.unwrap_or_default().to_string(),
                String::new(), // Facilities: no extractor feeds this yet
                entities.ehr_vendor.unwrap_or_default().to_string(),
                entities.lifecycle_phase.unwrap_or_default().to_string(),
                entities.go_live_date.unwrap_or_default(),
                detection_snippet(candidate, "training_program"),
                detection_snippet(candidate, "vilt_present"),
                entities.web_conferencing.unwrap_or_default().to_string(),
                entities.lms.unwrap_or_default().to_string(),
                outcome.tier.to_string(),
                outcome.score.to_string(),
                evidence_joined,
                notes.clone(),
            ]
        }
        Segment::Corporate => {
            let flags = orgscout_extract::display_flags(segment, &candidate.page_text);
            vec![
                candidate.name.clone(),
                region_label,
                "Corporate Academy".to_string(),
                detection_snippet(candidate, "named_academy"),
                yes_no(display_flag(&flags, "employee_focus")),
                yes_no(
                    display_flag(&flags, "structured_learning")
                        || candidate.evidence.present("structured_learning"),
                ),
                // Enrichment can add large_scale after the page was read.
                yes_no(
                    display_flag(&flags, "large_scale")
                        || candidate.evidence.present("large_scale"),
                ),
                outcome.tier.to_string(),
                outcome.score.to_string(),
                evidence_joined,
                notes.clone(),
            ]
        }
        Segment::Providers => {
            let flags = orgscout_extract::display_flags(segment, &candidate.page_text);
            vec![
                candidate.name.clone(),
                region_label,
                "Training Provider".to_string(),
                yes_no(display_flag(&flags, "training_provider")),
                yes_no(display_flag(&flags, "corporate_focus")),
                yes_no(display_flag(&flags, "service_offering")),
                yes_no(display_flag(&flags, "client_services")),
                yes_no(display_flag(&flags, "virtual_capability")),
                outcome.tier.to_string(),
                outcome.score.to_string(),
                evidence_joined,
                notes.clone(),
            ]
        }
    };

    let expected = columns_for(segment).len();
    if cells.len() != expected {
        return Err(OrgScoutError::schema(format!(
            "{}: row has {} cells, {} schema needs {expected}",
            candidate.name,
            cells.len(),
            segment.as_str()
        )));
    }

    Ok(OutputRow {
        organization: candidate.name.clone(),
        region: candidate.region,
        tier: outcome.tier,
        score: outcome.score,
        evidence_url: evidence_first,
        notes,
        cells,
    })
}

// ---------------------------------------------------------------------------
// CSV rendering
// ---------------------------------------------------------------------------

fn csv_field(field: &str) -> String {
    if field.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn csv_line(cells: &[String]) -> String {
    cells
        .iter()
        .map(|c| csv_field(c))
        .collect::<Vec<_>>()
        .join(",")
}

/// Render the segment CSV: header plus one line per row.
pub fn render_csv(segment: Segment, rows: &[OutputRow]) -> String {
    let mut out = String::new();
    out.push_str(&columns_for(segment).join(","));
    out.push('\n');
    for row in rows {
        out.push_str(&csv_line(&row.cells));
        out.push('\n');
    }
    out
}

/// Render `summary.txt`: the headline mix line, budget usage, and the
/// cache hit rate.
pub fn render_summary(
    segment: Segment,
    rows: &[OutputRow],
    mix: RegionMix,
    budget: &BudgetSnapshot,
    cache: &CacheStatsSnapshot,
) -> String {
    let mut lines = vec![format!(
        "Segment={} total={} NA={} EMEA={}",
        segment.as_str(),
        rows.len(),
        mix.na,
        mix.emea
    )];
    lines.extend(budget.report_lines());
    lines.push(format!(
        "Cache hits={} misses={} hit_rate={:.1}%",
        cache.hits, cache.misses, cache.hit_rate_percent
    ));
    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Run directory
// ---------------------------------------------------------------------------

/// Write a file atomically: temp file in the same directory, then rename.
fn write_atomic(dir: &Path, filename: &str, content: &str) -> Result<()> {
    let target = dir.join(filename);
    let temp = dir.join(format!(".{filename}.tmp"));
    std::fs::write(&temp, content).map_err(|e| OrgScoutError::io(&temp, e))?;
    std::fs::rename(&temp, &target).map_err(|e| OrgScoutError::io(&target, e))?;
    debug!(file = %filename, size = content.len(), "wrote artifact");
    Ok(())
}

/// Write the run directory (`run_<utc-ts>_<8hex>/`) and refresh the
/// `latest/` copy. Returns the run directory path.
#[instrument(skip_all, fields(segment = %segment, rows = rows.len()))]
pub fn write_run_artifacts(
    output_dir: &Path,
    run_id: &RunId,
    segment: Segment,
    rows: &[OutputRow],
    mix: RegionMix,
    budget: &BudgetSnapshot,
    cache: &CacheStatsSnapshot,
) -> Result<PathBuf> {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let run_dir = output_dir.join(format!("run_{stamp}_{}", run_id.short()));
    std::fs::create_dir_all(&run_dir).map_err(|e| OrgScoutError::io(&run_dir, e))?;

    let csv_name = format!("{}.csv", segment.as_str());
    let csv = render_csv(segment, rows);
    let summary = render_summary(segment, rows, mix, budget, cache);

    write_atomic(&run_dir, &csv_name, &csv)?;
    write_atomic(&run_dir, "summary.txt", &summary)?;

    // Refresh latest/ as a plain copy; failure there is not worth
    // failing the run over.
    let latest = output_dir.join("latest");
    if let Err(e) = refresh_latest(&latest, &run_dir, &[&csv_name, "summary.txt"]) {
        warn!(error = %e, "failed to refresh latest/");
    }

    info!(path = %run_dir.display(), "run artifacts written");
    Ok(run_dir)
}

fn refresh_latest(latest: &Path, run_dir: &Path, files: &[&str]) -> Result<()> {
    match std::fs::remove_dir_all(latest) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(OrgScoutError::io(latest, e)),
    }
    std::fs::create_dir_all(latest).map_err(|e| OrgScoutError::io(latest, e))?;
    for file in files {
        std::fs::copy(run_dir.join(file), latest.join(file))
            .map_err(|e| OrgScoutError::io(latest.join(file), e))?;
    }
    Ok(())
}
