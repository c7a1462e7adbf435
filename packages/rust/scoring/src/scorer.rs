//! The evidence scorer: a pure function from evidence to tier.

use orgscout_shared::{OrgScoutError, Result, Segment};
use serde::Serialize;

use crate::evidence::Evidence;
use crate::tables;

/// Confidence bucket for a scored candidate. Only `Confirmed` and
/// `Probable` candidates reach the output artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tier {
    Confirmed,
    Probable,
    NeedsConfirmation,
    Rejected,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Confirmed => "Confirmed",
            Tier::Probable => "Probable",
            Tier::NeedsConfirmation => "NeedsConfirmation",
            Tier::Rejected => "Rejected",
        }
    }

    pub fn is_reportable(self) -> bool {
        matches!(self, Tier::Confirmed | Tier::Probable)
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of scoring one candidate's evidence.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreOutcome {
    pub score: u32,
    pub tier: Tier,
    pub missing_musts: Vec<&'static str>,
    pub red_flags: Vec<String>,
}

impl ScoreOutcome {
    /// Notes field for output rows: `missing=a,b` when MUST signals are
    /// absent, empty otherwise.
    pub fn notes(&self) -> String {
        if self.missing_musts.is_empty() {
            String::new()
        } else {
            format!("missing={}", self.missing_musts.join(","))
        }
    }
}

/// Score evidence against the segment's table.
///
/// Red flags short-circuit to [`Tier::Rejected`] before any tallying.
/// Otherwise the score sums the points of present signals and every
/// absent MUST signal is recorded. Tier thresholds are shared across
/// segments: 90 with a full MUST set confirms, the 70 to 89 band is
/// Probable without re-checking MUST completeness (a deliberate policy,
/// not an oversight), and everything else needs confirmation.
pub fn score(segment: Segment, evidence: &Evidence) -> Result<ScoreOutcome> {
    if evidence.segment() != segment {
        return Err(OrgScoutError::validation(format!(
            "evidence for segment {} scored as {}",
            evidence.segment().as_str(),
            segment.as_str()
        )));
    }

    if !evidence.red_flags().is_empty() {
        return Ok(ScoreOutcome {
            score: 0,
            tier: Tier::Rejected,
            missing_musts: Vec::new(),
            red_flags: evidence.red_flags().to_vec(),
        });
    }

    let mut score = 0;
    let mut missing_musts = Vec::new();
    for spec in tables::table_for(segment) {
        if evidence.present(spec.name) {
            score += spec.points;
        } else if spec.must {
            missing_musts.push(spec.name);
        }
    }

    let tier = if score >= 90 && missing_musts.is_empty() {
        Tier::Confirmed
    } else if (70..90).contains(&score) {
        Tier::Probable
    } else {
        Tier::NeedsConfirmation
    };

    Ok(ScoreOutcome {
        score,
        tier,
        missing_musts,
        red_flags: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::Detection;

    fn evidence_with(segment: Segment, signals: &[&str]) -> Evidence {
        let mut evidence = Evidence::new(segment);
        for name in signals {
            evidence
                .record(
                    name,
                    Detection {
                        snippet: format!("{name} phrase"),
                        source_url: "https://org.example/".into(),
                    },
                )
                .unwrap();
        }
        evidence
    }

    #[test]
    fn healthcare_probable_at_75() {
        let evidence = evidence_with(
            Segment::Healthcare,
            &["ehr_lifecycle_active", "vilt_present", "provider_org"],
        );
        let outcome = score(Segment::Healthcare, &evidence).unwrap();
        assert_eq!(outcome.score, 75);
        assert_eq!(outcome.tier, Tier::Probable);
        assert!(outcome.missing_musts.is_empty());
    }

    #[test]
    fn healthcare_missing_vilt_needs_confirmation() {
        let evidence = evidence_with(Segment::Healthcare, &["ehr_lifecycle_active", "provider_org"]);
        let outcome = score(Segment::Healthcare, &evidence).unwrap();
        assert_eq!(outcome.score, 45);
        assert_eq!(outcome.tier, Tier::NeedsConfirmation);
        assert_eq!(outcome.missing_musts, vec!["vilt_present"]);
        assert_eq!(outcome.notes(), "missing=vilt_present");
    }

    #[test]
    fn healthcare_full_table_confirms() {
        let evidence = evidence_with(
            Segment::Healthcare,
            &[
                "provider_org",
                "ehr_lifecycle_active",
                "vilt_present",
                "training_program",
                "large_scale",
            ],
        );
        let outcome = score(Segment::Healthcare, &evidence).unwrap();
        assert_eq!(outcome.score, 95);
        assert_eq!(outcome.tier, Tier::Confirmed);
    }

    #[test]
    fn providers_all_musts_is_probable_at_80() {
        let evidence = evidence_with(
            Segment::Providers,
            &[
                "b2b_focus",
                "vilt_core_offering",
                "public_calendar_5plus",
                "instructor_bench_5plus",
            ],
        );
        let outcome = score(Segment::Providers, &evidence).unwrap();
        assert_eq!(outcome.score, 80);
        assert_eq!(outcome.tier, Tier::Probable);
    }

    #[test]
    fn providers_musts_plus_accreditations_confirms_at_90() {
        let evidence = evidence_with(
            Segment::Providers,
            &[
                "b2b_focus",
                "vilt_core_offering",
                "public_calendar_5plus",
                "instructor_bench_5plus",
                "accreditations",
            ],
        );
        let outcome = score(Segment::Providers, &evidence).unwrap();
        assert_eq!(outcome.score, 90);
        assert_eq!(outcome.tier, Tier::Confirmed);
    }

    #[test]
    fn probable_band_skips_must_check() {
        // 50 + 15 + 10 = 75 with two MUSTs absent still lands in Probable.
        let evidence = evidence_with(
            Segment::Corporate,
            &["named_academy", "structured_learning", "awards_recognition"],
        );
        let outcome = score(Segment::Corporate, &evidence).unwrap();
        assert_eq!(outcome.score, 75);
        assert_eq!(outcome.tier, Tier::Probable);
        assert_eq!(outcome.missing_musts, vec!["large_scale", "vilt_present"]);
    }

    #[test]
    fn ninety_with_missing_must_is_not_confirmed() {
        // Corporate without vilt_present can still total exactly 90; the
        // missing MUST keeps it out of Confirmed and the band bound keeps
        // it out of Probable.
        let evidence = evidence_with(
            Segment::Corporate,
            &[
                "named_academy",
                "large_scale",
                "structured_learning",
                "awards_recognition",
                "external_scope",
            ],
        );
        let outcome = score(Segment::Corporate, &evidence).unwrap();
        assert_eq!(outcome.score, 90);
        assert_eq!(outcome.tier, Tier::NeedsConfirmation);
        assert_eq!(outcome.missing_musts, vec!["vilt_present"]);
    }

    #[test]
    fn red_flags_reject_before_tallying() {
        let mut evidence = evidence_with(
            Segment::Providers,
            &[
                "b2b_focus",
                "vilt_core_offering",
                "public_calendar_5plus",
                "instructor_bench_5plus",
                "accreditations",
            ],
        );
        evidence.add_red_flag("coursera");
        let outcome = score(Segment::Providers, &evidence).unwrap();
        assert_eq!(outcome.score, 0);
        assert_eq!(outcome.tier, Tier::Rejected);
        assert_eq!(outcome.red_flags, vec!["coursera".to_string()]);
    }

    #[test]
    fn segment_mismatch_is_an_error() {
        let evidence = evidence_with(Segment::Healthcare, &["vilt_present"]);
        assert!(score(Segment::Corporate, &evidence).is_err());
    }

    #[test]
    fn scoring_is_deterministic() {
        let evidence = evidence_with(
            Segment::Healthcare,
            &["ehr_lifecycle_active", "vilt_present", "provider_org"],
        );
        let first = score(Segment::Healthcare, &evidence).unwrap();
        let second = score(Segment::Healthcare, &evidence).unwrap();
        assert_eq!(first.score, second.score);
        assert_eq!(first.tier, second.tier);
        assert_eq!(first.missing_musts, second.missing_musts);
    }
}
