//! Per-segment scoring tables.
//!
//! Each segment scores against a fixed list of (signal, points, must)
//! entries. The tables are the single source of truth for signal names;
//! evidence recorded under any other name is a caller bug.

use orgscout_shared::Segment;

/// One scored signal: its canonical name, point value, and whether its
/// absence blocks the Confirmed tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSpec {
    pub name: &'static str,
    pub points: u32,
    pub must: bool,
}

const fn sig(name: &'static str, points: u32, must: bool) -> SignalSpec {
    SignalSpec { name, points, must }
}

const HEALTHCARE: &[SignalSpec] = &[
    sig("provider_org", 5, false),
    sig("ehr_lifecycle_active", 40, true),
    sig("vilt_present", 30, true),
    sig("training_program", 15, false),
    sig("large_scale", 5, false),
];

const CORPORATE: &[SignalSpec] = &[
    sig("named_academy", 50, true),
    sig("large_scale", 10, true),
    sig("structured_learning", 15, false),
    sig("vilt_present", 15, true),
    sig("awards_recognition", 10, false),
    sig("external_scope", 5, false),
];

const PROVIDERS: &[SignalSpec] = &[
    sig("b2b_focus", 20, true),
    sig("vilt_core_offering", 25, true),
    sig("public_calendar_5plus", 20, true),
    sig("instructor_bench_5plus", 15, true),
    sig("accreditations", 10, false),
    sig("enterprise_clients", 10, false),
    sig("geo_reach", 5, false),
];

/// The scoring table for a segment.
pub fn table_for(segment: Segment) -> &'static [SignalSpec] {
    match segment {
        Segment::Healthcare => HEALTHCARE,
        Segment::Corporate => CORPORATE,
        Segment::Providers => PROVIDERS,
    }
}

/// Whether `name` is a scored signal for the segment.
pub fn is_known_signal(segment: Segment, name: &str) -> bool {
    table_for(segment).iter().any(|s| s.name == name)
}

/// Highest score the segment's table can produce.
pub fn max_score(segment: Segment) -> u32 {
    table_for(segment).iter().map(|s| s.points).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_maximums() {
        assert_eq!(max_score(Segment::Healthcare), 95);
        assert_eq!(max_score(Segment::Corporate), 105);
        assert_eq!(max_score(Segment::Providers), 105);
    }

    #[test]
    fn must_signals_per_segment() {
        let musts = |seg| {
            table_for(seg)
                .iter()
                .filter(|s| s.must)
                .map(|s| s.name)
                .collect::<Vec<_>>()
        };
        assert_eq!(musts(Segment::Healthcare), vec!["ehr_lifecycle_active", "vilt_present"]);
        assert_eq!(
            musts(Segment::Corporate),
            vec!["named_academy", "large_scale", "vilt_present"]
        );
        assert_eq!(
            musts(Segment::Providers),
            vec![
                "b2b_focus",
                "vilt_core_offering",
                "public_calendar_5plus",
                "instructor_bench_5plus"
            ]
        );
    }

    #[test]
    fn signal_lookup() {
        assert!(is_known_signal(Segment::Healthcare, "provider_org"));
        assert!(!is_known_signal(Segment::Healthcare, "named_academy"));
        assert!(!is_known_signal(Segment::Providers, "ehr_lifecycle_active"));
    }
}
