//! Fixed seed queries per segment, straight from the ICP definitions.

use orgscout_shared::Segment;

/// Results requested per seed query. Five queries at this width gives
/// harvest enough raw URLs to fill `target_count * 3` after dedup.
pub const RESULTS_PER_QUERY: usize = 20;

const HEALTHCARE_QUERIES: &[&str] = &[
    "Epic go-live training hospital 2024..2026",
    "healthcare EHR training virtual learning",
    "hospital Epic Cerner implementation training",
    "healthcare staff training program virtual",
    "medical center EHR go-live training",
];

const CORPORATE_QUERIES: &[&str] = &[
    "corporate academy training program",
    "employee development program corporate",
    "corporate learning center training",
    "company academy employee training",
    "corporate university training program",
];

const PROVIDER_QUERIES: &[&str] = &[
    "professional training company services",
    "corporate training provider company",
    "business training services company",
    "employee training provider organization",
    "corporate learning services company",
];

/// The segment's seed queries, in the order they are searched.
pub fn seed_queries(segment: Segment) -> &'static [&'static str] {
    match segment {
        Segment::Healthcare => HEALTHCARE_QUERIES,
        Segment::Corporate => CORPORATE_QUERIES,
        Segment::Providers => PROVIDER_QUERIES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_segment_has_five_queries() {
        for segment in [Segment::Healthcare, Segment::Corporate, Segment::Providers] {
            assert_eq!(seed_queries(segment).len(), 5);
        }
    }

    #[test]
    fn queries_do_not_repeat_within_a_segment() {
        for segment in [Segment::Healthcare, Segment::Corporate, Segment::Providers] {
            let queries = seed_queries(segment);
            let unique: std::collections::HashSet<_> = queries.iter().collect();
            assert_eq!(unique.len(), queries.len());
        }
    }
}
