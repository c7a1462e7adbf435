//! Region classification from page evidence.
//!
//! Counts NA, EMEA, and global indicator phrases in the text, adds a TLD
//! hint from the page host, and applies threshold rules. Returns `None`
//! when the page carries no geographic evidence at all.

use orgscout_shared::Region;
use url::Url;

const NA_INDICATORS: &[&str] = &[
    "united states",
    "usa",
    "canada",
    "mexico",
    "new york",
    "san francisco",
    "los angeles",
    "toronto",
    "vancouver",
    "north america",
    "america",
    "american",
    "us based",
    "canada based",
];

const EMEA_INDICATORS: &[&str] = &[
    "united kingdom",
    "uk",
    "germany",
    "france",
    "netherlands",
    "italy",
    "spain",
    "sweden",
    "norway",
    "denmark",
    "switzerland",
    "austria",
    "belgium",
    "south africa",
    "nigeria",
    "egypt",
    "uae",
    "dubai",
    "abu dhabi",
    "london",
    "paris",
    "berlin",
    "amsterdam",
    "madrid",
    "rome",
    "stockholm",
    "zurich",
    "geneva",
    "brussels",
    "copenhagen",
    "dublin",
    "edinburgh",
    "cape town",
    "johannesburg",
    "cairo",
    "lagos",
    "europe",
    "european",
    "emea",
    "middle east",
    "africa",
    "eu based",
];

const GLOBAL_INDICATORS: &[&str] = &[
    "global",
    "worldwide",
    "international",
    "multinational",
    "across continents",
    "multiple countries",
    "various regions",
];

const NA_TLDS: &[&str] = &[".ca", ".us"];

const EMEA_TLDS: &[&str] = &[
    ".uk", ".de", ".fr", ".nl", ".it", ".es", ".se", ".no", ".dk", ".ch", ".at", ".be", ".ie",
    ".co.za",
];

struct IndicatorCounts {
    na: usize,
    emea: usize,
    global: usize,
}

fn count_indicators(text: &str, url: &str) -> IndicatorCounts {
    let lower = text.to_lowercase();
    let mut counts = IndicatorCounts {
        na: NA_INDICATORS.iter().filter(|i| lower.contains(*i)).count(),
        emea: EMEA_INDICATORS.iter().filter(|i| lower.contains(*i)).count(),
        global: GLOBAL_INDICATORS.iter().filter(|i| lower.contains(*i)).count(),
    };

    // The page host's TLD counts as one more indicator for its side.
    if let Ok(parsed) = Url::parse(url) {
        if let Some(host) = parsed.host_str() {
            if NA_TLDS.iter().any(|t| host.ends_with(t)) {
                counts.na += 1;
            } else if EMEA_TLDS.iter().any(|t| host.ends_with(t)) {
                counts.emea += 1;
            }
        }
    }
    counts
}

/// Classify the page's region from indicator phrases and the host TLD.
///
/// Two or more global indicators classify as [`Region::Both`] outright.
/// A side wins when it has at least two indicators and strictly more than
/// the other; mixed single hits are `Both`; a lone hit takes its side.
pub fn classify_region(text: &str, url: &str) -> Option<Region> {
    let counts = count_indicators(text, url);

    if counts.global >= 2 {
        return Some(Region::Both);
    }
    if counts.na > counts.emea && counts.na >= 2 {
        return Some(Region::Na);
    }
    if counts.emea > counts.na && counts.emea >= 2 {
        return Some(Region::Emea);
    }
    if counts.na > 0 && counts.emea > 0 {
        return Some(Region::Both);
    }
    if counts.na > 0 {
        return Some(Region::Na);
    }
    if counts.emea > 0 {
        return Some(Region::Emea);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_na_evidence() {
        let region = classify_region(
            "Based in Toronto and Vancouver, serving clients across North America.",
            "https://example.com/",
        );
        assert_eq!(region, Some(Region::Na));
    }

    #[test]
    fn strong_emea_evidence() {
        let region = classify_region(
            "Offices in London and Berlin serve European enterprises.",
            "https://example.com/",
        );
        assert_eq!(region, Some(Region::Emea));
    }

    #[test]
    fn mixed_single_hits_classify_as_both() {
        let region = classify_region(
            "A London office and a Toronto office.",
            "https://example.com/",
        );
        assert_eq!(region, Some(Region::Both));
    }

    #[test]
    fn two_global_indicators_override() {
        let region = classify_region(
            "A global company with worldwide reach.",
            "https://example.com/",
        );
        assert_eq!(region, Some(Region::Both));
    }

    #[test]
    fn tld_hint_counts_for_its_side() {
        assert_eq!(
            classify_region("Training services.", "https://example.co.za/"),
            Some(Region::Emea)
        );
        assert_eq!(
            classify_region("Training services.", "https://example.us/"),
            Some(Region::Na)
        );
    }

    #[test]
    fn na_majority_beats_single_emea_hit() {
        let region = classify_region(
            "Toronto and Vancouver teams, plus a London partner.",
            "https://example.com/",
        );
        assert_eq!(region, Some(Region::Na));
    }

    #[test]
    fn no_evidence_is_none() {
        assert_eq!(classify_region("Nothing geographic here.", "https://example.net/"), None);
    }
}
