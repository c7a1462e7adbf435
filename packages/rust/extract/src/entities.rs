//! Healthcare entity extraction: EHR vendor, lifecycle phase, go-live
//! dates, organization type, and the training-tooling products that fill
//! the healthcare output columns.

use std::sync::LazyLock;

use regex::Regex;

/// Canonical vendor name and the phrases that identify it.
const EHR_VENDORS: &[(&str, &[&str])] = &[
    ("Epic", &["epic systems", "epic ehr", "epic go-live", "epic"]),
    ("Cerner", &["cerner corporation", "cerner ehr", "cerner"]),
    ("Meditech", &["meditech", "medical information technology"]),
    ("Allscripts", &["allscripts healthcare", "allscripts"]),
    ("Athenahealth", &["athenahealth", "athena health"]),
    ("NextGen", &["nextgen healthcare", "nextgen"]),
    ("eClinicalWorks", &["eclinicalworks", "eclinical works"]),
    ("CPSI", &["computer programs and systems", "cpsi"]),
    ("Medhost", &["medhost", "med host"]),
    ("Sunrise", &["sunrise clinical manager", "sunrise"]),
];

const LIFECYCLE_PHASES: &[(&str, &[&str])] = &[
    ("Planning", &["vendor selection", "planning", "evaluation", "selection"]),
    ("Implementation", &["implementation", "go-live", "go live", "deployment", "rollout"]),
    ("Optimization", &["optimization", "enhancement", "upgrade", "improvement"]),
    ("Maintenance", &["maintenance", "ongoing support", "operational"]),
    ("Replacement", &["replacement", "migration", "transition", "new system"]),
];

const ORG_TYPES: &[(&str, &[&str])] = &[
    ("Health System", &["health system", "healthcare system", "medical system"]),
    ("Hospital", &["hospital", "medical center", "health center"]),
    ("Physician Practice", &["physician practice", "medical practice"]),
    ("Urgent Care", &["urgent care", "walk-in clinic", "immediate care"]),
    ("Long-term Care", &["nursing home", "long-term care", "skilled nursing"]),
    ("Home Health", &["home health", "homecare", "home care"]),
    ("Behavioral Health", &["behavioral health", "mental health", "psychiatry"]),
    ("Rehabilitation", &["rehabilitation", "physical therapy"]),
];

const WEB_CONFERENCING: &[(&str, &[&str])] = &[
    ("Zoom", &["zoom"]),
    ("Microsoft Teams", &["microsoft teams", "ms teams"]),
    ("Webex", &["webex"]),
];

const LMS_PRODUCTS: &[(&str, &[&str])] = &[
    ("HealthStream", &["healthstream"]),
    ("Cornerstone", &["cornerstone ondemand", "cornerstone lms"]),
    ("Docebo", &["docebo"]),
    ("Moodle", &["moodle"]),
    ("SAP SuccessFactors", &["successfactors"]),
    ("Workday Learning", &["workday learning"]),
    ("Saba", &["saba cloud", "saba lms"]),
];

static GO_LIVE_DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(?:go-live|go live|implementation|deployment)\s+(?:date|on|in)?\s*:?\s*(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})",
        r"(?i)\b(?:go-live|go live|implementation|deployment)\s+(?:date|on|in)?\s*:?\s*(\w+\s+\d{1,2},?\s+\d{4})",
        r"(?i)\b(?:go-live|go live|implementation|deployment)\s+(?:date|on|in)?\s*:?\s*(\d{4}[-/]\d{1,2}[-/]\d{1,2})",
        r"(?i)\b(?:go-live|go live|went live)\s+(?:in\s+)?((?:january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{4})",
        r"(?i)\b(?:go-live|go live|went live)\s+(?:in\s+)?(q[1-4]\s+\d{4})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

fn first_match(tables: &[(&'static str, &[&str])], text_lower: &str) -> Option<&'static str> {
    for (canonical, phrases) in tables {
        if phrases.iter().any(|p| text_lower.contains(p)) {
            return Some(canonical);
        }
    }
    None
}

/// Entities pulled out of one page of healthcare text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthcareEntities {
    pub ehr_vendor: Option<&'static str>,
    pub lifecycle_phase: Option<&'static str>,
    pub go_live_date: Option<String>,
    pub org_type: Option<&'static str>,
    pub web_conferencing: Option<&'static str>,
    pub lms: Option<&'static str>,
}

/// Extract all healthcare entities from page text. Purely lexical; the
/// first vendor/phase/type mentioned wins.
pub fn extract_healthcare_entities(text: &str) -> HealthcareEntities {
    let lower = text.to_lowercase();

    let go_live_date = GO_LIVE_DATE_PATTERNS
        .iter()
        .find_map(|p| p.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string());

    HealthcareEntities {
        ehr_vendor: first_match(EHR_VENDORS, &lower),
        lifecycle_phase: first_match(LIFECYCLE_PHASES, &lower),
        go_live_date,
        org_type: first_match(ORG_TYPES, &lower),
        web_conferencing: first_match(WEB_CONFERENCING, &lower),
        lms: first_match(LMS_PRODUCTS, &lower),
    }
}
