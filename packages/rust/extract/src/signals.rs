//! Evidence signal detection: page text in, named boolean signals out.
//!
//! Each segment has its own keyword tables; derived signals (public
//! calendar, instructor bench, named academy) fold the text metrics into
//! the same signal shape. The scorer consumes these names as-is, so they
//! must match the segment's scoring table exactly.

use orgscout_shared::Segment;

use crate::metrics;

/// A signal found on a page, with the phrase or derived fact that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedSignal {
    pub name: &'static str,
    pub snippet: String,
}

// ---------------------------------------------------------------------------
// Keyword tables
// ---------------------------------------------------------------------------

const HC_PROVIDER_ORG: &[&str] = &[
    "hospital",
    "health system",
    "nhs",
    "clinic",
    "medical center",
    "healthcare",
    "health care",
];

const HC_EHR_LIFECYCLE: &[&str] = &[
    "epic go-live",
    "cerner go-live",
    "go live",
    "implementation",
    "switch to epic",
    "epic training",
    "cerner training",
    "ehr training",
    "electronic health record",
    "emr training",
];

const HC_VILT: &[&str] = &[
    "virtual training",
    "live online training",
    "zoom",
    "microsoft teams",
    "ms teams",
    "webinar",
    "online training",
    "virtual learning",
    "remote training",
    "digital training",
];

const HC_TRAINING_PROGRAM: &[&str] = &[
    "super user",
    "credentialed trainer",
    "command center",
    "training program",
    "learning program",
    "education program",
    "certification",
    "workshop",
    "course",
];

const HC_LARGE_SCALE: &[&str] = &[
    "hospitals",
    "clinics",
    "employees",
    "caregivers",
    "staff",
    "personnel",
    "facilities",
    "locations",
    "sites",
];

const CORP_TRAINING_PROGRAM: &[&str] = &[
    "training program",
    "learning program",
    "development program",
    "academy",
    "university",
    "education program",
];

const CORP_LARGE_SCALE: &[&str] = &[
    "employees",
    "staff",
    "workforce",
    "personnel",
    "locations",
    "sites",
    "departments",
];

const CORP_STRUCTURED_LEARNING: &[&str] = &[
    "curriculum",
    "course",
    "workshop",
    "seminar",
    "certification",
    "skill development",
];

const CORP_VILT: &[&str] = &[
    "virtual classroom",
    "vilt",
    "live online",
    "virtual training",
    "webinar",
];

const CORP_AWARDS: &[&str] = &["top 125", "clo", "atd", "award", "recognition"];

const CORP_EXTERNAL_SCOPE: &[&str] = &[
    "partner training",
    "dealer training",
    "customer training",
    "customer academy",
    "partner enablement",
];

const CORP_EMPLOYEE_FOCUS: &[&str] = &[
    "employee",
    "staff",
    "workforce",
    "personnel",
    "team member",
    "associate",
];

const PROV_B2B: &[&str] = &[
    "corporate training",
    "business training",
    "employee training",
    "workplace training",
    "professional development",
];

const PROV_VILT_CORE: &[&str] = &[
    "virtual instructor-led",
    "live online training",
    "vilt",
    "virtual training",
    "online training",
    "remote training",
    "digital learning",
    "e-learning",
    "webinar",
];

const PROV_ENTERPRISE: &[&str] = &[
    "enterprise clients",
    "fortune",
    "case studies",
    "success stories",
];

const PROV_GEO: &[&str] = &["global", "international", "worldwide", "na and emea"];

const PROV_TRAINING_PROVIDER: &[&str] = &[
    "training company",
    "training provider",
    "learning company",
    "education company",
    "training services",
    "learning services",
];

const PROV_SERVICE_OFFERING: &[&str] = &[
    "training programs",
    "learning solutions",
    "development programs",
    "workshops",
    "seminars",
    "courses",
];

const PROV_CLIENT_SERVICES: &[&str] = &[
    "clients",
    "customers",
    "organizations",
    "companies",
    "businesses",
    "enterprises",
];

// ---------------------------------------------------------------------------
// Red flags
// ---------------------------------------------------------------------------

const HC_RED_FLAGS: &[&str] = &[
    "insurance company",
    "health insurer",
    "health plan provider",
    "pharmaceutical company",
    "medical device manufacturer",
    "drug maker",
];

const CORP_RED_FLAGS: &[&str] = &[
    "higher education institution",
    "community college",
    "government academy",
    "military academy",
    "compliance-only",
];

const PROV_RED_FLAGS: &[&str] = &[
    "mooc",
    "coursera",
    "udemy",
    "edx",
    "khan academy",
    "k-12",
    "high school",
    "elementary",
    "sat prep",
    "gmat prep",
    "self-paced only",
    "no live instruction",
    "recorded only",
    "micro bootcamp",
    "1-day course",
    "2-hour session",
    "consulting services",
    "advisory only",
    "strategy consulting",
];

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

fn first_hit<'a>(keywords: &[&'a str], text_lower: &str) -> Option<&'a str> {
    keywords.iter().copied().find(|k| text_lower.contains(k))
}

fn push_keyword_signal(
    out: &mut Vec<DetectedSignal>,
    name: &'static str,
    keywords: &[&str],
    text_lower: &str,
) {
    if let Some(hit) = first_hit(keywords, text_lower) {
        out.push(DetectedSignal {
            name,
            snippet: hit.to_string(),
        });
    }
}

/// Detect the segment's scored signals on one page. Only present signals
/// are returned; absence is implied.
pub fn detect_signals(segment: Segment, text: &str, page_url: &str) -> Vec<DetectedSignal> {
    let lower = text.to_lowercase();
    let mut out = Vec::new();

    match segment {
        Segment::Healthcare => {
            push_keyword_signal(&mut out, "provider_org", HC_PROVIDER_ORG, &lower);
            push_keyword_signal(&mut out, "ehr_lifecycle_active", HC_EHR_LIFECYCLE, &lower);
            push_keyword_signal(&mut out, "vilt_present", HC_VILT, &lower);
            push_keyword_signal(&mut out, "training_program", HC_TRAINING_PROGRAM, &lower);
            push_keyword_signal(&mut out, "large_scale", HC_LARGE_SCALE, &lower);
        }
        Segment::Corporate => {
            // A named academy needs both program language and an actual name.
            let academy_name = metrics::extract_academy_name(text, page_url);
            if first_hit(CORP_TRAINING_PROGRAM, &lower).is_some() && !academy_name.is_empty() {
                out.push(DetectedSignal {
                    name: "named_academy",
                    snippet: academy_name,
                });
            }
            push_keyword_signal(&mut out, "large_scale", CORP_LARGE_SCALE, &lower);
            push_keyword_signal(&mut out, "structured_learning", CORP_STRUCTURED_LEARNING, &lower);
            push_keyword_signal(&mut out, "vilt_present", CORP_VILT, &lower);
            push_keyword_signal(&mut out, "awards_recognition", CORP_AWARDS, &lower);
            push_keyword_signal(&mut out, "external_scope", CORP_EXTERNAL_SCOPE, &lower);
        }
        Segment::Providers => {
            push_keyword_signal(&mut out, "b2b_focus", PROV_B2B, &lower);
            push_keyword_signal(&mut out, "vilt_core_offering", PROV_VILT_CORE, &lower);

            let sessions = metrics::count_vilt_sessions(text);
            let schedule_url = metrics::extract_schedule_url(text, page_url);
            if !schedule_url.is_empty() && sessions >= 5 {
                out.push(DetectedSignal {
                    name: "public_calendar_5plus",
                    snippet: format!("{sessions} sessions at {schedule_url}"),
                });
            }

            let bench = metrics::count_instructor_bench(text);
            if bench >= 5 {
                out.push(DetectedSignal {
                    name: "instructor_bench_5plus",
                    snippet: format!("{bench} instructors"),
                });
            }

            let accreditations = metrics::extract_accreditations(text);
            if !accreditations.is_empty() {
                out.push(DetectedSignal {
                    name: "accreditations",
                    snippet: accreditations,
                });
            }

            push_keyword_signal(&mut out, "enterprise_clients", PROV_ENTERPRISE, &lower);
            push_keyword_signal(&mut out, "geo_reach", PROV_GEO, &lower);
        }
    }
    out
}

/// Disqualifying phrases found on the page. Any hit rejects the candidate
/// outright at scoring time.
pub fn detect_red_flags(segment: Segment, text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let flags = match segment {
        Segment::Healthcare => HC_RED_FLAGS,
        Segment::Corporate => CORP_RED_FLAGS,
        Segment::Providers => PROV_RED_FLAGS,
    };
    flags
        .iter()
        .filter(|f| lower.contains(*f))
        .map(|f| f.to_string())
        .collect()
}

/// Display-only facts for the output schemas: each flag pairs a column
/// concern with whether its language appears on the page.
pub fn display_flags(segment: Segment, text: &str) -> Vec<(&'static str, bool)> {
    let lower = text.to_lowercase();
    let hit = |keywords: &[&str]| first_hit(keywords, &lower).is_some();

    match segment {
        Segment::Healthcare => Vec::new(),
        Segment::Corporate => vec![
            ("employee_focus", hit(CORP_EMPLOYEE_FOCUS)),
            ("structured_learning", hit(CORP_STRUCTURED_LEARNING)),
            ("large_scale", hit(CORP_LARGE_SCALE)),
        ],
        Segment::Providers => vec![
            ("training_provider", hit(PROV_TRAINING_PROVIDER)),
            ("corporate_focus", hit(PROV_B2B)),
            ("service_offering", hit(PROV_SERVICE_OFFERING)),
            ("client_services", hit(PROV_CLIENT_SERVICES)),
            ("virtual_capability", hit(PROV_VILT_CORE)),
        ],
    }
}

/// Clip text to at most `max_chars` characters on a char boundary.
/// Harvested pages are clipped before any signal work.
pub fn clip(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(signals: &[DetectedSignal]) -> Vec<&'static str> {
        signals.iter().map(|s| s.name).collect()
    }

    #[test]
    fn healthcare_signals_from_go_live_page() {
        let text = "Mercy Health System is a hospital network preparing for its Epic \
                    go-live. Virtual training runs over Zoom with super user support \
                    across 14 facilities.";
        let signals = detect_signals(Segment::Healthcare, text, "https://mercy.example/");
        let found = names(&signals);
        assert!(found.contains(&"provider_org"));
        assert!(found.contains(&"ehr_lifecycle_active"));
        assert!(found.contains(&"vilt_present"));
        assert!(found.contains(&"training_program"));
        assert!(found.contains(&"large_scale"));
    }

    #[test]
    fn healthcare_snippet_is_the_matched_phrase() {
        let text = "Cerner training for all staff.";
        let signals = detect_signals(Segment::Healthcare, text, "");
        let ehr = signals
            .iter()
            .find(|s| s.name == "ehr_lifecycle_active")
            .expect("signal");
        assert_eq!(ehr.snippet, "cerner training");
    }

    #[test]
    fn corporate_named_academy_requires_name_and_program() {
        let with_name = "The Acme Academy training program enrolls every new manager.";
        let signals = detect_signals(Segment::Corporate, with_name, "https://acme.example/");
        let academy = signals.iter().find(|s| s.name == "named_academy").expect("signal");
        assert_eq!(academy.snippet, "Acme Academy");

        // Program language alone is not a named academy.
        let without_name = "Our development program covers onboarding.";
        let signals = detect_signals(Segment::Corporate, without_name, "https://acme.example/");
        assert!(!names(&signals).contains(&"named_academy"));
    }

    #[test]
    fn providers_derived_signals() {
        let text = "A corporate training provider with virtual instructor-led courses. \
                    12 upcoming sessions on our training calendar at \
                    https://prov.example/schedule. Our 9 certified instructors hold \
                    CompTIA and PMI credentials.";
        let signals = detect_signals(Segment::Providers, text, "https://prov.example/");
        let found = names(&signals);
        assert!(found.contains(&"b2b_focus"));
        assert!(found.contains(&"vilt_core_offering"));
        assert!(found.contains(&"public_calendar_5plus"));
        assert!(found.contains(&"instructor_bench_5plus"));
        assert!(found.contains(&"accreditations"));

        let acc = signals.iter().find(|s| s.name == "accreditations").expect("signal");
        assert_eq!(acc.snippet, "PMI; CompTIA");
    }

    #[test]
    fn providers_thin_page_yields_few_signals() {
        let signals = detect_signals(
            Segment::Providers,
            "We sell workplace training.",
            "https://x.example/",
        );
        assert_eq!(names(&signals), vec!["b2b_focus"]);
    }

    #[test]
    fn red_flags_per_segment() {
        assert_eq!(
            detect_red_flags(Segment::Providers, "Find us on Coursera and Udemy"),
            vec!["coursera".to_string(), "udemy".to_string()]
        );
        assert!(
            !detect_red_flags(Segment::Healthcare, "a pharmaceutical company subsidiary")
                .is_empty()
        );
        assert!(detect_red_flags(Segment::Corporate, "an employee academy").is_empty());
    }

    #[test]
    fn display_flags_for_providers() {
        let text = "A training company serving enterprise clients with workshops.";
        let flags = display_flags(Segment::Providers, text);
        let get = |name: &str| flags.iter().find(|(n, _)| *n == name).map(|(_, v)| *v);
        assert_eq!(get("training_provider"), Some(true));
        assert_eq!(get("client_services"), Some(true));
        assert_eq!(get("virtual_capability"), Some(false));
    }

    #[test]
    fn clip_respects_char_boundaries() {
        assert_eq!(clip("hello", 10), "hello");
        assert_eq!(clip("hello", 3), "hel");
        // Multi-byte chars clip without panicking.
        assert_eq!(clip("héllo", 2), "hé");
    }
}
