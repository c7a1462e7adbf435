//! Text metrics behind the derived provider and corporate signals:
//! session counts, schedule URLs, accreditations, instructor bench size,
//! and academy names.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static SESSION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(\d+)\s+(?:live|virtual|online)\s+sessions?",
        r"(\d+)\s+sessions?\s+(?:per|each|every)\s+(?:month|week)",
        r"(\d+)\s+upcoming\s+(?:sessions?|courses?|classes?)",
        r"(\d+)\s+scheduled\s+(?:sessions?|courses?|classes?)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

/// Largest public session count mentioned in the text, zero when none.
pub fn count_vilt_sessions(text: &str) -> u32 {
    let lower = text.to_lowercase();
    SESSION_PATTERNS
        .iter()
        .flat_map(|p| p.captures_iter(&lower))
        .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

static SCHEDULE_URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(https?://\S+(?:schedule|calendar|courses|training)\S*)",
        r"(https?://\S+/(?:events|sessions|classes)\S*)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

const SCHEDULE_PAGE_MARKERS: &[&str] = &["upcoming sessions", "schedule", "calendar", "register"];

/// Public training calendar URL: an explicit link in the text, or the page
/// itself when it reads like a schedule. Empty when neither.
pub fn extract_schedule_url(text: &str, base_url: &str) -> String {
    let lower = text.to_lowercase();
    for pattern in SCHEDULE_URL_PATTERNS.iter() {
        if let Some(c) = pattern.captures(&lower) {
            if let Some(m) = c.get(1) {
                return m.as_str().to_string();
            }
        }
    }
    if SCHEDULE_PAGE_MARKERS.iter().any(|m| lower.contains(m)) {
        return base_url.to_string();
    }
    String::new()
}

static ACCREDITATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(PMI|Project Management Institute)\b",
        r"(?i)\b(NEBOSH)\b",
        r"(?i)\b(CompTIA)\b",
        r"(?i)\b(SHRM)\b",
        r"(?i)\b(ATD)\b",
        r"(?i)\b(IACET)\b",
        r"(?i)\b(Six Sigma)\b",
        r"(?i)\b(PMP)\b",
        r"(?i)\b(CISSP)\b",
        r"(?i)\b(ISO \d+)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

/// Professional accreditations mentioned in the text, deduplicated and
/// `; `-joined in a fixed precedence order. Empty when none.
pub fn extract_accreditations(text: &str) -> String {
    let mut found: Vec<String> = Vec::new();
    for pattern in ACCREDITATION_PATTERNS.iter() {
        for c in pattern.captures_iter(text) {
            if let Some(m) = c.get(1) {
                let hit = m.as_str().to_string();
                if !found.iter().any(|f| f.eq_ignore_ascii_case(&hit)) {
                    found.push(hit);
                }
            }
        }
    }
    found.join("; ")
}

static INSTRUCTOR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(\d+)\s+(?:expert|certified|experienced)\s+(?:instructors?|trainers?)",
        r"(\d+)\s+(?:instructors?|trainers?|facilitators?)",
        r"(?:team|staff)\s+of\s+(\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

/// Instructor bench size: the largest explicit count, with a conservative
/// estimate from descriptive terms when no number is given.
pub fn count_instructor_bench(text: &str) -> u32 {
    let lower = text.to_lowercase();
    let max_count = INSTRUCTOR_PATTERNS
        .iter()
        .flat_map(|p| p.captures_iter(&lower))
        .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
        .max()
        .unwrap_or(0);

    if max_count > 0 {
        return max_count;
    }
    if ["large team", "extensive", "numerous"].iter().any(|t| lower.contains(t)) {
        10
    } else if ["team of experts", "experienced staff"].iter().any(|t| lower.contains(t)) {
        5
    } else {
        0
    }
}

static ACADEMY_NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(\w+)\s+(?:corporate\s+)?academy",
        r"(\w+)\s+university",
        r"(\w+)\s+learning\s+center",
        r"(\w+)\s+training\s+center",
        r"(\w+)\s+development\s+center",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Named corporate academy from text or the page's own hostname.
/// Empty when no academy name can be derived.
pub fn extract_academy_name(text: &str, page_url: &str) -> String {
    let lower = text.to_lowercase();
    for pattern in ACADEMY_NAME_PATTERNS.iter() {
        if let Some(c) = pattern.captures(&lower) {
            if let Some(m) = c.get(1) {
                return format!("{} Academy", title_case(m.as_str()));
            }
        }
    }

    // Fall back to an academy subdomain: academy.acme.com names Acme.
    if let Ok(parsed) = Url::parse(page_url) {
        if let Some(host) = parsed.host_str() {
            if host.contains("academy") {
                for part in host.split('.') {
                    if !matches!(part, "www" | "academy" | "com" | "org") && part.len() > 2 {
                        return format!("{} Academy", title_case(part));
                    }
                }
            }
        }
    }
    String::new()
}

static ACADEMY_URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(https?://\S*academy\S*)",
        r"(https?://\S+/academy\S*)",
        r"(https?://\S+university\S*)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

/// Academy URL from the text, or the page itself when it lives on an
/// academy or university host.
pub fn extract_academy_url(text: &str, base_url: &str) -> String {
    let lower = text.to_lowercase();
    for pattern in ACADEMY_URL_PATTERNS.iter() {
        if let Some(c) = pattern.captures(&lower) {
            if let Some(m) = c.get(1) {
                return m.as_str().to_string();
            }
        }
    }
    if let Ok(parsed) = Url::parse(base_url) {
        if let Some(host) = parsed.host_str() {
            if host.contains("academy") || host.contains("university") {
                return base_url.to_string();
            }
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_count_takes_max_across_forms() {
        let text = "Join 3 live sessions this week. We list 12 upcoming courses \
                    and 7 scheduled classes for the quarter.";
        assert_eq!(count_vilt_sessions(text), 12);
        assert_eq!(count_vilt_sessions("no schedule language here"), 0);
    }

    #[test]
    fn schedule_url_prefers_explicit_link() {
        let text = "See https://provider.example/training-calendar for dates. Register today.";
        assert_eq!(
            extract_schedule_url(text, "https://provider.example/"),
            "https://provider.example/training-calendar"
        );
    }

    #[test]
    fn schedule_page_markers_use_base_url() {
        let text = "Upcoming sessions are listed below. Register to attend.";
        assert_eq!(
            extract_schedule_url(text, "https://provider.example/schedule"),
            "https://provider.example/schedule"
        );
        assert_eq!(extract_schedule_url("nothing relevant", "https://x.example/"), "");
    }

    #[test]
    fn accreditations_joined_in_order() {
        let text = "Courses are accredited by PMI and CompTIA; our ISO 9001 \
                    processes are audited yearly. PMI members get discounts.";
        assert_eq!(extract_accreditations(text), "PMI; CompTIA; ISO 9001");
        assert_eq!(extract_accreditations("plain text"), "");
    }

    #[test]
    fn instructor_bench_counts_and_estimates() {
        assert_eq!(count_instructor_bench("our 14 certified instructors"), 14);
        assert_eq!(count_instructor_bench("a team of 8 facilitators"), 8);
        assert_eq!(count_instructor_bench("an extensive faculty network"), 10);
        assert_eq!(count_instructor_bench("our team of experts delivers"), 5);
        assert_eq!(count_instructor_bench("one trainer"), 0);
    }

    #[test]
    fn academy_name_from_text_and_host() {
        assert_eq!(
            extract_academy_name("Welcome to the Walmart Academy onboarding portal", ""),
            "Walmart Academy"
        );
        assert_eq!(
            extract_academy_name("no names here", "https://academy.acme.com/courses"),
            "Acme Academy"
        );
        assert_eq!(extract_academy_name("no names here", "https://acme.com/"), "");
    }

    #[test]
    fn academy_url_extraction() {
        assert_eq!(
            extract_academy_url(
                "Enroll at https://academy.acme.com/enroll now",
                "https://acme.com/"
            ),
            "https://academy.acme.com/enroll"
        );
        assert_eq!(
            extract_academy_url("nothing linked", "https://university.acme.com/about"),
            "https://university.acme.com/about"
        );
    }
}
