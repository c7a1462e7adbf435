//! Candidate organization names from search result titles.

/// Title fragments that mark a listicle or news headline rather than an
/// organization's own page. Candidates with these titles never enter the
/// pipeline.
const ARTICLE_TITLE_MARKERS: &[&str] = &[
    "top ",
    "best ",
    "list of",
    "guide to",
    "how to",
    "why ",
    "what ",
    "when ",
    "where ",
    "report",
    "announces",
    "launches",
    "implements",
    "news",
];

/// Whether a result title reads like an article rather than an organization.
pub fn is_article_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    ARTICLE_TITLE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Derive an organization name from a result title: the text before the
/// first ` - ` separator, trimmed and capped at 120 characters. Returns
/// `None` for empty titles.
pub fn org_name_from_title(title: &str) -> Option<String> {
    let head = title.split(" - ").next().unwrap_or("").trim();
    if head.is_empty() {
        return None;
    }
    let name: String = head.chars().take(120).collect();
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_title_head_capped() {
        assert_eq!(
            org_name_from_title("Intermountain Health - Epic Go-Live Resources"),
            Some("Intermountain Health".to_string())
        );
        assert_eq!(org_name_from_title("   "), None);

        let long = "A".repeat(300);
        assert_eq!(org_name_from_title(&long).unwrap().chars().count(), 120);
    }

    #[test]
    fn article_titles_are_flagged() {
        assert!(is_article_title("Top 10 Hospitals Using Epic"));
        assert!(is_article_title("Mercy Health announces new training center"));
        assert!(is_article_title("Guide to EHR training"));
        assert!(!is_article_title("Sandler Training"));
        assert!(!is_article_title("Cleveland Clinic"));
    }
}
