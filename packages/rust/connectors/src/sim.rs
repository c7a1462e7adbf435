//! Deterministic in-process providers for offline runs and tests.
//!
//! The corpus is a fixed set of organizations per segment with page text
//! written to exercise the full range of outcomes: confirmed and probable
//! candidates on both sides of the regional mix, candidates missing a
//! required signal, red-flag rejections, article titles that never enter
//! the pipeline, and one duplicate listing.

use orgscout_shared::{Firmographics, OrgScoutError, Result, Segment};

use crate::traits::{
    EnrichProvider, FetchProvider, FetchedPage, LlmExtract, LlmReply, SearchHit, SearchProvider,
};

/// One seeded organization: a search listing plus the page behind it.
#[derive(Debug, Clone, Copy)]
pub struct SimOrg {
    pub name: &'static str,
    pub title: &'static str,
    pub url: &'static str,
    pub snippet: &'static str,
    pub page_text: &'static str,
    pub employee_range: Option<&'static str>,
    pub country: Option<&'static str>,
}

const HEALTHCARE_ORGS: &[SimOrg] = &[
    SimOrg {
        name: "Sentara Health",
        title: "Sentara Health - Epic Go-Live Training Hub",
        url: "https://www.sentarahealth.us/ehr-training",
        snippet: "Go-live readiness and training resources for Sentara teams.",
        page_text: "Sentara Health is a health system running an Epic go-live with a \
                    command center and super user program. Virtual training over Zoom \
                    reaches 30,000 employees across 12 hospitals in the United States \
                    and North America. Courses are tracked in HealthStream. The first \
                    region went live in March 2025.",
        employee_range: Some("10001+"),
        country: Some("US"),
    },
    SimOrg {
        name: "Royal Devon NHS Trust",
        title: "Royal Devon NHS Trust - Epic Programme Training",
        url: "https://www.royaldevon.nhs.uk/epic-programme",
        snippet: "Training for the Epic electronic patient record programme.",
        page_text: "The Royal Devon NHS trust is delivering Epic training for all staff \
                    before the go live. Sessions run on Microsoft Teams as remote \
                    training, led by credentialed trainer teams across its hospitals \
                    in the United Kingdom.",
        employee_range: Some("5001-10000"),
        country: Some("GB"),
    },
    SimOrg {
        name: "Prairie Regional Medical Center",
        title: "Prairie Regional Medical Center - EHR Learning Portal",
        url: "https://prairieregional.ca/ehr",
        snippet: "EHR learning portal for clinicians.",
        page_text: "Prairie Regional Medical Center offers EHR training delivered as \
                    online training for clinicians across the region. Based in \
                    Toronto, Canada.",
        employee_range: None,
        country: None,
    },
    SimOrg {
        name: "Lakeside Clinic Network",
        title: "Lakeside Clinic Network - Nursing Education",
        url: "https://lakesideclinics.org/education",
        snippet: "Education resources for nursing teams.",
        page_text: "Lakeside Clinic Network coordinates a training program for nurses \
                    at its clinics.",
        employee_range: None,
        country: Some("US"),
    },
    SimOrg {
        name: "Top 25 Epic Go-Lives of 2025",
        title: "Top 25 Epic Go-Lives of 2025 - EHR Industry News",
        url: "https://ehrindustrynews.com/top-25-go-lives",
        snippet: "The biggest go-lives of the year, ranked.",
        page_text: "",
        employee_range: None,
        country: None,
    },
    SimOrg {
        name: "Meridian Health Plan Group",
        title: "Meridian Health Plan Group - Member Services",
        url: "https://meridianhealthgroup.com/members",
        snippet: "Coverage and wellness services for members.",
        page_text: "Meridian Health Plan Group is an insurance company offering health \
                    care coverage, wellness webinar series, and member education \
                    programs across the United States.",
        employee_range: None,
        country: Some("US"),
    },
    SimOrg {
        name: "Sentara Health",
        title: "Sentara Health - Clinical Informatics Careers",
        url: "https://www.sentarahealth.us/careers",
        snippet: "Open roles in clinical informatics and training.",
        page_text: "Sentara Health recruits credentialed trainer and Epic principal \
                    trainer staff for hospital education programs in Virginia.",
        employee_range: None,
        country: None,
    },
];

const CORPORATE_ORGS: &[SimOrg] = &[
    SimOrg {
        name: "Hamilton Motors Academy",
        title: "Hamilton Motors Academy - Dealer and Employee Learning",
        url: "https://academy.hamiltonmotors.com/dealer-learning",
        snippet: "Learning for dealers, technicians, and corporate teams.",
        page_text: "The Hamilton Academy trains 60,000 employees and dealer networks \
                    worldwide. Its curriculum covers a virtual classroom program \
                    recognized with an ATD BEST award. Dealer training reaches \
                    partners in the United States and across North America.",
        employee_range: Some("10001+"),
        country: Some("US"),
    },
    SimOrg {
        name: "Severn Utilities Academy",
        title: "Severn Utilities Academy - Technical Learning",
        url: "https://www.severnutilities.co.uk/academy",
        snippet: "Technical learning for engineering teams.",
        page_text: "The Severn Academy delivers a technical curriculum with VILT \
                    seminars for engineers. Severn Utilities serves customers across \
                    the United Kingdom.",
        employee_range: Some("5001-10000"),
        country: Some("GB"),
    },
    SimOrg {
        name: "Crestline University",
        title: "Crestline University - Professional Certification",
        url: "https://www.crestline.com/university",
        snippet: "Certification tracks for the Crestline workforce.",
        page_text: "Crestline University runs certification tracks for its global \
                    workforce, recognized in the Training Top 125. Customer training \
                    extends the curriculum to distributors in the United States.",
        employee_range: None,
        country: None,
    },
    SimOrg {
        name: "Braddock Community College",
        title: "Braddock Community College - Workforce Programs",
        url: "https://braddock.edu/workforce",
        snippet: "Workforce programs for local employers.",
        page_text: "Braddock Community College provides workforce training courses \
                    for local employers.",
        employee_range: None,
        country: None,
    },
    SimOrg {
        name: "Why Corporate Academies Fail",
        title: "Why Corporate Academies Fail - Industry Analysis",
        url: "https://learningindustry.com/why-academies-fail",
        snippet: "An analysis of academy programs that stalled.",
        page_text: "",
        employee_range: None,
        country: None,
    },
    SimOrg {
        name: "Veridian Airlines Academy",
        title: "Veridian Airlines Academy - Crew Learning",
        url: "https://learning.veridianair.com/academy",
        snippet: "Learning for flight and cabin crews.",
        page_text: "The Veridian Academy certifies 18,000 employees with virtual \
                    training courses for cabin crew across the United States and \
                    New York hubs.",
        employee_range: Some("10001+"),
        country: Some("US"),
    },
];

const PROVIDER_ORGS: &[SimOrg] = &[
    SimOrg {
        name: "Summit Learning Group",
        title: "Summit Learning Group - Corporate Training for Enterprises",
        url: "https://summitlearning.com/corporate-training",
        snippet: "Virtual instructor-led programs for enterprise teams.",
        page_text: "Summit Learning Group is a corporate training company delivering \
                    training programs as virtual instructor-led cohorts for Fortune \
                    500 enterprise clients \
                    across North America. Browse 32 live sessions at \
                    https://summitlearning.com/schedule with 45 certified \
                    instructors. PMI and CompTIA accredited, with case studies from \
                    global rollouts.",
        employee_range: Some("1001-5000"),
        country: Some("US"),
    },
    SimOrg {
        name: "Kestrel Training",
        title: "Kestrel Training - Health and Safety Courses",
        url: "https://www.kestreltraining.co.uk/courses",
        snippet: "NEBOSH-accredited safety training for employers.",
        page_text: "Kestrel Training is a NEBOSH-accredited business training \
                    provider. Our team of 12 trainers runs 18 upcoming sessions \
                    delivered as VILT courses for employers across London and the \
                    United Kingdom.",
        employee_range: Some("201-500"),
        country: Some("GB"),
    },
    SimOrg {
        name: "BrightPath Skills",
        title: "BrightPath Skills - Workplace Learning",
        url: "https://brightpathskills.com/workplace",
        snippet: "Workplace learning paths for client teams.",
        page_text: "BrightPath Skills builds workplace training paths with online \
                    training modules for client organizations. Browse 9 scheduled \
                    classes and register today. SHRM accredited.",
        employee_range: None,
        country: Some("CA"),
    },
    SimOrg {
        name: "Pinnacle Learning Library",
        title: "Pinnacle Learning Library - On-Demand Video Catalog",
        url: "https://pinnaclelibrary.com/catalog",
        snippet: "A video library for independent learners.",
        page_text: "Pinnacle Learning Library sells a self-paced only video catalog \
                    with no live instruction.",
        employee_range: None,
        country: None,
    },
    SimOrg {
        name: "2025 Corporate Training Market Report",
        title: "2025 Corporate Training Market Report - Market Watch",
        url: "https://trainingmarketwatch.com/2025-report",
        snippet: "Market sizing and vendor landscape.",
        page_text: "",
        employee_range: None,
        country: None,
    },
];

/// The seeded organizations for one segment, in search-result order.
pub fn corpus(segment: Segment) -> &'static [SimOrg] {
    match segment {
        Segment::Healthcare => HEALTHCARE_ORGS,
        Segment::Corporate => CORPORATE_ORGS,
        Segment::Providers => PROVIDER_ORGS,
    }
}

fn all_orgs() -> impl Iterator<Item = &'static SimOrg> {
    HEALTHCARE_ORGS
        .iter()
        .chain(CORPORATE_ORGS)
        .chain(PROVIDER_ORGS)
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Search over the seeded corpus. Every query returns the segment's full
/// listing capped at `max_results`, so repeated queries exercise the
/// harvest-side URL dedupe.
pub struct SimSearch {
    segment: Segment,
}

impl SimSearch {
    pub fn new(segment: Segment) -> Self {
        Self { segment }
    }
}

impl SearchProvider for SimSearch {
    async fn search(
        &self,
        _query: &str,
        max_results: usize,
        site: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        let hits = corpus(self.segment)
            .iter()
            .filter(|org| site.is_none_or(|s| org.url.contains(s)))
            .take(max_results)
            .map(|org| SearchHit {
                title: org.title.to_string(),
                url: org.url.to_string(),
                snippet: org.snippet.to_string(),
            })
            .collect();
        Ok(hits)
    }
}

/// Serves seeded pages by URL; anything else fails like a dead link.
pub struct SimFetch;

impl FetchProvider for SimFetch {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let Some(org) = all_orgs().find(|org| org.url == url) else {
            return Err(OrgScoutError::Transport(format!(
                "no page at {url} in the seeded corpus"
            )));
        };
        Ok(FetchedPage {
            status_code: 200,
            raw_html: format!("<html><body><main>{}</main></body></html>", org.page_text),
            extracted_text: org.page_text.to_string(),
        })
    }
}

/// Firmographics lookup by organization name containment, so the
/// title-derived candidate name "Hamilton Motors Academy" still finds
/// the seeded "Hamilton Motors Academy" record.
pub struct SimEnrich;

impl EnrichProvider for SimEnrich {
    async fn enrich(&self, company: &str, _domain: Option<&str>) -> Result<Option<Firmographics>> {
        let query = company.trim().to_lowercase();
        if query.is_empty() {
            return Ok(None);
        }
        let hit = all_orgs().find(|org| {
            let name = org.name.to_lowercase();
            query.contains(&name) || name.contains(&query)
        });
        Ok(hit
            .filter(|org| org.employee_range.is_some() || org.country.is_some())
            .map(|org| Firmographics {
                employee_range: org.employee_range.map(str::to_string),
                country: org.country.map(str::to_string),
                industry: None,
                website: Some(org.url.to_string()),
            }))
    }
}

/// Answers canonicalization prompts with the quoted title's head,
/// mirroring what a well-behaved model does with these prompts.
pub struct SimLlm;

impl LlmExtract for SimLlm {
    async fn extract(&self, prompt: &str, _max_tokens: u64) -> Result<LlmReply> {
        let title = prompt
            .split_once("Title: '")
            .and_then(|(_, rest)| rest.split_once('\''))
            .map(|(title, _)| title)
            .unwrap_or("");
        let head = title.split(" - ").next().unwrap_or("").trim();
        Ok(LlmReply {
            content: head.to_string(),
            tokens_used: (prompt.len() as u64) / 4,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_caps_results() {
        let search = SimSearch::new(Segment::Healthcare);
        let hits = search.search("epic go-live training", 3, None).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits[0].title.starts_with("Sentara Health"));
    }

    #[tokio::test]
    async fn search_honors_site_filter() {
        let search = SimSearch::new(Segment::Healthcare);
        let hits = search
            .search("epic training", 10, Some("nhs.uk"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].url.contains("royaldevon"));
    }

    #[tokio::test]
    async fn fetch_serves_seeded_pages_only() {
        let page = SimFetch
            .fetch("https://summitlearning.com/corporate-training")
            .await
            .unwrap();
        assert_eq!(page.status_code, 200);
        assert!(page.extracted_text.contains("virtual instructor-led"));

        let missing = SimFetch.fetch("https://nowhere.example/page").await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn enrich_matches_on_name_containment() {
        let firmo = SimEnrich
            .enrich("Hamilton Motors Academy", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(firmo.employee_range.as_deref(), Some("10001+"));
        assert!(firmo.is_large_scale());

        assert!(SimEnrich.enrich("Unknown Org", None).await.unwrap().is_none());
        assert!(SimEnrich.enrich("", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn llm_answers_with_title_head() {
        let prompt = "Extract the clean organization name. Title: 'Sentara Health - \
                      Epic Go-Live Training Hub' URL: https://www.sentarahealth.us. \
                      Otherwise return only the organization name.";
        let reply = SimLlm.extract(prompt, 60).await.unwrap();
        assert_eq!(reply.content, "Sentara Health");
    }

    #[test]
    fn corpus_urls_are_unique() {
        let mut urls: Vec<&str> = all_orgs().map(|org| org.url).collect();
        let before = urls.len();
        urls.sort_unstable();
        urls.dedup();
        assert_eq!(urls.len(), before);
    }
}
