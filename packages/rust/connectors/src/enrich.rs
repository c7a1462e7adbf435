//! Firmographic enrichment client.
//!
//! Talks to an Explorium-style company enrichment API. Enrichment is
//! always optional: a missing API base or key, a company the service
//! does not know, or a rate-limited response all degrade to "no data"
//! rather than failing the candidate.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use orgscout_runtime::{Budget, BudgetKind, CacheStack, RetryPolicy, cache_key};
use orgscout_shared::{EnrichConfig, Firmographics, OrgScoutError, Region, Result};

use crate::traits::EnrichProvider;

const NA_COUNTRIES: &[&str] = &["US", "USA", "UNITED STATES", "CA", "CANADA", "MX", "MEXICO"];

const EMEA_COUNTRIES: &[&str] = &[
    "GB", "UK", "UNITED KINGDOM", "FR", "FRANCE", "DE", "GERMANY", "IT", "ITALY", "ES", "SPAIN",
    "NL", "NETHERLANDS", "BE", "BELGIUM", "SE", "SWEDEN", "NO", "NORWAY", "DK", "DENMARK", "FI",
    "FINLAND", "CH", "SWITZERLAND", "AT", "AUSTRIA", "PL", "POLAND", "IE", "IRELAND", "AE", "UAE",
    "SA", "SAUDI ARABIA", "ZA", "SOUTH AFRICA", "IL", "ISRAEL",
];

/// Region implied by a headquarters country, when it maps cleanly onto
/// one side of the target mix.
pub fn region_from_country(country: &str) -> Option<Region> {
    let upper = country.trim().to_uppercase();
    if NA_COUNTRIES.contains(&upper.as_str()) {
        Some(Region::Na)
    } else if EMEA_COUNTRIES.contains(&upper.as_str()) {
        Some(Region::Emea)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct EnrichResponse {
    #[serde(default)]
    employee_range: Option<String>,
    #[serde(default)]
    employee_count_range: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    industry: Option<String>,
    #[serde(default)]
    website: Option<String>,
}

/// Enrichment provider backed by an HTTP JSON API.
pub struct HttpEnrichClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
}

impl HttpEnrichClient {
    pub fn new(config: &EnrichConfig, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OrgScoutError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: std::env::var(&config.api_key_env).ok(),
        })
    }
}

impl EnrichProvider for HttpEnrichClient {
    #[instrument(skip_all, fields(company = %company))]
    async fn enrich(&self, company: &str, domain: Option<&str>) -> Result<Option<Firmographics>> {
        let Some(api_key) = self.api_key.as_deref() else {
            debug!("enrichment key not configured");
            return Ok(None);
        };
        if self.api_base.is_empty() {
            debug!("enrichment api base not configured");
            return Ok(None);
        }

        let mut payload = serde_json::Map::new();
        payload.insert("company_name".into(), company.into());
        if let Some(domain) = domain {
            payload.insert("website".into(), domain.into());
        }

        let response = self
            .client
            .post(format!("{}/company/enrich", self.api_base))
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| OrgScoutError::Transport(format!("enrich {company}: {e}")))?;

        match response.status().as_u16() {
            200 => {
                let body: EnrichResponse = response.json().await.map_err(|e| {
                    OrgScoutError::parse(format!("enrich {company}: bad response: {e}"))
                })?;
                Ok(Some(Firmographics {
                    employee_range: body.employee_range.or(body.employee_count_range),
                    country: body.country,
                    industry: body.industry,
                    website: body.website,
                }))
            }
            404 => {
                debug!("company not known to enrichment service");
                Ok(None)
            }
            429 => {
                warn!("enrichment rate limit reached");
                Ok(None)
            }
            status => Err(OrgScoutError::Transport(format!(
                "enrich {company}: HTTP {status}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Metered wrapper
// ---------------------------------------------------------------------------

/// Budget- and cache-aware front end over an enrichment provider.
/// Successful lookups are cached; lookups that returned no data are not,
/// so a later run with better connectivity can try again.
pub struct MeteredEnrich<E> {
    provider: E,
    budget: std::sync::Arc<Budget>,
    cache: std::sync::Arc<CacheStack>,
    retry: RetryPolicy,
}

impl<E: EnrichProvider> MeteredEnrich<E> {
    pub fn new(
        provider: E,
        budget: std::sync::Arc<Budget>,
        cache: std::sync::Arc<CacheStack>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            budget,
            cache,
            retry,
        }
    }

    /// Enrich one organization. `Ok(None)` covers both "no data" and an
    /// exhausted enrichment budget; cached data costs nothing.
    pub async fn enrich(&self, company: &str, domain: Option<&str>) -> Result<Option<Firmographics>> {
        let company_key = company.trim().to_lowercase();
        let key = cache_key(
            "enrich",
            &[("company", company_key.as_str()), ("domain", domain.unwrap_or(""))],
        );

        if let Some(firmo) = self.cache.get_as::<Firmographics>(&key) {
            return Ok(Some(firmo));
        }
        if !self.budget.reserve(BudgetKind::Enrich, 1) {
            return Ok(None);
        }

        let result = self
            .retry
            .run("enrich", || self.provider.enrich(company, domain))
            .await?;
        if let Some(firmo) = &result {
            self.cache.set_value(&key, firmo);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use orgscout_runtime::{BudgetCeilings, MemoryCache};
    use orgscout_shared::{BudgetConfig, Mode};

    #[test]
    fn country_to_region_mapping() {
        assert_eq!(region_from_country("United States"), Some(Region::Na));
        assert_eq!(region_from_country("de"), Some(Region::Emea));
        assert_eq!(region_from_country("south africa"), Some(Region::Emea));
        assert_eq!(region_from_country("Japan"), None);
        assert_eq!(region_from_country(""), None);
    }

    #[tokio::test]
    async fn unconfigured_client_returns_no_data() {
        let config = EnrichConfig {
            api_base: String::new(),
            api_key_env: "ORGSCOUT_TEST_MISSING_KEY".into(),
        };
        let client = HttpEnrichClient::new(&config, 5).unwrap();
        let result = client.enrich("Acme Corp", None).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn enrich_parses_firmographics() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/company/enrich"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({
                    "employee_range": "10001+",
                    "country": "US",
                    "industry": "Hospitals",
                    "website": "https://mercy.example"
                }),
            ))
            .mount(&server)
            .await;

        unsafe { std::env::set_var("ORGSCOUT_TEST_ENRICH_KEY_A", "secret") };
        let config = EnrichConfig {
            api_base: server.uri(),
            api_key_env: "ORGSCOUT_TEST_ENRICH_KEY_A".into(),
        };
        let client = HttpEnrichClient::new(&config, 5).unwrap();
        let firmo = client.enrich("Mercy Health", None).await.unwrap().unwrap();
        assert_eq!(firmo.employee_range.as_deref(), Some("10001+"));
        assert!(firmo.is_large_scale());
        assert_eq!(region_from_country(firmo.country.as_deref().unwrap_or("")), Some(Region::Na));
    }

    #[tokio::test]
    async fn not_found_is_no_data() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        unsafe { std::env::set_var("ORGSCOUT_TEST_ENRICH_KEY_B", "secret") };
        let config = EnrichConfig {
            api_base: server.uri(),
            api_key_env: "ORGSCOUT_TEST_ENRICH_KEY_B".into(),
        };
        let client = HttpEnrichClient::new(&config, 5).unwrap();
        assert!(client.enrich("Unknown Org", None).await.unwrap().is_none());
    }

    struct CountingEnrich {
        calls: AtomicU32,
    }

    impl EnrichProvider for CountingEnrich {
        async fn enrich(&self, _company: &str, _domain: Option<&str>) -> Result<Option<Firmographics>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(Firmographics {
                employee_range: Some("5001-10000".into()),
                country: Some("GB".into()),
                industry: None,
                website: None,
            }))
        }
    }

    fn metered(max_enrich: u64) -> MeteredEnrich<CountingEnrich> {
        let budget_cfg = BudgetConfig {
            max_enrich,
            ..BudgetConfig::default()
        };
        let ceilings = BudgetCeilings::for_mode(&budget_cfg, Mode::Fast);
        MeteredEnrich::new(
            CountingEnrich {
                calls: AtomicU32::new(0),
            },
            Arc::new(Budget::new(ceilings)),
            Arc::new(CacheStack::new(vec![Arc::new(MemoryCache::new(16))])),
            RetryPolicy::default(),
        )
    }

    #[tokio::test]
    async fn cached_enrichment_skips_provider_and_budget() {
        let wrapper = metered(10);

        let first = wrapper.enrich("Acme Corp", None).await.unwrap();
        assert!(first.is_some());
        // Same company in different case hits the cache.
        let second = wrapper.enrich("ACME CORP", None).await.unwrap();
        assert!(second.is_some());

        assert_eq!(wrapper.provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(wrapper.budget.used(BudgetKind::Enrich), 1);
    }

    #[tokio::test]
    async fn exhausted_enrich_budget_returns_none() {
        let wrapper = metered(0);
        assert!(wrapper.enrich("Acme Corp", None).await.unwrap().is_none());
        assert_eq!(wrapper.provider.calls.load(Ordering::SeqCst), 0);
    }
}
