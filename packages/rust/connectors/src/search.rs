//! DuckDuckGo HTML search provider.
//!
//! Queries the `html.duckduckgo.com` endpoint and parses the result list
//! with `scraper`. Result links point at DuckDuckGo's redirect endpoint;
//! the real URL is unwrapped from the `uddg` query parameter.

use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use orgscout_shared::{OrgScoutError, Result};

use crate::traits::{SearchHit, SearchProvider};

const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

// The HTML endpoint serves an empty shell to obvious bot user agents.
const USER_AGENT: &str = "Mozilla/5.0 (compatible; OrgScout)";

/// Search provider backed by the DuckDuckGo HTML endpoint.
pub struct DuckDuckGoSearch {
    client: Client,
    endpoint: String,
}

impl DuckDuckGoSearch {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(3))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OrgScoutError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: SEARCH_ENDPOINT.to_string(),
        })
    }

    /// Point the provider at a test server instead of DuckDuckGo.
    #[cfg(test)]
    fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

impl SearchProvider for DuckDuckGoSearch {
    #[instrument(skip_all, fields(query = %query))]
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        site: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        let full_query = match site {
            Some(site) => format!("{query} site:{site}"),
            None => query.to_string(),
        };

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", full_query.as_str())])
            .send()
            .await
            .map_err(|e| OrgScoutError::Transport(format!("search: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OrgScoutError::Transport(format!("search: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| OrgScoutError::Transport(format!("search: body read failed: {e}")))?;

        let hits = parse_results(&body, max_results);
        debug!(hits = hits.len(), "search results parsed");
        Ok(hits)
    }
}

/// Parse the result list out of a DuckDuckGo HTML response.
fn parse_results(body: &str, max_results: usize) -> Vec<SearchHit> {
    let doc = Html::parse_document(body);
    let result_sel = Selector::parse("div.result").unwrap();
    let title_sel = Selector::parse("a.result__a").unwrap();
    let snippet_sel = Selector::parse(".result__snippet").unwrap();

    let mut hits = Vec::new();
    for result in doc.select(&result_sel) {
        if hits.len() >= max_results {
            break;
        }
        // Sponsored blocks reuse the result class with an --ad modifier.
        if result.value().classes().any(|c| c.contains("result--ad")) {
            continue;
        }

        let Some(anchor) = result.select(&title_sel).next() else {
            continue;
        };
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(url) = unwrap_redirect(href) else {
            continue;
        };

        let title = anchor.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            continue;
        }

        let snippet = result
            .select(&snippet_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        hits.push(SearchHit {
            title,
            url,
            snippet,
        });
    }
    hits
}

/// Unwrap a result href into the destination URL. Redirect links carry the
/// destination in the `uddg` parameter; plain links pass through.
fn unwrap_redirect(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    let parsed = Url::parse(&absolute).ok()?;

    if parsed.path().starts_with("/l/") {
        return parsed
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned());
    }
    Some(absolute)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r##"<html><body>
      <div class="result results_links web-result">
        <h2 class="result__title">
          <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fmercy.example%2Ftraining&amp;rut=abc">Mercy Health System - Epic Training</a>
        </h2>
        <a class="result__snippet" href="#">Virtual Epic go-live training program.</a>
      </div>
      <div class="result result--ad">
        <h2 class="result__title">
          <a class="result__a" href="https://ads.example/">Sponsored</a>
        </h2>
      </div>
      <div class="result results_links web-result">
        <h2 class="result__title">
          <a class="result__a" href="https://direct.example/page">Direct Result</a>
        </h2>
      </div>
    </body></html>"##;

    #[test]
    fn parses_results_and_unwraps_redirects() {
        let hits = parse_results(RESULTS_PAGE, 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Mercy Health System - Epic Training");
        assert_eq!(hits[0].url, "https://mercy.example/training");
        assert_eq!(hits[0].snippet, "Virtual Epic go-live training program.");
        assert_eq!(hits[1].url, "https://direct.example/page");
    }

    #[test]
    fn respects_max_results() {
        let hits = parse_results(RESULTS_PAGE, 1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn unwrap_redirect_passes_plain_urls_through() {
        assert_eq!(
            unwrap_redirect("https://example.com/a").as_deref(),
            Some("https://example.com/a")
        );
        assert_eq!(
            unwrap_redirect("//duckduckgo.com/l/?uddg=https%3A%2F%2Fx.example%2F&rut=1").as_deref(),
            Some("https://x.example/")
        );
        assert_eq!(unwrap_redirect("not a url"), None);
    }

    #[tokio::test]
    async fn search_against_mock_endpoint() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/html/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
            .mount(&server)
            .await;

        let provider = DuckDuckGoSearch::new(5)
            .unwrap()
            .with_endpoint(&format!("{}/html/", server.uri()));
        let hits = provider.search("epic training", 10, None).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn http_error_maps_to_transport() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = DuckDuckGoSearch::new(5)
            .unwrap()
            .with_endpoint(&format!("{}/html/", server.uri()));
        let err = provider.search("anything", 5, None).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
