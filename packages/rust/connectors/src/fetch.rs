//! Page fetch provider.
//!
//! Plain reqwest GET with bounded redirects, returning the raw HTML plus
//! a whitespace-collapsed plain-text extraction for the signal detectors.

use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

use orgscout_shared::{OrgScoutError, Result};

use crate::traits::{FetchProvider, FetchedPage};

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("OrgScout/", env!("CARGO_PKG_VERSION"));

/// HTTP fetcher for candidate pages.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OrgScoutError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl FetchProvider for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| OrgScoutError::Transport(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OrgScoutError::Transport(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| OrgScoutError::Transport(format!("{url}: body read failed: {e}")))?;

        let extracted_text = extract_page_text(&body);
        debug!(bytes = body.len(), text_chars = extracted_text.len(), "page fetched");

        Ok(FetchedPage {
            status_code: status.as_u16(),
            raw_html: body,
            extracted_text,
        })
    }
}

/// Extract readable text from an HTML document: chrome and script/style
/// elements are dropped, then all remaining text is collapsed to single
/// spaces.
pub fn extract_page_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let chrome_sel =
        Selector::parse("nav, header, footer, aside, script, style, noscript").unwrap();

    let mut cleaned = html.to_string();
    for el in doc.select(&chrome_sel) {
        let outer = el.html();
        cleaned = cleaned.replace(&outer, "");
    }

    let doc = Html::parse_document(&cleaned);
    let body_sel = Selector::parse("body").unwrap();
    let raw: String = match doc.select(&body_sel).next() {
        Some(body) => body.text().collect::<Vec<_>>().join(" "),
        None => doc.root_element().text().collect::<Vec<_>>().join(" "),
    };

    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
