//! HTTP clients for the scraping service and the alternate legal corpus.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::fetch::{CorpusLookup, CorpusStatute, FetchOptions, FetchedPage, PageFetcher, PageFormat};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

// ── Scraping service ──

/// Client for a Firecrawl-style `/v1/scrape` endpoint.
pub struct ScrapeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: &'a [PageFormat],
    only_main_content: bool,
    wait_for: u64,
}

#[derive(Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    data: Option<ScrapeData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeData {
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    raw_html: Option<String>,
    #[serde(default)]
    markdown: Option<String>,
}

impl From<ScrapeData> for FetchedPage {
    fn from(d: ScrapeData) -> Self {
        FetchedPage {
            html: d.raw_html.filter(|s| !s.is_empty()).or(d.html),
            markdown: d.markdown,
        }
    }
}

impl ScrapeClient {
    /// `base_url` like `https://api.firecrawl.dev` (no trailing slash).
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Scrape `url`, surfacing every failure.
    pub async fn scrape(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<FetchedPage, SyncError> {
        let endpoint = format!("{}/v1/scrape", self.base_url);
        let body = ScrapeRequest {
            url,
            formats: &options.formats,
            only_main_content: !options.full_page,
            wait_for: options.render_wait_ms,
        };

        info!(url, full_page = options.full_page, raw = options.wants_raw(), "fetching page");
        let mut req = self.client.post(&endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ScrapeResponse = serde_json::from_str(&resp.text().await?)?;
        Ok(parsed.data.map(FetchedPage::from).unwrap_or_default())
    }
}

#[async_trait]
impl PageFetcher for ScrapeClient {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> FetchedPage {
        match self.scrape(url, options).await {
            Ok(page) => page,
            Err(e) => {
                warn!(url, error = %e, "fetch failed");
                FetchedPage::default()
            }
        }
    }
}

// ── Alternate corpus ──

/// Client for a legal-corpus lookup endpoint (`GET {base}/statutes?name=`).
pub struct CorpusClient {
    client: reqwest::Client,
    base_url: String,
}

impl CorpusClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Look a statute up, surfacing every failure.
    pub async fn find(&self, statute: &str) -> Result<CorpusStatute, SyncError> {
        let url = format!("{}/statutes", self.base_url);
        info!(url = %url, statute, "querying alternate corpus");
        let resp = self.client.get(&url).query(&[("name", statute)]).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: CorpusStatute = serde_json::from_str(&resp.text().await?)?;
        info!(count = parsed.articles.len(), "corpus articles received");
        Ok(parsed)
    }
}

#[async_trait]
impl CorpusLookup for CorpusClient {
    async fn lookup(&self, statute: &str) -> Option<CorpusStatute> {
        match self.find(statute).await {
            Ok(s) if !s.articles.is_empty() => Some(s),
            Ok(_) => None,
            Err(e) => {
                warn!(statute, error = %e, "corpus lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_request_shape() {
        let opts = FetchOptions::raw_html(8000);
        let body = ScrapeRequest {
            url: "https://www.planalto.gov.br/l8078.htm",
            formats: &opts.formats,
            only_main_content: !opts.full_page,
            wait_for: opts.render_wait_ms,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["formats"], serde_json::json!(["rawHtml", "markdown"]));
        assert_eq!(json["onlyMainContent"], false);
        assert_eq!(json["waitFor"], 8000);
    }

    #[test]
    fn scrape_response_prefers_raw_html() {
        let parsed: ScrapeResponse = serde_json::from_str(
            r#"{"success": true, "data": {"html": "<p>a</p>", "rawHtml": "<html>b</html>", "markdown": "a"}}"#,
        )
        .unwrap();
        let page = FetchedPage::from(parsed.data.unwrap());
        assert_eq!(page.html.as_deref(), Some("<html>b</html>"));
        assert_eq!(page.markdown.as_deref(), Some("a"));
    }

    #[test]
    fn scrape_response_without_data() {
        let parsed: ScrapeResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(parsed.data.is_none());
    }

    #[test]
    fn new_trims_trailing_slash() {
        let c = ScrapeClient::new("http://localhost:3002/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(c.base_url, "http://localhost:3002");
        let c = CorpusClient::new("http://localhost:8080/", Duration::from_secs(5)).unwrap();
        assert_eq!(c.base_url, "http://localhost:8080");
    }
}
