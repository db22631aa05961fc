//! HTTP implementation of the page-fetcher seam.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, CACHE_CONTROL, REFERER, USER_AGENT};

use reelpress_core::error::{CrawlError, Result};
use reelpress_core::PageFetcher;

/// Mobile-browser user agent; the source site serves the same markup but
/// is less eager to challenge it.
const USER_AGENT_VALUE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 14_0_1 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E150";

/// reqwest-backed [`PageFetcher`] with browser-like headers and a hard
/// per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(referer: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("vi-VN"));
        if let Ok(value) = HeaderValue::from_str(referer) {
            headers.insert(REFERER, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let fetch_err = |err: reqwest::Error| CrawlError::Fetch {
            url: url.to_string(),
            reason: err.to_string(),
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(fetch_err)?;
        response.text().await.map_err(fetch_err)
    }
}
