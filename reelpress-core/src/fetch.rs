//! Page-fetcher seam.
//!
//! The crawl pipeline only needs markup for a URL; how it is fetched
//! (client, headers, retries) lives behind this trait so tests and the
//! binary can supply their own implementations.

use async_trait::async_trait;

use crate::error::Result;

/// Fetch raw markup for a URL. Failures are item-scoped: the caller skips
/// the item and moves on, it never aborts the crawl.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}
