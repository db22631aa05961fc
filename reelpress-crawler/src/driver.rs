//! The crawl driver: catalog page loops and per-item orchestration.
//!
//! One item is fully fetched, extracted, mapped, and stored before the
//! next begins. Every per-item failure is logged to the failure logs and
//! skipped; the loops only stop when the process is terminated.

use std::time::Duration;

use tracing::{info, warn};

use reelpress_core::extract::{self, ListingItem};
use reelpress_core::map;
use reelpress_core::{Config, CrawlError, FailureLog, PageFetcher, Result, WordpressStore};
use reelpress_model::{ContentKind, ContentRecord};

/// Glue between the fetcher, the extraction/mapping pipeline, and the
/// store. Holds no crawl state beyond its collaborators.
pub struct Crawler<F> {
    fetcher: F,
    store: WordpressStore,
    config: Config,
    faillog: FailureLog,
}

impl<F: PageFetcher> Crawler<F> {
    pub fn new(fetcher: F, store: WordpressStore, config: Config, faillog: FailureLog) -> Self {
        Self {
            fetcher,
            store,
            config,
            faillog,
        }
    }

    /// Crawl catalog pages of `kind` forever, starting at `start_page` and
    /// wrapping back to page 2 once pages run dry past the configured last
    /// page. Page failures retry the same page after the pause.
    pub async fn run_catalog(&self, kind: ContentKind, start_page: u32) -> Result<()> {
        let mut page = start_page;
        loop {
            let url = self.config.catalog_url(kind, page);
            match self.crawl_page(&url, kind).await {
                Ok(0) if page >= self.config.last_page(kind) => {
                    info!(page, "catalog exhausted; wrapping around");
                    page = 2;
                }
                Ok(count) => {
                    info!(page, count, "crawled catalog page");
                    page += 1;
                }
                Err(err) => {
                    warn!(page, %err, "catalog page failed; will retry");
                    self.faillog
                        .log("crawler.page", &format!("{url}: {err}"));
                }
            }
            tokio::time::sleep(Duration::from_secs(self.config.page_pause_secs)).await;
        }
    }

    /// Crawl one listing page; returns the number of items attempted.
    pub async fn crawl_page(&self, url: &str, kind: ContentKind) -> Result<usize> {
        info!(%url, "crawling listing page");
        let html = self.fetcher.fetch(url).await?;
        let items = extract::parse_listing(&html, &self.config.homepage);

        for item in &items {
            if let Err(err) = self.crawl_item(item, kind).await {
                match &err {
                    CrawlError::MissingTitle { slug } => {
                        self.faillog.log(
                            "crawler.no_title",
                            &format!("no title for {slug}; href {}", item.href),
                        );
                    }
                    _ => {
                        self.faillog
                            .log("crawler.item", &format!("{}: {err}", item.href));
                    }
                }
                warn!(href = %item.href, %err, "item failed; skipping");
            }
        }

        Ok(items.len())
    }

    /// Fetch, extract, map, and store one item.
    async fn crawl_item(&self, item: &ListingItem, kind: ContentKind) -> Result<()> {
        let record = self.extract_item(item, kind).await?;
        self.store.store_content(&record).await
    }

    /// The storage-free front half of the pipeline.
    async fn extract_item(&self, item: &ListingItem, kind: ContentKind) -> Result<ContentRecord> {
        let html = self.fetcher.fetch(&item.href).await?;
        let (extracted, issues) = extract::parse_detail(&html, item, kind);
        for issue in issues {
            self.faillog.log(issue.category, &issue.message);
        }
        map::map_record(extracted)
    }
}
