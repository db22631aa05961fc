use thiserror::Error;

/// Error taxonomy for the crawl pipeline.
///
/// The driver treats every variant as item-scoped: the failing item is
/// logged and skipped, the crawl moves on. Only [`CrawlError::Connection`]
/// during startup is allowed to stop the process.
///
/// Missing markup elements are deliberately not here: the extractor
/// recovers them in place with empty defaults and reports them as
/// [`crate::extract::ExtractionIssue`]s instead of failing the item.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// No usable title anywhere for the item; persisting it would create a
    /// titleless post, so it is discarded before the store runs.
    #[error("no title found for item with slug '{slug}'")]
    MissingTitle { slug: String },

    /// Duplicate-key violation from a concurrent writer on a relationship
    /// or term insert. Expected under racing crawlers; swallowed by callers.
    #[error("duplicate key from concurrent writer")]
    StoreRace,

    /// Any other persistence failure. Logged at item granularity; partial
    /// writes already committed for the item are left in place.
    #[error("store operation failed: {0}")]
    StoreFatal(#[source] sqlx::Error),

    /// Could not reach the backing database.
    #[error("database connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    /// Page fetch failed; the item is skipped.
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },
}

impl CrawlError {
    /// Classify an sqlx error: unique-key violations become the expected
    /// [`CrawlError::StoreRace`], everything else is fatal for the item.
    pub fn from_store(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return CrawlError::StoreRace;
            }
        }
        CrawlError::StoreFatal(err)
    }
}

pub type Result<T> = std::result::Result<T, CrawlError>;
