//! The idempotent upsert engine over the WordPress schema.
//!
//! Every write here must be safe to repeat across re-crawls without
//! duplicating domain entities. The mechanism is resolve-or-create by
//! natural key (slug + post_type for posts, slug + taxonomy for terms)
//! rather than conflict-resolution upserts: no unique constraints are
//! assumed on the target schema, and the select-then-insert race window
//! between concurrent crawlers is an accepted property, not a bug.
//!
//! Statements commit independently; there are no transactions. A crash in
//! the middle of a multi-statement sequence leaves valid-but-incomplete
//! rows the next crawl pass completes or redoes.

mod film;
mod terms;

use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::Row as _;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{CrawlError, Result};
use crate::faillog::FailureLog;

pub use film::repeatable_fields;

/// Column order of the posts table. The target schema's reader relies on
/// this exact positional layout; do not reorder.
const POST_COLUMNS: &[&str] = &[
    "post_author",
    "post_date",
    "post_date_gmt",
    "post_content",
    "post_title",
    "post_excerpt",
    "post_status",
    "comment_status",
    "ping_status",
    "post_password",
    "post_name",
    "to_ping",
    "pinged",
    "post_modified",
    "post_modified_gmt",
    "post_content_filtered",
    "post_parent",
    "guid",
    "menu_order",
    "post_type",
    "post_mime_type",
    "comment_count",
];

/// Store handle: connection pool plus the schema/site knobs the write
/// paths need. Cheap to clone; passed explicitly to whoever persists.
#[derive(Debug, Clone)]
pub struct WordpressStore {
    pool: MySqlPool,
    prefix: String,
    embed_base: String,
    iframe_template: String,
    episode_cover: bool,
    meta_write_delay: Duration,
    faillog: FailureLog,
}

impl WordpressStore {
    /// Connect to the target database, retrying transient failures with a
    /// fixed backoff before giving up. A store that cannot come up at all
    /// is a configuration problem and surfaces as [`CrawlError::Connection`].
    pub async fn connect(config: &Config, faillog: FailureLog) -> Result<Self> {
        let options = || {
            MySqlPoolOptions::new()
                .max_connections(4)
                .acquire_timeout(Duration::from_secs(30))
        };

        let mut attempt = 1u32;
        let pool = loop {
            match options().connect(&config.database_url).await {
                Ok(pool) => break pool,
                Err(err) if attempt < config.db_connect_attempts => {
                    warn!(attempt, %err, "database connection failed; retrying");
                    tokio::time::sleep(Duration::from_secs(config.db_connect_backoff_secs))
                        .await;
                    attempt += 1;
                }
                Err(err) => return Err(CrawlError::Connection(err)),
            }
        };

        info!(prefix = %config.table_prefix, "connected to content database");

        Ok(Self {
            pool,
            prefix: config.table_prefix.clone(),
            embed_base: config.embed_base.clone(),
            iframe_template: config.iframe_template.clone(),
            episode_cover: config.episode_cover,
            meta_write_delay: Duration::from_millis(config.meta_write_delay_ms),
            faillog,
        })
    }

    fn table(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Look up a post id by its natural key.
    pub async fn select_post_id(&self, slug: &str, post_type: &str) -> Result<Option<u64>> {
        let sql = format!(
            "SELECT ID FROM {} WHERE post_name = ? AND post_type = ?",
            self.table("posts")
        );
        let row = sqlx::query(&sql)
            .bind(slug)
            .bind(post_type)
            .fetch_optional(&self.pool)
            .await
            .map_err(CrawlError::from_store)?;
        Ok(row.map(|r| r.get::<u64, _>(0)))
    }

    /// Insert one post row and return its generated id.
    pub(crate) async fn insert_post(&self, row: &PostRow<'_>) -> Result<u64> {
        let sql = insert_post_sql(&self.prefix);
        let result = sqlx::query(&sql)
            .bind(0i64) // post_author
            .bind(row.date())
            .bind(row.date_gmt())
            .bind(row.content)
            .bind(row.title)
            .bind("") // post_excerpt
            .bind("publish")
            .bind("open") // comment_status
            .bind("open") // ping_status
            .bind("") // post_password
            .bind(row.slug)
            .bind("") // to_ping
            .bind("") // pinged
            .bind(row.date())
            .bind(row.date_gmt())
            .bind("") // post_content_filtered
            .bind(0i64) // post_parent
            .bind("") // guid
            .bind(0i64) // menu_order
            .bind(row.post_type)
            .bind("") // post_mime_type
            .bind(0i64) // comment_count
            .execute(&self.pool)
            .await
            .map_err(CrawlError::from_store)?;
        Ok(result.last_insert_id())
    }

    /// Write metadata rows one statement at a time, pausing between rows so
    /// a live site sharing the database stays responsive.
    pub(crate) async fn insert_postmeta(&self, rows: &[(u64, String, String)]) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (post_id, meta_key, meta_value) VALUES (?, ?, ?)",
            self.table("postmeta")
        );
        for (post_id, key, value) in rows {
            sqlx::query(&sql)
                .bind(post_id)
                .bind(key)
                .bind(value)
                .execute(&self.pool)
                .await
                .map_err(CrawlError::from_store)?;
            tokio::time::sleep(self.meta_write_delay).await;
        }
        Ok(())
    }

    /// Monotonic high-watermark for a season's observed episode count.
    ///
    /// Partial page loads can under-report episodes; the recorded total only
    /// ever rises. Read, compare, then conditionally write - never an
    /// unconditional overwrite.
    pub async fn update_season_episode_count(
        &self,
        season_post_id: u64,
        observed: u64,
    ) -> Result<()> {
        let select = format!(
            "SELECT meta_value FROM {} WHERE post_id = ? AND meta_key = 'number_of_episodes'",
            self.table("postmeta")
        );
        let row = sqlx::query(&select)
            .bind(season_post_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(CrawlError::from_store)?;

        match row {
            None => {
                self.insert_postmeta(&[(
                    season_post_id,
                    "number_of_episodes".to_string(),
                    observed.to_string(),
                )])
                .await
            }
            Some(row) => {
                let stored: u64 = row
                    .get::<String, _>(0)
                    .parse()
                    .unwrap_or(0);
                if stored < observed {
                    let update = format!(
                        "UPDATE {} SET meta_value = ? \
                         WHERE post_id = ? AND meta_key = 'number_of_episodes'",
                        self.table("postmeta")
                    );
                    sqlx::query(&update)
                        .bind(observed.to_string())
                        .bind(season_post_id)
                        .execute(&self.pool)
                        .await
                        .map_err(CrawlError::from_store)?;
                }
                Ok(())
            }
        }
    }
}

/// Resolve-or-create by natural key: run `find`; on a miss run `create`,
/// which must leave the row in place. Returns the identity either way plus
/// whether this call created it.
///
/// At most one logical duplicate per non-racing caller; concurrent callers
/// can both miss and both insert (see module docs).
pub(crate) async fn resolve_or_create<T, F, FFut, C, CFut>(find: F, create: C) -> Result<(T, bool)>
where
    F: Fn() -> FFut,
    FFut: std::future::Future<Output = Result<Option<T>>>,
    C: FnOnce() -> CFut,
    CFut: std::future::Future<Output = Result<T>>,
{
    if let Some(existing) = find().await? {
        return Ok((existing, false));
    }
    let created = create().await?;
    Ok((created, true))
}

/// One pending posts row. Timestamps are pinned at construction so the
/// date and modified columns agree.
#[derive(Debug)]
pub(crate) struct PostRow<'a> {
    pub title: &'a str,
    pub slug: &'a str,
    pub content: &'a str,
    pub post_type: &'a str,
    stamp: DateTime<Local>,
}

impl<'a> PostRow<'a> {
    pub fn new(title: &'a str, slug: &'a str, content: &'a str, post_type: &'a str) -> Self {
        Self {
            title,
            slug,
            content,
            post_type,
            stamp: timeupdate(),
        }
    }

    fn date(&self) -> String {
        self.stamp.format("%Y/%m/%d %H:%M:%S").to_string()
    }

    fn date_gmt(&self) -> String {
        (self.stamp - TimeDelta::hours(2))
            .format("%Y/%m/%d %H:%M:%S")
            .to_string()
    }

    /// Value of the `_edit_lock` metadata row for this post.
    pub fn edit_lock(&self) -> String {
        format!("{}:1", self.stamp.timestamp())
    }
}

/// Publication clock: the source site runs seven hours behind this host.
fn timeupdate() -> DateTime<Local> {
    Local::now() - TimeDelta::hours(7)
}

fn insert_post_sql(prefix: &str) -> String {
    let placeholders = vec!["?"; POST_COLUMNS.len()].join(", ");
    format!(
        "INSERT INTO {prefix}posts ({}) VALUES ({placeholders})",
        POST_COLUMNS.join(", ")
    )
}
