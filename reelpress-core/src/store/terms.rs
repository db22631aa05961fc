//! Taxonomy term resolution.

use sqlx::Row as _;
use tracing::debug;

use reelpress_model::slugify;

use crate::error::{CrawlError, Result};

use super::{resolve_or_create, WordpressStore};

impl WordpressStore {
    /// Resolve a comma-joined term list under one taxonomy and relate every
    /// term to `post_id`.
    pub async fn resolve_terms(&self, post_id: u64, terms: &str, taxonomy: &str) -> Result<()> {
        for term in terms.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            self.resolve_term(post_id, term, taxonomy).await?;
        }
        Ok(())
    }

    /// Resolve one term by its natural key (slugified name, taxonomy),
    /// creating the terms + term_taxonomy pair on a miss, then attach it to
    /// the post.
    ///
    /// The two creation inserts are separate committed statements; a crash
    /// between them leaves an orphan terms row that a later pass simply does
    /// not match. The relationship insert is attempted unconditionally, and
    /// a duplicate-key failure means the post was already related - the
    /// expected outcome on re-crawls, not an error.
    pub async fn resolve_term(&self, post_id: u64, term: &str, taxonomy: &str) -> Result<u64> {
        let term_slug = slugify(term);

        let (term_taxonomy_id, created) = resolve_or_create(
            || self.select_term_taxonomy_id(&term_slug, taxonomy),
            || self.insert_term(term, taxonomy),
        )
        .await?;
        if created {
            debug!(term, taxonomy, "created taxonomy term");
        }

        let relate = format!(
            "INSERT INTO {} (object_id, term_taxonomy_id, term_order) VALUES (?, ?, 0)",
            self.table("term_relationships")
        );
        match sqlx::query(&relate)
            .bind(post_id)
            .bind(term_taxonomy_id)
            .execute(&self.pool)
            .await
        {
            Ok(_) => {}
            Err(err) => match CrawlError::from_store(err) {
                // already related; concurrent writers and re-crawls land here
                CrawlError::StoreRace => {}
                other => return Err(other),
            },
        }

        Ok(term_taxonomy_id)
    }

    async fn select_term_taxonomy_id(
        &self,
        term_slug: &str,
        taxonomy: &str,
    ) -> Result<Option<u64>> {
        let sql = format!(
            "SELECT tt.term_taxonomy_id FROM {} tt, {} t \
             WHERE t.slug = ? AND tt.term_id = t.term_id AND tt.taxonomy = ?",
            self.table("term_taxonomy"),
            self.table("terms")
        );
        let row = sqlx::query(&sql)
            .bind(term_slug)
            .bind(taxonomy)
            .fetch_optional(&self.pool)
            .await
            .map_err(CrawlError::from_store)?;
        Ok(row.map(|r| r.get::<u64, _>(0)))
    }

    async fn insert_term(&self, term: &str, taxonomy: &str) -> Result<u64> {
        let insert_term = format!(
            "INSERT INTO {} (name, slug, term_group) VALUES (?, ?, 0)",
            self.table("terms")
        );
        let term_id = sqlx::query(&insert_term)
            .bind(term)
            .bind(slugify(term))
            .execute(&self.pool)
            .await
            .map_err(CrawlError::from_store)?
            .last_insert_id();

        let insert_taxonomy = format!(
            "INSERT INTO {} (term_id, taxonomy, description, parent, count) \
             VALUES (?, ?, '', 0, 0)",
            self.table("term_taxonomy")
        );
        let term_taxonomy_id = sqlx::query(&insert_taxonomy)
            .bind(term_id)
            .bind(taxonomy)
            .execute(&self.pool)
            .await
            .map_err(CrawlError::from_store)?
            .last_insert_id();

        Ok(term_taxonomy_id)
    }
}
