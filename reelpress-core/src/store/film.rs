//! Post resolution for crawled titles: root posts, their season and
//! episode variants, and the attached metadata.

use tracing::info;

use reelpress_model::{ContentKind, ContentRecord, PostKind, SeasonRecord};

use crate::error::Result;
use crate::php::PhpValue;

use super::{resolve_or_create, PostRow, WordpressStore};

/// Encode a player list the target theme can `unserialize()`: an ordered
/// integer-keyed map of `{name, select, idioma, url}` records, with each
/// link pushed through the embed template.
pub fn repeatable_fields(iframe_template: &str, links: &[String]) -> String {
    let entries = links
        .iter()
        .enumerate()
        .map(|(i, link)| {
            (
                PhpValue::Int(i as i64),
                PhpValue::Array(vec![
                    (
                        PhpValue::Str("name".into()),
                        PhpValue::Str(format!("Server {i}")),
                    ),
                    (
                        PhpValue::Str("select".into()),
                        PhpValue::Str("dtshcode".into()),
                    ),
                    (PhpValue::Str("idioma".into()), PhpValue::Str(String::new())),
                    (
                        PhpValue::Str("url".into()),
                        PhpValue::Str(iframe_template.replace("{}", link)),
                    ),
                ]),
            )
        })
        .collect();
    PhpValue::Array(entries).serialize()
}

impl WordpressStore {
    /// Persist one content record: the root post, and for shows every
    /// season and episode variant. Safe to call repeatedly; existing posts
    /// are matched by natural key and left untouched.
    pub async fn store_content(&self, record: &ContentRecord) -> Result<()> {
        let (root_id, was_created) = self.resolve_root_post(record).await?;

        match record.kind {
            ContentKind::Movie => {
                // enrich exactly once; a found post already has its details
                if was_created {
                    self.insert_movie_details(root_id, record).await?;
                }
            }
            ContentKind::TvShow => {
                for season in &record.seasons {
                    let season_id = self.resolve_season(record, season, root_id).await?;
                    self.resolve_episodes(record, season, root_id).await?;

                    let observed = season.episodes.len() as u64;
                    if let Err(err) = self
                        .update_season_episode_count(season_id, observed)
                        .await
                    {
                        self.faillog.log(
                            "store.season_episode_count",
                            &format!(
                                "season post {season_id} ({} episodes observed): {err}",
                                observed
                            ),
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// Resolve the root post by (slug, post_type). A hit returns the
    /// existing id with nothing rewritten: create-once, enrich-once.
    pub async fn resolve_root_post(&self, record: &ContentRecord) -> Result<(u64, bool)> {
        let post_type = record.kind.post_type();
        resolve_or_create(
            || self.select_post_id(&record.slug, post_type),
            || self.insert_root_post(record),
        )
        .await
    }

    async fn insert_root_post(&self, record: &ContentRecord) -> Result<u64> {
        info!(title = %record.title, kind = %record.kind.post_type(), "inserting root post");

        let row = PostRow::new(
            &record.title,
            &record.slug,
            &record.description,
            record.kind.post_type(),
        );
        let post_id = self.insert_post(&row).await?;

        let mut meta = vec![
            (post_id, "youtube_id".into(), format!("[{}]", record.trailer_id)),
            (post_id, "dt_poster".into(), record.cover_url.clone()),
            (post_id, "dt_backdrop".into(), record.cover_url.clone()),
            (post_id, "original_name".into(), record.title.clone()),
            (post_id, "_edit_last".into(), "1".into()),
            (post_id, "_edit_lock".into(), row.edit_lock()),
        ];
        if record.kind == ContentKind::TvShow {
            meta.push((post_id, "ids".into(), post_id.to_string()));
            meta.push((post_id, "clgnrt".into(), "1".into()));
            if let Some(rating) = &record.attributes.imdb_rating {
                meta.push((post_id, "imdbRating".into(), rating.clone()));
            }
        }
        self.insert_postmeta(&meta).await?;

        for (taxonomy, terms) in record.taxonomy_terms() {
            self.resolve_terms(post_id, terms, taxonomy).await?;
        }

        Ok(post_id)
    }

    /// Players and country for a freshly created movie post. Skipped
    /// entirely when the watch page carried no TMDB id to build links from.
    async fn insert_movie_details(&self, post_id: u64, record: &ContentRecord) -> Result<()> {
        let Some(tmdb_id) = record.tmdb_id.as_deref() else {
            return Ok(());
        };

        info!(title = %record.title, "inserting movie players");

        let links = vec![format!("{}/movie?id={tmdb_id}", self.embed_base)];
        let mut meta = vec![(
            post_id,
            "repeatable_fields".to_string(),
            repeatable_fields(&self.iframe_template, &links),
        )];
        if let Some(country) = &record.attributes.country {
            meta.push((post_id, "Country".into(), country.clone()));
        }
        self.insert_postmeta(&meta).await
    }

    /// Resolve one season post, creating it with its back-reference
    /// metadata on a miss. Returns the season post id.
    pub async fn resolve_season(
        &self,
        record: &ContentRecord,
        season: &SeasonRecord,
        root_id: u64,
    ) -> Result<u64> {
        let slug = record.season_slug(season);
        let (season_id, _created) = resolve_or_create(
            || self.select_post_id(&slug, PostKind::Season.post_type()),
            || async {
                let title = record.season_title(season);
                info!(%title, "inserting season");

                let row = PostRow::new(
                    &title,
                    &slug,
                    &record.description,
                    PostKind::Season.post_type(),
                );
                let season_id = self.insert_post(&row).await?;

                self.insert_postmeta(&[
                    (season_id, "temporada".into(), season.number.clone()),
                    (season_id, "serie".into(), record.title.clone()),
                    (season_id, "dt_poster".into(), record.cover_url.clone()),
                    (season_id, "ids".into(), root_id.to_string()),
                    (season_id, "clgnrt".into(), "1".into()),
                    (season_id, "_edit_last".into(), "1".into()),
                    (season_id, "_edit_lock".into(), row.edit_lock()),
                ])
                .await?;

                Ok(season_id)
            },
        )
        .await?;

        Ok(season_id)
    }

    /// Resolve every episode of one season, creating missing episode posts
    /// with their players and back-references.
    pub async fn resolve_episodes(
        &self,
        record: &ContentRecord,
        season: &SeasonRecord,
        root_id: u64,
    ) -> Result<()> {
        let tmdb_id = record.tmdb_id.as_deref().unwrap_or("0");

        for episode in &season.episodes {
            let slug = record.episode_slug(season, episode);
            if self
                .select_post_id(&slug, PostKind::Episode.post_type())
                .await?
                .is_some()
            {
                continue;
            }

            let title = record.episode_title(season, episode);
            info!(%title, "inserting episode");

            let row = PostRow::new(&title, &slug, "", PostKind::Episode.post_type());
            let episode_id = self.insert_post(&row).await?;

            let links = vec![format!(
                "{}/tv?id={tmdb_id}&s={}&e={}",
                self.embed_base, season.number, episode.number
            )];
            let mut meta = vec![
                (episode_id, "temporada".into(), season.number.clone()),
                (episode_id, "episodio".into(), episode.number.clone()),
                (episode_id, "serie".into(), record.title.clone()),
                (episode_id, "episode_name".into(), episode.title.clone()),
                (episode_id, "ids".into(), root_id.to_string()),
                (episode_id, "clgnrt".into(), "1".into()),
                (
                    episode_id,
                    "repeatable_fields".into(),
                    repeatable_fields(&self.iframe_template, &links),
                ),
                (episode_id, "_edit_last".into(), "1".into()),
                (episode_id, "_edit_lock".into(), row.edit_lock()),
            ];
            if self.episode_cover {
                meta.push((episode_id, "dt_backdrop".into(), record.cover_url.clone()));
            }
            self.insert_postmeta(&meta).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::php::PhpValue;

    #[test]
    fn repeatable_fields_round_trips_through_the_codec() {
        let serialized = repeatable_fields("{}", &["https://x".to_string()]);
        assert_eq!(
            serialized,
            r#"a:1:{i:0;a:4:{s:4:"name";s:8:"Server 0";s:6:"select";s:8:"dtshcode";s:6:"idioma";s:0:"";s:3:"url";s:9:"https://x";}}"#
        );

        let parsed = PhpValue::parse(&serialized).unwrap();
        let PhpValue::Array(entries) = parsed else {
            panic!("expected array");
        };
        assert_eq!(entries[0].0, PhpValue::Int(0));
    }

    #[test]
    fn repeatable_fields_applies_the_embed_template() {
        let serialized = repeatable_fields(
            r#"<iframe src="{}"></iframe>"#,
            &["https://e/1".to_string(), "https://e/2".to_string()],
        );
        assert!(serialized.starts_with("a:2:{"));
        assert!(serialized.contains(r#"<iframe src="https://e/1"></iframe>"#));
        assert!(serialized.contains("Server 1"));
    }
}
