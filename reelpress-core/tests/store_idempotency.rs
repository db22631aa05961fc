//! Idempotency coverage for the store's resolve-or-create paths.
//!
//! These tests need a MySQL database; point `TEST_DATABASE_URL` at an empty
//! schema and drop the `#[ignore]` filter:
//!
//! ```text
//! TEST_DATABASE_URL=mysql://root@localhost/reelpress_test \
//!     cargo test -p reelpress-core -- --ignored
//! ```

use std::path::PathBuf;

use sqlx::mysql::MySqlPool;
use sqlx::Row as _;

use reelpress_core::{Config, FailureLog, WordpressStore};
use reelpress_model::{
    ContentKind, ContentRecord, EpisodeRecord, FilmAttributes, SeasonRecord,
};

fn test_database_url() -> String {
    std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set for store tests")
}

fn test_config() -> Config {
    Config {
        database_url: test_database_url(),
        table_prefix: "wp_".into(),
        db_connect_attempts: 1,
        db_connect_backoff_secs: 0,
        homepage: "https://example.org".into(),
        movies_path: "/movie".into(),
        tvshows_path: "/tv-show".into(),
        movies_last_page: 1,
        tvshows_last_page: 1,
        embed_base: "https://embed.example.org/tmdb".into(),
        iframe_template: "{}".into(),
        episode_cover: false,
        page_pause_secs: 0,
        meta_write_delay_ms: 0,
        log_dir: std::env::temp_dir().join("reelpress-test-logs"),
    }
}

async fn setup() -> (WordpressStore, MySqlPool) {
    let config = test_config();
    let pool = MySqlPool::connect(&config.database_url)
        .await
        .expect("connect to test database");
    create_schema(&pool).await;

    let faillog = FailureLog::new(config.log_dir.as_path());
    let store = WordpressStore::connect(&config, faillog)
        .await
        .expect("store connect");
    (store, pool)
}

async fn create_schema(pool: &MySqlPool) {
    let statements = [
        "CREATE TABLE IF NOT EXISTS wp_posts (
            ID BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
            post_author BIGINT UNSIGNED NOT NULL DEFAULT 0,
            post_date DATETIME NOT NULL,
            post_date_gmt DATETIME NOT NULL,
            post_content LONGTEXT NOT NULL,
            post_title TEXT NOT NULL,
            post_excerpt TEXT NOT NULL,
            post_status VARCHAR(20) NOT NULL DEFAULT 'publish',
            comment_status VARCHAR(20) NOT NULL DEFAULT 'open',
            ping_status VARCHAR(20) NOT NULL DEFAULT 'open',
            post_password VARCHAR(255) NOT NULL DEFAULT '',
            post_name VARCHAR(200) NOT NULL DEFAULT '',
            to_ping TEXT NOT NULL,
            pinged TEXT NOT NULL,
            post_modified DATETIME NOT NULL,
            post_modified_gmt DATETIME NOT NULL,
            post_content_filtered LONGTEXT NOT NULL,
            post_parent BIGINT UNSIGNED NOT NULL DEFAULT 0,
            guid VARCHAR(255) NOT NULL DEFAULT '',
            menu_order INT NOT NULL DEFAULT 0,
            post_type VARCHAR(20) NOT NULL DEFAULT 'post',
            post_mime_type VARCHAR(100) NOT NULL DEFAULT '',
            comment_count BIGINT NOT NULL DEFAULT 0
        )",
        "CREATE TABLE IF NOT EXISTS wp_postmeta (
            meta_id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
            post_id BIGINT UNSIGNED NOT NULL DEFAULT 0,
            meta_key VARCHAR(255) DEFAULT NULL,
            meta_value LONGTEXT
        )",
        "CREATE TABLE IF NOT EXISTS wp_terms (
            term_id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
            name VARCHAR(200) NOT NULL DEFAULT '',
            slug VARCHAR(200) NOT NULL DEFAULT '',
            term_group BIGINT NOT NULL DEFAULT 0
        )",
        "CREATE TABLE IF NOT EXISTS wp_term_taxonomy (
            term_taxonomy_id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
            term_id BIGINT UNSIGNED NOT NULL DEFAULT 0,
            taxonomy VARCHAR(32) NOT NULL DEFAULT '',
            description LONGTEXT NOT NULL,
            parent BIGINT UNSIGNED NOT NULL DEFAULT 0,
            count BIGINT NOT NULL DEFAULT 0
        )",
        "CREATE TABLE IF NOT EXISTS wp_term_relationships (
            object_id BIGINT UNSIGNED NOT NULL DEFAULT 0,
            term_taxonomy_id BIGINT UNSIGNED NOT NULL DEFAULT 0,
            term_order INT NOT NULL DEFAULT 0,
            PRIMARY KEY (object_id, term_taxonomy_id)
        )",
    ];
    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .expect("create table");
    }
}

async fn count(pool: &MySqlPool, sql: &str, binds: &[&str]) -> i64 {
    let mut query = sqlx::query(sql);
    for bind in binds {
        query = query.bind(*bind);
    }
    query
        .fetch_one(pool)
        .await
        .expect("count query")
        .get::<i64, _>(0)
}

fn movie(slug: &str) -> ContentRecord {
    ContentRecord {
        title: "Broken Arrow".into(),
        slug: slug.into(),
        description: "A bomber goes down.".into(),
        cover_url: "https://img.example.org/ba.jpg".into(),
        trailer_id: "q1w2e3".into(),
        quality: "HD".into(),
        kind: ContentKind::Movie,
        tmdb_id: Some("861".into()),
        attributes: FilmAttributes {
            imdb_rating: Some("6.1".into()),
            genres: Some("Action, Thriller".into()),
            country: Some("USA".into()),
            ..FilmAttributes::default()
        },
        seasons: Vec::new(),
    }
}

fn show(slug: &str) -> ContentRecord {
    ContentRecord {
        title: "The Long Watch".into(),
        slug: slug.into(),
        description: "A lighthouse keeper refuses to leave.".into(),
        cover_url: "https://img.example.org/tlw.jpg".into(),
        trailer_id: "z9y8x7".into(),
        quality: "HD".into(),
        kind: ContentKind::TvShow,
        tmdb_id: Some("4821".into()),
        // attributes derive from the slug so concurrently running tests
        // never race on the same taxonomy terms
        attributes: FilmAttributes {
            genres: Some(format!("{slug} genre")),
            creator: Some(format!("{slug} creator")),
            director: Some(format!("{slug} creator")),
            ..FilmAttributes::default()
        },
        seasons: vec![SeasonRecord {
            number: "1".into(),
            label: "Season 1".into(),
            episodes: vec![
                EpisodeRecord {
                    number: "1".into(),
                    title: "First Light".into(),
                },
                EpisodeRecord {
                    number: "2".into(),
                    title: "Undertow".into(),
                },
            ],
        }],
    }
}

#[tokio::test]
#[ignore = "needs a MySQL database; set TEST_DATABASE_URL"]
async fn root_post_resolution_is_idempotent() {
    let (store, pool) = setup().await;
    let record = movie("idem-root-movie");

    let (first_id, created) = store.resolve_root_post(&record).await.unwrap();
    assert!(created);

    let (second_id, created_again) = store.resolve_root_post(&record).await.unwrap();
    assert_eq!(first_id, second_id);
    assert!(!created_again);

    let posts = count(
        &pool,
        "SELECT COUNT(*) FROM wp_posts WHERE post_name = ? AND post_type = ?",
        &["idem-root-movie", "movies"],
    )
    .await;
    assert_eq!(posts, 1);
}

#[tokio::test]
#[ignore = "needs a MySQL database; set TEST_DATABASE_URL"]
async fn term_resolution_is_idempotent() {
    let (store, pool) = setup().await;
    let (post_id, _) = store
        .resolve_root_post(&movie("idem-term-movie"))
        .await
        .unwrap();

    for _ in 0..3 {
        store
            .resolve_term(post_id, "Slow Cinema", "genres")
            .await
            .unwrap();
    }

    let terms = count(
        &pool,
        "SELECT COUNT(*) FROM wp_terms WHERE slug = ?",
        &["slow-cinema"],
    )
    .await;
    assert_eq!(terms, 1);

    let relationships = count(
        &pool,
        "SELECT COUNT(*) FROM wp_term_relationships tr, wp_term_taxonomy tt, wp_terms t \
         WHERE tr.term_taxonomy_id = tt.term_taxonomy_id \
         AND tt.term_id = t.term_id AND t.slug = ? AND tr.object_id = ?",
        &["slow-cinema", &post_id.to_string()],
    )
    .await;
    assert_eq!(relationships, 1);
}

#[tokio::test]
#[ignore = "needs a MySQL database; set TEST_DATABASE_URL"]
async fn episode_count_watermark_only_rises() {
    let (store, pool) = setup().await;
    let record = show("idem-watermark-show");
    let (root_id, _) = store.resolve_root_post(&record).await.unwrap();
    let season_id = store
        .resolve_season(&record, &record.seasons[0], root_id)
        .await
        .unwrap();

    for observed in [5u64, 3, 8, 2] {
        store
            .update_season_episode_count(season_id, observed)
            .await
            .unwrap();
    }

    let row = sqlx::query(
        "SELECT meta_value FROM wp_postmeta \
         WHERE post_id = ? AND meta_key = 'number_of_episodes'",
    )
    .bind(season_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(row.get::<String, _>(0), "8");

    let rows = count(
        &pool,
        "SELECT COUNT(*) FROM wp_postmeta \
         WHERE post_id = ? AND meta_key = 'number_of_episodes'",
        &[&season_id.to_string()],
    )
    .await;
    assert_eq!(rows, 1);
}

#[tokio::test]
#[ignore = "needs a MySQL database; set TEST_DATABASE_URL"]
async fn double_run_changes_no_row_counts() {
    let (store, pool) = setup().await;
    let record = show("idem-double-run-show");

    // every count is scoped to this record's slug family and terms so the
    // other tests can run against the same schema concurrently
    const FAMILY_POSTS: &str = "SELECT COUNT(*) FROM wp_posts WHERE post_name LIKE ?";
    const FAMILY_META: &str = "SELECT COUNT(*) FROM wp_postmeta WHERE post_id IN \
         (SELECT ID FROM wp_posts WHERE post_name LIKE ?)";
    const FAMILY_TERMS: &str = "SELECT COUNT(*) FROM wp_terms \
         WHERE slug IN ('idem-double-run-show-genre', 'idem-double-run-show-creator')";
    const FAMILY_RELATIONSHIPS: &str =
        "SELECT COUNT(*) FROM wp_term_relationships tr \
         WHERE tr.object_id IN (SELECT ID FROM wp_posts WHERE post_name LIKE ?)";
    let family = "idem-double-run-show%";

    store.store_content(&record).await.unwrap();
    let posts_after_first = count(&pool, FAMILY_POSTS, &[family]).await;
    let meta_after_first = count(&pool, FAMILY_META, &[family]).await;
    let terms_after_first = count(&pool, FAMILY_TERMS, &[]).await;
    let relationships_after_first = count(&pool, FAMILY_RELATIONSHIPS, &[family]).await;

    // one root + one season + two episodes
    assert_eq!(posts_after_first, 4);

    store.store_content(&record).await.unwrap();
    assert_eq!(count(&pool, FAMILY_POSTS, &[family]).await, posts_after_first);
    assert_eq!(count(&pool, FAMILY_META, &[family]).await, meta_after_first);
    assert_eq!(count(&pool, FAMILY_TERMS, &[]).await, terms_after_first);
    assert_eq!(
        count(&pool, FAMILY_RELATIONSHIPS, &[family]).await,
        relationships_after_first
    );
}
