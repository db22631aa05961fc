//! Environment-derived crawler configuration.
//!
//! Everything except `DATABASE_URL` and `SITE_HOMEPAGE` has a default, so a
//! `.env` file with those two entries is a complete setup. Override via
//! environment variables.

use std::path::PathBuf;

use thiserror::Error;

use reelpress_model::ContentKind;

/// Errors raised while assembling a [`Config`] from the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
}

/// Runtime configuration for the crawler and store.
#[derive(Debug, Clone)]
pub struct Config {
    /// MySQL connection string for the target WordPress database.
    pub database_url: String,
    /// Table-name prefix of the target schema, `wp_` on stock installs.
    pub table_prefix: String,
    /// Connection attempts before giving up at startup.
    pub db_connect_attempts: u32,
    /// Seconds between connection attempts.
    pub db_connect_backoff_secs: u64,

    /// Origin of the source site, scheme included, no trailing slash.
    pub homepage: String,
    /// Catalog path for movies, e.g. `/movie`.
    pub movies_path: String,
    /// Catalog path for TV shows, e.g. `/tv-show`.
    pub tvshows_path: String,
    /// Page the movies loop wraps around after.
    pub movies_last_page: u32,
    /// Page the TV-shows loop wraps around after.
    pub tvshows_last_page: u32,

    /// Base of the player-embed URLs built from TMDB ids.
    pub embed_base: String,
    /// Template wrapping an embed URL into the stored player markup; `{}`
    /// is replaced with the URL.
    pub iframe_template: String,
    /// Also attach the show cover to each episode post.
    pub episode_cover: bool,

    /// Pause between listing pages.
    pub page_pause_secs: u64,
    /// Pause between successive postmeta-row inserts for one item. Keeps a
    /// shared WordPress database responsive while a crawl is running.
    pub meta_write_delay_ms: u64,

    /// Directory the per-category failure logs are written under.
    pub log_dir: PathBuf,
}

impl Config {
    /// Assemble a configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: require("DATABASE_URL")?,
            table_prefix: var_or("TABLE_PREFIX", "wp_"),
            db_connect_attempts: parse_or("DB_CONNECT_ATTEMPTS", 5),
            db_connect_backoff_secs: parse_or("DB_CONNECT_BACKOFF_SECS", 3),
            homepage: require("SITE_HOMEPAGE")?,
            movies_path: var_or("SITE_MOVIES_PATH", "/movie"),
            tvshows_path: var_or("SITE_TVSHOWS_PATH", "/tv-show"),
            movies_last_page: parse_or("SITE_MOVIES_LAST_PAGE", 500),
            tvshows_last_page: parse_or("SITE_TVSHOWS_LAST_PAGE", 500),
            embed_base: var_or("EMBED_BASE", "https://www.2embed.to/embed/tmdb"),
            iframe_template: var_or(
                "IFRAME_TEMPLATE",
                r#"<iframe src="{}" frameborder="0" scrolling="no" allowfullscreen></iframe>"#,
            ),
            episode_cover: parse_or("EPISODE_COVER", false),
            page_pause_secs: parse_or("WAIT_BETWEEN_PAGES", 10),
            meta_write_delay_ms: parse_or("META_WRITE_DELAY_MS", 10),
            log_dir: PathBuf::from(var_or("LOG_DIR", "log")),
        })
    }

    /// Listing-page URL for one catalog page of the given kind.
    pub fn catalog_url(&self, kind: ContentKind, page: u32) -> String {
        let path = match kind {
            ContentKind::Movie => &self.movies_path,
            ContentKind::TvShow => &self.tvshows_path,
        };
        format!("{}{}?page={}", self.homepage, path, page)
    }

    /// Page the loop for `kind` wraps around after.
    pub fn last_page(&self, kind: ContentKind) -> u32 {
        match kind {
            ContentKind::Movie => self.movies_last_page,
            ContentKind::TvShow => self.tvshows_last_page,
        }
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_url_joins_path_and_page() {
        let mut config = Config {
            database_url: String::new(),
            table_prefix: "wp_".into(),
            db_connect_attempts: 5,
            db_connect_backoff_secs: 3,
            homepage: "https://example.org".into(),
            movies_path: "/movie".into(),
            tvshows_path: "/tv-show".into(),
            movies_last_page: 10,
            tvshows_last_page: 20,
            embed_base: String::new(),
            iframe_template: String::new(),
            episode_cover: false,
            page_pause_secs: 0,
            meta_write_delay_ms: 0,
            log_dir: PathBuf::from("log"),
        };
        assert_eq!(
            config.catalog_url(ContentKind::Movie, 3),
            "https://example.org/movie?page=3"
        );
        config.tvshows_path = "/series".into();
        assert_eq!(
            config.catalog_url(ContentKind::TvShow, 1),
            "https://example.org/series?page=1"
        );
        assert_eq!(config.last_page(ContentKind::TvShow), 20);
    }
}
