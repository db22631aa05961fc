//! Content records flowing through the crawl pipeline.
//!
//! [`ExtractedRecord`] is the raw, per-page extraction result; the mapper
//! normalizes it into a [`ContentRecord`], the canonical unit the store
//! consumes. One record may fan out into several posts (root title, seasons,
//! episodes) that share its title/slug prefixes.

use std::fmt;

use crate::slug::slugify;

/// Kind of crawled content at the catalog level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Movie,
    TvShow,
}

impl ContentKind {
    /// The `post_type` value root posts of this kind are stored under.
    pub fn post_type(&self) -> &'static str {
        PostKind::from(*self).post_type()
    }
}

/// Kind of a persisted post, including the derived season/episode variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
    Movie,
    TvShow,
    Season,
    Episode,
}

impl PostKind {
    /// The `post_type` column value for this kind.
    pub fn post_type(&self) -> &'static str {
        match self {
            PostKind::Movie => "movies",
            PostKind::TvShow => "tvshows",
            PostKind::Season => "seasons",
            PostKind::Episode => "episodes",
        }
    }
}

impl From<ContentKind> for PostKind {
    fn from(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Movie => PostKind::Movie,
            ContentKind::TvShow => PostKind::TvShow,
        }
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.post_type())
    }
}

/// Raw per-item extraction result. Ephemeral; never persisted as-is.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExtractedRecord {
    /// Title from the listing card or the detail page heading. Items without
    /// any usable title are discarded by the mapper.
    pub title: Option<String>,
    /// Last path segment of the detail URL. Stable across re-crawls of the
    /// same source item; the natural key for idempotency.
    pub slug: String,
    pub description: String,
    pub cover_url: String,
    pub trailer_id: String,
    /// Quality badge from the listing card (`HD`, `CAM`, ...).
    pub quality: String,
    /// Labeled facts from the detail page, in page order: `IMDB`, `Country`,
    /// `Casts`, `Production`, `Released`, `Genre`, `Quality`, ...
    pub extra_info: Vec<(String, String)>,
    /// TMDB id from the watch page, used to build player embeds.
    pub tmdb_id: Option<String>,
    /// Season label -> numbered episode titles. Empty for movies.
    pub seasons: Vec<ExtractedSeason>,
    pub kind: ContentKind,
}

/// One season block scraped from a detail page.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExtractedSeason {
    /// Free-form season heading, e.g. `Season 2` or `Specials`.
    pub label: String,
    /// `(episode_number, episode_title)` in page order.
    pub episodes: Vec<(String, String)>,
}

/// Normalized attributes built from the fixed extraction-key rename table.
///
/// Every field is a comma-joined term list (or a single value); absent means
/// the source page did not carry that fact.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FilmAttributes {
    pub imdb_rating: Option<String>,
    pub genres: Option<String>,
    pub cast: Option<String>,
    pub creator: Option<String>,
    pub director: Option<String>,
    pub country: Option<String>,
    pub year: Option<String>,
}

impl FilmAttributes {
    /// All present attributes as `(canonical_name, value)` pairs, in the
    /// canonical order the store writes them.
    pub fn canonical_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("imdbRating", self.imdb_rating.as_deref()),
            ("genres", self.genres.as_deref()),
            ("dtcast", self.cast.as_deref()),
            ("dtcreator", self.creator.as_deref()),
            ("dtdirector", self.director.as_deref()),
            ("country", self.country.as_deref()),
            ("dtyear", self.year.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }

    /// Look up a present attribute by its canonical name.
    pub fn get(&self, canonical: &str) -> Option<&str> {
        match canonical {
            "imdbRating" => self.imdb_rating.as_deref(),
            "genres" => self.genres.as_deref(),
            "dtcast" => self.cast.as_deref(),
            "dtcreator" => self.creator.as_deref(),
            "dtdirector" => self.director.as_deref(),
            "country" => self.country.as_deref(),
            "dtyear" => self.year.as_deref(),
            _ => None,
        }
    }
}

/// Taxonomies attached to movie root posts.
pub const MOVIE_TAXONOMIES: &[&str] = &["genres", "dtcast", "dtdirector", "dtyear"];

/// Taxonomies attached to TV-show root posts.
pub const TVSHOW_TAXONOMIES: &[&str] = &["genres", "dtcast", "dtcreator", "dtyear"];

/// Canonical unit of persistence: one crawled title, ready for the store.
///
/// Immutable once built. The store derives the root post from it directly
/// and season/episode posts via [`ContentRecord::season_title`] and friends.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ContentRecord {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub cover_url: String,
    pub trailer_id: String,
    pub quality: String,
    pub kind: ContentKind,
    pub tmdb_id: Option<String>,
    pub attributes: FilmAttributes,
    pub seasons: Vec<SeasonRecord>,
}

/// One season of a [`ContentRecord`], with its normalized number.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SeasonRecord {
    /// Season number as a decimal string; `"1"` when the label carried none.
    pub number: String,
    /// Original season heading, kept for diagnostics.
    pub label: String,
    pub episodes: Vec<EpisodeRecord>,
}

/// One episode of a [`SeasonRecord`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EpisodeRecord {
    pub number: String,
    pub title: String,
}

impl ContentRecord {
    /// Taxonomy terms for the root post: the per-kind taxonomy set, filtered
    /// down to attributes the source actually carried.
    pub fn taxonomy_terms(&self) -> Vec<(&'static str, &str)> {
        let taxonomies = match self.kind {
            ContentKind::Movie => MOVIE_TAXONOMIES,
            ContentKind::TvShow => TVSHOW_TAXONOMIES,
        };
        taxonomies
            .iter()
            .filter_map(|taxonomy| {
                self.attributes
                    .get(taxonomy)
                    .filter(|v| !v.is_empty())
                    .map(|v| (*taxonomy, v))
            })
            .collect()
    }

    /// Display title of a season post: `<title>: Season <n>`.
    pub fn season_title(&self, season: &SeasonRecord) -> String {
        format!("{}: Season {}", self.title, season.number)
    }

    /// Slug of a season post, derived from the root slug so re-crawls land
    /// on the same natural key.
    pub fn season_slug(&self, season: &SeasonRecord) -> String {
        slugify(&format!("{}: Season {}", self.slug, season.number))
    }

    /// Display title of an episode post: `<title> <season>x<episode>`.
    pub fn episode_title(&self, season: &SeasonRecord, episode: &EpisodeRecord) -> String {
        format!("{} {}x{}", self.title, season.number, episode.number)
    }

    /// Slug of an episode post.
    pub fn episode_slug(&self, season: &SeasonRecord, episode: &EpisodeRecord) -> String {
        slugify(&format!("{} {}x{}", self.slug, season.number, episode.number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: ContentKind) -> ContentRecord {
        ContentRecord {
            title: "Breaking Point".into(),
            slug: "breaking-point-39201".into(),
            description: String::new(),
            cover_url: String::new(),
            trailer_id: String::new(),
            quality: "HD".into(),
            kind,
            tmdb_id: None,
            attributes: FilmAttributes {
                genres: Some("Action, Drama".into()),
                creator: Some("Jane Doe".into()),
                director: Some("Jane Doe".into()),
                country: Some("USA".into()),
                ..FilmAttributes::default()
            },
            seasons: Vec::new(),
        }
    }

    #[test]
    fn movie_taxonomies_pick_director_not_creator() {
        let terms = record(ContentKind::Movie).taxonomy_terms();
        assert!(terms.contains(&("dtdirector", "Jane Doe")));
        assert!(!terms.iter().any(|(t, _)| *t == "dtcreator"));
        // country is metadata, never a taxonomy
        assert!(!terms.iter().any(|(t, _)| *t == "country"));
    }

    #[test]
    fn tvshow_taxonomies_pick_creator_not_director() {
        let terms = record(ContentKind::TvShow).taxonomy_terms();
        assert!(terms.contains(&("dtcreator", "Jane Doe")));
        assert!(!terms.iter().any(|(t, _)| *t == "dtdirector"));
    }

    #[test]
    fn absent_attributes_are_skipped() {
        let mut rec = record(ContentKind::Movie);
        rec.attributes.genres = None;
        let terms = rec.taxonomy_terms();
        assert!(!terms.iter().any(|(t, _)| *t == "genres"));
    }

    #[test]
    fn season_and_episode_naming() {
        let rec = record(ContentKind::TvShow);
        let season = SeasonRecord {
            number: "2".into(),
            label: "Season 2".into(),
            episodes: Vec::new(),
        };
        let episode = EpisodeRecord {
            number: "4".into(),
            title: "The Long Fall".into(),
        };

        assert_eq!(rec.season_title(&season), "Breaking Point: Season 2");
        assert_eq!(rec.season_slug(&season), "breaking-point-39201-season-2");
        assert_eq!(rec.episode_title(&season, &episode), "Breaking Point 2x4");
        assert_eq!(
            rec.episode_slug(&season, &episode),
            "breaking-point-39201-2x4"
        );
    }
}
