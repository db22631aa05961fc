//! Core data model definitions shared across reelpress crates.

pub mod content;
pub mod slug;

pub use content::{
    ContentKind, ContentRecord, EpisodeRecord, ExtractedRecord,
    ExtractedSeason, FilmAttributes, MOVIE_TAXONOMIES, PostKind,
    SeasonRecord, TVSHOW_TAXONOMIES,
};
pub use slug::{format_slug, slugify};
