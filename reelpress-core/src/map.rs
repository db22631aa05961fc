//! Normalization of extracted records into canonical content records.
//!
//! The rename table below is the contract between the source site's labeled
//! facts and the canonical attribute names the store writes. Keys outside
//! the table are intentionally dropped; the drop is logged so new source
//! labels show up in debug output instead of disappearing silently.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use reelpress_model::{
    ContentRecord, EpisodeRecord, ExtractedRecord, FilmAttributes, SeasonRecord,
};

use crate::error::{CrawlError, Result};

/// Extraction label -> canonical attribute name. Fixed; extending it is a
/// deliberate schema decision, not a parsing tweak.
const KEY_MAPPING: &[(&str, &str)] = &[
    ("IMDB", "imdbRating"),
    ("Genre", "genres"),
    ("Casts", "dtcast"),
    ("Production", "dtcreator"),
    ("Country", "country"),
    ("Released", "dtyear"),
];

static SEASON_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"season\s+(\d+)").unwrap());

/// Pull the season number out of a free-form season label.
///
/// Labels without a `season <digits>` pattern (`Specials`, `Final Season`)
/// default to `"1"`: most single-season shows carry unlabeled or oddly
/// labeled season headers, and folding them onto season 1 is the expected
/// shape downstream.
pub fn season_number(label: &str) -> String {
    let folded = label.replace('\n', " ").to_lowercase();
    match SEASON_NUMBER.captures(&folded) {
        Some(captures) => captures[1].to_string(),
        None => "1".to_string(),
    }
}

/// Map an [`ExtractedRecord`] into the canonical [`ContentRecord`].
///
/// Pure; the only failure is an item with no usable title anywhere, which
/// the caller logs and discards rather than persisting a titleless post.
pub fn map_record(extracted: ExtractedRecord) -> Result<ContentRecord> {
    let title = extracted
        .title
        .clone()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| CrawlError::MissingTitle {
            slug: extracted.slug.clone(),
        })?;

    let mut attributes = FilmAttributes::default();
    let mut quality = None;

    for (key, value) in &extracted.extra_info {
        if value.is_empty() {
            continue;
        }
        match canonical_name(key) {
            Some("imdbRating") => attributes.imdb_rating = Some(value.clone()),
            Some("genres") => attributes.genres = Some(value.clone()),
            Some("dtcast") => attributes.cast = Some(value.clone()),
            Some("dtcreator") => attributes.creator = Some(value.clone()),
            Some("country") => attributes.country = Some(value.clone()),
            Some("dtyear") => attributes.year = Some(value.clone()),
            Some(other) => debug!(%key, canonical = other, "unhandled canonical name"),
            None if key == "Quality" => quality = Some(value.clone()),
            None => debug!(%key, %value, "dropping unmapped extraction key"),
        }
    }

    // Production credits double as the director taxonomy on movies.
    attributes.director = attributes.creator.clone();

    let quality = quality
        .or_else(|| Some(extracted.quality.clone()).filter(|q| !q.is_empty()))
        .unwrap_or_else(|| "HD".to_string());

    let seasons = extracted
        .seasons
        .iter()
        .map(|season| SeasonRecord {
            number: season_number(&season.label),
            label: season.label.clone(),
            episodes: season
                .episodes
                .iter()
                .map(|(number, title)| EpisodeRecord {
                    number: number.clone(),
                    title: title.clone(),
                })
                .collect(),
        })
        .collect();

    Ok(ContentRecord {
        title,
        slug: extracted.slug,
        description: extracted.description,
        cover_url: extracted.cover_url,
        trailer_id: extracted.trailer_id,
        quality,
        kind: extracted.kind,
        tmdb_id: extracted.tmdb_id,
        attributes,
        seasons,
    })
}

fn canonical_name(key: &str) -> Option<&'static str> {
    KEY_MAPPING
        .iter()
        .find(|(from, _)| *from == key)
        .map(|(_, to)| *to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelpress_model::{ContentKind, ExtractedSeason};

    fn extracted(kind: ContentKind) -> ExtractedRecord {
        ExtractedRecord {
            title: Some("Breaking Point".into()),
            slug: "breaking-point-39201".into(),
            description: "A story.".into(),
            cover_url: "https://img.example.org/c.jpg".into(),
            trailer_id: "q1w2e3".into(),
            quality: "HD".into(),
            extra_info: vec![
                ("IMDB".into(), "7.5".into()),
                ("Genre".into(), "Action, Drama".into()),
                ("Country".into(), "USA".into()),
            ],
            tmdb_id: Some("4821".into()),
            seasons: Vec::new(),
            kind,
        }
    }

    #[test]
    fn renames_keys_and_skips_absent_production() {
        let record = map_record(extracted(ContentKind::Movie)).unwrap();

        assert_eq!(record.attributes.imdb_rating.as_deref(), Some("7.5"));
        assert_eq!(record.attributes.genres.as_deref(), Some("Action, Drama"));
        assert_eq!(record.attributes.country.as_deref(), Some("USA"));
        // no Production fact, so neither creator nor its director alias
        assert_eq!(record.attributes.creator, None);
        assert_eq!(record.attributes.director, None);
    }

    #[test]
    fn production_aliases_to_director() {
        let mut input = extracted(ContentKind::Movie);
        input
            .extra_info
            .push(("Production".into(), "Jane Doe".into()));
        let record = map_record(input).unwrap();
        assert_eq!(record.attributes.creator.as_deref(), Some("Jane Doe"));
        assert_eq!(record.attributes.director.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn unmapped_keys_are_dropped() {
        let mut input = extracted(ContentKind::Movie);
        input
            .extra_info
            .push(("Duration".into(), "115 min".into()));
        let record = map_record(input).unwrap();
        assert_eq!(record.attributes, {
            let base = map_record(extracted(ContentKind::Movie)).unwrap();
            base.attributes
        });
    }

    #[test]
    fn quality_prefers_detail_fact_over_badge() {
        let mut input = extracted(ContentKind::Movie);
        input.quality = "CAM".into();
        input.extra_info.push(("Quality".into(), "HD 1080p".into()));
        assert_eq!(map_record(input).unwrap().quality, "HD 1080p");

        let mut badge_only = extracted(ContentKind::Movie);
        badge_only.quality = "CAM".into();
        assert_eq!(map_record(badge_only).unwrap().quality, "CAM");

        let mut neither = extracted(ContentKind::Movie);
        neither.quality = String::new();
        assert_eq!(map_record(neither).unwrap().quality, "HD");
    }

    #[test]
    fn missing_title_is_an_error() {
        let mut input = extracted(ContentKind::Movie);
        input.title = None;
        assert!(matches!(
            map_record(input),
            Err(CrawlError::MissingTitle { .. })
        ));

        let mut empty = extracted(ContentKind::Movie);
        empty.title = Some(String::new());
        assert!(map_record(empty).is_err());
    }

    #[test]
    fn season_numbers_extract_with_default() {
        assert_eq!(season_number("Season 2 Recap"), "2");
        assert_eq!(season_number("season   14"), "14");
        assert_eq!(season_number("SEASON\n3"), "3");
        assert_eq!(season_number("Specials"), "1");
        assert_eq!(season_number("Final Season"), "1");
    }

    #[test]
    fn seasons_map_with_numbers_and_episodes() {
        let mut input = extracted(ContentKind::TvShow);
        input.seasons = vec![
            ExtractedSeason {
                label: "Season 2".into(),
                episodes: vec![("1".into(), "Opener".into())],
            },
            ExtractedSeason {
                label: "Specials".into(),
                episodes: Vec::new(),
            },
        ];
        let record = map_record(input).unwrap();
        assert_eq!(record.seasons[0].number, "2");
        assert_eq!(record.seasons[0].episodes[0].title, "Opener");
        assert_eq!(record.seasons[1].number, "1");
    }
}
