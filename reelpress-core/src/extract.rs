//! Selector-driven extraction of listing and detail pages.
//!
//! Pure functions of markup to structured data; nothing here touches
//! storage. Missing elements degrade to empty defaults and are reported as
//! [`ExtractionIssue`]s for the caller to route into the failure logs;
//! extraction itself never aborts an item.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use reelpress_model::{ContentKind, ExtractedRecord, ExtractedSeason};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static FILM_LIST_WRAP: Lazy<Selector> = Lazy::new(|| selector("div.film_list-wrap"));
static FLW_ITEM: Lazy<Selector> = Lazy::new(|| selector("div.flw-item"));
static FILM_POSTER: Lazy<Selector> = Lazy::new(|| selector("div.film-poster"));
static POSTER_QUALITY: Lazy<Selector> = Lazy::new(|| selector("div.film-poster-quality"));
static POSTER_IMG: Lazy<Selector> = Lazy::new(|| selector("img"));
static POSTER_LINK: Lazy<Selector> = Lazy::new(|| selector("a"));
static FILM_NAME: Lazy<Selector> = Lazy::new(|| selector("h3.film-name"));
static FILM_NAME_LINK: Lazy<Selector> = Lazy::new(|| selector("h3.film-name a"));

static DETAIL_INFO: Lazy<Selector> = Lazy::new(|| selector("div.detail_page-infor"));
static HEADING_NAME: Lazy<Selector> = Lazy::new(|| selector("h2.heading-name"));
static DESCRIPTION: Lazy<Selector> = Lazy::new(|| selector("div.description"));
static DETAIL_POSTER_IMG: Lazy<Selector> = Lazy::new(|| selector("img.film-poster-img"));
static BTN_IMDB: Lazy<Selector> = Lazy::new(|| selector("div.dp-i-stats button.btn-imdb"));
static ROW_LINE: Lazy<Selector> = Lazy::new(|| selector("div.elements div.row-line"));
static ROW_LABEL: Lazy<Selector> = Lazy::new(|| selector("strong"));
static TRAILER_IFRAME: Lazy<Selector> = Lazy::new(|| selector("div#modaltrailer iframe"));
static PLAYER_AREA: Lazy<Selector> = Lazy::new(|| selector("div.watching_player-area"));
static SEASON_LINKS: Lazy<Selector> =
    Lazy::new(|| selector("div.seasons-list div.slc-seasons li a"));

/// One card scraped from a catalog listing page.
#[derive(Debug, Clone)]
pub struct ListingItem {
    pub title: String,
    /// Absolute detail-page URL.
    pub href: String,
    /// Last path segment of `href`; the item's natural key.
    pub slug: String,
    pub quality: String,
    pub cover_url: String,
}

/// A recoverable extraction problem, routed to a per-category failure log.
#[derive(Debug, Clone)]
pub struct ExtractionIssue {
    pub category: &'static str,
    pub message: String,
}

impl ExtractionIssue {
    fn new(category: &'static str, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

/// Collapse whitespace artifacts the way page text is normalized upstream:
/// strip newlines, swap double quotes for singles, trim.
fn clean_text(text: &str) -> String {
    text.trim_matches('\n')
        .replace('"', "'")
        .replace('’', "'")
        .trim()
        .to_string()
}

fn https_url(url: &str) -> String {
    if url.is_empty() || url.contains("http") {
        url.to_string()
    } else {
        format!("https:{url}")
    }
}

/// Parse a catalog listing page into its item cards.
///
/// Cards missing a detail link are dropped; every other missing field
/// degrades to an empty default the detail pass can fill in.
pub fn parse_listing(html: &str, homepage: &str) -> Vec<ListingItem> {
    let doc = Html::parse_document(html);
    let Some(wrap) = doc.select(&FILM_LIST_WRAP).next() else {
        return Vec::new();
    };

    let mut items = Vec::new();
    for card in wrap.select(&FLW_ITEM) {
        let mut quality = String::from("HD");
        let mut cover_url = String::new();
        let mut href = String::new();

        if let Some(poster) = card.select(&FILM_POSTER).next() {
            if let Some(badge) = poster.select(&POSTER_QUALITY).next() {
                let text = element_text(badge);
                if !text.is_empty() {
                    quality = text;
                }
            }
            if let Some(img) = poster.select(&POSTER_IMG).next() {
                cover_url = https_url(img.value().attr("data-src").unwrap_or_default());
            }
            if let Some(link) = poster.select(&POSTER_LINK).next() {
                href = link.value().attr("href").unwrap_or_default().to_string();
            }
        }

        let mut title = String::new();
        if let Some(name) = card.select(&FILM_NAME).next() {
            title = element_text(name);
            if href.is_empty() {
                if let Some(link) = card.select(&FILM_NAME_LINK).next() {
                    href = link.value().attr("href").unwrap_or_default().to_string();
                }
            }
        }

        if href.is_empty() {
            continue;
        }
        if !href.contains("http") {
            href = format!("{homepage}{href}");
        }
        let slug = href.rsplit('/').next().unwrap_or_default().to_string();

        items.push(ListingItem {
            title: clean_text(&title),
            href,
            slug,
            quality: clean_text(&quality),
            cover_url,
        });
    }

    items
}

/// Parse a detail page (plus its watch data) into an [`ExtractedRecord`],
/// falling back to listing-card values where the page is missing pieces.
pub fn parse_detail(
    html: &str,
    item: &ListingItem,
    kind: ContentKind,
) -> (ExtractedRecord, Vec<ExtractionIssue>) {
    let doc = Html::parse_document(html);
    let mut issues = Vec::new();

    let info = doc.select(&DETAIL_INFO).next();

    let mut title = item.title.clone();
    if title.is_empty() {
        match info.and_then(|i| i.select(&HEADING_NAME).next()) {
            Some(heading) => title = element_text(heading),
            None => issues.push(ExtractionIssue::new(
                "extractor.title",
                format!("no heading-name on {}", item.href),
            )),
        }
    }

    let description = match info.and_then(|i| i.select(&DESCRIPTION).next()) {
        Some(desc) => element_text(desc),
        None => {
            issues.push(ExtractionIssue::new(
                "extractor.description",
                format!("no description on {}", item.href),
            ));
            String::new()
        }
    };

    let mut cover_url = item.cover_url.clone();
    if cover_url.is_empty() {
        match info.and_then(|i| i.select(&DETAIL_POSTER_IMG).next()) {
            Some(img) => {
                cover_url = https_url(img.value().attr("src").unwrap_or_default());
            }
            None => issues.push(ExtractionIssue::new(
                "extractor.cover_url",
                format!("no poster image on {}", item.href),
            )),
        }
    }

    let trailer_id = doc
        .select(&TRAILER_IFRAME)
        .next()
        .and_then(|iframe| iframe.value().attr("data-src"))
        .and_then(|src| src.rsplit('/').next())
        .unwrap_or_default()
        .to_string();

    let mut extra_info = Vec::new();
    if let Some(info) = info {
        let imdb = imdb_score(info);
        extra_info.push(("IMDB".to_string(), imdb));
        extra_info.extend(row_line_pairs(info));
    }

    let player_area = doc.select(&PLAYER_AREA).next();
    let tmdb_id = player_area
        .and_then(|area| area.value().attr("data-tmdb-id"))
        .map(str::to_string);

    let seasons = if kind == ContentKind::TvShow {
        let (seasons, season_issues) = parse_seasons(&doc, &item.href);
        issues.extend(season_issues);
        seasons
    } else {
        Vec::new()
    };

    let record = ExtractedRecord {
        title: Some(clean_text(&title)).filter(|t| !t.is_empty()),
        slug: item.slug.clone(),
        description: clean_text(&description),
        cover_url,
        trailer_id,
        quality: item.quality.clone(),
        extra_info,
        tmdb_id,
        seasons,
        kind,
    };

    (record, issues)
}

fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<String>())
}

/// The IMDB badge reads `IMDB: 7.5`; keep only the score.
fn imdb_score(info: ElementRef<'_>) -> String {
    info.select(&BTN_IMDB)
        .next()
        .map(|btn| {
            element_text(btn)
                .to_lowercase()
                .replace("imdb:", "")
                .trim()
                .to_string()
        })
        .unwrap_or_default()
}

/// `div.row-line` rows carry `<strong>Label:</strong> value, value` pairs.
fn row_line_pairs(info: ElementRef<'_>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for row in info.select(&ROW_LINE) {
        let Some(label_el) = row.select(&ROW_LABEL).next() else {
            continue;
        };
        let label_text = label_el.text().collect::<String>();
        let key = label_text.replace(':', "");
        let key = key.trim_matches('\n').trim();
        if key.is_empty() {
            continue;
        }

        let row_text = row.text().collect::<String>();
        let value = row_text.replace(&label_text, "").replace('\n', "");
        let value = value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(",");

        pairs.push((key.to_string(), value));
    }
    pairs
}

fn parse_seasons(doc: &Html, href: &str) -> (Vec<ExtractedSeason>, Vec<ExtractionIssue>) {
    let mut seasons = Vec::new();
    let mut issues = Vec::new();

    let season_links: Vec<_> = doc.select(&SEASON_LINKS).collect();
    if season_links.is_empty() {
        issues.push(ExtractionIssue::new(
            "extractor.episodes",
            format!("no seasons list on {href}"),
        ));
        return (seasons, issues);
    }

    for link in season_links {
        let label = link.value().attr("title").unwrap_or_default().to_string();
        let block_id = link
            .value()
            .attr("href")
            .unwrap_or_default()
            .trim_start_matches('#')
            .to_string();

        let episode_selector =
            match Selector::parse(&format!("div[id=\"{block_id}\"] a.episode-item")) {
                Ok(sel) => sel,
                Err(_) => {
                    issues.push(ExtractionIssue::new(
                        "extractor.episodes",
                        format!("unusable season block id '{block_id}' on {href}"),
                    ));
                    continue;
                }
            };

        let mut episodes = Vec::new();
        for episode in doc.select(&episode_selector) {
            let number = episode.value().attr("data-number").unwrap_or_default();
            let title = episode.value().attr("title").unwrap_or_default();
            if number.is_empty() {
                continue;
            }
            episodes.push((number.to_string(), clean_text(title)));
        }

        seasons.push(ExtractedSeason { label, episodes });
    }

    (seasons, issues)
}
