//! # reelpress crawler
//!
//! Long-running scraper that walks a streaming catalog and mirrors its
//! film/TV metadata into a WordPress-shaped database.
//!
//! Configuration comes from the environment (a `.env` file is honored);
//! `DATABASE_URL` and `SITE_HOMEPAGE` are required. Failures never stop a
//! run: items and pages that break are appended to per-category files under
//! the log directory and the crawl moves on.

mod driver;
mod fetch;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reelpress_core::{extract, map, Config, FailureLog, PageFetcher, WordpressStore};
use reelpress_model::ContentKind;

use crate::driver::Crawler;
use crate::fetch::HttpFetcher;

#[derive(Parser)]
#[command(name = "reelpress", about = "Catalog crawler for WordPress film sites")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl the movie catalog forever.
    Movies {
        /// Page to start from.
        #[arg(long, default_value_t = 1)]
        start_page: u32,
    },
    /// Crawl the TV-show catalog forever.
    Tvshows {
        /// Page to start from.
        #[arg(long, default_value_t = 1)]
        start_page: u32,
    },
    /// Crawl a single listing page, or preview its mapped records.
    Page {
        /// Full listing-page URL.
        url: String,
        /// Content kind of the listing.
        #[arg(long, value_enum)]
        kind: KindArg,
        /// Print mapped records as JSON instead of storing them.
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Movies,
    Tvshows,
}

impl From<KindArg> for ContentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Movies => ContentKind::Movie,
            KindArg::Tvshows => ContentKind::TvShow,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_loaded = dotenvy::dotenv().is_ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if env_loaded {
        tracing::info!("loaded .env file");
    }

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    let faillog = FailureLog::new(config.log_dir.clone());
    let fetcher = HttpFetcher::new(&config.homepage).context("failed to build http client")?;

    match cli.command {
        Command::Movies { start_page } => {
            let crawler = connect(fetcher, config, faillog).await?;
            crawler.run_catalog(ContentKind::Movie, start_page).await?;
        }
        Command::Tvshows { start_page } => {
            let crawler = connect(fetcher, config, faillog).await?;
            crawler.run_catalog(ContentKind::TvShow, start_page).await?;
        }
        Command::Page {
            url,
            kind,
            dry_run: true,
        } => {
            preview_page(&fetcher, &config, &faillog, &url, kind.into()).await?;
        }
        Command::Page {
            url,
            kind,
            dry_run: false,
        } => {
            let crawler = connect(fetcher, config, faillog).await?;
            let count = crawler.crawl_page(&url, kind.into()).await?;
            tracing::info!(count, "page crawl finished");
        }
    }

    Ok(())
}

async fn connect(
    fetcher: HttpFetcher,
    config: Config,
    faillog: FailureLog,
) -> anyhow::Result<Crawler<HttpFetcher>> {
    let store = WordpressStore::connect(&config, faillog.clone())
        .await
        .context("could not reach the content database")?;
    Ok(Crawler::new(fetcher, store, config, faillog))
}

/// Fetch and map one listing page, printing the records instead of
/// storing them. Handy for checking selectors against a live site.
async fn preview_page(
    fetcher: &HttpFetcher,
    config: &Config,
    faillog: &FailureLog,
    url: &str,
    kind: ContentKind,
) -> anyhow::Result<()> {
    let html = fetcher.fetch(url).await?;
    let items = extract::parse_listing(&html, &config.homepage);
    tracing::info!(count = items.len(), "listing items found");

    for item in items {
        let detail_html = match fetcher.fetch(&item.href).await {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!(href = %item.href, %err, "detail fetch failed; skipping");
                continue;
            }
        };
        let (extracted, issues) = extract::parse_detail(&detail_html, &item, kind);
        for issue in issues {
            faillog.log(issue.category, &issue.message);
        }
        match map::map_record(extracted) {
            Ok(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            Err(err) => tracing::warn!(href = %item.href, %err, "record discarded"),
        }
    }

    Ok(())
}
