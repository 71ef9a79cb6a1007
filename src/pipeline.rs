use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog;
use crate::config::Config;
use crate::fetch::{FetchError, FetchPath, PageFetcher};
use crate::parser::{self, Listing};
use crate::queue;

/// Where the batch gets its URLs from.
pub enum Source {
    /// URLs given on the command line, processed in order, not tracked.
    Direct(Vec<String>),
    /// Pending rows of a queue CSV; successes are marked as scraped.
    Queue(PathBuf),
}

/// Why a single URL did not make it into the catalog.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("could not fetch page: {0}")]
    Fetch(#[from] FetchError),
    #[error("description block not found")]
    MissingDescription,
    #[error("could not add to catalog: {0:#}")]
    Catalog(anyhow::Error),
}

/// Scrape stats returned after completion.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScrapeStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

pub struct Scraped {
    pub id: u64,
    pub via: FetchPath,
    pub listing: Listing,
}

/// fetch → extract → parse → append for one URL.
pub async fn scrape_one<F: PageFetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    catalog_path: &Path,
) -> Result<Scraped, ScrapeError> {
    let page = fetcher.fetch(url).await?;
    let listing = parser::process_page(&page.html).ok_or(ScrapeError::MissingDescription)?;

    let f = &listing.fields;
    info!(
        "Parsed {}: reference={:?} name={:?} brand={:?} promo={:?} regular={:?}",
        url,
        f.reference.as_deref().unwrap_or(""),
        f.name.as_deref().unwrap_or(""),
        f.brand.as_deref().unwrap_or(""),
        listing.prices.promo,
        listing.prices.regular,
    );

    let id = catalog::append(catalog_path, &listing.fields, &listing.prices)
        .map_err(ScrapeError::Catalog)?;

    Ok(Scraped {
        id,
        via: page.via,
        listing,
    })
}

/// Process every URL of `source` in order, pausing between requests.
///
/// Per-URL failures are logged and counted; only an unreadable queue file
/// aborts the batch.
pub async fn run_batch<F: PageFetcher + ?Sized>(
    fetcher: &F,
    config: &Config,
    source: &Source,
) -> Result<ScrapeStats> {
    let urls = match source {
        Source::Direct(urls) => urls.clone(),
        Source::Queue(path) => queue::load_pending(path)?,
    };
    let total = urls.len();
    if total == 0 {
        return Ok(ScrapeStats::default());
    }

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let mut ok = 0usize;
    let mut errors = 0usize;

    for (i, url) in urls.iter().enumerate() {
        pb.set_message(url.clone());
        info!("[{}/{}] {}", i + 1, total, url);

        match scrape_one(fetcher, url, &config.catalog_path).await {
            Ok(done) => {
                ok += 1;
                let f = &done.listing.fields;
                info!(
                    "Added ID {} via {} | UGS: {} | Nom: {} | Marque: {}",
                    done.id,
                    done.via,
                    f.reference.as_deref().unwrap_or(""),
                    f.name.as_deref().unwrap_or(""),
                    f.brand.as_deref().unwrap_or(""),
                );

                if let Source::Queue(path) = source {
                    if let Err(e) = queue::mark_scraped(path, url, Local::now()) {
                        warn!("Added {} but could not mark it in {}: {:#}", url, path.display(), e);
                    }
                }
            }
            Err(e) => {
                errors += 1;
                warn!("Failed {}: {}", url, e);
            }
        }
        pb.inc(1);

        if i + 1 < total && !config.pace_delay.is_zero() {
            info!("Waiting {:.0}s before the next URL", config.pace_delay.as_secs_f64());
            tokio::time::sleep(config.pace_delay).await;
        }
    }

    pb.finish_and_clear();
    info!("Scraped {} URLs ({} ok, {} errors)", total, ok, errors);

    Ok(ScrapeStats { total, ok, errors })
}
