mod browser;
mod catalog;
mod config;
mod csvfile;
mod fetch;
mod parser;
mod pipeline;
mod queue;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use browser::{BrowserFetcher, BrowserSettings};
use config::Config;
use fetch::{HttpFetcher, PageFetcher, TwoTierFetcher};
use pipeline::{ScrapeStats, Source};

#[derive(Parser)]
#[command(
    name = "lbc_scraper",
    about = "Scrape classified-ad listings into a product catalog CSV"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape listings and append them to the catalog
    Run {
        /// Read pending URLs from a queue CSV (default: $LBC_QUEUE or urls.csv)
        #[arg(short = 'f', long, value_name = "QUEUE", num_args = 0..=1)]
        file: Option<Option<PathBuf>>,
        /// Listing URLs, processed in order
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        urls: Vec<String>,
    },
    /// Extract one listing (URL or saved HTML file) and print it without writing
    Inspect {
        target: String,
    },
    /// Show queue and catalog statistics
    Stats {
        /// Queue CSV to report on
        #[arg(short = 'f', long, value_name = "QUEUE")]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let result = match cli.command {
        Commands::Run { file, urls } => {
            let source = match file {
                Some(path) => Source::Queue(path.unwrap_or_else(|| config.queue_path.clone())),
                None => Source::Direct(urls),
            };
            if let Source::Queue(path) = &source {
                println!("Queue: {}", path.display());
            }
            println!("Catalog: {}", config.catalog_path.display());

            let fetcher = build_fetcher(&config)?;
            let stats = pipeline::run_batch(&fetcher, &config, &source).await?;

            if stats.total == 0 {
                println!("All URLs have already been scraped.");
            } else {
                println!("\nSucceeded: {}", stats.ok);
                println!("Failed:    {}", stats.errors);
                println!("Total:     {}", stats.total);
            }
            outcome(&stats)
        }
        Commands::Inspect { target } => {
            let html = if Path::new(&target).is_file() {
                std::fs::read_to_string(&target)
                    .with_context(|| format!("Failed to read {}", target))?
            } else {
                let fetcher = build_fetcher(&config)?;
                let page = fetcher.fetch(&target).await?;
                println!("Fetched {} via {}", page.url, page.via);
                page.html
            };

            match parser::process_page(&html) {
                Some(listing) => {
                    println!("{}", serde_json::to_string_pretty(&listing)?);
                    Ok(())
                }
                None => bail!("no description block found in {}", target),
            }
        }
        Commands::Stats { file } => {
            let queue_path = file.unwrap_or_else(|| config.queue_path.clone());
            if queue_path.exists() {
                let q = queue::stats(&queue_path)?;
                println!("Queue:     {}", queue_path.display());
                println!("Total:     {}", q.total);
                println!("Scraped:   {}", q.scraped);
                println!("Pending:   {}", q.pending);
            } else {
                println!("Queue:     {} (not found)", queue_path.display());
            }

            let c = catalog::summary(&config.catalog_path)?;
            println!("Catalog:   {}", config.catalog_path.display());
            println!("Products:  {}", c.rows);
            println!("Next ID:   {}", c.next_id);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn build_fetcher(config: &Config) -> anyhow::Result<TwoTierFetcher<HttpFetcher, BrowserFetcher>> {
    let http = HttpFetcher::new(config).context("Failed to build HTTP client")?;
    let browser = BrowserFetcher::new(BrowserSettings::from_config(config));
    Ok(TwoTierFetcher::new(http, browser))
}

/// A batch fails only when there was work and none of it succeeded.
fn outcome(stats: &ScrapeStats) -> anyhow::Result<()> {
    if stats.total > 0 && stats.ok == 0 {
        bail!("none of the {} URLs could be scraped", stats.total);
    }
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_with_urls() {
        let cli = Cli::try_parse_from(["lbc_scraper", "run", "https://a", "https://b"]).unwrap();
        match cli.command {
            Commands::Run { file, urls } => {
                assert!(file.is_none());
                assert_eq!(urls, vec!["https://a", "https://b"]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn run_with_default_queue() {
        let cli = Cli::try_parse_from(["lbc_scraper", "run", "--file"]).unwrap();
        assert!(matches!(cli.command, Commands::Run { file: Some(None), .. }));
    }

    #[test]
    fn run_with_named_queue() {
        let cli = Cli::try_parse_from(["lbc_scraper", "run", "-f", "todo.csv"]).unwrap();
        match cli.command {
            Commands::Run { file: Some(Some(path)), urls } => {
                assert_eq!(path, PathBuf::from("todo.csv"));
                assert!(urls.is_empty());
            }
            _ => panic!("expected run with queue"),
        }
    }

    #[test]
    fn run_without_arguments_is_a_usage_error() {
        assert!(Cli::try_parse_from(["lbc_scraper", "run"]).is_err());
    }

    #[test]
    fn exit_status_follows_successes() {
        let all_failed = ScrapeStats { total: 3, ok: 0, errors: 3 };
        let some_ok = ScrapeStats { total: 3, ok: 1, errors: 2 };
        let nothing_pending = ScrapeStats::default();

        let err = outcome(&all_failed).unwrap_err();
        assert!(err.to_string().contains("none of the 3 URLs"));
        assert!(outcome(&some_ok).is_ok());
        assert!(outcome(&nothing_pending).is_ok());
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(std::time::Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(std::time::Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(std::time::Duration::from_secs(3725)), "1h 2m 5s");
    }
}
