mod browser;
mod config;
mod loader;
mod localize;
mod models;
mod pipeline;
mod scraper;
mod sites;
mod storage;
mod utils;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::browser::webdriver::WebDriverPage;
use crate::config::{AppConfig, BrowserConfig, CurrencySource, TranslatorKind};
use crate::localize::{
    CurrencyConverter, EcbRateConverter, FixedRateConverter, GlossaryTranslator, GoogleTranslator,
    IdentityTranslator, Translator,
};
use crate::models::{Query, ResultEnvelope};
use crate::pipeline::{Pipeline, Services, SitePipeline};
use crate::scraper::HttpClient;
use crate::sites::SiteRegistry;
use crate::storage::{DuckDbCache, TableCache};

#[derive(Parser)]
#[command(name = "transit-scrape", about = "Transport booking site scrapers", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// List registered sites
    Sites,

    /// Scrape one route and print the result envelope
    Run {
        #[arg(short, long)]
        site: String,
        #[arg(long)]
        origin: String,
        #[arg(long)]
        destination: String,
        /// Travel date, YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        hash_id: Option<String>,
        #[arg(long)]
        order: Option<i64>,
        #[arg(long)]
        total_size: Option<i64>,
        #[arg(long)]
        country_id: Option<i64>,
        #[arg(long)]
        origin_id: Option<i64>,
        #[arg(long)]
        destination_id: Option<i64>,
    },

    /// Scrape every query in a CSV file, writing one JSON envelope per line
    Batch {
        #[arg(short, long)]
        site: String,
        #[arg(short, long)]
        file: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Inspect or clean the page cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    Stats,
    /// Delete entries older than `cache.max_age_secs`
    Purge,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "transit_scrape=info,warn",
        1 => "transit_scrape=debug,info",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(env_filter)
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Sites => {
            let (registry, _) = build(&config)?;
            println!("{} sites:", registry.len());
            for p in registry.profiles() {
                println!(
                    "  {:<14} {:<4} {:<6} {:<4} {}",
                    p.key, p.country, p.mode, p.currency, p.name
                );
            }
        }

        Command::Run {
            site,
            origin,
            destination,
            date,
            hash_id,
            order,
            total_size,
            country_id,
            origin_id,
            destination_id,
        } => {
            let _t = utils::Timer::start(format!("{}: {} -> {}", site, origin, destination));
            let (registry, pipeline) = build(&config)?;
            let site = lookup(&registry, &site)?;
            let query = Query {
                country_id,
                origin,
                origin_id,
                destination,
                destination_id,
                date,
                order,
                hash_id,
                total_size,
            };
            let envelope = scrape(&pipeline, site.as_ref(), &config.browser, &query).await;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }

        Command::Batch { site, file, out } => {
            let t = utils::Timer::start(format!("batch {:?}", file));
            let (registry, pipeline) = build(&config)?;
            let site = lookup(&registry, &site)?;
            let queries = loader::load_queries(&file)?;

            let envelopes = run_batch(
                pipeline,
                site,
                Arc::new(config.browser.clone()),
                queries,
                config.runner.concurrency,
            )
            .await;

            let mut sink: Box<dyn Write> = match &out {
                Some(path) => Box::new(std::io::BufWriter::new(
                    std::fs::File::create(path).with_context(|| format!("Cannot create {:?}", path))?,
                )),
                None => Box::new(std::io::stdout().lock()),
            };
            for env in &envelopes {
                serde_json::to_writer(&mut sink, env)?;
                writeln!(sink)?;
            }
            sink.flush()?;

            let ok = envelopes.iter().filter(|e| e.is_ok()).count();
            info!(
                "Done: {} queries, {} with data, {} without ({:.1?})",
                envelopes.len(),
                ok,
                envelopes.len() - ok,
                t.elapsed()
            );
        }

        Command::Cache { action } => {
            let cache = DuckDbCache::open(&config.cache.db_path)?;
            match action {
                CacheAction::Stats => {
                    let stats = cache.stats()?;
                    let age = |t: Option<chrono::NaiveDateTime>| {
                        t.map(|t| format!("{} ago", utils::fmt_age(t)))
                            .unwrap_or_else(|| "-".into())
                    };
                    println!("─────────────────────────────────");
                    println!("  Page cache {:?}", config.cache.db_path);
                    println!("─────────────────────────────────");
                    println!("  Entries : {}", utils::fmt_number(stats.entries));
                    println!("  Oldest  : {}", age(stats.oldest));
                    println!("  Newest  : {}", age(stats.newest));
                    println!("─────────────────────────────────");
                }
                CacheAction::Purge => {
                    let n = cache.purge_older_than(Duration::from_secs(config.cache.max_age_secs))?;
                    println!("Purged {} stale entries.", n);
                }
            }
        }
    }

    Ok(())
}

/// Wire the collaborators from configuration.
fn build(config: &AppConfig) -> Result<(SiteRegistry, Pipeline)> {
    let http = Arc::new(HttpClient::new(&config.http).context("Failed to build HTTP client")?);
    let cache: Arc<dyn TableCache> =
        Arc::new(DuckDbCache::open(&config.cache.db_path).context("Failed to open page cache")?);

    let loc = &config.localization;
    let base: Arc<dyn Translator> = match loc.translator {
        TranslatorKind::Google => Arc::new(GoogleTranslator::new(http.clone())),
        TranslatorKind::Identity => Arc::new(IdentityTranslator),
    };
    let translator = with_glossary(&loc.glossary, base);
    let converter: Arc<dyn CurrencyConverter> = match loc.currency_source {
        CurrencySource::Fixed => Arc::new(FixedRateConverter::new(&loc.rates)),
        CurrencySource::Ecb => Arc::new(EcbRateConverter::new(http.clone())),
    };
    let target = loc.target_currency.trim();

    let services = Services {
        translator,
        converter,
        target_currency: (!target.is_empty()).then(|| target.to_uppercase()),
        navigation_policy: config.runner.navigation_policy,
    };
    Ok((SiteRegistry::with_defaults(config, http, cache), Pipeline::new(services)))
}

fn with_glossary(entries: &HashMap<String, String>, inner: Arc<dyn Translator>) -> Arc<dyn Translator> {
    if entries.is_empty() {
        inner
    } else {
        Arc::new(GlossaryTranslator::new(entries, inner))
    }
}

fn lookup(registry: &SiteRegistry, key: &str) -> Result<Arc<dyn SitePipeline>> {
    match registry.get(key) {
        Some(site) => Ok(site),
        None => bail!(
            "Unknown or disabled site {:?}; known: {}",
            key,
            registry.keys().collect::<Vec<_>>().join(", ")
        ),
    }
}

/// One query in its own browser session. A session that cannot be opened
/// still yields an envelope, with no data.
async fn scrape(
    pipeline: &Pipeline,
    site: &dyn SitePipeline,
    browser: &BrowserConfig,
    query: &Query,
) -> ResultEnvelope {
    let page = match WebDriverPage::connect(browser).await {
        Ok(p) => p,
        Err(e) => {
            error!(site = site.profile().key, "browser session failed: {}", e);
            return ResultEnvelope::no_data(query);
        }
    };
    let envelope = pipeline.run(site, &page, query).await;
    if let Err(e) = page.quit().await {
        warn!("closing browser session: {}", e);
    }
    envelope
}

/// Run queries concurrently, at most `concurrency` browser sessions at a
/// time. Envelopes come back in input order.
async fn run_batch(
    pipeline: Pipeline,
    site: Arc<dyn SitePipeline>,
    browser: Arc<BrowserConfig>,
    queries: Vec<Query>,
    concurrency: usize,
) -> Vec<ResultEnvelope> {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let tasks: Vec<_> = queries
        .into_iter()
        .map(|query| {
            let (pipeline, site, browser, permits) =
                (pipeline.clone(), site.clone(), browser.clone(), permits.clone());
            let q = query.clone();
            let handle = tokio::spawn(async move {
                match permits.acquire_owned().await {
                    Ok(_permit) => scrape(&pipeline, site.as_ref(), &browser, &q).await,
                    Err(_) => ResultEnvelope::no_data(&q),
                }
            });
            (query, handle)
        })
        .collect();

    let mut envelopes = Vec::with_capacity(tasks.len());
    for (query, handle) in tasks {
        envelopes.push(handle.await.unwrap_or_else(|e| {
            error!(hash_id = ?query.hash_id, order = ?query.order, "batch task failed: {}", e);
            ResultEnvelope::no_data(&query)
        }));
    }
    envelopes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_arguments() {
        let cli = Cli::try_parse_from([
            "transit-scrape", "-vv", "run", "--site", "armenia", "--origin", "Gyumri",
            "--destination", "Yerevan", "--date", "2021-03-15", "--hash-id", "abc", "--order", "0",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Run { site, date, hash_id, order, total_size, .. } => {
                assert_eq!(site, "armenia");
                assert_eq!(date, NaiveDate::from_ymd_opt(2021, 3, 15).unwrap());
                assert_eq!(hash_id.as_deref(), Some("abc"));
                assert_eq!(order, Some(0));
                assert_eq!(total_size, None);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_bad_date_rejected() {
        let parsed = Cli::try_parse_from([
            "transit-scrape", "run", "-s", "kenya", "--origin", "Nairobi",
            "--destination", "Mombasa", "--date", "24/12/2021",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_lookup_lists_known_sites() {
        let mut registry = SiteRegistry::new();
        registry.register(Arc::new(sites::egypt::Egypt::new(sites::egypt::profile())));
        assert!(lookup(&registry, "egypt").is_ok());
        let err = lookup(&registry, "mars").err().unwrap();
        assert!(err.to_string().contains("known: egypt"));
    }

    #[test]
    fn test_empty_glossary_keeps_translator() {
        let inner: Arc<dyn Translator> = Arc::new(IdentityTranslator);
        let same = with_glossary(&HashMap::new(), inner.clone());
        assert!(Arc::ptr_eq(&same, &inner));
    }
}
