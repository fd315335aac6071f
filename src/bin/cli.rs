//! cinewatch CLI
//!
//! Local execution entry point. For AWS Lambda, use `cinewatch-lambda`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use cinewatch::{
    config::{Settings, load_local},
    error::Result,
    notify::delivery_channel,
    pipeline::{Pipeline, RunBudget, RunOptions, backfill_degraded, collapse_duplicates, diff},
    services::{SourceRegistry, SourceScraper},
    storage::{LocalStorage, SnapshotStore, SubscriberDirectory},
    utils::http,
};
use clap::{Parser, Subcommand};

/// cinewatch - Cinema Programme Watcher
#[derive(Parser, Debug)]
#[command(
    name = "cinewatch",
    version,
    about = "Watches cinema programme pages and notifies subscribers about changes"
)]
struct Cli {
    /// Path to storage directory holding config, subscribers and snapshots
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Configuration file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape, diff, notify and commit every enabled source
    Run {
        /// Only process this source (repeatable)
        #[arg(long = "source", value_name = "ID")]
        sources: Vec<String>,

        /// Log messages instead of sending them and keep stored snapshots
        #[arg(long)]
        dry_run: bool,

        /// Bypass the drop guard
        #[arg(long)]
        force: bool,
    },

    /// Scrape one source and print its entries as JSON
    Scrape {
        /// Source id
        id: String,
    },

    /// Scrape one source and print the changes against its stored snapshot
    Diff {
        /// Source id
        id: String,
    },

    /// List configured sources
    Sources,

    /// List subscribers, per source
    Subscribers {
        /// Only this source
        #[arg(long = "source", value_name = "ID")]
        source: Option<String>,
    },

    /// Validate configuration and locale files
    Validate,

    /// Show stored snapshot info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("cinewatch starting...");

    let Settings { config, locales } = load_local(&cli.storage_dir, cli.config.as_deref())?;
    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    let storage = Arc::new(LocalStorage::with_config(&cli.storage_dir, &config.storage));

    match cli.command {
        Command::Run {
            sources,
            dry_run,
            force,
        } => {
            config.validate()?;
            locales.validate()?;

            let client = http::create_async_client(&config.http)?;
            let mut registry = SourceRegistry::from_config(&config, &client)?;
            if !sources.is_empty() {
                registry = registry.restrict_to(&sources)?;
            }
            let channel = delivery_channel(&client, &config.telegram, dry_run)?;
            let pipeline = Pipeline::from_config(
                &config,
                registry,
                storage.clone(),
                storage.clone(),
                channel,
                Arc::new(locales),
            );

            let budget = RunBudget::from_secs(config.pipeline.time_budget_secs);
            let report = pipeline
                .run(
                    &budget,
                    RunOptions {
                        force,
                        commit: !dry_run,
                    },
                )
                .await;

            for source in &report.sources {
                log::info!(
                    "{}: {:?} | {} entries | +{} -{} ~{} | {} message(s), {} failed",
                    source.source_id,
                    source.state,
                    source.entries,
                    source.added,
                    source.removed,
                    source.modified,
                    source.deliveries.len(),
                    source.failed_deliveries()
                );
            }
            for source in report.guard_blocked() {
                log::warn!(
                    "{}: drop guard kept the stored snapshot; accept a real shrink with `run --source {} --force`",
                    source.source_id,
                    source.source_id
                );
            }
            if report.has_failures() {
                log::error!("{} source(s) failed", report.failed_sources().count());
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Scrape { id } => {
            let client = http::create_async_client(&config.http)?;
            let registry = SourceRegistry::from_config(&config, &client)?;
            let scraper = registry.get(&id)?;

            let budget = RunBudget::from_secs(config.pipeline.time_budget_secs);
            let outcome = scraper.scrape(&budget).await?;
            log::info!(
                "{} entries, {} skipped, {}/{} detail pages failed",
                outcome.entries.len(),
                outcome.skipped_entries.len(),
                outcome.detail_failures,
                outcome.detail_total
            );
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }

        Command::Diff { id } => {
            let client = http::create_async_client(&config.http)?;
            let registry = SourceRegistry::from_config(&config, &client)?;
            let scraper = registry.get(&id)?;

            let budget = RunBudget::from_secs(config.pipeline.time_budget_secs);
            let mut outcome = scraper.scrape(&budget).await?;
            let prior = storage.load(&id).await?;
            match &prior {
                Some(prior) => {
                    log::info!("Comparing against snapshot from {}", prior.captured_at);
                    backfill_degraded(&prior.entries, &mut outcome.entries, &outcome.degraded);
                }
                None => log::info!("No stored snapshot, every entry is new"),
            }
            let entries = collapse_duplicates(outcome.entries);
            let changeset = diff(prior.as_ref().map(|s| s.entries.as_slice()), &entries);
            log::info!(
                "{} added, {} removed, {} modified",
                changeset.added.len(),
                changeset.removed.len(),
                changeset.modified.len()
            );
            println!("{}", serde_json::to_string_pretty(&changeset)?);
        }

        Command::Sources => {
            for source in &config.sources {
                let enabled = config.enabled_sources().any(|s| s.id == source.id);
                println!(
                    "{}\t{}\t{}{}",
                    source.id,
                    source.display_name,
                    source.url,
                    if enabled { "" } else { "\t(disabled)" }
                );
            }
        }

        Command::Subscribers { source } => {
            let ids: Vec<String> = match source {
                Some(id) => vec![id],
                None => config.sources.iter().map(|s| s.id.clone()).collect(),
            };
            for id in ids {
                let subscribers = storage.list_subscribers(&id).await?;
                println!("{id}: {} subscriber(s)", subscribers.len());
                for subscriber in subscribers {
                    let (language, _) = locales.resolve(subscriber.language.as_deref());
                    println!("  {}\t{language}", subscriber.recipient_id);
                }
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK ({} source(s))", config.sources.len());

            if let Err(e) = locales.validate() {
                log::error!("Locale validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Locales OK ({}; default {})",
                locales.languages().collect::<Vec<_>>().join(", "),
                locales.default_language()
            );

            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());
            log::info!(
                "Bot token: {}",
                if config.telegram.bot_token.is_some() {
                    "configured"
                } else {
                    "not set"
                }
            );
            for source in config.enabled_sources() {
                match storage.load(&source.id).await {
                    Ok(Some(snapshot)) => log::info!(
                        "{}: {} entries, captured {}",
                        source.id,
                        snapshot.len(),
                        snapshot.captured_at
                    ),
                    Ok(None) => log::info!("{}: no snapshot yet", source.id),
                    Err(e) => log::warn!("{}: {}", source.id, e),
                }
            }
        }
    }

    log::info!("Done!");

    Ok(ExitCode::SUCCESS)
}
