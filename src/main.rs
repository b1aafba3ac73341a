use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use nexus::config::Config;
use nexus::pipeline::{FilterDecision, IngestWorker, KeyFilter, WorkerSettings};
use nexus::queue::SqsQueue;
use nexus::storage::S3ObjectStore;

/// Nexus: ingest newly created S3 text files into PostgreSQL.
///
/// Drains an SQS queue of S3 ObjectCreated notifications, downloads each
/// matching object, and appends its content to the processed_files table.
#[derive(Parser)]
#[command(name = "nexus", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the queue and ingest files until SIGTERM/SIGINT
    Run,

    /// Create the processed_files table if it does not exist
    Init,

    /// Show ingested row count, recent files, and queue depth
    Status {
        /// Number of recent files to list
        #[arg(long, default_value = "5")]
        recent: u32,
    },

    /// Decode a notification payload and show what the worker would do with it
    Decode {
        /// File containing the payload (reads stdin when omitted)
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nexus=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            let config = load_config()?;
            let target = match config.require_worker() {
                Ok(target) => target,
                Err(e) => {
                    error!(error = %e, "Cannot start worker");
                    return Err(e.into());
                }
            };

            // Listen before any startup I/O so an early SIGTERM still exits 0.
            let shutdown = CancellationToken::new();
            nexus::shutdown::cancel_on_signal(shutdown.clone());

            let sink = nexus::db::connect_postgres(&config.db)
                .await
                .inspect_err(|e| error!(error = %e, "Fatal startup error"))?;
            if let Err(e) = sink.ensure_schema().await {
                error!(error = %e, "Fatal startup error: schema setup failed");
                sink.close().await;
                return Err(e);
            }

            let sdk = nexus::aws::load_sdk_config(&config.aws_region).await;
            let queue = SqsQueue::new(nexus::aws::sqs_client(&sdk), &target.queue_url);
            let store = S3ObjectStore::new(nexus::aws::s3_client(&sdk), &target.bucket_name);

            info!(
                queue = %target.queue_url,
                bucket = %target.bucket_name,
                region = %config.aws_region,
                "Worker configured"
            );

            let worker = IngestWorker::new(
                Arc::new(queue),
                Arc::new(store),
                sink.clone(),
                WorkerSettings::from_config(&config),
            );

            if shutdown.is_cancelled() {
                info!("Shutdown requested during startup, not polling");
            } else {
                worker.run(&shutdown).await;
            }

            sink.close().await;
            info!("Database connections closed");
        }

        Commands::Init => {
            let config = load_config()?;
            info!("Initializing processed_files table...");
            let sink = nexus::db::connect_postgres(&config.db).await?;
            let result = sink.ensure_schema().await;
            let count = match result {
                Ok(()) => sink.record_count().await,
                Err(e) => Err(e),
            };
            sink.close().await;

            println!("Table processed_files ready ({} rows)", count?);
            println!("\nNext step: set QUEUE_URL and BUCKET_NAME, then run: nexus run");
        }

        Commands::Status { recent } => {
            let config = load_config()?;
            let sink = nexus::db::connect_postgres(&config.db).await?;

            let queue = match &config.queue_url {
                Some(url) => {
                    let sdk = nexus::aws::load_sdk_config(&config.aws_region).await;
                    Some(SqsQueue::new(nexus::aws::sqs_client(&sdk), url))
                }
                None => None,
            };

            let result = nexus::status::show(&sink, queue.as_ref(), recent).await;
            sink.close().await;
            result?;
        }

        Commands::Decode { file } => {
            let config = load_config()?;
            let payload = read_payload(file.as_ref())?;
            let filter = KeyFilter::new(config.allowed_suffixes.iter().cloned());
            show_decoded(&payload, &filter)?;
        }
    }

    Ok(())
}

/// Load configuration, logging the error before bailing.
fn load_config() -> Result<Config> {
    Config::load()
        .inspect_err(|e| error!(error = %e, "Invalid configuration"))
        .context("Failed to load configuration from environment")
}

fn read_payload(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read payload from {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read payload from stdin")?;
            Ok(buf)
        }
    }
}

/// Print each decoded notification and the filter's verdict on it.
fn show_decoded(payload: &str, filter: &KeyFilter) -> Result<()> {
    let notifications = nexus::notification::decode(payload)?;

    if notifications.is_empty() {
        println!("No records in payload (message would be acknowledged as a no-op)");
        return Ok(());
    }

    println!("{} notification(s):", notifications.len());
    for n in &notifications {
        let verdict = match filter.evaluate(n) {
            FilterDecision::Keep => "ingest".green().to_string(),
            FilterDecision::Skip(reason) => format!("{} ({reason})", "skip".yellow()),
        };
        println!("  {} [{}] -> {}", n.object_key, n.event_type, verdict);
    }
    Ok(())
}
