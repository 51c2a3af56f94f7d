//! Camera snapshot ingester.
//!
//! Decodes snapshot files delivered by the station transport and upserts
//! one image row per capture, resolving station, device and instrument
//! references against the store.

mod config;
mod ingest;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{IngesterConfig, LogFormat};
use ingest::IngestArgs;
use ingestion::CleanupPolicy;

#[derive(Parser, Debug)]
#[command(name = "ingester")]
#[command(about = "Camera snapshot ingester")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "INGESTER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (overrides logging.level)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Stop at the first file that fails
    #[arg(long, global = true)]
    exit_on_error: bool,

    /// When to remove handled files: always, on-success or never
    #[arg(long, global = true)]
    cleanup: Option<CleanupPolicy>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest delivered snapshot files
    Ingest(IngestArgs),

    /// Decode a snapshot file and print its header
    Inspect { file: PathBuf },

    /// Load stations, devices and instruments from a YAML file
    LoadRefs { file: PathBuf },

    /// Create the tables and unique indexes
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = IngesterConfig::load(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(cleanup) = cli.cleanup {
        config.ingest.cleanup = cleanup;
    }
    if cli.exit_on_error {
        config.ingest.exit_on_error = true;
    }

    init_tracing(&config)?;

    match &cli.command {
        Command::Ingest(args) => {
            info!(
                cleanup = %config.ingest.cleanup,
                exit_on_error = config.ingest.exit_on_error,
                routes = ?config.routes.keys().collect::<Vec<_>>(),
                "Starting snapshot ingest"
            );
            let summary = ingest::run_ingest(&config, args).await?;
            println!(
                "persisted {} skipped {} failed {}",
                summary.persisted, summary.skipped, summary.failed
            );
        }
        Command::Inspect { file } => {
            print!("{}", ingest::describe_file(file)?);
        }
        Command::LoadRefs { file } => {
            let loaded = ingest::run_load_refs(&config, file).await?;
            println!("loaded {} reference entries", loaded);
        }
        Command::Migrate => ingest::run_migrate(&config).await?,
    }

    Ok(())
}

fn init_tracing(config: &IngesterConfig) -> Result<()> {
    let level = match config.logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(builder.json().finish())?;
        }
        LogFormat::Text => {
            tracing::subscriber::set_global_default(builder.finish())?;
        }
    }
    Ok(())
}
