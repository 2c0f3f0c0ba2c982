//! Contest Notifier CLI
//!
//! Runs discovery cycles once or on a schedule, and inspects the checkpoint.

use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Parser, Subcommand};
use contest_notifier::{
    error::{AppError, Result},
    models::{Config, Platform},
    pipeline::{self, Orchestrator, Scheduler},
    storage::{CheckpointStore, LocalStorage},
};

/// Contest Notifier - Kaggle & Dacon competition alerts for Slack
#[derive(Parser, Debug)]
#[command(
    name = "contest-notifier",
    version,
    about = "Announces newly opened data-science competitions on Slack"
)]

struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Override the checkpoint file location
    #[arg(long, global = true)]
    checkpoint: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single discovery cycle
    Run,

    /// Run cycles on the configured interval until Ctrl-C
    Watch {
        /// Seconds between cycles (overrides schedule.interval_secs)
        #[arg(long)]
        interval: Option<u64>,

        /// Also run on Saturdays and Sundays
        #[arg(long)]
        every_day: bool,
    },

    /// Drop expired competitions from the checkpoint
    Clean,

    /// Validate configuration
    Validate,

    /// Show checkpoint info
    Info,
}

/// Initialize logging from the verbosity flag, falling back to the configured level.
fn init_logging(verbose: bool, configured: &str) {
    let level = if verbose { "debug" } else { configured };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Read the config file, falling back to defaults.
///
/// The load error is handed back so it can be logged once the logger exists.
fn load_config(path: &Path) -> (Config, Option<AppError>) {
    match Config::load(path) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let (mut config, load_error) = load_config(&cli.config);
    init_logging(cli.verbose, &config.logging.level);
    match load_error {
        None => log::info!("Loaded configuration from {}", cli.config.display()),
        Some(e) => log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        ),
    }

    config.apply_env();
    if let Some(path) = cli.checkpoint {
        config.storage.checkpoint_path = path;
    }

    match cli.command {
        Command::Run => {
            config.validate()?;
            let orchestrator = Orchestrator::from_config(&config)?;
            orchestrator.run_cycle().await;
        }

        Command::Watch {
            interval,
            every_day,
        } => {
            if let Some(secs) = interval {
                config.schedule.interval_secs = secs;
            }
            if every_day {
                config.schedule.weekdays_only = false;
            }
            config.validate()?;

            let orchestrator = Orchestrator::from_config(&config)?;
            let scheduler = Scheduler::from_config(&config.schedule);

            log::info!("Competition notification bot started");
            scheduler
                .run_until(&orchestrator, async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        log::error!("Failed to listen for Ctrl-C: {e}");
                        std::future::pending::<()>().await;
                    }
                })
                .await;
        }

        Command::Clean => {
            let storage = LocalStorage::new(&config.storage.checkpoint_path);
            let records = storage.load().await?;
            let total = records.len();
            let kept = pipeline::prune(records, Utc::now());
            storage.save(&kept).await?;

            log::info!(
                "Removed {} expired competitions, {} remain",
                total - kept.len(),
                kept.len()
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            if config.slack.token.is_none() {
                log::warn!("SLACK_TOKEN is not set; notifications will fail");
            }
            if config.kaggle.enabled
                && (config.kaggle.username.is_none() || config.kaggle.key.is_none())
            {
                log::warn!("Kaggle credentials are not set; the Kaggle source will be empty");
            }

            log::info!("All validations passed!");
        }

        Command::Info => {
            let storage = LocalStorage::new(&config.storage.checkpoint_path);
            log::info!("Checkpoint: {}", storage.location());

            if !storage.path().exists() {
                log::info!("No checkpoint found yet.");
                return Ok(());
            }

            let records = storage.load().await?;
            let count = |platform: Platform| records.iter().filter(|r| r.platform == platform).count();
            log::info!("Known competitions: {}", records.len());
            log::info!("    Kaggle: {}", count(Platform::Kaggle));
            log::info!("    Dacon: {}", count(Platform::Dacon));
        }
    }

    Ok(())
}
