//! Career Events CLI
//!
//! Local execution entry point for the events refresh job.

use std::path::PathBuf;

use career_events::{
    error::{AppError, Result},
    models::Config,
    pipeline::{self, RefreshJob, RefreshOptions},
    providers::EnvToggles,
    storage::LocalStorage,
};
use clap::{Parser, Subcommand};

/// Career Events - verified career event listings
#[derive(Parser, Debug)]
#[command(
    name = "career-events",
    version,
    about = "Fetch, verify and publish career events"
)]
struct Cli {
    /// Data directory holding config.toml, caches and output
    #[arg(short, long, default_value = "data", global = true)]
    data_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh events from all enabled providers
    #[command(alias = "events:refresh")]
    Refresh {
        /// Look-ahead window in months (default: window.months)
        #[arg(long)]
        months: Option<u32>,

        /// Run the full pipeline without writing output files
        #[arg(long)]
        dry_run: bool,

        /// Skip live and content verification
        #[arg(long)]
        skip_verify: bool,

        /// Only run this provider id
        #[arg(long)]
        provider: Option<String>,

        /// Publish even if the publish guard objects
        #[arg(long)]
        force: bool,
    },

    /// Validate configuration and list providers
    Validate,

    /// Show provider health records
    Health,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.data_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);
    log::debug!("Data directory: {}", cli.data_dir.display());

    let env = EnvToggles::from_env();
    let storage = LocalStorage::new(&cli.data_dir);

    match cli.command {
        Command::Refresh {
            months,
            dry_run,
            skip_verify,
            provider,
            force,
        } => {
            config.validate()?;
            if months == Some(0) {
                return Err(AppError::validation("--months must be > 0"));
            }

            let job = RefreshJob::from_storage(config, storage, env)?;
            let options = RefreshOptions {
                months,
                dry_run,
                skip_verify,
                provider,
                force,
                today: None,
            };
            let summary = job.run(&options).await?;
            pipeline::print_summary(&summary);

            if summary.publish_skipped {
                log::warn!("events.json left unchanged by the publish guard");
            }
        }

        Command::Validate => {
            pipeline::run_validate(&config, &env)?;
        }

        Command::Health => {
            pipeline::run_health(&storage).await?;
        }
    }

    Ok(())
}
