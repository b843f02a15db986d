//! Clusterwatch daemon
//!
//! Watches ECS cluster statuses and publishes a notification on every change

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use clusterwatch_daemon::config::{ClusterwatchConfig, ConfigError};
use clusterwatch_daemon::logging;
use clusterwatch_daemon::runtime::build_poller;
use clusterwatch_daemon::shutdown::ShutdownCoordinator;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to the standard search path)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll until terminated (default)
    Run,
    /// Run a single poll cycle and print its report
    Once,
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print a sample configuration file
    Sample,
    /// Validate the effective configuration and print it
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Config {
            command: ConfigCommands::Sample,
        } => {
            print!("{}", ClusterwatchConfig::generate_sample());
            Ok(())
        }
        Commands::Config {
            command: ConfigCommands::Check,
        } => {
            let (config, ignored) = load_config(cli.config.as_deref())?;
            if let Some(e) = &ignored {
                eprintln!("warning: ignoring config file: {}", e);
            }
            print!(
                "{}",
                toml::to_string_pretty(&config).context("rendering configuration")?
            );
            Ok(())
        }
        Commands::Once => {
            let (config, ignored) = load_config(cli.config.as_deref())?;
            let _guard = logging::init(&config.logging)?;
            report_ignored(ignored.as_ref());

            let coordinator = ShutdownCoordinator::new();
            let mut poller = build_poller(&config, coordinator.subscribe()).await?;

            let report = poller.run_cycle().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Run => {
            let (config, ignored) = load_config(cli.config.as_deref())?;
            run(config, ignored).await
        }
    }
}

/// Load and validate; an explicit `--config` must load, a discovered file may be skipped
fn load_config(path: Option<&Path>) -> Result<(ClusterwatchConfig, Option<ConfigError>)> {
    let (config, ignored) = match path {
        Some(path) => (
            ClusterwatchConfig::load_with_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None,
        ),
        None => ClusterwatchConfig::load(),
    };
    config.validate().context("invalid configuration")?;
    Ok((config, ignored))
}

fn report_ignored(ignored: Option<&ConfigError>) {
    if let Some(e) = ignored {
        warn!("Ignoring config file, using defaults: {}", e);
    }
}

async fn run(config: ClusterwatchConfig, ignored: Option<ConfigError>) -> Result<()> {
    let _guard = logging::init(&config.logging)?;
    report_ignored(ignored.as_ref());

    let coordinator = ShutdownCoordinator::new();
    let poller = build_poller(&config, coordinator.subscribe())
        .await
        .context("building poller")?;

    let signals = coordinator.clone();
    tokio::spawn(async move {
        if let Err(e) = signals.wait_for_signal().await {
            error!("Failed to install signal handlers: {}", e);
        }
    });

    poller.run().await;
    info!("Shutdown complete");
    Ok(())
}
