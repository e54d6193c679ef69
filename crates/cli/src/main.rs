use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use steward_core::{
    load_config, validate_config, Config, DelugeClient, JournalSet, RecoveryPass, RelocationPass,
    RunError, SanitizedConfig, TorrentClient,
};

/// Maintenance for a Deluge torrent session.
#[derive(Debug, Parser)]
#[command(name = "steward", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short, env = "STEWARD_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Command {
    /// Move finished torrents into their library and drop them from the session
    Relocate,
    /// Recover errored torrents, fill free download slots, drop finished torrents
    Recover,
    /// Relocate, then recover
    Run,
    /// Print the effective configuration with secrets redacted
    ShowConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Loading configuration from {:?}", cli.config);
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;

    if cli.command == Command::ShowConfig {
        let sanitized = SanitizedConfig::from(&config);
        println!("{}", serde_json::to_string_pretty(&sanitized)?);
        return Ok(());
    }

    let journals = JournalSet::open(&config.journal.dir)
        .with_context(|| format!("Failed to open journals in {:?}", config.journal.dir))?;

    let result = execute(cli.command, &config, &journals).await;
    if let Err(e) = &result {
        let message = format!("Fatal: {:#}", e);
        if matches!(cli.command, Command::Relocate | Command::Run) {
            journals.relocation.record(&message);
        }
        journals.script_errors.record(&message);
    }
    result
}

async fn execute(command: Command, config: &Config, journals: &JournalSet) -> Result<()> {
    let client: Arc<dyn TorrentClient> = Arc::new(
        DelugeClient::new(config.deluge.clone()).context("Failed to create Deluge client")?,
    );
    info!("Using torrent client: {}", client.name());

    if matches!(command, Command::Relocate | Command::Run) {
        relocate(client.clone(), config, journals).await?;
    }
    if matches!(command, Command::Recover | Command::Run) {
        recover(client, config, journals).await?;
    }
    Ok(())
}

async fn relocate(
    client: Arc<dyn TorrentClient>,
    config: &Config,
    journals: &JournalSet,
) -> Result<(), RunError> {
    let summary = RelocationPass::new(client, config, journals.relocation.clone())
        .run()
        .await?;
    info!(
        "Relocated {} of {} finished torrents",
        summary.removed, summary.examined
    );
    Ok(())
}

async fn recover(
    client: Arc<dyn TorrentClient>,
    config: &Config,
    journals: &JournalSet,
) -> Result<(), RunError> {
    let summary = RecoveryPass::new(client, config, journals.clone())
        .run()
        .await?;
    info!(
        "Recovery: {} errored, {} rechecked, {} resumed, {} removed",
        summary.errors, summary.rechecked, summary.slot_resumed, summary.removed
    );
    Ok(())
}
