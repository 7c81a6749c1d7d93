#![deny(unsafe_code)]

//! breachhound CLI — command-line control plane.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use breachhound_chat::keepalive::{self, KeepaliveState};
use breachhound_chat::{BotToken, ChatService};
use breachhound_core::corpus::Corpus;
use breachhound_core::handler::CommandHandler;
use breachhound_core::{report, scanner};

/// breachhound — a breach-data search bot with tiered access.
#[derive(Parser)]
#[command(name = "breachhound", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "breachhound.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot service.
    Start,

    /// Run a one-off search against the local corpus.
    Search {
        /// Term to search for.
        term: String,
    },

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up tracing subscriber with verbosity level
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Commands::Start => cmd_start(&cli.config).await?,
        Commands::Search { term } => cmd_search(&cli.config, &term)?,
        Commands::Config { show } => cmd_config(&cli.config, show)?,
    }

    Ok(())
}

async fn cmd_start(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;

    // Platform authentication is the one fatal startup requirement.
    let _token = match BotToken::from_env() {
        Ok(token) => token,
        Err(e) => {
            error!("{e}");
            anyhow::bail!("startup aborted: {e}");
        }
    };

    let handler = Arc::new(CommandHandler::from_config(&config));

    if let Some(owner) = &config.service.bootstrap_admin
        && let Some(key) = handler.entitlements().ensure_admin(owner)?
    {
        info!(owner = %owner, key = %key, "bootstrap admin configured");
    }

    let (reply_tx, _reply_rx) = broadcast::channel(256);
    let (service, handle) =
        ChatService::new(Arc::clone(&handler), &config.service.command_prefix, reply_tx);

    let (shutdown_tx, _) = broadcast::channel(1);
    if config.keepalive.enabled {
        let addr = format!(
            "{}:{}",
            config.keepalive.listen_addr, config.keepalive.listen_port
        )
        .parse()?;
        let state = Arc::new(KeepaliveState {
            handler: Arc::clone(&handler),
            started_at: Instant::now(),
        });
        tokio::spawn(keepalive::serve(addr, state, shutdown_tx.subscribe()));
    }

    info!("breachhound service starting");
    let service_task = tokio::spawn(service.run());

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, initiating graceful shutdown");
    let _ = shutdown_tx.send(());
    handle.shutdown().await?;
    service_task.await?;

    Ok(())
}

fn cmd_search(config_path: &Path, term: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let corpus = Corpus::new(&config.corpus.root, config.corpus.extensions.clone());

    let results = scanner::scan(&corpus, term)?;
    if results.is_empty() {
        println!("No files containing '{term}' were found.");
        return Ok(());
    }

    for message in report::build_summary(term, &results) {
        println!("{message}");
    }

    let writer = report::ReportWriter::new(&config.storage.reports_dir);
    let artifact = writer.write(term, &results)?;
    println!("Full results written to {}", artifact.display());

    Ok(())
}

fn cmd_config(config_path: &Path, show: bool) -> Result<()> {
    let config = load_config(config_path)?;
    if show {
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| anyhow::anyhow!("TOML error: {e}"))?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<breachhound_config::AppConfig> {
    if path.exists() {
        breachhound_config::AppConfig::load(path).map_err(|e| anyhow::anyhow!(e))
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
        Ok(breachhound_config::AppConfig::default())
    }
}
