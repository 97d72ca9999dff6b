//! LinkKeeper - conversational bookmark folders
//!
//! A chat bot that files links into folders and shares folders through
//! access keys approved by the folder owner.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use linkkeeper::{
    channels::{ChatGateway, TelegramAdapter},
    config::BotConfig,
    consumer::Consumer,
    processor::Processor,
    session::SessionManager,
    storage::SqliteStorage,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "linkkeeper")]
#[command(author = "LinkKeeper Team")]
#[command(version)]
#[command(about = "Conversational bookmark folders with shared, key-gated access")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "LINKKEEPER_CONFIG")]
    config: Option<PathBuf>,

    /// Bot token, overrides the configuration file
    #[arg(long, env = "LINKKEEPER_BOT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll for updates and serve users (default)
    Run,

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("linkkeeper={}", log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // Load configuration
    let mut config = BotConfig::load(cli.config.as_deref())?;
    if let Some(token) = cli.token {
        config.telegram.token = Some(token);
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await?,
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn run(config: BotConfig) -> Result<()> {
    config.validate()?;
    let token = config
        .token()
        .context("bot token is not specified")?
        .to_string();

    tracing::info!("Opening storage at {}", config.storage.path.display());
    let storage = Arc::new(
        SqliteStorage::open(&config.storage.path)
            .with_context(|| format!("can't open {}", config.storage.path.display()))?,
    );

    let adapter = Arc::new(TelegramAdapter::new(&config.telegram, &token)?);
    tracing::info!("Using {} gateway at {}", adapter.name(), config.telegram.api_host);
    let processor = Arc::new(
        Processor::new(adapter.clone(), storage, Arc::new(SessionManager::new()))
            .with_admin_chat(config.feedback.admin_chat_id),
    );
    let consumer = Consumer::new(adapter, processor, &config);

    tracing::info!("LinkKeeper is running. Press Ctrl+C to stop.");
    consumer
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    tracing::info!("Shutting down...");
    Ok(())
}

fn show_config(config: Option<&BotConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default().redacted();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
