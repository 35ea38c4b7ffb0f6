//! Portal CLI - session-aware client for the Portal API

mod commands;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::{App, Commands};
use portal_client::{
    ApiClient, AuthContext, ClientConfig, FileStorage, SessionGuard, TokenStore, UserDirectory,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, debug, error};

#[derive(Parser)]
#[command(name = "portal")]
#[command(about = "Log in to a Portal backend and manage its users")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Configuration file path
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides configuration and PORTAL_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory the session is stored in
    #[arg(short = 'd', long, global = true)]
    storage_dir: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(short = 't', long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init_logging(cli.log_level.into())?;

    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(storage_dir) = cli.storage_dir {
        config.storage_dir = Some(storage_dir);
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = Some(timeout);
    }
    config.validate()?;
    debug!(api_url = %config.api_url, "Loaded configuration");

    let storage = match &config.storage_dir {
        Some(dir) => FileStorage::new(dir),
        None => FileStorage::in_data_dir()?,
    };
    let store = TokenStore::restore(Arc::new(storage));
    let client = ApiClient::from_config(&config, store)?;

    let auth = AuthContext::new(client);
    auth.initialize().await;
    let guard = SessionGuard::new(auth);
    let app = App {
        directory: UserDirectory::new(guard.clone()),
        guard,
    };

    if let Err(e) = cli.command.execute(&app).await {
        error!("Command failed: {e:#}");
        eprintln!("{e}");
        std::process::exit(1);
    }

    Ok(())
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}
