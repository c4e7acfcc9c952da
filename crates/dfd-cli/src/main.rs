//! dfd - command-line client for Data for Dummies.
//!
//! Signs in against the Data for Dummies API, keeps the issued tokens in the
//! credentials file (or the OS keychain), and exposes the account and contacts
//! endpoints as subcommands.

mod commands;
mod config;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use dfd_core::{ClientConfig, SessionManager};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Command;
use config::Config;

/// Directory for rolling log files; unset means stderr only
const ENV_LOG_DIR: &str = "DFD_LOG_DIR";

/// Initialize the tracing subscriber for logging.
///
/// Returns the file writer guard when file logging is on; it must live until exit.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=dfd_core=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var_os(ENV_LOG_DIR) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(PathBuf::from(dir), "dfd.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    let mut config = Config::load()?;
    config.apply_env()?;
    debug!(
        base_url = config.api_base_url(),
        backend = %config.credential_backend,
        "Configuration loaded"
    );

    let client_config = ClientConfig::with_base_url(config.api_base_url());
    let session = SessionManager::new(&client_config, config.credential_store()?)?;
    info!(?command, "Running command");

    commands::run(command, &session, &mut config).await
}
