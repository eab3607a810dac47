//! sessiongate - log in to a backend and make authenticated requests from
//! the terminal.
//!
//! The session is persisted between runs, so `login` once and every later
//! `get` / `post` / `page` carries the bearer token until it expires or the
//! backend rejects it.

mod commands;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sessiongate_core::config::StorageBackend;
use sessiongate_core::{ApiError, Config, Services};

use commands::TerminalNavigator;

/// Exit code when the backend rejected the session mid-command
const EXIT_SESSION_EXPIRED: u8 = 2;

#[derive(Parser)]
#[command(name = "sessiongate", version, about = "Authenticated requests against a session-based backend")]
struct Cli {
    #[arg(long, env = "SESSIONGATE_BASE_URL", help = "Backend base URL")]
    base_url: Option<String>,

    #[arg(long, env = "SESSIONGATE_STORAGE", help = "Session storage: file, keyring or memory")]
    storage: Option<StorageBackend>,

    #[arg(long, help = "Also write logs to this file")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Log in and persist the session
    Login {
        #[arg(short, long, env = "SESSIONGATE_USERNAME")]
        username: Option<String>,
        #[arg(long, env = "SESSIONGATE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show whether the stored session is valid
    Status,
    /// Print the logged-in user's profile
    Whoami,
    /// GET a resource
    Get {
        path: String,
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
        #[arg(long, help = "Deadline in milliseconds (default from config)")]
        timeout_ms: Option<u64>,
    },
    /// POST a JSON body
    Post {
        path: String,
        #[arg(default_value = "{}")]
        body: String,
    },
    /// GET a paged resource
    Page {
        path: String,
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
        #[arg(long)]
        size: Option<u32>,
        #[arg(long)]
        page: Option<u32>,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_file: Option<&PathBuf>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(std::path::Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let _guard = match init_tracing(cli.log_file.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.downcast_ref::<ApiError>().is_some_and(ApiError::is_session_expired) {
                // The navigator already told the user where to go
                return ExitCode::from(EXIT_SESSION_EXPIRED);
            }
            eprintln!("Error: {:#}", e);
            if let Some(hint) = failure_hint(&e) {
                eprintln!("{}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

/// Follow-up advice printed under the error, if any
fn failure_hint(err: &anyhow::Error) -> Option<&'static str> {
    match err.downcast_ref::<ApiError>() {
        Some(e) if e.is_timeout() => Some("The backend did not answer in time. Retry with a larger --timeout-ms."),
        _ => None,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = cli.base_url {
        config.base_url = url;
    }
    if let Some(storage) = cli.storage {
        config.storage = storage;
    }
    info!(base_url = %config.base_url, storage = ?config.storage, "sessiongate starting");

    let services = Services::new(config, Arc::new(TerminalNavigator))?;
    commands::execute(&services, cli.command).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_timeout_gets_a_hint() {
        let err = anyhow::Error::from(ApiError::Timeout(Duration::from_millis(50)));
        assert!(failure_hint(&err).unwrap().contains("--timeout-ms"));
    }

    #[test]
    fn test_other_errors_get_no_hint() {
        assert!(failure_hint(&anyhow::Error::from(ApiError::Cancelled)).is_none());
        assert!(failure_hint(&anyhow::anyhow!("Username and password required")).is_none());
    }
}
