use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dispatch;
mod error;
mod handlers;
mod path;

use config::Config;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Root directory all request paths are resolved under
    pub root_dir: PathBuf,
}

#[derive(Parser, Debug)]
#[command(name = "minidav")]
#[command(about = "Minimal HTTP file server with WebDAV-style uploads")]
#[command(version)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "MINIDAV_PORT", default_value = "8000")]
    port: u16,

    /// Address to bind to
    #[arg(short = 'H', long, env = "MINIDAV_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Root directory to serve files from
    #[arg(short, long, env = "MINIDAV_ROOT", default_value = ".")]
    directory: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, env = "MINIDAV_VERBOSE")]
    verbose: bool,

    /// Config file path (optional)
    #[arg(short, long, env = "MINIDAV_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "minidav=debug,tower_http=debug"
    } else {
        "minidav=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else {
        Config::default()
    };

    // Resolve root directory to absolute path
    let root_dir = cli
        .directory
        .canonicalize()
        .unwrap_or_else(|_| cli.directory.clone());

    // A missing or non-directory root is reported but not fatal; requests
    // against it surface their own errors.
    if !root_dir.is_dir() {
        warn!("No such directory \"{}\"", cli.directory.display());
    }

    info!("Serving files from: {}", root_dir.display());

    let app = dispatch::app(AppState { root_dir });

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    let listener = bind_with_retry(addr, config.retry_interval(), config.max_bind_retries).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Bind the listener, retrying while the address is in use.
///
/// `max_retries` of `None` retries forever, once per `interval`; a bounded
/// count gives up with the last error. Any bind error other than `AddrInUse`
/// is fatal immediately.
async fn bind_with_retry(
    addr: SocketAddr,
    interval: Duration,
    max_retries: Option<u32>,
) -> std::io::Result<TcpListener> {
    let mut attempts = 0u32;
    loop {
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                attempts += 1;
                if let Some(max) = max_retries {
                    if attempts > max {
                        return Err(err);
                    }
                }
                info!("Port {} in use, retrying...", addr.port());
                tokio::time::sleep(interval).await;
            }
            Err(err) => return Err(err),
        }
    }
}
