//! TwinDB Site Daemon
//!
//! The `twind` binary runs on the REMOTE machine. It:
//! - Opens the site's data directory
//! - Serves its tables, metadata and catalogs to the LOCAL process
//! - Handles graceful shutdown on SIGTERM/SIGINT
//!
//! # Usage
//!
//! ```bash
//! # Serve ./twin_data on the default port
//! twind
//!
//! # Serve a custom data directory
//! twind --data-dir /var/lib/twindb
//!
//! # Use configuration file
//! twind --config /etc/twindb/twind.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use twin_server::config::DaemonConfig;
use twin_storage::{FileStore, SiteServer, SiteStorage};

/// TwinDB Site Daemon
#[derive(Parser, Debug)]
#[command(
    name = "twind",
    version,
    about = "TwinDB remote site daemon",
    long_about = "TwinDB splits one relational database across a LOCAL and a REMOTE site.\n\n\
                  This daemon serves the REMOTE site's data directory to the LOCAL process."
)]
struct Args {
    /// Host address to bind to
    #[arg(short = 'H', long, env = "TWIN_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short = 'p', long, env = "TWIN_PORT")]
    port: Option<u16>,

    /// Data directory to serve
    #[arg(short = 'd', long, value_name = "DIR", env = "TWIN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", env = "TWIN_LOG_LEVEL")]
    log_level: String,

    /// Print configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = load_config(&args)?;

    if args.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    print_banner();

    run_daemon(config).await
}

fn init_logging(args: &Args) {
    let level = if args.verbose {
        "debug"
    } else {
        &args.log_level
    };

    let filter = EnvFilter::try_new(format!("twind={level},twin_server={level},twin_storage={level}"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn load_config(args: &Args) -> Result<DaemonConfig> {
    let mut config = if let Some(path) = &args.config {
        DaemonConfig::from_file(path).context("Failed to load config file")?
    } else {
        DaemonConfig::default()
    };

    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }

    Ok(config)
}

fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("╔═══════════════════════════════════════════╗");
    info!("║                                           ║");
    info!("║   TwinDB site daemon v{:<10}          ║", version);
    info!("║   serving the REMOTE site                 ║");
    info!("║                                           ║");
    info!("╚═══════════════════════════════════════════╝");
}

async fn run_daemon(config: DaemonConfig) -> Result<()> {
    let store = FileStore::open(&config.data_dir).with_context(|| {
        format!("Failed to open data directory {}", config.data_dir.display())
    })?;
    let store: Arc<dyn SiteStorage> = Arc::new(store);

    let addr = config.socket_addr();
    info!("Daemon configuration:");
    info!("  Listen address: {}", addr);
    info!("  Data directory: {}", config.data_dir.display());

    let server = SiteServer::bind(&addr, Arc::clone(&store))
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Press Ctrl+C to shutdown");

    if let Err(e) = server.serve_until(shutdown_signal()).await {
        error!("Server error: {}", e);
        return Err(anyhow::anyhow!("Server error: {}", e));
    }

    info!("Shutting down gracefully...");
    store.close();
    info!("Daemon stopped. Goodbye!");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
