use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use uniqnum::{init_logging, ListenerConfig, Server};
use uniqnum_core::AppConfig;
use uniqnum_pool::MetricsExporter;

/// uniqnum - concurrent 9-digit number deduplication server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override maximum concurrent clients
    #[arg(long)]
    max_clients: Option<usize>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(max_clients) = args.max_clients {
        config.server.max_clients = max_clients;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging(&config.logging)?;
    MetricsExporter::new(config.metrics.clone()).init()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_addr = %config.server.bind_addr(),
        "Starting uniqnum server"
    );

    let server = match Server::bind(ListenerConfig::from(&config.server)).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "Cannot open server port, quitting");
            return Err(e.into());
        }
    };

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C");
                shutdown.request_shutdown("interrupt");
            }
            Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    let summary = server.run().await?;

    info!(
        drained_cleanly = summary.drained_cleanly,
        force_closed = summary.force_closed,
        unique_total = summary.final_report.unique_total,
        "Shutdown complete"
    );

    Ok(())
}
