use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};

use capture_proxy::capture::CaptureSummary;
use capture_proxy::config::{self, CliOverrides, UpstreamEndpoint};
use capture_proxy::CaptureListener;

#[derive(Parser, Debug)]
#[command(name = "capture-proxy")]
#[command(
    about = "Capture, classify and log HTTP traffic bound for embedding and vector-store services",
    long_about = None
)]
struct Args {
    /// Path to configuration file (YAML/JSON/TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Address to listen on
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (0 picks a free port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Embedding service upstream
    #[arg(long, value_name = "HOST:PORT", value_parser = parse_endpoint)]
    embedding_upstream: Option<UpstreamEndpoint>,

    /// Vector-store service upstream
    #[arg(long, value_name = "HOST:PORT", value_parser = parse_endpoint)]
    vector_store_upstream: Option<UpstreamEndpoint>,

    /// Maximum number of captures kept in memory
    #[arg(long)]
    capacity: Option<usize>,

    /// Forward captured requests to their upstream instead of answering 501
    #[arg(long)]
    forward: bool,

    /// Print the effective configuration as YAML and exit
    #[arg(long)]
    print_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn parse_endpoint(value: &str) -> Result<UpstreamEndpoint, String> {
    UpstreamEndpoint::parse_host_port(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("capture_proxy={log_level}").parse()?);
    match args.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            config::load_from_path(path).map_err(|e| {
                error!("Failed to load configuration from {}: {}", path.display(), e);
                e
            })?
        }
        None => {
            info!("Loading configuration from default locations");
            config::load_from_env_or_file().map_err(|e| {
                error!("Failed to load configuration: {}", e);
                e
            })?
        }
    };

    let overrides = CliOverrides {
        host: args.host,
        port: args.port,
        embedding_upstream: args.embedding_upstream,
        vector_store_upstream: args.vector_store_upstream,
        capacity: args.capacity,
        forward: args.forward,
    };
    if !overrides.is_empty() {
        config::apply_overrides(&mut config, &overrides);
        config::validate(&config)?;
    }

    if args.print_config {
        print!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    let listener = CaptureListener::from_config(config)?;
    let handle = listener.bind().await?;
    info!("Capturing on http://{}", handle.local_addr());

    shutdown_signal().await;

    info!("Shutting down capture listener");
    let metrics = handle.metrics().clone();
    let store = handle.store().clone();
    handle.stop().await?;

    if tracing::enabled!(tracing::Level::DEBUG) {
        let summaries: Vec<CaptureSummary> = store
            .snapshot()
            .iter()
            .map(|record| CaptureSummary::from(record.as_ref()))
            .collect();
        tracing::debug!("Captured requests: {}", serde_json::to_string_pretty(&summaries)?);
    }

    info!(
        captured = metrics.requests_captured.get(),
        evicted = metrics.store_evictions.get(),
        "Final capture metrics"
    );
    tracing::debug!("\n{}", metrics.encode_text());

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
