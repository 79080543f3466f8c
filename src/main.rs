//! CLI entry point for the PTLA service.
//!
//! Polls the GTFS-RT vehicle position and trip update feeds of one agency,
//! publishes per-route statistics as Prometheus metrics and appends a JSON
//! snapshot per cycle.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ptla::config::Config;
use ptla::cycle::{CycleAggregator, CycleSettings};
use ptla::fetch::{BasicClient, FETCH_TIMEOUT, FeedFetcher};
use ptla::liveness::Liveness;
use ptla::metrics::PtlaMetrics;
use ptla::routes::{AppState, create_router};
use ptla::scheduler::Scheduler;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "ptla")]
#[command(about = "Public Transport Live Arrivals: GTFS-RT route statistics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll feeds in the background and serve /, /health and /metrics
    Serve,
    /// Poll feeds in the foreground without the HTTP surface
    Poll {
        /// Number of cycles to run (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 0)]
        cycles: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/ptla.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("ptla.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let metrics = Arc::new(PtlaMetrics::new()?);
    let liveness = Arc::new(Liveness::new());
    let fetcher = FeedFetcher::new(BasicClient::with_timeout(FETCH_TIMEOUT)?, metrics.clone());
    let aggregator = Arc::new(CycleAggregator::new(
        CycleSettings::from(&config),
        fetcher,
        metrics.clone(),
        liveness.clone(),
    ));
    let scheduler = Scheduler::new(aggregator, config.poll_interval);

    info!(
        agency = %config.agency_id,
        city = %config.city,
        vehicle_positions = !config.vehicle_positions_url.is_empty(),
        trip_updates = !config.trip_updates_url.is_empty(),
        poll_secs = config.poll_interval.as_secs(),
        "Starting PTLA"
    );

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            tokio::spawn(async move { scheduler.run(0).await });

            let app = create_router(AppState {
                agency_id: config.agency_id.clone(),
                city: config.city.clone(),
                metrics,
                liveness,
            });
            let addr = config.socket_addr()?;
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;

            info!(%addr, "HTTP server listening");
            axum::serve(listener, app).await?;
        }
        Commands::Poll { cycles } => {
            scheduler.run(cycles).await;
        }
    }

    Ok(())
}
