//! Pulse daemon entry point.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pulse::{
    config::AppConfig,
    http_client::HttpClientPool,
    http_server::{self, ApiState},
    ingestion::IngestionService,
    notification::ChannelDispatcher,
    persistence::sqlite::SqliteStore,
    pipeline::AnomalyNotificationPipeline,
    rate_limiter::RateLimiter,
};

#[derive(Parser)]
#[command(name = "pulse", about = "Telemetry admission and anomaly notification daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Starts the ingest server and the notification scheduler.
    Run {
        /// Directory containing `app.yaml`.
        #[arg(long, short)]
        config_dir: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config_dir } => run(config_dir.as_deref()).await,
    }
}

async fn run(config_dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::new(config_dir)?;

    let store = Arc::new(SqliteStore::new(&config.database_url).await?);
    store.run_migrations().await?;
    tracing::info!(database_url = %config.database_url, "Analytics store ready.");

    let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
    let ingestion = Arc::new(IngestionService::new(
        Arc::clone(&store),
        Arc::clone(&store),
        limiter,
    ));

    let client_pool = HttpClientPool::new();
    let dispatcher = Arc::new(ChannelDispatcher::from_channels(&config.channels, &client_pool).await?);
    tracing::info!(
        channels = dispatcher.channel_count(),
        "Notification channels configured."
    );

    let pipeline = Arc::new(AnomalyNotificationPipeline::new(
        Arc::clone(&store),
        Arc::clone(&store),
        dispatcher,
        config.dashboard_base_url.clone(),
    ));

    let notification_interval = config.notification_interval_secs;
    let listen_address = config.server.listen_address.clone();
    let state = ApiState {
        config: Arc::new(config),
        ingestion,
        pipeline: Arc::clone(&pipeline),
        store: Arc::clone(&store),
    };

    let scheduler = tokio::spawn(pipeline.run(notification_interval));

    tokio::select! {
        result = http_server::run_server(&listen_address, state) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received, stopping.");
        }
    }

    scheduler.abort();
    store.close().await;
    Ok(())
}
