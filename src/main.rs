use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use barhop::api::OverpassClient;
use barhop::cache::{InMemoryVenueStore, SqliteVenueStore, VenueStore};
use barhop::config::{CacheBackend, FileConfig};
use barhop::lookup::LookupService;
use barhop::ratelimit::RateLimiter;
use barhop::server::{AppState, build_router};

/// Nearby bar lookup service backed by OpenStreetMap
///
/// Examples:
///   # Serve with defaults (127.0.0.1:8080, ./barhop.db)
///   barhop
///
///   # Listen on all interfaces with a custom cache location
///   barhop --bind 0.0.0.0:8080 --database /var/lib/barhop/bars.db
///
///   # Use a config file
///   barhop --config my-settings.toml
#[derive(Parser, Debug)]
#[command(name = "barhop")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches barhop.toml if not provided)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// SQLite database used as the venue cache
    #[arg(short = 'd', long)]
    database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!("Starting barhop v{}", env!("CARGO_PKG_VERSION"));

    let mut config = FileConfig::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(database) = args.database {
        config.database = database;
    }
    config.validate()?;

    let store: Arc<dyn VenueStore> = match config.cache_backend {
        CacheBackend::Sqlite => {
            info!("Venue cache: {}", config.database.display());
            Arc::new(
                SqliteVenueStore::connect(&config.database)
                    .await
                    .context("Failed to open venue cache")?,
            )
        }
        CacheBackend::Memory => {
            info!("Venue cache: in-memory");
            Arc::new(InMemoryVenueStore::new())
        }
    };

    let overpass = OverpassClient::new(&config.overpass).context("Failed to create Overpass client")?;
    info!(
        mirrors = config.overpass.urls.len(),
        max_retries = config.overpass.max_retries,
        "Overpass client ready"
    );

    let limiter = if config.rate_limit.enabled {
        info!(
            max_requests = config.rate_limit.max_requests,
            window_ms = config.rate_limit.window_ms,
            "Rate limiting enabled"
        );
        Some(RateLimiter::new(&config.rate_limit))
    } else {
        info!("Rate limiting disabled");
        None
    };

    let lookup = LookupService::new(Arc::new(overpass), store);
    let app = build_router(AppState::new(lookup, limiter, config.radius));

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("barhop listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
