use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use trip_ledger::app::{self, AppState};
use trip_ledger::config::Config;
use trip_ledger::constants::RATE_WORKER_PERIOD_SECS;
use trip_ledger::ledger::LedgerStore;
use trip_ledger::rates::{HttpRateSource, RateCache, RateCacheSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // load environment variables
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env().context("Invalid configuration")?;

    let ledger = LedgerStore::open(config.ledger_path()).context("Failed to open ledger")?;

    let timeout = config.rate_fetch_timeout();
    let primary = HttpRateSource::new("exchangerate-api", &config.primary_rate_url, timeout)
        .context("Failed to build primary rate client")?;
    let secondary = HttpRateSource::new("open-er-api", &config.secondary_rate_url, timeout)
        .context("Failed to build secondary rate client")?;
    let rates = Arc::new(RateCache::initialize(
        RateCacheSettings {
            path: config.rates_path(),
            staleness: config.rate_staleness(),
            fetch_timeout: timeout,
        },
        Box::new(primary),
        Some(Box::new(secondary)),
    ));

    // Pull live rates once at startup without delaying the listener.
    let startup = rates.clone();
    tokio::spawn(async move {
        startup.force_refresh().await;
    });
    let _worker = rates
        .clone()
        .spawn_refresh_worker(Duration::from_secs(RATE_WORKER_PERIOD_SECS));

    let bind_address = config.bind_address();
    let app = app::router(AppState::new(ledger, rates, config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server running on http://{}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
