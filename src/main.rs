use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crypto_alert_engine::collector::CoinGeckoProvider;
use crypto_alert_engine::engine::AlertEngine;
use crypto_alert_engine::store::{InMemoryAlertStore, InMemoryMetricStore};
use crypto_alert_engine::utils::Config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,crypto_alert_engine=debug")),
        )
        .init();

    let config = Config::from_env();
    info!(
        "Tracking top {} coins, global cap {}/day",
        config.top_coins_limit, config.max_global_alerts_per_day
    );

    let provider = Arc::new(CoinGeckoProvider::new(config.coingecko_api_key.clone()));
    let metric_store = Arc::new(InMemoryMetricStore::new());
    let alert_store = Arc::new(InMemoryAlertStore::new());

    let engine = AlertEngine::new(config, metric_store, alert_store, provider);
    engine.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    engine.stop().await;

    Ok(())
}
