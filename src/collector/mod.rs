mod coingecko;

pub use coingecko::{CoinGeckoProvider, CoinMarket, GlobalMarketData, MarketDataProvider};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::errors::{AlertError, Result};
use crate::models::{
    CoinSummary, CollectionStatus, MarketIndicatorSnapshot, MarketOverview, MetricSnapshot,
};
use crate::store::MetricStore;
use crate::utils::with_timeout;

const OVERVIEW_TOP_COINS: usize = 10;

/// Health of the collection cycle, surfaced in `system_stats`
#[derive(Debug, Clone, Copy)]
pub struct CollectionHealth {
    pub status: CollectionStatus,
    pub last_collection: Option<DateTime<Utc>>,
}

/// Periodically pulls market data from the provider into the metric store.
///
/// A failed cycle flips the health status to degraded and is retried only
/// on the next scheduled tick.
pub struct MarketCollector {
    provider: Arc<dyn MarketDataProvider>,
    metric_store: Arc<dyn MetricStore>,
    timeout: Duration,
    top_coins_limit: usize,
    health: Arc<RwLock<CollectionHealth>>,
}

impl MarketCollector {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        metric_store: Arc<dyn MetricStore>,
        timeout: Duration,
        top_coins_limit: usize,
    ) -> Self {
        Self {
            provider,
            metric_store,
            timeout,
            top_coins_limit,
            health: Arc::new(RwLock::new(CollectionHealth {
                status: CollectionStatus::Unknown,
                last_collection: None,
            })),
        }
    }

    /// Run one collection cycle and return the aggregate market view
    pub async fn collect(&self) -> Result<MarketOverview> {
        let result = with_timeout(
            self.collect_inner(),
            self.timeout,
            "market_collection",
            AlertError::Collection,
        )
        .await;

        let mut health = self.health.write().await;
        match &result {
            Ok(_) => {
                health.status = CollectionStatus::Healthy;
                health.last_collection = Some(Utc::now());
            }
            Err(e) => {
                warn!("Collection cycle failed, marking degraded: {}", e);
                health.status = CollectionStatus::Degraded;
            }
        }

        result
    }

    async fn collect_inner(&self) -> Result<MarketOverview> {
        let now = Utc::now();

        let markets = self.provider.fetch_markets(self.top_coins_limit).await?;
        let global = self.provider.fetch_global().await?;
        let fear_greed = self.provider.fetch_fear_greed().await?;

        debug!("Collected {} coins from provider", markets.len());

        let mut top_coins = Vec::with_capacity(OVERVIEW_TOP_COINS);
        for coin in &markets {
            let snapshot = MetricSnapshot {
                symbol: coin.symbol.to_uppercase(),
                timestamp: now,
                price: Decimal::from_f64_retain(coin.current_price).unwrap_or_default(),
                volume: Decimal::from_f64_retain(coin.total_volume.unwrap_or(0.0))
                    .unwrap_or_default(),
                market_cap: Decimal::from_f64_retain(coin.market_cap.unwrap_or(0.0))
                    .unwrap_or_default(),
                rank: coin.market_cap_rank.unwrap_or(0),
            };

            if top_coins.len() < OVERVIEW_TOP_COINS {
                top_coins.push(CoinSummary {
                    symbol: snapshot.symbol.clone(),
                    price: snapshot.price,
                    change_24h_percent: coin.price_change_percentage_24h.unwrap_or(0.0),
                    market_cap: snapshot.market_cap,
                });
            }

            self.metric_store.append(snapshot).await?;
        }

        let indicator = MarketIndicatorSnapshot {
            timestamp: now,
            total_market_cap: global.total_market_cap,
            btc_dominance: global.btc_dominance,
            fear_greed_index: fear_greed,
        };
        self.metric_store.append_indicator(indicator.clone()).await?;

        info!(
            "Collection cycle complete: {} symbols, BTC dominance {:.1}%, fear/greed {}",
            markets.len(),
            indicator.btc_dominance,
            indicator.fear_greed_index
        );

        Ok(MarketOverview {
            timestamp: now,
            total_market_cap: indicator.total_market_cap,
            btc_dominance: indicator.btc_dominance,
            fear_greed_index: indicator.fear_greed_index,
            top_coins,
        })
    }

    pub async fn health(&self) -> CollectionHealth {
        *self.health.read().await
    }
}
