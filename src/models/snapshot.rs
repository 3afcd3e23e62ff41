use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-symbol market data point, produced by the collector at a fixed
/// cadence. Immutable once appended to the metric store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub volume: Decimal,
    pub market_cap: Decimal,
    pub rank: u32,
}

/// Global market indicators, not tied to a single symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketIndicatorSnapshot {
    pub timestamp: DateTime<Utc>,
    pub total_market_cap: Decimal,
    pub btc_dominance: f64,
    pub fear_greed_index: f64,
}

/// Aggregate market view pushed to subscribers as `market_update`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketOverview {
    pub timestamp: DateTime<Utc>,
    pub total_market_cap: Decimal,
    pub btc_dominance: f64,
    pub fear_greed_index: f64,
    pub top_coins: Vec<CoinSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinSummary {
    pub symbol: String,
    pub price: Decimal,
    pub change_24h_percent: f64,
    pub market_cap: Decimal,
}
