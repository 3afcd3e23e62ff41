use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use crate::errors::{AlertError, Result};

const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";
const FEAR_GREED_API_URL: &str = "https://api.alternative.me/fng/";

/// Upstream source of market snapshots, substitutable in tests
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Top coins by market cap, descending
    async fn fetch_markets(&self, limit: usize) -> Result<Vec<CoinMarket>>;

    async fn fetch_global(&self) -> Result<GlobalMarketData>;

    /// Fear & Greed index on the 0-100 scale
    async fn fetch_fear_greed(&self) -> Result<f64>;
}

/// One row of the CoinGecko `/coins/markets` response
#[derive(Debug, Clone, Deserialize)]
pub struct CoinMarket {
    pub symbol: String,
    pub current_price: f64,
    pub total_volume: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub price_change_percentage_24h: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct GlobalMarketData {
    pub total_market_cap: Decimal,
    pub btc_dominance: f64,
}

#[derive(Debug, Deserialize)]
struct GlobalResponse {
    data: GlobalData,
}

#[derive(Debug, Deserialize)]
struct GlobalData {
    total_market_cap: HashMap<String, f64>,
    market_cap_percentage: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct FearGreedResponse {
    data: Vec<FearGreedEntry>,
}

#[derive(Debug, Deserialize)]
struct FearGreedEntry {
    value: String,
}

/// CoinGecko-backed market data provider, plus the alternative.me
/// Fear & Greed endpoint for the sentiment indicator
pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: COINGECKO_API_URL.to_string(),
            api_key,
        }
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(url);
        if let Some(key) = &self.api_key {
            builder = builder.header("X-CG-Demo-API-Key", key);
        }
        builder
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    async fn fetch_markets(&self, limit: usize) -> Result<Vec<CoinMarket>> {
        debug!("Fetching top {} markets from CoinGecko", limit);

        let markets: Vec<CoinMarket> = self
            .request(&format!("{}/coins/markets", self.base_url))
            .query(&[
                ("vs_currency", "usd"),
                ("order", "market_cap_desc"),
                ("per_page", &limit.min(250).to_string()),
                ("page", "1"),
                ("sparkline", "false"),
                ("price_change_percentage", "24h"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(markets)
    }

    async fn fetch_global(&self) -> Result<GlobalMarketData> {
        debug!("Fetching global market data from CoinGecko");

        let response: GlobalResponse = self
            .request(&format!("{}/global", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let total_usd = response
            .data
            .total_market_cap
            .get("usd")
            .copied()
            .ok_or_else(|| AlertError::collection("global data missing usd market cap"))?;
        let btc_dominance = response
            .data
            .market_cap_percentage
            .get("btc")
            .copied()
            .ok_or_else(|| AlertError::collection("global data missing btc dominance"))?;

        Ok(GlobalMarketData {
            total_market_cap: Decimal::from_f64_retain(total_usd).unwrap_or_default(),
            btc_dominance,
        })
    }

    async fn fetch_fear_greed(&self) -> Result<f64> {
        debug!("Fetching fear & greed index");

        let response: FearGreedResponse = self
            .client
            .get(FEAR_GREED_API_URL)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .data
            .first()
            .and_then(|entry| entry.value.parse().ok())
            .ok_or_else(|| AlertError::collection("fear & greed response was empty"))
    }
}
