use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::models::AlertLevel;

const DEFAULT_COLLECTION_INTERVAL_MS: u64 = 300_000; // 5 min
const DEFAULT_DETECTION_INTERVAL_MS: u64 = 60_000; // 1 min
const DEFAULT_STATS_INTERVAL_MS: u64 = 30_000; // 30 s
const DEFAULT_COLLECTION_TIMEOUT_MS: u64 = 30_000;

/// Runtime configuration for the alerting pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Cadences
    pub collection_interval_ms: u64,
    pub detection_interval_ms: u64,
    pub stats_interval_ms: u64,
    pub collection_timeout_ms: u64,

    // Admission control
    pub cooldown_hours: CooldownHours,
    pub max_alerts_per_symbol_per_day: usize,
    pub max_global_alerts_per_day: usize,

    // Price-change detector (percent, per designated level/timeframe)
    pub price_change_thresholds: PriceChangeThresholds,

    // Volume-spike detector
    pub volume_spike_normal_multiplier: f64,
    pub volume_spike_strong_multiplier: f64,
    pub volume_spike_price_change_threshold: f64,

    // Sentiment detector
    pub fear_greed_extreme_fear_threshold: f64,
    pub fear_greed_extreme_greed_threshold: f64,

    // Market-structure detector
    pub btc_dominance_change_threshold: f64,
    pub total_market_cap_change_threshold: f64,

    // Collector
    pub top_coins_limit: usize,
    pub coingecko_api_key: Option<String>,
}

/// Cooldown windows between price-change alerts sharing symbol and level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownHours {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl CooldownHours {
    pub fn for_level(&self, level: AlertLevel) -> chrono::Duration {
        let hours = match level {
            AlertLevel::Low => self.low,
            AlertLevel::Medium => self.medium,
            AlertLevel::High => self.high,
        };
        chrono::Duration::seconds((hours * 3600.0) as i64)
    }
}

/// Percent-change thresholds, one per designated timeframe/level pair:
/// 1h is checked only against High, 4h against Medium, 24h against Low.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceChangeThresholds {
    pub high_1h: f64,
    pub medium_4h: f64,
    pub low_24h: f64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            collection_interval_ms: env_parse("COLLECTION_INTERVAL_MS", DEFAULT_COLLECTION_INTERVAL_MS),
            detection_interval_ms: env_parse("DETECTION_INTERVAL_MS", DEFAULT_DETECTION_INTERVAL_MS),
            stats_interval_ms: env_parse("STATS_INTERVAL_MS", DEFAULT_STATS_INTERVAL_MS),
            collection_timeout_ms: env_parse("COLLECTION_TIMEOUT_MS", DEFAULT_COLLECTION_TIMEOUT_MS),

            cooldown_hours: CooldownHours {
                low: env_parse("COOLDOWN_HOURS_LOW", 24.0),
                medium: env_parse("COOLDOWN_HOURS_MEDIUM", 4.0),
                high: env_parse("COOLDOWN_HOURS_HIGH", 1.0),
            },
            max_alerts_per_symbol_per_day: env_parse("MAX_ALERTS_PER_SYMBOL_PER_DAY", 10),
            max_global_alerts_per_day: env_parse("MAX_GLOBAL_ALERTS_PER_DAY", 50),

            price_change_thresholds: PriceChangeThresholds {
                high_1h: env_parse("PRICE_CHANGE_THRESHOLD_HIGH_1H", 10.0),
                medium_4h: env_parse("PRICE_CHANGE_THRESHOLD_MEDIUM_4H", 10.0),
                low_24h: env_parse("PRICE_CHANGE_THRESHOLD_LOW_24H", 10.0),
            },

            volume_spike_normal_multiplier: env_parse("VOLUME_SPIKE_NORMAL_MULTIPLIER", 3.0),
            volume_spike_strong_multiplier: env_parse("VOLUME_SPIKE_STRONG_MULTIPLIER", 5.0),
            volume_spike_price_change_threshold: env_parse("VOLUME_SPIKE_PRICE_CHANGE_THRESHOLD", 5.0),

            fear_greed_extreme_fear_threshold: env_parse("FEAR_GREED_EXTREME_FEAR_THRESHOLD", 20.0),
            fear_greed_extreme_greed_threshold: env_parse("FEAR_GREED_EXTREME_GREED_THRESHOLD", 80.0),

            btc_dominance_change_threshold: env_parse("BTC_DOMINANCE_CHANGE_THRESHOLD", 2.0),
            total_market_cap_change_threshold: env_parse("TOTAL_MARKET_CAP_CHANGE_THRESHOLD", 5.0),

            top_coins_limit: env_parse("TOP_COINS_LIMIT", 100),
            coingecko_api_key: env::var("COINGECKO_API_KEY").ok().filter(|k| !k.is_empty()),
        }
    }

    pub fn collection_interval(&self) -> Duration {
        Duration::from_millis(self.collection_interval_ms)
    }

    pub fn detection_interval(&self) -> Duration {
        Duration::from_millis(self.detection_interval_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }

    pub fn collection_timeout(&self) -> Duration {
        Duration::from_millis(self.collection_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collection_interval_ms: DEFAULT_COLLECTION_INTERVAL_MS,
            detection_interval_ms: DEFAULT_DETECTION_INTERVAL_MS,
            stats_interval_ms: DEFAULT_STATS_INTERVAL_MS,
            collection_timeout_ms: DEFAULT_COLLECTION_TIMEOUT_MS,
            cooldown_hours: CooldownHours {
                low: 24.0,
                medium: 4.0,
                high: 1.0,
            },
            max_alerts_per_symbol_per_day: 10,
            max_global_alerts_per_day: 50,
            price_change_thresholds: PriceChangeThresholds {
                high_1h: 10.0,
                medium_4h: 10.0,
                low_24h: 10.0,
            },
            volume_spike_normal_multiplier: 3.0,
            volume_spike_strong_multiplier: 5.0,
            volume_spike_price_change_threshold: 5.0,
            fear_greed_extreme_fear_threshold: 20.0,
            fear_greed_extreme_greed_threshold: 80.0,
            btc_dominance_change_threshold: 2.0,
            total_market_cap_change_threshold: 5.0,
            top_coins_limit: 100,
            coingecko_api_key: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
