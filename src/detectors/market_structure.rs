use chrono::{Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::errors::Result;
use crate::models::{AlertLevel, AlertType, CandidateAlert, MARKET_SYMBOL};
use crate::store::MetricStore;

const LOOKBACK_TOLERANCE_HOURS: i64 = 2;

/// Detects shifts in market structure over the last 24 hours: BTC
/// dominance rotation and aggregate market-cap inflow/outflow.
pub struct MarketStructureDetector {
    metric_store: Arc<dyn MetricStore>,
    dominance_change_threshold: f64,
    market_cap_change_threshold: f64,
}

impl MarketStructureDetector {
    pub fn new(
        metric_store: Arc<dyn MetricStore>,
        dominance_change_threshold: f64,
        market_cap_change_threshold: f64,
    ) -> Self {
        Self {
            metric_store,
            dominance_change_threshold,
            market_cap_change_threshold,
        }
    }

    pub async fn detect(&self) -> Result<Vec<CandidateAlert>> {
        let now = Utc::now();

        let Some(latest) = self.metric_store.latest_indicator().await? else {
            return Ok(Vec::new());
        };
        let Some(past) = self
            .metric_store
            .indicator_near(now - Duration::hours(24), Duration::hours(LOOKBACK_TOLERANCE_HOURS))
            .await?
        else {
            return Ok(Vec::new());
        };

        let mut candidates = Vec::new();

        let dominance_change = latest.btc_dominance - past.btc_dominance;
        if dominance_change.abs() >= self.dominance_change_threshold {
            let direction = if dominance_change > 0.0 {
                "toward BTC"
            } else {
                "away from BTC into altcoins"
            };
            debug!("BTC dominance shifted {:+.2}pp over 24h", dominance_change);
            candidates.push(CandidateAlert {
                symbol: MARKET_SYMBOL.to_string(),
                alert_type: AlertType::MarketStructure,
                level: AlertLevel::Medium,
                title: "BTC dominance shift".to_string(),
                description: format!(
                    "BTC dominance moved {:+.2}pp in 24h ({:.1}% -> {:.1}%), capital rotating {}",
                    dominance_change, past.btc_dominance, latest.btc_dominance, direction
                ),
                change_percent: Some(dominance_change),
                timeframe: Some("24h".to_string()),
                volume: None,
                details: json!({
                    "dominance_now": latest.btc_dominance,
                    "dominance_then": past.btc_dominance,
                }),
                timestamp: now,
            });
        }

        if !past.total_market_cap.is_zero() {
            let cap_change_percent = ((latest.total_market_cap - past.total_market_cap)
                / past.total_market_cap
                * Decimal::from(100))
            .to_f64()
            .unwrap_or(0.0);

            if cap_change_percent.abs() >= self.market_cap_change_threshold {
                let direction = if cap_change_percent > 0.0 {
                    "flowing into"
                } else {
                    "flowing out of"
                };
                debug!("Total market cap changed {:+.2}% over 24h", cap_change_percent);
                candidates.push(CandidateAlert {
                    symbol: MARKET_SYMBOL.to_string(),
                    alert_type: AlertType::MarketStructure,
                    level: AlertLevel::High,
                    title: "Total market cap swing".to_string(),
                    description: format!(
                        "Total market cap changed {:+.2}% in 24h, capital {} the market",
                        cap_change_percent, direction
                    ),
                    change_percent: Some(cap_change_percent),
                    timeframe: Some("24h".to_string()),
                    volume: None,
                    details: json!({
                        "market_cap_now": latest.total_market_cap,
                        "market_cap_then": past.total_market_cap,
                    }),
                    timestamp: now,
                });
            }
        }

        Ok(candidates)
    }
}
