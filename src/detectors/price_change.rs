use chrono::{Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::errors::Result;
use crate::models::{AlertLevel, AlertType, CandidateAlert};
use crate::store::MetricStore;
use crate::utils::PriceChangeThresholds;

// Tolerance when resolving the "snapshot closest to now - timeframe"
const LOOKBACK_TOLERANCE_MINUTES: i64 = 30;

/// Detects large price moves over 1h, 4h and 24h windows.
///
/// Each timeframe is checked against exactly one severity's threshold:
/// 1h against High, 4h against Medium, 24h against Low. A fast move is
/// treated as more urgent than a slow one of the same magnitude.
pub struct PriceChangeDetector {
    metric_store: Arc<dyn MetricStore>,
    thresholds: PriceChangeThresholds,
}

impl PriceChangeDetector {
    pub fn new(metric_store: Arc<dyn MetricStore>, thresholds: PriceChangeThresholds) -> Self {
        Self {
            metric_store,
            thresholds,
        }
    }

    pub async fn detect(&self) -> Result<Vec<CandidateAlert>> {
        let now = Utc::now();
        let tolerance = Duration::minutes(LOOKBACK_TOLERANCE_MINUTES);
        let checks = [
            (Duration::hours(1), "1h", AlertLevel::High, self.thresholds.high_1h),
            (Duration::hours(4), "4h", AlertLevel::Medium, self.thresholds.medium_4h),
            (Duration::hours(24), "24h", AlertLevel::Low, self.thresholds.low_24h),
        ];

        let mut candidates = Vec::new();

        for symbol in self.metric_store.symbols().await? {
            let Some(latest) = self.metric_store.latest(&symbol).await? else {
                continue;
            };

            for (timeframe, label, level, threshold) in &checks {
                let Some(past) = self
                    .metric_store
                    .snapshot_near(&symbol, now - *timeframe, tolerance)
                    .await?
                else {
                    continue;
                };

                if past.price.is_zero() {
                    continue;
                }

                let change_percent = ((latest.price - past.price) / past.price
                    * Decimal::from(100))
                .to_f64()
                .unwrap_or(0.0);

                if change_percent.abs() < *threshold {
                    continue;
                }

                debug!(
                    "{} moved {:+.2}% over {} (threshold {:.1}%)",
                    symbol, change_percent, label, threshold
                );

                let direction = if change_percent >= 0.0 { "up" } else { "down" };
                candidates.push(CandidateAlert {
                    symbol: symbol.clone(),
                    alert_type: AlertType::PriceChange,
                    level: *level,
                    title: format!("{} {} {:.1}% in {}", symbol, direction, change_percent.abs(), label),
                    description: format!(
                        "{} moved {:+.2}% over the last {} (${} -> ${})",
                        symbol, change_percent, label, past.price, latest.price
                    ),
                    change_percent: Some(change_percent),
                    timeframe: Some(label.to_string()),
                    volume: None,
                    details: json!({
                        "price_now": latest.price,
                        "price_then": past.price,
                        "threshold": threshold,
                    }),
                    timestamp: now,
                });
            }
        }

        Ok(candidates)
    }
}
