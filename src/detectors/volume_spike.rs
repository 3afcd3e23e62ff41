use chrono::{Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::errors::Result;
use crate::models::{AlertLevel, AlertType, CandidateAlert};
use crate::store::MetricStore;

const SHORT_WINDOW_MINUTES: i64 = 15;
const SHORT_WINDOW_TOLERANCE_MINUTES: i64 = 10;

/// Detects unusual trading volume against the trailing 24h average.
///
/// Two independent checks per symbol: a normal spike (Medium) at
/// `normal_multiplier`, and a strong signal (High) that additionally
/// requires a sharp 15-minute price move. Both may fire in one cycle.
pub struct VolumeSpikeDetector {
    metric_store: Arc<dyn MetricStore>,
    normal_multiplier: f64,
    strong_multiplier: f64,
    price_change_threshold: f64,
}

impl VolumeSpikeDetector {
    pub fn new(
        metric_store: Arc<dyn MetricStore>,
        normal_multiplier: f64,
        strong_multiplier: f64,
        price_change_threshold: f64,
    ) -> Self {
        Self {
            metric_store,
            normal_multiplier,
            strong_multiplier,
            price_change_threshold,
        }
    }

    pub async fn detect(&self) -> Result<Vec<CandidateAlert>> {
        let now = Utc::now();
        let mut candidates = Vec::new();

        for symbol in self.metric_store.symbols().await? {
            let Some(latest) = self.metric_store.latest(&symbol).await? else {
                continue;
            };

            let window = self
                .metric_store
                .range(&symbol, now - Duration::hours(24), now)
                .await?;
            if window.len() < 2 {
                continue;
            }

            let total: Decimal = window.iter().map(|s| s.volume).sum();
            let average = total / Decimal::from(window.len());
            if average.is_zero() {
                continue;
            }

            let ratio = (latest.volume / average).to_f64().unwrap_or(0.0);

            if ratio >= self.normal_multiplier {
                debug!("{} volume at {:.1}x trailing 24h average", symbol, ratio);
                candidates.push(CandidateAlert {
                    symbol: symbol.clone(),
                    alert_type: AlertType::VolumeSpike,
                    level: AlertLevel::Medium,
                    title: format!("{} volume spike", symbol),
                    description: format!(
                        "{} trading volume is {:.1}x its trailing 24h average",
                        symbol, ratio
                    ),
                    change_percent: None,
                    timeframe: None,
                    volume: Some(latest.volume),
                    details: json!({
                        "volume_ratio": ratio,
                        "average_volume": average,
                    }),
                    timestamp: now,
                });
            }

            // Strong signal: sharp 15-minute move backed by heavy volume.
            // Both conditions must hold; either alone yields at most the
            // normal alert above.
            if ratio >= self.strong_multiplier {
                if let Some(change_percent) = self.short_window_change(&symbol, &latest.price).await? {
                    if change_percent.abs() >= self.price_change_threshold {
                        debug!(
                            "{} strong volume signal: {:+.2}% in 15m at {:.1}x volume",
                            symbol, change_percent, ratio
                        );
                        candidates.push(CandidateAlert {
                            symbol: symbol.clone(),
                            alert_type: AlertType::VolumeSpike,
                            level: AlertLevel::High,
                            title: format!("{} strong volume signal", symbol),
                            description: format!(
                                "{} moved {:+.2}% in 15 minutes on {:.1}x average volume",
                                symbol, change_percent, ratio
                            ),
                            change_percent: Some(change_percent),
                            timeframe: Some("15m".to_string()),
                            volume: Some(latest.volume),
                            details: json!({
                                "volume_ratio": ratio,
                                "average_volume": average,
                            }),
                            timestamp: now,
                        });
                    }
                }
            }
        }

        Ok(candidates)
    }

    async fn short_window_change(&self, symbol: &str, latest_price: &Decimal) -> Result<Option<f64>> {
        let past = self
            .metric_store
            .snapshot_near(
                symbol,
                Utc::now() - Duration::minutes(SHORT_WINDOW_MINUTES),
                Duration::minutes(SHORT_WINDOW_TOLERANCE_MINUTES),
            )
            .await?;

        Ok(past.filter(|p| !p.price.is_zero()).map(|p| {
            ((*latest_price - p.price) / p.price * Decimal::from(100))
                .to_f64()
                .unwrap_or(0.0)
        }))
    }
}
