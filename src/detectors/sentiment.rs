use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::errors::Result;
use crate::models::{AlertLevel, AlertType, CandidateAlert, MARKET_SYMBOL};
use crate::store::MetricStore;

/// Detects extreme readings of the Fear & Greed index.
///
/// Market-wide signal, emitted under the synthetic MARKET symbol. Values
/// strictly between the two thresholds produce nothing.
pub struct SentimentDetector {
    metric_store: Arc<dyn MetricStore>,
    extreme_fear_threshold: f64,
    extreme_greed_threshold: f64,
}

impl SentimentDetector {
    pub fn new(
        metric_store: Arc<dyn MetricStore>,
        extreme_fear_threshold: f64,
        extreme_greed_threshold: f64,
    ) -> Self {
        Self {
            metric_store,
            extreme_fear_threshold,
            extreme_greed_threshold,
        }
    }

    pub async fn detect(&self) -> Result<Vec<CandidateAlert>> {
        let Some(indicator) = self.metric_store.latest_indicator().await? else {
            return Ok(Vec::new());
        };

        let index = indicator.fear_greed_index;
        let now = Utc::now();

        let candidate = if index <= self.extreme_fear_threshold {
            debug!("Fear & greed at {} (extreme fear)", index);
            Some(CandidateAlert {
                symbol: MARKET_SYMBOL.to_string(),
                alert_type: AlertType::Sentiment,
                level: AlertLevel::High,
                title: "Extreme fear in the market".to_string(),
                description: format!(
                    "Fear & Greed index at {:.0} (extreme fear) - historically a potential buying opportunity",
                    index
                ),
                change_percent: None,
                timeframe: None,
                volume: None,
                details: json!({
                    "fear_greed_index": index,
                    "signal": "extreme_fear",
                }),
                timestamp: now,
            })
        } else if index >= self.extreme_greed_threshold {
            debug!("Fear & greed at {} (extreme greed)", index);
            Some(CandidateAlert {
                symbol: MARKET_SYMBOL.to_string(),
                alert_type: AlertType::Sentiment,
                level: AlertLevel::High,
                title: "Extreme greed in the market".to_string(),
                description: format!(
                    "Fear & Greed index at {:.0} (extreme greed) - watch for selling pressure",
                    index
                ),
                change_percent: None,
                timeframe: None,
                volume: None,
                details: json!({
                    "fear_greed_index": index,
                    "signal": "extreme_greed",
                }),
                timestamp: now,
            })
        } else {
            None
        };

        Ok(candidate.into_iter().collect())
    }
}
