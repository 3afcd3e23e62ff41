mod market_structure;
mod price_change;
mod sentiment;
mod volume_spike;

pub use market_structure::MarketStructureDetector;
pub use price_change::PriceChangeDetector;
pub use sentiment::SentimentDetector;
pub use volume_spike::VolumeSpikeDetector;

use std::sync::Arc;
use tracing::error;

use crate::errors::Result;
use crate::models::CandidateAlert;
use crate::store::MetricStore;
use crate::utils::Config;

/// The four anomaly detectors, run concurrently once per detection cycle.
///
/// All detectors are stateless and read-only against the metric store. A
/// failure in one detector only drops that detector's candidates; the
/// other three still contribute for the cycle.
pub struct DetectorSet {
    price_change: PriceChangeDetector,
    volume_spike: VolumeSpikeDetector,
    sentiment: SentimentDetector,
    market_structure: MarketStructureDetector,
}

impl DetectorSet {
    pub fn new(config: &Config, metric_store: Arc<dyn MetricStore>) -> Self {
        Self {
            price_change: PriceChangeDetector::new(
                Arc::clone(&metric_store),
                config.price_change_thresholds.clone(),
            ),
            volume_spike: VolumeSpikeDetector::new(
                Arc::clone(&metric_store),
                config.volume_spike_normal_multiplier,
                config.volume_spike_strong_multiplier,
                config.volume_spike_price_change_threshold,
            ),
            sentiment: SentimentDetector::new(
                Arc::clone(&metric_store),
                config.fear_greed_extreme_fear_threshold,
                config.fear_greed_extreme_greed_threshold,
            ),
            market_structure: MarketStructureDetector::new(
                metric_store,
                config.btc_dominance_change_threshold,
                config.total_market_cap_change_threshold,
            ),
        }
    }

    /// Run all four detectors against the same point-in-time read of the
    /// metric store and merge their candidates in fixed detector order.
    pub async fn run(&self) -> Vec<CandidateAlert> {
        let (price, volume, sentiment, structure) = futures::join!(
            self.price_change.detect(),
            self.volume_spike.detect(),
            self.sentiment.detect(),
            self.market_structure.detect(),
        );

        let mut candidates = Vec::new();
        candidates.extend(isolate("price_change", price));
        candidates.extend(isolate("volume_spike", volume));
        candidates.extend(isolate("sentiment", sentiment));
        candidates.extend(isolate("market_structure", structure));
        candidates
    }
}

fn isolate(detector: &str, result: Result<Vec<CandidateAlert>>) -> Vec<CandidateAlert> {
    match result {
        Ok(candidates) => candidates,
        Err(e) => {
            error!("Detector '{}' failed, dropping its candidates: {}", detector, e);
            Vec::new()
        }
    }
}
