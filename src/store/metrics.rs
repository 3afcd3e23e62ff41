use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::errors::Result;
use crate::models::{MarketIndicatorSnapshot, MetricSnapshot};

/// Append-only history of per-symbol and global market snapshots.
///
/// Snapshots are immutable once written; detectors only read.
#[async_trait]
pub trait MetricStore: Send + Sync {
    async fn append(&self, snapshot: MetricSnapshot) -> Result<()>;
    async fn append_indicator(&self, snapshot: MarketIndicatorSnapshot) -> Result<()>;

    /// Most recent snapshot for a symbol
    async fn latest(&self, symbol: &str) -> Result<Option<MetricSnapshot>>;

    /// Snapshot closest to `at`, or None if nothing falls within `tolerance`
    async fn snapshot_near(
        &self,
        symbol: &str,
        at: DateTime<Utc>,
        tolerance: Duration,
    ) -> Result<Option<MetricSnapshot>>;

    /// Snapshots with `from <= timestamp <= to`, oldest first
    async fn range(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MetricSnapshot>>;

    async fn latest_indicator(&self) -> Result<Option<MarketIndicatorSnapshot>>;

    async fn indicator_near(
        &self,
        at: DateTime<Utc>,
        tolerance: Duration,
    ) -> Result<Option<MarketIndicatorSnapshot>>;

    /// All symbols with at least one snapshot
    async fn symbols(&self) -> Result<Vec<String>>;
}

// Per-symbol history cap; at a 5-minute collection cadence this covers
// roughly a week, far beyond the 24h lookback any detector needs.
const MAX_HISTORY_PER_SYMBOL: usize = 2000;
const MAX_INDICATOR_HISTORY: usize = 2000;

/// In-memory metric store for tests and standalone runs
#[derive(Clone, Default)]
pub struct InMemoryMetricStore {
    snapshots: Arc<RwLock<HashMap<String, VecDeque<MetricSnapshot>>>>,
    indicators: Arc<RwLock<VecDeque<MarketIndicatorSnapshot>>>,
}

impl InMemoryMetricStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricStore for InMemoryMetricStore {
    async fn append(&self, snapshot: MetricSnapshot) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        let history = snapshots
            .entry(snapshot.symbol.clone())
            .or_insert_with(|| VecDeque::with_capacity(256));

        history.push_back(snapshot);
        if history.len() > MAX_HISTORY_PER_SYMBOL {
            history.pop_front();
        }

        Ok(())
    }

    async fn append_indicator(&self, snapshot: MarketIndicatorSnapshot) -> Result<()> {
        let mut indicators = self.indicators.write().await;
        indicators.push_back(snapshot);
        if indicators.len() > MAX_INDICATOR_HISTORY {
            indicators.pop_front();
        }

        Ok(())
    }

    async fn latest(&self, symbol: &str) -> Result<Option<MetricSnapshot>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(symbol).and_then(|h| h.back().cloned()))
    }

    async fn snapshot_near(
        &self,
        symbol: &str,
        at: DateTime<Utc>,
        tolerance: Duration,
    ) -> Result<Option<MetricSnapshot>> {
        let snapshots = self.snapshots.read().await;
        let Some(history) = snapshots.get(symbol) else {
            return Ok(None);
        };

        let nearest = history
            .iter()
            .min_by_key(|s| (s.timestamp - at).abs())
            .filter(|s| (s.timestamp - at).abs() <= tolerance)
            .cloned();

        Ok(nearest)
    }

    async fn range(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MetricSnapshot>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots
            .get(symbol)
            .map(|h| {
                h.iter()
                    .filter(|s| s.timestamp >= from && s.timestamp <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn latest_indicator(&self) -> Result<Option<MarketIndicatorSnapshot>> {
        let indicators = self.indicators.read().await;
        Ok(indicators.back().cloned())
    }

    async fn indicator_near(
        &self,
        at: DateTime<Utc>,
        tolerance: Duration,
    ) -> Result<Option<MarketIndicatorSnapshot>> {
        let indicators = self.indicators.read().await;
        let nearest = indicators
            .iter()
            .min_by_key(|s| (s.timestamp - at).abs())
            .filter(|s| (s.timestamp - at).abs() <= tolerance)
            .cloned();

        Ok(nearest)
    }

    async fn symbols(&self) -> Result<Vec<String>> {
        let snapshots = self.snapshots.read().await;
        let mut symbols: Vec<String> = snapshots.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}
