use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{AdmittedAlert, AlertLevel, AlertType};

/// Query filter for counting admitted alerts
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub symbol: Option<String>,
    pub level: Option<AlertLevel>,
    pub alert_type: Option<AlertType>,
    pub since: Option<DateTime<Utc>>,
}

impl AlertFilter {
    pub fn since(since: DateTime<Utc>) -> Self {
        Self {
            since: Some(since),
            ..Default::default()
        }
    }

    pub fn symbol_since(symbol: impl Into<String>, since: DateTime<Utc>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            since: Some(since),
            ..Default::default()
        }
    }

    fn matches(&self, alert: &AdmittedAlert) -> bool {
        self.symbol.as_deref().map_or(true, |s| alert.symbol == s)
            && self.level.map_or(true, |l| alert.level == l)
            && self.alert_type.map_or(true, |t| alert.alert_type == t)
            && self.since.map_or(true, |ts| alert.timestamp >= ts)
    }
}

/// Durable, queryable log of admitted alerts.
///
/// The admission controller is the only component that calls `create`;
/// detectors and the stats cycle only query.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn create(&self, records: &[AdmittedAlert]) -> Result<()>;

    async fn count(&self, filter: AlertFilter) -> Result<usize>;

    /// Most recent alert matching (symbol, level, type) at or after `since`
    async fn most_recent(
        &self,
        symbol: &str,
        level: AlertLevel,
        alert_type: AlertType,
        since: DateTime<Utc>,
    ) -> Result<Option<AdmittedAlert>>;

    /// Most recent alerts, newest first
    async fn find_recent(&self, limit: usize) -> Result<Vec<AdmittedAlert>>;

    /// Flip the dismissed flag; returns false when the id is unknown
    async fn mark_dismissed(&self, id: Uuid) -> Result<bool>;
}

const MAX_RETAINED_ALERTS: usize = 10_000;

/// In-memory alert store for tests and standalone runs
#[derive(Clone, Default)]
pub struct InMemoryAlertStore {
    alerts: Arc<RwLock<VecDeque<AdmittedAlert>>>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn create(&self, records: &[AdmittedAlert]) -> Result<()> {
        let mut alerts = self.alerts.write().await;
        for record in records {
            alerts.push_back(record.clone());
            if alerts.len() > MAX_RETAINED_ALERTS {
                alerts.pop_front();
            }
        }

        Ok(())
    }

    async fn count(&self, filter: AlertFilter) -> Result<usize> {
        let alerts = self.alerts.read().await;
        Ok(alerts.iter().filter(|a| filter.matches(a)).count())
    }

    async fn most_recent(
        &self,
        symbol: &str,
        level: AlertLevel,
        alert_type: AlertType,
        since: DateTime<Utc>,
    ) -> Result<Option<AdmittedAlert>> {
        let alerts = self.alerts.read().await;
        Ok(alerts
            .iter()
            .filter(|a| {
                a.symbol == symbol
                    && a.level == level
                    && a.alert_type == alert_type
                    && a.timestamp >= since
            })
            .max_by_key(|a| a.timestamp)
            .cloned())
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<AdmittedAlert>> {
        let alerts = self.alerts.read().await;
        Ok(alerts.iter().rev().take(limit).cloned().collect())
    }

    async fn mark_dismissed(&self, id: Uuid) -> Result<bool> {
        let mut alerts = self.alerts.write().await;
        match alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.dismissed = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
