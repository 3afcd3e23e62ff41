use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health of the data-collection cycle as reported in `system_stats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    Healthy,
    Degraded,
    Unknown,
}

/// Operational counters pushed to subscribers as `system_stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    pub alerts_today: usize,
    pub data_collection_status: CollectionStatus,
    pub last_collection: Option<DateTime<Utc>>,
    pub connected_subscribers: usize,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}
