use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Synthetic symbol for market-wide alerts (sentiment, market structure)
pub const MARKET_SYMBOL: &str = "MARKET";

/// Alert categories, one per detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    PriceChange,
    VolumeSpike,
    Sentiment,
    MarketStructure,
}

/// Severity levels, ordered Low < Medium < High.
///
/// The ordering doubles as the priority key when candidates compete for
/// the remaining global daily slots.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Low,
    Medium,
    High,
}

impl AlertLevel {
    pub fn priority(&self) -> u8 {
        match self {
            AlertLevel::High => 3,
            AlertLevel::Medium => 2,
            AlertLevel::Low => 1,
        }
    }
}

/// Detector output prior to admission control. Never persisted directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateAlert {
    pub symbol: String,
    pub alert_type: AlertType,
    pub level: AlertLevel,
    pub title: String,
    pub description: String,
    pub change_percent: Option<f64>,
    pub timeframe: Option<String>,
    pub volume: Option<Decimal>,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// A candidate that cleared cooldown, per-symbol cap and global cap.
///
/// Immutable once created except for the `dismissed` flag, which a viewing
/// action may set later through the alert store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmittedAlert {
    pub id: Uuid,
    pub symbol: String,
    pub alert_type: AlertType,
    pub level: AlertLevel,
    pub title: String,
    pub description: String,
    pub change_percent: Option<f64>,
    pub timeframe: Option<String>,
    pub volume: Option<Decimal>,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub dismissed: bool,
}

impl AdmittedAlert {
    pub fn from_candidate(candidate: CandidateAlert) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: candidate.symbol,
            alert_type: candidate.alert_type,
            level: candidate.level,
            title: candidate.title,
            description: candidate.description,
            change_percent: candidate.change_percent,
            timeframe: candidate.timeframe,
            volume: candidate.volume,
            details: candidate.details,
            timestamp: candidate.timestamp,
            dismissed: false,
        }
    }
}
