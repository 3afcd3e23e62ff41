mod alert;
mod snapshot;
mod stats;

pub use alert::{AdmittedAlert, AlertLevel, AlertType, CandidateAlert, MARKET_SYMBOL};
pub use snapshot::{CoinSummary, MarketIndicatorSnapshot, MarketOverview, MetricSnapshot};
pub use stats::{CollectionStatus, SystemStats};
