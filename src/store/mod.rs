mod alerts;
mod metrics;

pub use alerts::{AlertFilter, AlertStore, InMemoryAlertStore};
pub use metrics::{InMemoryMetricStore, MetricStore};
