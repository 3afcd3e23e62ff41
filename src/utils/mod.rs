pub mod config;
pub mod timeout;

pub use config::{Config, CooldownHours, PriceChangeThresholds};
pub use timeout::with_timeout;
