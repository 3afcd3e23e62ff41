pub mod admission;
pub mod broadcast;
pub mod collector;
pub mod detectors;
pub mod engine;
pub mod errors;
pub mod models;
pub mod store;
pub mod utils;

pub use engine::{AlertEngine, EngineStatus};
pub use errors::{AlertError, Result};
