use thiserror::Error;

pub type Result<T> = std::result::Result<T, AlertError>;

/// Error taxonomy for the alerting pipeline
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream fetch or store-write failure during a collection cycle
    #[error("Collection error: {0}")]
    Collection(String),

    /// A single detector failed; the remaining detectors still contribute
    #[error("Detector '{detector}' failed: {message}")]
    Detector { detector: String, message: String },

    /// Alert store write failure for an admitted batch
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A single transport emit failed
    #[error("Broadcast error: {0}")]
    Broadcast(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AlertError {
    pub fn collection(msg: impl Into<String>) -> Self {
        Self::Collection(msg.into())
    }

    pub fn detector(detector: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Detector {
            detector: detector.into(),
            message: msg.into(),
        }
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn broadcast(msg: impl Into<String>) -> Self {
        Self::Broadcast(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
