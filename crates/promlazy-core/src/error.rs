//! Shared error type across promlazy crates.

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, LazyError>;

/// Unified error type used by core, the factory, and the config loader.
#[derive(Debug, Error)]
pub enum LazyError {
    /// A metric definition was rejected while building the metric object.
    #[error("invalid metric: {0}")]
    InvalidMetric(String),
    /// The registry refused the batch (name collision, inconsistent help, ...).
    #[error("registration failed: {0}")]
    Registration(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl LazyError {
    /// Wrap a backend error raised while constructing a metric.
    pub fn invalid_metric(err: prometheus::Error) -> Self {
        LazyError::InvalidMetric(err.to_string())
    }

    /// True for collisions reported at registration time.
    pub fn is_registration(&self) -> bool {
        matches!(self, LazyError::Registration(_))
    }
}
