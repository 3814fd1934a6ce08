//! Batch definitions loader (strict parsing).

pub mod schema;

use std::fs;

use promlazy_core::error::{LazyError, Result};

pub use schema::{BatchConfig, MetricConfig, MetricKind, MetricsConfig, ObjectiveConfig};

pub fn load_from_file(path: &str) -> Result<MetricsConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| LazyError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<MetricsConfig> {
    let cfg: MetricsConfig = serde_yaml::from_str(s)
        .map_err(|e| LazyError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
