//! Shared state for the demo server.
//!
//! Holds the registry every batch targets and the set of batches whose
//! module is switched on.

use std::collections::HashSet;
use std::sync::Arc;

use prometheus::Registry;
use promlazy::config::MetricsConfig;
use promlazy::{MetricBatch, Result};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    registry: Registry,
    batches: Vec<MetricBatch>,
    enabled: HashSet<String>,
}

impl AppState {
    /// Build every configured batch. Eager batches register (or fail) here.
    pub fn new(cfg: &MetricsConfig, enabled: HashSet<String>) -> Result<Self> {
        let registry = Registry::new();
        let batches = MetricBatch::build_all(cfg, &registry)?;

        for name in &enabled {
            if cfg.batch(name).is_none() {
                tracing::warn!(batch = %name, "enabled batch is not configured");
            }
        }

        Ok(Self {
            inner: Arc::new(AppStateInner { registry, batches, enabled }),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Batches whose module is running.
    pub fn active_batches(&self) -> impl Iterator<Item = &MetricBatch> {
        self.inner
            .batches
            .iter()
            .filter(|b| self.inner.enabled.contains(b.name()))
    }
}
