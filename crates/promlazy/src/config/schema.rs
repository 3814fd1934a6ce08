use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use promlazy_core::error::{LazyError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    pub version: u32,

    #[serde(default)]
    pub batches: Vec<BatchConfig>,
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(LazyError::UnsupportedVersion);
        }
        if self.batches.is_empty() {
            return Err(LazyError::BadConfig("batches must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for b in &self.batches {
            if !seen.insert(b.name.as_str()) {
                return Err(LazyError::BadConfig(format!("duplicate batch name: {}", b.name)));
            }
            b.validate()?;
        }
        Ok(())
    }

    pub fn batch(&self, name: &str) -> Option<&BatchConfig> {
        self.batches.iter().find(|b| b.name == name)
    }
}

/// One factory's worth of metrics.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    pub name: String,

    #[serde(default)]
    pub namespace: String,

    #[serde(default)]
    pub subsystem: String,

    #[serde(default)]
    pub const_labels: HashMap<String, String>,

    /// Register at build time instead of on first write.
    #[serde(default)]
    pub eager: bool,

    #[serde(default)]
    pub metrics: Vec<MetricConfig>,
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LazyError::BadConfig("batch name must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for m in &self.metrics {
            if m.name.trim().is_empty() {
                return Err(LazyError::BadConfig(format!(
                    "batch {}: metric name must not be empty",
                    self.name
                )));
            }
            if !seen.insert(m.name.as_str()) {
                return Err(LazyError::BadConfig(format!(
                    "batch {}: duplicate metric name: {}",
                    self.name, m.name
                )));
            }
            m.validate().map_err(|e| match e {
                LazyError::BadConfig(msg) => {
                    LazyError::BadConfig(format!("batch {}: {msg}", self.name))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    Summary,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricConfig {
    pub kind: MetricKind,
    pub name: String,
    pub help: String,

    // histogram only
    pub buckets: Option<Vec<f64>>,

    // summary only
    pub objectives: Option<Vec<ObjectiveConfig>>,
    pub max_age_ms: Option<u64>,
    pub age_buckets: Option<u32>,
    pub buf_cap: Option<usize>,
}

impl MetricConfig {
    pub fn validate(&self) -> Result<()> {
        if self.buckets.is_some() && self.kind != MetricKind::Histogram {
            return Err(LazyError::BadConfig(format!(
                "{}: buckets are only valid on histograms",
                self.name
            )));
        }
        let summary_fields = self.objectives.is_some()
            || self.max_age_ms.is_some()
            || self.age_buckets.is_some()
            || self.buf_cap.is_some();
        if summary_fields && self.kind != MetricKind::Summary {
            return Err(LazyError::BadConfig(format!(
                "{}: objectives/max_age_ms/age_buckets/buf_cap are only valid on summaries",
                self.name
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectiveConfig {
    pub quantile: f64,
    pub error: f64,
}
