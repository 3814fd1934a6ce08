//! Config-driven batches.
//!
//! A `MetricBatch` is one `LazyFactory` built from a `BatchConfig`, with its
//! handles indexed by metric name. Metric names are the config's short names
//! (before namespace/subsystem prefixing).

use std::collections::HashMap;
use std::time::Duration;

use prometheus::{HistogramOpts, Opts, Registry};
use promlazy_core::error::Result;
use promlazy_core::summary::SummaryOpts;

use crate::config::{BatchConfig, MetricConfig, MetricKind, MetricsConfig};
use crate::factory::LazyFactory;
use crate::proxy::{LazyCounter, LazyGauge, LazyHistogram, LazySummary};

pub struct MetricBatch {
    name: String,
    factory: LazyFactory,
    counters: HashMap<String, LazyCounter>,
    gauges: HashMap<String, LazyGauge>,
    histograms: HashMap<String, LazyHistogram>,
    summaries: HashMap<String, LazySummary>,
}

impl MetricBatch {
    /// Define every metric of `cfg` on a fresh factory over `registry`.
    /// Eager batches are registered before returning.
    pub fn build(cfg: &BatchConfig, registry: &Registry) -> Result<Self> {
        let mut batch = Self {
            name: cfg.name.clone(),
            factory: LazyFactory::with(registry),
            counters: HashMap::new(),
            gauges: HashMap::new(),
            histograms: HashMap::new(),
            summaries: HashMap::new(),
        };

        for m in &cfg.metrics {
            let opts = common_opts(cfg, m);
            let key = m.name.clone();
            match m.kind {
                MetricKind::Counter => {
                    batch.counters.insert(key, batch.factory.new_counter(opts)?);
                }
                MetricKind::Gauge => {
                    batch.gauges.insert(key, batch.factory.new_gauge(opts)?);
                }
                MetricKind::Histogram => {
                    let mut hopts = HistogramOpts::from(opts);
                    if let Some(buckets) = &m.buckets {
                        hopts = hopts.buckets(buckets.clone());
                    }
                    batch.histograms.insert(key, batch.factory.new_histogram(hopts)?);
                }
                MetricKind::Summary => {
                    batch.summaries.insert(key, batch.factory.new_summary(summary_opts(opts, m))?);
                }
            }
        }

        if cfg.eager {
            batch.factory.try_register()?;
        }
        tracing::debug!(
            batch = %batch.name,
            metrics = batch.factory.len(),
            eager = cfg.eager,
            "metric batch defined"
        );
        Ok(batch)
    }

    /// Build every batch of a loaded config over one registry.
    pub fn build_all(cfg: &MetricsConfig, registry: &Registry) -> Result<Vec<Self>> {
        cfg.batches.iter().map(|b| Self::build(b, registry)).collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn factory(&self) -> &LazyFactory {
        &self.factory
    }

    pub fn counter(&self, name: &str) -> Option<&LazyCounter> {
        self.counters.get(name)
    }

    pub fn gauge(&self, name: &str) -> Option<&LazyGauge> {
        self.gauges.get(name)
    }

    pub fn histogram(&self, name: &str) -> Option<&LazyHistogram> {
        self.histograms.get(name)
    }

    pub fn summary(&self, name: &str) -> Option<&LazySummary> {
        self.summaries.get(name)
    }

    pub fn counters(&self) -> impl Iterator<Item = &LazyCounter> {
        self.counters.values()
    }

    pub fn gauges(&self) -> impl Iterator<Item = &LazyGauge> {
        self.gauges.values()
    }

    pub fn histograms(&self) -> impl Iterator<Item = &LazyHistogram> {
        self.histograms.values()
    }

    pub fn summaries(&self) -> impl Iterator<Item = &LazySummary> {
        self.summaries.values()
    }
}

fn common_opts(batch: &BatchConfig, m: &MetricConfig) -> Opts {
    Opts::new(m.name.clone(), m.help.clone())
        .namespace(batch.namespace.clone())
        .subsystem(batch.subsystem.clone())
        .const_labels(batch.const_labels.clone())
}

fn summary_opts(opts: Opts, m: &MetricConfig) -> SummaryOpts {
    let mut sopts = SummaryOpts::from(opts);
    for o in m.objectives.iter().flatten() {
        sopts = sopts.objective(o.quantile, o.error);
    }
    if let Some(ms) = m.max_age_ms {
        sopts = sopts.max_age(Duration::from_millis(ms));
    }
    if let Some(n) = m.age_buckets {
        sopts = sopts.age_buckets(n);
    }
    if let Some(n) = m.buf_cap {
        sopts = sopts.buf_cap(n);
    }
    sopts
}
