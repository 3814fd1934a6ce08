//! Lazy metric factory.
//!
//! A `LazyFactory` collects metric definitions and registers all of them with
//! its registry the first time any one of them is written to. Until then the
//! registry exports nothing from the batch, so dead code paths and disabled
//! modules stay invisible.
//!
//! Registration runs behind a one-shot gate: a mutex that also guards the
//! pending batch, plus an atomic flag for the fast path once it fired.
//! Concurrent first writes block on the mutex until the winner finishes, so no
//! writer ever forwards into a half-registered batch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use prometheus::core::Collector;
use prometheus::{Counter, Gauge, Histogram, HistogramOpts, Opts, Registry};
use promlazy_core::error::{LazyError, Result};
use promlazy_core::summary::{Summary, SummaryOpts};

use crate::proxy::{LazyCounter, LazyGauge, LazyHistogram, LazySummary};

/// Creates a batch of metrics that register on first write.
///
/// Clones share the batch and the gate.
///
/// Registration failures are fatal on the write path: a proxy whose batch
/// cannot be registered panics, like eager `register_*!` helpers do at
/// definition time. Call [`LazyFactory::register`] (or
/// [`LazyFactory::try_register`]) as soon as the owning module is known to be
/// in use to surface naming conflicts at a controlled point.
#[derive(Clone)]
pub struct LazyFactory {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    registry: Registry,
    fired: AtomicBool,
    pending: Mutex<Vec<PendingMetric>>,
}

/// A defined metric waiting for its batch to be registered.
enum PendingMetric {
    Counter(Counter),
    Gauge(Gauge),
    Histogram(Histogram),
    Summary(Summary),
}

impl PendingMetric {
    fn boxed(&self) -> Box<dyn Collector> {
        match self {
            PendingMetric::Counter(m) => Box::new(m.clone()),
            PendingMetric::Gauge(m) => Box::new(m.clone()),
            PendingMetric::Histogram(m) => Box::new(m.clone()),
            PendingMetric::Summary(m) => Box::new(m.clone()),
        }
    }

    fn name(&self) -> String {
        self.boxed()
            .desc()
            .first()
            .map(|d| d.fq_name.clone())
            .unwrap_or_default()
    }
}

impl Default for LazyFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl LazyFactory {
    /// Factory targeting `prometheus::default_registry()`.
    pub fn new() -> Self {
        Self::with(prometheus::default_registry())
    }

    /// Factory targeting an explicit registry.
    pub fn with(registry: &Registry) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: registry.clone(),
                fired: AtomicBool::new(false),
                pending: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Define a counter. Invalid options fail here, not at first write.
    pub fn new_counter(&self, opts: Opts) -> Result<LazyCounter> {
        let counter = Counter::with_opts(opts).map_err(LazyError::invalid_metric)?;
        self.shared.push(PendingMetric::Counter(counter.clone()));
        Ok(LazyCounter::new(counter, self.shared.clone()))
    }

    /// Define a gauge. Invalid options fail here, not at first write.
    pub fn new_gauge(&self, opts: Opts) -> Result<LazyGauge> {
        let gauge = Gauge::with_opts(opts).map_err(LazyError::invalid_metric)?;
        self.shared.push(PendingMetric::Gauge(gauge.clone()));
        Ok(LazyGauge::new(gauge, self.shared.clone()))
    }

    /// Define a histogram. Invalid options (including buckets) fail here.
    pub fn new_histogram(&self, opts: HistogramOpts) -> Result<LazyHistogram> {
        let histogram = Histogram::with_opts(opts).map_err(LazyError::invalid_metric)?;
        self.shared.push(PendingMetric::Histogram(histogram.clone()));
        Ok(LazyHistogram::new(histogram, self.shared.clone()))
    }

    /// Define a summary. Invalid options (including objectives) fail here.
    pub fn new_summary(&self, opts: SummaryOpts) -> Result<LazySummary> {
        let summary = Summary::with_opts(opts)?;
        self.shared.push(PendingMetric::Summary(summary.clone()));
        Ok(LazySummary::new(summary, self.shared.clone()))
    }

    /// Register the whole batch now.
    ///
    /// Idempotent: calls after the first success do nothing.
    ///
    /// # Panics
    ///
    /// Panics if the registry rejects the batch. A collision is a static
    /// programming error; use [`LazyFactory::try_register`] to handle it.
    pub fn register(&self) {
        self.shared.register();
    }

    /// Like [`LazyFactory::register`], but reports a rejected batch as
    /// `LazyError::Registration`. The gate stays open after a failure.
    pub fn try_register(&self) -> Result<()> {
        self.shared.try_register()
    }

    /// Whether the batch has been registered.
    pub fn is_registered(&self) -> bool {
        self.shared.fired.load(Ordering::Acquire)
    }

    /// Number of metrics defined on this factory.
    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Vec<PendingMetric>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, metric: PendingMetric) {
        let mut pending = self.lock();
        if self.fired.load(Ordering::Acquire) {
            tracing::warn!(
                metric = %metric.name(),
                "metric defined after its batch was registered; it will not be exported"
            );
        }
        pending.push(metric);
    }

    #[allow(clippy::panic)]
    pub(crate) fn register(&self) {
        if let Err(err) = self.try_register() {
            tracing::error!(%err, "lazy metrics registration failed");
            panic!("lazy metrics registration failed: {err}");
        }
    }

    pub(crate) fn try_register(&self) -> Result<()> {
        if self.fired.load(Ordering::Acquire) {
            return Ok(());
        }
        let pending = self.lock();
        // Another writer may have won while we waited for the lock.
        if self.fired.load(Ordering::Acquire) {
            return Ok(());
        }
        register_batch(&self.registry, &pending)?;
        self.fired.store(true, Ordering::Release);
        tracing::debug!(metrics = pending.len(), "lazy metrics batch registered");
        Ok(())
    }
}

/// Register every metric or none of them.
fn register_batch(registry: &Registry, batch: &[PendingMetric]) -> Result<()> {
    for (i, metric) in batch.iter().enumerate() {
        if let Err(e) = registry.register(metric.boxed()) {
            for done in &batch[..i] {
                if let Err(undo) = registry.unregister(done.boxed()) {
                    tracing::warn!(metric = %done.name(), %undo, "rollback unregister failed");
                }
            }
            return Err(LazyError::Registration(format!("{}: {e}", metric.name())));
        }
    }
    Ok(())
}
