//! Write-triggered metric handles.
//!
//! Each handle wraps the real metric plus its factory. Every mutating call
//! fires the factory gate first, because any write may be the batch's first.
//! Handles expose nothing but their kind's writes.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use prometheus::{Counter, Gauge, Histogram};
use promlazy_core::summary::Summary;

use crate::factory::Shared;

/// Counter that registers its batch on first write.
#[derive(Clone)]
pub struct LazyCounter {
    inner: Counter,
    factory: Arc<Shared>,
}

impl LazyCounter {
    pub(crate) fn new(inner: Counter, factory: Arc<Shared>) -> Self {
        Self { inner, factory }
    }

    pub fn inc(&self) {
        self.factory.register();
        self.inner.inc();
    }

    /// Add a non-negative delta.
    pub fn inc_by(&self, v: f64) {
        self.factory.register();
        self.inner.inc_by(v);
    }
}

/// Gauge that registers its batch on first write.
#[derive(Clone)]
pub struct LazyGauge {
    inner: Gauge,
    factory: Arc<Shared>,
}

impl LazyGauge {
    pub(crate) fn new(inner: Gauge, factory: Arc<Shared>) -> Self {
        Self { inner, factory }
    }

    pub fn set(&self, v: f64) {
        self.factory.register();
        self.inner.set(v);
    }

    pub fn inc(&self) {
        self.factory.register();
        self.inner.inc();
    }

    pub fn dec(&self) {
        self.factory.register();
        self.inner.dec();
    }

    pub fn add(&self, v: f64) {
        self.factory.register();
        self.inner.add(v);
    }

    pub fn sub(&self, v: f64) {
        self.factory.register();
        self.inner.sub(v);
    }

    /// Set to the current Unix time in seconds.
    pub fn set_to_current_time(&self) {
        self.factory.register();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        self.inner.set(now);
    }
}

/// Histogram that registers its batch on first observation.
#[derive(Clone)]
pub struct LazyHistogram {
    inner: Histogram,
    factory: Arc<Shared>,
}

impl LazyHistogram {
    pub(crate) fn new(inner: Histogram, factory: Arc<Shared>) -> Self {
        Self { inner, factory }
    }

    pub fn observe(&self, v: f64) {
        self.factory.register();
        self.inner.observe(v);
    }
}

/// Summary that registers its batch on first observation.
#[derive(Clone)]
pub struct LazySummary {
    inner: Summary,
    factory: Arc<Shared>,
}

impl LazySummary {
    pub(crate) fn new(inner: Summary, factory: Arc<Shared>) -> Self {
        Self { inner, factory }
    }

    pub fn observe(&self, v: f64) {
        self.factory.register();
        self.inner.observe(v);
    }
}
