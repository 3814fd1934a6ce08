//! Summary metric for the prometheus crate.
//!
//! The prometheus crate ships counters, gauges and histograms but no summary.
//! `Summary` fills the gap as a plain `Collector`: a cumulative count and sum,
//! plus quantiles over a sliding time window. The window is split into
//! `age_buckets` streams that rotate every `max_age / age_buckets`; quantiles
//! are read from the oldest live stream, which covers up to `max_age`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use prometheus::core::{Collector, Desc};
use prometheus::proto::{self, MetricFamily, MetricType};
use prometheus::Opts;

use crate::error::{LazyError, Result};

/// Default window length for quantile estimation.
pub const DEF_MAX_AGE: Duration = Duration::from_secs(10 * 60);
/// Default number of streams the window is split into.
pub const DEF_AGE_BUCKETS: u32 = 5;
/// Default number of samples retained per stream.
pub const DEF_BUF_CAP: usize = 500;

/// Upper bound on `age_buckets`; each bucket is a preallocated stream.
pub const MAX_AGE_BUCKETS: u32 = 1024;

/// Label name reserved for the quantile dimension.
const QUANTILE_LABEL: &str = "quantile";

/// Options for building a [`Summary`].
#[derive(Clone, Debug)]
pub struct SummaryOpts {
    pub common_opts: Opts,
    /// `(quantile, allowed error)` pairs to export.
    pub objectives: Vec<(f64, f64)>,
    pub max_age: Duration,
    pub age_buckets: u32,
    pub buf_cap: usize,
}

impl SummaryOpts {
    pub fn new<S1: Into<String>, S2: Into<String>>(name: S1, help: S2) -> Self {
        Opts::new(name, help).into()
    }

    pub fn namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.common_opts.namespace = namespace.into();
        self
    }

    pub fn subsystem<S: Into<String>>(mut self, subsystem: S) -> Self {
        self.common_opts.subsystem = subsystem.into();
        self
    }

    pub fn const_label<S1: Into<String>, S2: Into<String>>(mut self, name: S1, value: S2) -> Self {
        self.common_opts = self.common_opts.const_label(name, value);
        self
    }

    pub fn const_labels(mut self, labels: HashMap<String, String>) -> Self {
        self.common_opts = self.common_opts.const_labels(labels);
        self
    }

    /// Add an exported quantile.
    pub fn objective(mut self, quantile: f64, error: f64) -> Self {
        self.objectives.push((quantile, error));
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn age_buckets(mut self, age_buckets: u32) -> Self {
        self.age_buckets = age_buckets;
        self
    }

    pub fn buf_cap(mut self, buf_cap: usize) -> Self {
        self.buf_cap = buf_cap;
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.common_opts.variable_labels.is_empty() {
            return Err(LazyError::InvalidMetric(
                "summary does not take variable labels".into(),
            ));
        }
        if self.common_opts.const_labels.contains_key(QUANTILE_LABEL) {
            return Err(LazyError::InvalidMetric(format!(
                "\"{QUANTILE_LABEL}\" is reserved for summaries"
            )));
        }
        for &(q, e) in &self.objectives {
            if !(0.0..=1.0).contains(&q) {
                return Err(LazyError::InvalidMetric(format!(
                    "objective quantile {q} out of [0, 1]"
                )));
            }
            if !(0.0..1.0).contains(&e) {
                return Err(LazyError::InvalidMetric(format!(
                    "objective error {e} out of [0, 1)"
                )));
            }
        }
        if self.max_age.is_zero() {
            return Err(LazyError::InvalidMetric("max_age must be positive".into()));
        }
        if self.age_buckets == 0 || self.age_buckets > MAX_AGE_BUCKETS {
            return Err(LazyError::InvalidMetric(format!(
                "age_buckets must be in 1..={MAX_AGE_BUCKETS}"
            )));
        }
        if (self.max_age / self.age_buckets).is_zero() {
            return Err(LazyError::InvalidMetric(
                "max_age is too short to split into age_buckets".into(),
            ));
        }
        if self.buf_cap == 0 {
            return Err(LazyError::InvalidMetric("buf_cap must be positive".into()));
        }
        Ok(())
    }
}

impl From<Opts> for SummaryOpts {
    fn from(common_opts: Opts) -> Self {
        Self {
            common_opts,
            objectives: Vec::new(),
            max_age: DEF_MAX_AGE,
            age_buckets: DEF_AGE_BUCKETS,
            buf_cap: DEF_BUF_CAP,
        }
    }
}

/// A summary metric: count, sum and windowed quantiles of observations.
///
/// Clones share the same underlying state.
#[derive(Clone)]
pub struct Summary {
    core: Arc<SummaryCore>,
}

struct SummaryCore {
    desc: Desc,
    objectives: Vec<(f64, f64)>,
    state: Mutex<SummaryState>,
}

struct SummaryState {
    count: u64,
    sum: f64,
    window: Window,
}

impl Summary {
    pub fn with_opts(opts: SummaryOpts) -> Result<Self> {
        opts.validate()?;
        let common = &opts.common_opts;
        let desc = Desc::new(
            common.fq_name(),
            common.help.clone(),
            Vec::new(),
            common.const_labels.clone(),
        )
        .map_err(LazyError::invalid_metric)?;

        let mut objectives = opts.objectives.clone();
        objectives.sort_by(|a, b| a.0.total_cmp(&b.0));

        let window = Window::new(opts.max_age, opts.age_buckets, opts.buf_cap, Instant::now());
        Ok(Self {
            core: Arc::new(SummaryCore {
                desc,
                objectives,
                state: Mutex::new(SummaryState { count: 0, sum: 0.0, window }),
            }),
        })
    }

    /// Record one observation.
    pub fn observe(&self, v: f64) {
        let now = Instant::now();
        let mut state = self.core.lock();
        state.count += 1;
        state.sum += v;
        if !v.is_nan() {
            state.window.observe(v, now);
        }
    }

    pub fn get_sample_count(&self) -> u64 {
        self.core.lock().count
    }

    pub fn get_sample_sum(&self) -> f64 {
        self.core.lock().sum
    }
}

impl SummaryCore {
    fn lock(&self) -> std::sync::MutexGuard<'_, SummaryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Collector for Summary {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.core.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let (count, sum, quantiles) = {
            let mut state = self.core.lock();
            state.window.rotate(Instant::now());
            let quantiles = state.window.quantiles(&self.core.objectives);
            (state.count, state.sum, quantiles)
        };

        let mut summary = proto::Summary::default();
        summary.set_sample_count(count);
        summary.set_sample_sum(sum);
        for (q, v) in quantiles {
            let mut quantile = proto::Quantile::default();
            quantile.set_quantile(q);
            quantile.set_value(v);
            summary.mut_quantile().push(quantile);
        }

        let mut metric = proto::Metric::default();
        for pair in &self.core.desc.const_label_pairs {
            metric.mut_label().push(pair.clone());
        }
        metric.set_summary(summary);

        let mut family = MetricFamily::default();
        family.set_name(self.core.desc.fq_name.clone());
        family.set_help(self.core.desc.help.clone());
        family.set_field_type(MetricType::SUMMARY);
        family.mut_metric().push(metric);
        vec![family]
    }
}

/// Rotating set of sample streams. `streams[head]` is the oldest.
struct Window {
    streams: Vec<VecDeque<f64>>,
    head: usize,
    head_expires: Instant,
    stream_duration: Duration,
    max_age: Duration,
    buf_cap: usize,
}

impl Window {
    fn new(max_age: Duration, age_buckets: u32, buf_cap: usize, now: Instant) -> Self {
        let stream_duration = max_age / age_buckets;
        Self {
            streams: (0..age_buckets).map(|_| VecDeque::new()).collect(),
            head: 0,
            head_expires: now + stream_duration,
            stream_duration,
            max_age,
            buf_cap,
        }
    }

    fn observe(&mut self, v: f64, now: Instant) {
        self.rotate(now);
        for stream in &mut self.streams {
            if stream.len() == self.buf_cap {
                stream.pop_front();
            }
            stream.push_back(v);
        }
    }

    fn rotate(&mut self, now: Instant) {
        if now.saturating_duration_since(self.head_expires) >= self.max_age {
            // Idle for a whole window: every stream is stale.
            self.streams.iter_mut().for_each(VecDeque::clear);
            self.head = 0;
            self.head_expires = now + self.stream_duration;
            return;
        }
        while now > self.head_expires {
            self.streams[self.head].clear();
            self.head = (self.head + 1) % self.streams.len();
            self.head_expires += self.stream_duration;
        }
    }

    fn quantiles(&self, objectives: &[(f64, f64)]) -> Vec<(f64, f64)> {
        let mut sorted: Vec<f64> = self.streams[self.head].iter().copied().collect();
        sorted.sort_by(f64::total_cmp);
        objectives
            .iter()
            .map(|&(q, _)| (q, rank(&sorted, q)))
            .collect()
    }
}

/// Exact rank query over sorted samples; NaN when empty.
fn rank(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    let idx = ((q * n as f64).ceil() as usize).clamp(1, n);
    sorted[idx - 1]
}
