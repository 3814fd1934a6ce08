#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use prometheus::proto::{MetricFamily, MetricType};
use prometheus::{HistogramOpts, Opts, Registry};
use promlazy::{LazyError, LazyFactory, SummaryOpts};

fn value(families: &[MetricFamily], name: &str) -> f64 {
    let family = families
        .iter()
        .find(|f| f.get_name() == name)
        .unwrap_or_else(|| panic!("{name} not gathered"));
    let metric = &family.get_metric()[0];
    match family.get_field_type() {
        MetricType::COUNTER => metric.get_counter().get_value(),
        MetricType::GAUGE => metric.get_gauge().get_value(),
        other => panic!("unexpected type {other:?}"),
    }
}

#[test]
fn first_write_registers_whole_batch() {
    let registry = Registry::new();
    let batch = LazyFactory::with(&registry);
    let m1 = batch.new_gauge(Opts::new("m1", "First metric.")).unwrap();
    let m2 = batch.new_counter(Opts::new("m2", "Second metric.")).unwrap();

    assert!(registry.gather().is_empty());
    assert!(!batch.is_registered());

    m1.set(42.0);
    let gathered = registry.gather();
    assert_eq!(gathered.len(), 2);
    assert_eq!(value(&gathered, "m1"), 42.0);
    assert_eq!(value(&gathered, "m2"), 0.0);
    assert!(batch.is_registered());

    m1.inc();
    m2.inc_by(3.0);
    m1.dec();
    let gathered = registry.gather();
    assert_eq!(gathered.len(), 2);
    assert_eq!(value(&gathered, "m1"), 42.0);
    assert_eq!(value(&gathered, "m2"), 3.0);
}

#[test]
fn every_gauge_write_triggers_registration() {
    type Write = fn(&promlazy::LazyGauge);
    let writes: [Write; 6] = [
        |g| g.set(1.0),
        |g| g.inc(),
        |g| g.dec(),
        |g| g.add(2.0),
        |g| g.sub(2.0),
        |g| g.set_to_current_time(),
    ];
    for write in writes {
        let registry = Registry::new();
        let batch = LazyFactory::with(&registry);
        let g = batch.new_gauge(Opts::new("g", "Gauge.")).unwrap();
        assert!(registry.gather().is_empty());
        write(&g);
        assert_eq!(registry.gather().len(), 1);
    }
}

#[test]
fn counter_inc_triggers_registration() {
    let registry = Registry::new();
    let batch = LazyFactory::with(&registry);
    let c = batch.new_counter(Opts::new("c_total", "Counter.")).unwrap();
    c.inc();
    assert_eq!(value(&registry.gather(), "c_total"), 1.0);
}

#[test]
fn set_to_current_time_uses_unix_seconds() {
    let registry = Registry::new();
    let batch = LazyFactory::with(&registry);
    let g = batch.new_gauge(Opts::new("last_seen_seconds", "Last seen.")).unwrap();
    g.set_to_current_time();
    assert!(value(&registry.gather(), "last_seen_seconds") > 1_600_000_000.0);
}

#[test]
fn histogram_and_summary_observe_register_batch() {
    let registry = Registry::new();
    let batch = LazyFactory::with(&registry);
    let h = batch
        .new_histogram(HistogramOpts::new("size_bytes", "Size.").buckets(vec![1.0, 10.0]))
        .unwrap();
    let s = batch
        .new_summary(SummaryOpts::new("duration_seconds", "Duration.").objective(0.5, 0.05))
        .unwrap();

    assert!(registry.gather().is_empty());
    s.observe(0.25);

    let gathered = registry.gather();
    assert_eq!(gathered.len(), 2);
    let summary = gathered
        .iter()
        .find(|f| f.get_name() == "duration_seconds")
        .unwrap();
    assert_eq!(summary.get_field_type(), MetricType::SUMMARY);
    let inner = summary.get_metric()[0].get_summary();
    assert_eq!(inner.get_sample_count(), 1);
    assert_eq!(inner.get_quantile()[0].get_value(), 0.25);

    h.observe(5.0);
    let gathered = registry.gather();
    let hist = gathered.iter().find(|f| f.get_name() == "size_bytes").unwrap();
    assert_eq!(hist.get_metric()[0].get_histogram().get_sample_count(), 1);
    assert_eq!(gathered.len(), 2);
}

#[test]
fn explicit_register_matches_first_write() {
    let registry = Registry::new();
    let batch = LazyFactory::with(&registry);
    let g = batch.new_gauge(Opts::new("m1", "First metric.")).unwrap();
    let _c = batch.new_counter(Opts::new("m2", "Second metric.")).unwrap();

    batch.register();
    batch.register();
    batch.try_register().unwrap();
    let gathered = registry.gather();
    assert_eq!(gathered.len(), 2);
    assert_eq!(value(&gathered, "m1"), 0.0);

    g.set(7.0);
    assert_eq!(registry.gather().len(), 2);
}

#[test]
fn clones_share_the_gate() {
    let registry = Registry::new();
    let batch = LazyFactory::with(&registry);
    let other = batch.clone();
    let c = other.new_counter(Opts::new("shared_total", "Shared.")).unwrap();
    assert_eq!(batch.len(), 1);
    c.inc();
    assert!(batch.is_registered());
}

#[test]
fn invalid_definitions_fail_at_construction() {
    let registry = Registry::new();
    let batch = LazyFactory::with(&registry);
    let err = batch.new_counter(Opts::new("bad name", "Help.")).err().unwrap();
    assert!(matches!(err, LazyError::InvalidMetric(_)));
    let err = batch
        .new_histogram(HistogramOpts::new("h", "Help.").buckets(vec![2.0, 1.0]))
        .err()
        .unwrap();
    assert!(matches!(err, LazyError::InvalidMetric(_)));
    assert!(batch.is_empty());
}

#[test]
fn collision_surfaces_on_registration_not_definition() {
    let registry = Registry::new();
    let first = LazyFactory::with(&registry);
    let second = LazyFactory::with(&registry);
    first.new_counter(Opts::new("dup_total", "Dup.")).unwrap().inc();

    let _unique = second.new_gauge(Opts::new("unique", "Unique.")).unwrap();
    let _dup = second.new_counter(Opts::new("dup_total", "Dup.")).unwrap();
    assert_eq!(registry.gather().len(), 1);

    let err = second.try_register().unwrap_err();
    assert!(err.is_registration());
    assert!(!second.is_registered());

    // Nothing from the rejected batch is left behind.
    let gathered = registry.gather();
    assert_eq!(gathered.len(), 1);
    assert_eq!(gathered[0].get_name(), "dup_total");
}

#[test]
#[should_panic(expected = "lazy metrics registration failed")]
fn collision_panics_on_first_write() {
    let registry = Registry::new();
    let first = LazyFactory::with(&registry);
    let second = LazyFactory::with(&registry);
    let a = first.new_counter(Opts::new("dup_total", "Dup.")).unwrap();
    let b = second.new_counter(Opts::new("dup_total", "Dup.")).unwrap();
    a.inc();
    b.inc();
}

#[test]
#[should_panic(expected = "lazy metrics registration failed")]
fn duplicate_within_batch_panics_on_first_write() {
    let registry = Registry::new();
    let batch = LazyFactory::with(&registry);
    let g = batch.new_gauge(Opts::new("twice", "Twice.")).unwrap();
    let _again = batch.new_gauge(Opts::new("twice", "Twice.")).unwrap();
    g.set(1.0);
}

#[test]
fn late_definitions_are_never_registered() {
    let registry = Registry::new();
    let batch = LazyFactory::with(&registry);
    batch.new_counter(Opts::new("early_total", "Early.")).unwrap().inc();

    let late = batch.new_gauge(Opts::new("late", "Late.")).unwrap();
    late.set(1.0);
    batch.register();

    let gathered = registry.gather();
    assert_eq!(gathered.len(), 1);
    assert_eq!(gathered[0].get_name(), "early_total");
    assert_eq!(batch.len(), 2);
}

#[test]
fn default_factory_targets_default_registry() {
    let name = "promlazy_default_registry_probe_total";
    let batch = LazyFactory::new();
    let c = batch.new_counter(Opts::new(name, "Probe.")).unwrap();

    let listed = |n: &str| prometheus::gather().iter().any(|f| f.get_name() == n);
    assert!(!listed(name));
    c.inc();
    assert!(listed(name));
}
