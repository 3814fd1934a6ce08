//! Synthetic workload for enabled modules.
//!
//! Each tick writes to every metric of every active batch. Batches of
//! disabled modules are never touched and therefore never exported.

use std::time::{Duration, Instant};

use crate::app_state::AppState;

pub async fn run(state: AppState, tick: Duration) {
    let started = Instant::now();
    let mut interval = tokio::time::interval(tick);
    loop {
        interval.tick().await;
        let elapsed = started.elapsed().as_secs_f64();
        for batch in state.active_batches() {
            batch.counters().for_each(|c| c.inc());
            batch.gauges().for_each(|g| g.set_to_current_time());
            batch.histograms().for_each(|h| h.observe(elapsed % 10.0));
            batch.summaries().for_each(|s| s.observe(elapsed % 1.0));
        }
        tracing::trace!(elapsed, "workload tick");
    }
}
