//! promlazy: Prometheus metrics that register on first write.
//!
//! Define metrics up front, the way `register_*!` helpers allow, but keep them
//! out of the registry until the code that owns them actually runs. A
//! [`LazyFactory`] groups definitions into a batch; the first write to any
//! handle from the batch registers all of them at once.
//!
//! ```no_run
//! use prometheus::{Opts, Registry};
//! use promlazy::LazyFactory;
//!
//! # fn main() -> promlazy::Result<()> {
//! let registry = Registry::new();
//! let factory = LazyFactory::with(&registry);
//! let uploads = factory.new_counter(Opts::new("uploads_total", "Uploaded files."))?;
//! assert!(registry.gather().is_empty());
//! uploads.inc();
//! assert_eq!(registry.gather().len(), 1);
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod batch;
pub mod config;
pub mod factory;
pub mod proxy;

pub use batch::MetricBatch;
pub use factory::LazyFactory;
pub use proxy::{LazyCounter, LazyGauge, LazyHistogram, LazySummary};

pub use promlazy_core::error::{LazyError, Result};
pub use promlazy_core::summary::{Summary, SummaryOpts};
