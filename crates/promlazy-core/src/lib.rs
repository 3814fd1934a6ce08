//! promlazy core: the shared error surface and the metric primitives the
//! prometheus crate does not ship.
//!
//! This crate carries no runtime dependencies so the factory crate and any
//! tooling can share one error type.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. All fallible paths
//! surface as `LazyError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod summary;

pub use error::{LazyError, Result};
pub use summary::{Summary, SummaryOpts};
