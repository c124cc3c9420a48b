//! Backoff policy and state machine for reconnect attempts.
//!
//! This module encapsulates the vendor's "stalls and reconnecting" contract:
//! failure classification into a small set of categories, a per-category
//! delay curve (linear or exponential) with a hard ceiling, and a controller
//! that grows the delay under a continuing category and raises a fatal
//! condition when the ceiling is reached.

mod classify;
mod controller;
mod policy;

pub use classify::classify;
pub use controller::{BackoffController, BackoffExhausted};
pub use policy::{BackoffSpec, BackoffTable, Category, Growth};
