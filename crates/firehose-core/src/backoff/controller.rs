//! Mutable backoff state: grow the delay under a continuing category, raise
//! a fatal error at the ceiling, restart fresh on a category switch.

use super::policy::{BackoffTable, Category, Growth};
use std::time::Duration;

/// Fatal condition: a continuing backoff reached its category's ceiling.
/// The session must not keep retrying under that category after this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("backoff ceiling reached for {category:?}")]
pub struct BackoffExhausted {
    pub category: Category,
}

/// Per-session backoff state machine. No I/O; the caller performs the sleep.
///
/// Invariant: the stored delay and the stored category are both present or
/// both absent. `None` means "not currently backing off".
#[derive(Debug, Clone)]
pub struct BackoffController {
    table: BackoffTable,
    current: Option<(Category, Duration)>,
}

impl BackoffController {
    pub fn new(table: BackoffTable) -> Self {
        Self {
            table,
            current: None,
        }
    }

    /// Compute the next sleep duration for `category`.
    ///
    /// The first call after `reset()`, or a call whose category differs from
    /// the active one, returns that category's `initial_delay` without any
    /// ceiling check: a category switch discards the old state rather than
    /// inheriting growth from a different failure type. A continuing call
    /// grows the delay, and a grown delay that reaches or exceeds
    /// `max_delay` is returned as `BackoffExhausted` instead of a value.
    ///
    /// Note the ceiling is never checked on first entry, so a category whose
    /// `initial_delay` already exceeds its own `max_delay` will still be
    /// attempted once. Misconfiguration hazard, kept for parity with the
    /// vendor contract.
    pub fn next_delay(&mut self, category: Category) -> Result<Duration, BackoffExhausted> {
        let spec = self.table.spec(category);
        match self.current {
            Some((active, delay)) if active == category => {
                let grown = match spec.growth {
                    Growth::Linear { step } => delay + step,
                    Growth::Exponential { factor } => delay.mul_f64(factor),
                };
                if grown >= spec.max_delay {
                    return Err(BackoffExhausted { category });
                }
                self.current = Some((category, grown));
                Ok(grown)
            }
            _ => {
                self.current = Some((category, spec.initial_delay));
                Ok(spec.initial_delay)
            }
        }
    }

    /// Clear backoff state. Idempotent; the next `next_delay` call of any
    /// category behaves as a first call.
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Currently active category and delay, if backing off.
    pub fn current(&self) -> Option<(Category, Duration)> {
        self.current
    }
}
