use std::time::Duration;

/// Why the previous connection ended, for backoff purposes.
///
/// Each category has its own delay curve because the underlying failure
/// types have independent recovery time characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Transport-level failure: stall, connection error, socket error, or a
    /// clean server-side close (the vendor mandates backoff before any
    /// reconnect).
    Tcp,
    /// HTTP error response other than 420.
    Http,
    /// HTTP 420: the vendor's rate-limit signal, with a stricter curve.
    Http420,
}

/// How the delay grows while a category keeps failing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Growth {
    /// Add `step` on every continuing failure.
    Linear { step: Duration },
    /// Multiply by `factor` on every continuing failure.
    Exponential { factor: f64 },
}

/// Static delay curve for one failure category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffSpec {
    /// First delay after entering (or re-entering) this category.
    pub initial_delay: Duration,
    pub growth: Growth,
    /// Ceiling: a continuing delay that would reach or exceed this is a
    /// fatal condition, not a longer sleep.
    pub max_delay: Duration,
}

/// One `BackoffSpec` per category. Read-only after construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffTable {
    pub tcp: BackoffSpec,
    pub http: BackoffSpec,
    pub http_420: BackoffSpec,
}

impl BackoffTable {
    pub fn spec(&self, category: Category) -> &BackoffSpec {
        match category {
            Category::Tcp => &self.tcp,
            Category::Http => &self.http,
            Category::Http420 => &self.http_420,
        }
    }
}

impl Default for BackoffTable {
    /// Vendor-documented defaults for the streaming endpoint.
    fn default() -> Self {
        Self {
            tcp: BackoffSpec {
                initial_delay: Duration::ZERO,
                growth: Growth::Linear {
                    step: Duration::from_millis(250),
                },
                max_delay: Duration::from_secs(16),
            },
            http: BackoffSpec {
                initial_delay: Duration::from_secs(5),
                growth: Growth::Exponential { factor: 2.0 },
                max_delay: Duration::from_secs(320),
            },
            http_420: BackoffSpec {
                initial_delay: Duration::from_secs(60),
                growth: Growth::Exponential { factor: 2.0 },
                max_delay: Duration::from_secs(600),
            },
        }
    }
}
