//! Streaming transport capability.
//!
//! The session consumes the stream through the `Transport` trait so the
//! failure classification is a pure match on `TransportError` and tests can
//! script connections in memory. The curl-backed implementation lives in
//! `curl.rs`.

mod curl;
mod lines;

pub use curl::CurlTransport;
pub use lines::LineSplitter;

/// Why a streaming call failed. One variant per vendor-documented failure
/// mode; the backoff module maps these to categories.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Timed out before any bytes were exchanged.
    #[error("connect timed out")]
    ConnectTimeout,
    /// No data (not even a keep-alive) within the stall window.
    #[error("no data within the stall window")]
    ReadTimeout,
    /// Connection-level failure: DNS, refused, reset mid-stream.
    #[error("connection error: {0}")]
    Connection(String),
    /// HTTP error response; the status selects the backoff category.
    #[error("HTTP {0}")]
    HttpStatus(u32),
    /// Low-level socket error surfaced by the HTTP library.
    #[error("socket error: {0}")]
    Socket(String),
}

/// Returned by the per-line callback to keep reading or abort the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFlow {
    Continue,
    Stop,
}

/// How one streaming call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Server closed the stream with no error. Still requires backoff
    /// before reconnecting, per vendor guidance.
    EndOfStream,
    /// The line callback asked to stop (cancellation or a fatal downstream
    /// condition; the caller knows which).
    Stopped,
    Failed(TransportError),
}

/// Opens the long-lived filter request and delivers each newline-delimited
/// record to `on_line` until the stream ends, fails, or `on_line` stops it.
///
/// Each call opens a fresh connection; the sequence is restartable per call,
/// not mid-stream. Implementations must release the connection on every
/// exit path before returning.
pub trait Transport {
    fn stream(
        &mut self,
        request: &crate::auth::SignedRequest,
        on_line: &mut dyn FnMut(&str) -> LineFlow,
    ) -> StreamOutcome;
}
