//! Per-line record processing: parse, validate shape, count, fan out.

use crate::handler::RecordHandler;
use serde_json::Value;

/// Fatal condition: a registered handler's liveness probe reported dead.
/// A dead downstream consumer cannot be fixed by reconnecting upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("record consumer is no longer alive")]
pub struct ConsumerDead;

/// Parses raw stream lines into records and forwards them to the handler
/// set. No network I/O; the session feeds it one line at a time.
pub struct RecordProcessor {
    handlers: Vec<Box<dyn RecordHandler>>,
    window_size: u64,
    records_received: u64,
}

impl RecordProcessor {
    pub fn new(handlers: Vec<Box<dyn RecordHandler>>, window_size: u64) -> Self {
        Self {
            handlers,
            window_size,
            records_received: 0,
        }
    }

    /// Process one line received from the stream.
    ///
    /// Returns `Ok(true)` when the line was forwarded or was a keep-alive,
    /// `Ok(false)` when it was malformed and dropped (the session keeps
    /// going), and `Err(ConsumerDead)` when a handler's liveness probe
    /// failed (the session must stop for good).
    pub fn process_line(&mut self, line: &str) -> Result<bool, ConsumerDead> {
        // Keep-alive newline: valid no-op.
        if line.is_empty() {
            return Ok(true);
        }
        let record: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(err) => {
                tracing::error!(%err, raw = line, "undecodable stream line dropped");
                return Ok(false);
            }
        };
        if !is_status_record(&record) {
            tracing::error!(raw = line, "non-status stream message dropped");
            return Ok(false);
        }
        self.records_received += 1;
        if self.records_received % self.window_size == 0 {
            tracing::info!(records = self.records_received, "stream progress");
        }
        for handler in &mut self.handlers {
            if let Some(liveness) = handler.liveness() {
                if !liveness.is_alive() {
                    return Err(ConsumerDead);
                }
            }
            handler.process_one(&record);
        }
        Ok(true)
    }

    /// Total schema-valid records forwarded so far.
    pub fn records_received(&self) -> u64 {
        self.records_received
    }

    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }
}

/// Heuristic that distinguishes an actual status record from other stream
/// control messages (deletion notices, limit notices): all three fields
/// must be present. Extra fields pass through untouched.
fn is_status_record(value: &Value) -> bool {
    match value.as_object() {
        Some(map) => {
            map.contains_key("in_reply_to_status_id")
                && map.contains_key("user")
                && map.contains_key("id")
        }
        None => false,
    }
}
