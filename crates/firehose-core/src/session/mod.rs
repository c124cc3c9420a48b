//! Long-lived stream session: connection lifecycle and reconnect loop.
//!
//! The session is an explicit state machine driven by a single control-flow
//! thread. It owns its backoff state and counters outright, so multiple
//! independent sessions (e.g. several filter streams) can run in one
//! process without shared mutable state.

mod run;

use crate::auth::{RequestSigner, SignedRequest, StreamRequest};
use crate::backoff::{BackoffController, BackoffExhausted, BackoffTable, Category};
use crate::control::CancelToken;
use crate::processor::RecordProcessor;
use crate::transport::Transport;
use std::time::Duration;

/// Session loop states. `Connected` carries the signed context for the
/// attempt; a fresh one is produced for every reconnect.
#[derive(Debug)]
pub enum SessionState {
    Disconnected,
    Authenticating,
    Connected(SignedRequest),
    BackingOff(Category),
}

/// The only two conditions that escape the session loop. Everything else is
/// absorbed, logged, and retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    BackoffExhausted(#[from] BackoffExhausted),
    #[error("record consumer is no longer alive")]
    ConsumerDead,
}

pub struct StreamSession<T: Transport, S: RequestSigner> {
    transport: T,
    signer: S,
    request: StreamRequest,
    processor: RecordProcessor,
    backoff: BackoffController,
    connect_retry_delay: Duration,
    cancel: CancelToken,
}

impl<T: Transport, S: RequestSigner> StreamSession<T, S> {
    pub fn new(
        transport: T,
        signer: S,
        request: StreamRequest,
        processor: RecordProcessor,
        backoff_table: BackoffTable,
        connect_retry_delay: Duration,
        cancel: CancelToken,
    ) -> Self {
        tracing::info!(
            handlers = ?processor.handler_names(),
            params = ?request.params,
            "stream session configured"
        );
        Self {
            transport,
            signer,
            request,
            processor,
            backoff: BackoffController::new(backoff_table),
            connect_retry_delay,
            cancel,
        }
    }

    /// Total schema-valid records forwarded to handlers so far.
    pub fn records_received(&self) -> u64 {
        self.processor.records_received()
    }
}
