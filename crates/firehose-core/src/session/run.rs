//! The session loop: connect, read lines, classify failures, back off,
//! reconnect, forever — until a fatal condition or cancellation.

use super::{SessionError, SessionState, StreamSession};
use crate::auth::{RequestSigner, SignedRequest};
use crate::backoff::{classify, Category};
use crate::control::sleep_cancellable;
use crate::processor::ConsumerDead;
use crate::transport::{LineFlow, StreamOutcome, Transport, TransportError};

/// The vendor stream emits at least this many keep-alive newlines per
/// connection regardless of authentication success, so this many lines of
/// any kind within one connection proves the stream healthy.
const HEALTHY_LINE_THRESHOLD: u64 = 8;

/// How one connection attempt ended, from the loop's point of view.
enum ConnectionEnd {
    Cancelled,
    ConsumerDead,
    /// Connect-phase timeout: lighter-weight path, fixed short delay, no
    /// backoff growth.
    ConnectTimeout,
    Backoff(Category),
}

impl<T: Transport, S: RequestSigner> StreamSession<T, S> {
    /// Drive the state machine until cancellation (`Ok`) or a fatal
    /// condition (`Err`). Transient transport and protocol failures never
    /// escape this loop.
    pub fn run(&mut self) -> Result<(), SessionError> {
        tracing::info!("started streaming");
        let mut state = SessionState::Disconnected;
        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("session cancelled; shutting down");
                return Ok(());
            }
            state = match state {
                SessionState::Disconnected => SessionState::Authenticating,
                SessionState::Authenticating => match self.signer.sign(&self.request) {
                    Ok(signed) => SessionState::Connected(signed),
                    Err(err) => {
                        tracing::warn!(%err, "request signing failed; backing off");
                        SessionState::BackingOff(Category::Http)
                    }
                },
                SessionState::Connected(signed) => match self.stream_once(&signed) {
                    ConnectionEnd::Cancelled => {
                        tracing::info!("session cancelled; shutting down");
                        return Ok(());
                    }
                    ConnectionEnd::ConsumerDead => {
                        tracing::error!("record consumer dead; terminating session");
                        return Err(SessionError::ConsumerDead);
                    }
                    ConnectionEnd::ConnectTimeout => {
                        tracing::warn!(
                            delay = ?self.connect_retry_delay,
                            "connect timed out; retrying shortly"
                        );
                        if !sleep_cancellable(&self.cancel, self.connect_retry_delay) {
                            return Ok(());
                        }
                        SessionState::Disconnected
                    }
                    ConnectionEnd::Backoff(category) => SessionState::BackingOff(category),
                },
                SessionState::BackingOff(category) => {
                    let delay = match self.backoff.next_delay(category) {
                        Ok(delay) => delay,
                        Err(exhausted) => {
                            tracing::error!(
                                ?category,
                                "backoff ceiling reached; terminating session"
                            );
                            return Err(exhausted.into());
                        }
                    };
                    tracing::warn!(?category, ?delay, "backing off before reconnect");
                    if !sleep_cancellable(&self.cancel, delay) {
                        return Ok(());
                    }
                    SessionState::Disconnected
                }
            };
        }
    }

    /// One connection lifetime: feed every line to the processor, reset
    /// backoff once the stream proves healthy, classify the ending.
    fn stream_once(&mut self, signed: &SignedRequest) -> ConnectionEnd {
        // Reset on every reconnect attempt; counts keep-alives too.
        let mut lines_since_reconnect: u64 = 0;
        let mut consumer_dead = false;
        let cancel = self.cancel.clone();
        let processor = &mut self.processor;
        let backoff = &mut self.backoff;
        let transport = &mut self.transport;

        let mut on_line = |line: &str| {
            if cancel.is_cancelled() {
                return LineFlow::Stop;
            }
            match processor.process_line(line) {
                Ok(_) => {}
                Err(ConsumerDead) => {
                    consumer_dead = true;
                    return LineFlow::Stop;
                }
            }
            lines_since_reconnect += 1;
            if lines_since_reconnect >= HEALTHY_LINE_THRESHOLD {
                // Proven healthy: clear backoff state without touching the
                // socket.
                tracing::debug!("stream healthy; resetting backoff");
                backoff.reset();
                lines_since_reconnect = 0;
            }
            LineFlow::Continue
        };

        let outcome = transport.stream(signed, &mut on_line);
        match outcome {
            StreamOutcome::Stopped => {
                if consumer_dead {
                    ConnectionEnd::ConsumerDead
                } else {
                    ConnectionEnd::Cancelled
                }
            }
            StreamOutcome::EndOfStream => {
                // An implicit disconnect; the vendor mandates backoff before
                // any reconnect.
                tracing::warn!("stream closed by server; backing off");
                ConnectionEnd::Backoff(Category::Tcp)
            }
            StreamOutcome::Failed(TransportError::ConnectTimeout) => ConnectionEnd::ConnectTimeout,
            StreamOutcome::Failed(err) => {
                let category = classify(&err);
                tracing::warn!(%err, ?category, "transport failure; backing off");
                ConnectionEnd::Backoff(category)
            }
        }
    }
}
