//! curl-backed streaming transport.
//!
//! One `stream` call is one long-lived POST. Stall detection uses libcurl's
//! low-speed abort: fewer than one byte per second over the stall window
//! (keep-alive newlines count) kills the transfer with a timeout error.
//! There is deliberately no overall transfer timeout.

use super::lines::LineSplitter;
use super::{LineFlow, StreamOutcome, Transport, TransportError};
use crate::auth::SignedRequest;
use crate::control::CancelToken;
use std::cell::Cell;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Streaming transport over `curl::easy`.
pub struct CurlTransport {
    stall_timeout: Duration,
    cancel: CancelToken,
}

impl CurlTransport {
    pub fn new(stall_timeout: Duration, cancel: CancelToken) -> Self {
        Self {
            stall_timeout,
            cancel,
        }
    }
}

impl Transport for CurlTransport {
    fn stream(
        &mut self,
        request: &SignedRequest,
        on_line: &mut dyn FnMut(&str) -> LineFlow,
    ) -> StreamOutcome {
        let mut easy = curl::easy::Easy::new();
        if let Err(e) = configure(&mut easy, request, self.stall_timeout) {
            return StreamOutcome::Failed(TransportError::Connection(e.to_string()));
        }

        let status = Cell::new(0u32);
        let got_bytes = Cell::new(false);
        let stopped_by_line = Cell::new(false);
        let mut splitter = LineSplitter::new();
        let cancel = self.cancel.clone();

        // The transfer handle is scoped; dropping it releases the connection
        // on every exit path.
        let performed = {
            let mut transfer = easy.transfer();
            if let Err(e) = transfer.header_function(|data| {
                // Headers are exchanged bytes: once they arrive, a later
                // timeout is a stall, not a connect failure.
                got_bytes.set(true);
                if let Some(code) = parse_status_line(data) {
                    status.set(code);
                }
                true
            }) {
                return StreamOutcome::Failed(TransportError::Connection(e.to_string()));
            }
            if let Err(e) = transfer.progress_function(move |_, _, _, _| !cancel.is_cancelled()) {
                return StreamOutcome::Failed(TransportError::Connection(e.to_string()));
            }
            if let Err(e) = transfer.write_function(|data| {
                got_bytes.set(true);
                // An error response body is not record data; abort and let
                // the status drive classification.
                if status.get() >= 400 {
                    return Ok(0);
                }
                for line in splitter.push(data) {
                    if on_line(&line) == LineFlow::Stop {
                        stopped_by_line.set(true);
                        return Ok(0);
                    }
                }
                Ok(data.len())
            }) {
                return StreamOutcome::Failed(TransportError::Connection(e.to_string()));
            }
            transfer.perform()
        };

        let code = status.get();
        match performed {
            Ok(()) => {
                if code >= 400 {
                    return StreamOutcome::Failed(TransportError::HttpStatus(code));
                }
                // A final record may lack its trailing newline.
                if let Some(tail) = splitter.take_remainder() {
                    if on_line(&tail) == LineFlow::Stop {
                        return StreamOutcome::Stopped;
                    }
                }
                StreamOutcome::EndOfStream
            }
            Err(err) => {
                if stopped_by_line.get() || err.is_aborted_by_callback() {
                    return StreamOutcome::Stopped;
                }
                if code >= 400 {
                    return StreamOutcome::Failed(TransportError::HttpStatus(code));
                }
                StreamOutcome::Failed(map_curl_error(&err, got_bytes.get()))
            }
        }
    }
}

fn configure(
    easy: &mut curl::easy::Easy,
    request: &SignedRequest,
    stall_timeout: Duration,
) -> Result<(), curl::Error> {
    easy.url(&request.endpoint)?;
    easy.post(true)?;
    easy.post_fields_copy(request.body.as_bytes())?;
    let mut list = curl::easy::List::new();
    for (k, v) in &request.headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    easy.http_headers(list)?;
    easy.connect_timeout(CONNECT_TIMEOUT)?;
    easy.low_speed_limit(1)?;
    easy.low_speed_time(stall_timeout)?;
    easy.progress(true)?;
    Ok(())
}

/// Pull the status code out of an `HTTP/1.1 420 ...` status line.
fn parse_status_line(data: &[u8]) -> Option<u32> {
    let line = std::str::from_utf8(data).ok()?;
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}

/// Map a curl error to the vendor failure taxonomy. A timeout with nothing
/// received at all (not even the status line) is a connect-phase timeout;
/// once any response bytes arrived, a timeout is a stall.
fn map_curl_error(err: &curl::Error, got_bytes: bool) -> TransportError {
    if err.is_operation_timedout() {
        if got_bytes {
            return TransportError::ReadTimeout;
        }
        return TransportError::ConnectTimeout;
    }
    if err.is_recv_error() || err.is_send_error() || err.is_read_error() || err.is_got_nothing() {
        return TransportError::Socket(err.to_string());
    }
    TransportError::Connection(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_parses() {
        assert_eq!(parse_status_line(b"HTTP/1.1 420 Enhance Your Calm\r\n"), Some(420));
        assert_eq!(parse_status_line(b"HTTP/2 200 \r\n"), Some(200));
        assert_eq!(parse_status_line(b"Content-Type: text/plain\r\n"), None);
    }

    #[test]
    fn timeout_mapping_depends_on_received_bytes() {
        // 28 = CURLE_OPERATION_TIMEDOUT. `got_bytes` is true as soon as the
        // response status line arrives, so a post-header stall maps to
        // ReadTimeout even with an empty body.
        let timeout = curl::Error::new(28);
        assert_eq!(map_curl_error(&timeout, false), TransportError::ConnectTimeout);
        assert_eq!(map_curl_error(&timeout, true), TransportError::ReadTimeout);
    }
}
