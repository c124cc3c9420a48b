//! Integration test: curl transport against a local server that goes silent.
//!
//! A server that accepts, returns 200 headers, and then sends nothing must
//! surface as a stall (read timeout), which the session backs off from under
//! the tcp curve — not as a connect-phase timeout, whose fixed short retry
//! would hammer the endpoint forever.

use firehose_core::auth::SignedRequest;
use firehose_core::control::CancelToken;
use firehose_core::transport::{CurlTransport, LineFlow, StreamOutcome, Transport, TransportError};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::time::Duration;

/// Accept one connection, answer with 200 headers, then hold the socket
/// open without ever sending a body byte.
fn serve_headers_then_stall() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 2048];
            let _ = stream.read(&mut buf);
            let _ = stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n");
            let _ = stream.flush();
            std::thread::sleep(Duration::from_secs(10));
        }
    });
    format!("http://{}", addr)
}

#[test]
fn stall_after_headers_is_a_read_timeout() {
    let endpoint = serve_headers_then_stall();
    let mut transport = CurlTransport::new(Duration::from_secs(1), CancelToken::new());
    let request = SignedRequest {
        endpoint,
        body: "track=rust".to_string(),
        headers: vec![("Authorization".to_string(), "Bearer token".to_string())],
    };
    let mut lines: Vec<String> = Vec::new();
    let mut on_line = |line: &str| {
        lines.push(line.to_string());
        LineFlow::Continue
    };
    let outcome = transport.stream(&request, &mut on_line);
    assert_eq!(outcome, StreamOutcome::Failed(TransportError::ReadTimeout));
    assert!(lines.is_empty(), "no body lines were sent");
}
