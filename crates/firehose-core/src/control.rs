//! Session control: shared cancellation tokens for clean shutdown.
//!
//! Each running stream session holds a `CancelToken`; a control surface
//! (e.g. a SIGINT handler) requests stop and the session observes the token
//! at every suspension point — loop top, in-stream line delivery, and every
//! backoff sleep. Cancellation is the clean shutdown path, distinct from a
//! fatal error.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Cheap clonable stop flag shared between a session and its controller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Registry of session name -> cancel token, so several independent filter
/// streams in one process can be stopped individually or all at once.
#[derive(Default)]
pub struct SessionControl {
    sessions: RwLock<HashMap<String, CancelToken>>,
}

impl SessionControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session; returns the token to pass into its loop.
    pub fn register(&self, name: &str) -> CancelToken {
        let token = CancelToken::new();
        self.sessions
            .write()
            .unwrap()
            .insert(name.to_string(), token.clone());
        token
    }

    /// Unregister a session (call when its loop returns).
    pub fn unregister(&self, name: &str) {
        self.sessions.write().unwrap().remove(name);
    }

    /// Request stop for one session.
    pub fn request_stop(&self, name: &str) {
        if let Some(token) = self.sessions.read().unwrap().get(name) {
            token.cancel();
        }
    }

    /// Request stop for every registered session.
    pub fn request_stop_all(&self) {
        for token in self.sessions.read().unwrap().values() {
            token.cancel();
        }
    }
}

/// Sleep for `duration`, waking early if the token is cancelled.
/// Returns false when cancellation cut the sleep short.
pub fn sleep_cancellable(token: &CancelToken, duration: Duration) -> bool {
    const SLICE: Duration = Duration::from_millis(100);
    let deadline = Instant::now() + duration;
    loop {
        if token.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(SLICE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_clear_and_sticks_once_cancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        assert!(token.clone().is_cancelled());
    }

    #[test]
    fn registry_stops_by_name_and_all() {
        let control = SessionControl::new();
        let a = control.register("a");
        let b = control.register("b");
        control.request_stop("a");
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
        control.request_stop_all();
        assert!(b.is_cancelled());
        control.unregister("a");
        control.unregister("b");
    }

    #[test]
    fn cancelled_sleep_returns_early() {
        let token = CancelToken::new();
        token.cancel();
        let start = Instant::now();
        assert!(!sleep_cancellable(&token, Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn uncancelled_sleep_completes() {
        let token = CancelToken::new();
        assert!(sleep_cancellable(&token, Duration::from_millis(10)));
    }
}
