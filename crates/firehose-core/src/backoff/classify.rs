//! Classify transport failures into backoff categories.

use super::policy::Category;
use crate::transport::TransportError;

/// Map a transport failure to the backoff curve that governs the reconnect.
///
/// Connect-phase timeouts normally never reach this function: the session
/// handles them with a short fixed delay outside the backoff controller.
/// They are mapped to `Tcp` here so the function stays total.
pub fn classify(err: &TransportError) -> Category {
    match err {
        TransportError::ConnectTimeout
        | TransportError::ReadTimeout
        | TransportError::Connection(_)
        | TransportError::Socket(_) => Category::Tcp,
        TransportError::HttpStatus(420) => Category::Http420,
        TransportError::HttpStatus(_) => Category::Http,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_level_failures_are_tcp() {
        assert_eq!(classify(&TransportError::ReadTimeout), Category::Tcp);
        assert_eq!(
            classify(&TransportError::Connection("reset".into())),
            Category::Tcp
        );
        assert_eq!(
            classify(&TransportError::Socket("broken pipe".into())),
            Category::Tcp
        );
        assert_eq!(classify(&TransportError::ConnectTimeout), Category::Tcp);
    }

    #[test]
    fn http_420_gets_its_own_category() {
        assert_eq!(classify(&TransportError::HttpStatus(420)), Category::Http420);
    }

    #[test]
    fn other_http_statuses_are_http() {
        assert_eq!(classify(&TransportError::HttpStatus(401)), Category::Http);
        assert_eq!(classify(&TransportError::HttpStatus(503)), Category::Http);
    }
}
