//! Request signing capability.
//!
//! The vendor handshake is an external collaborator: the session hands a
//! `StreamRequest` to a `RequestSigner` on every reconnect attempt and gets
//! back a `SignedRequest` ready for the transport. Signed contexts are never
//! cached across attempts, since credentials/nonces are typically single-use
//! per connection.

use url::form_urlencoded;

/// The unsigned filter request: endpoint plus vendor-specific filter
/// parameters sent as the form body.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub endpoint: String,
    pub params: Vec<(String, String)>,
}

impl StreamRequest {
    pub fn new(endpoint: impl Into<String>, params: Vec<(String, String)>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params,
        }
    }

    /// Urlencoded form body for the POST.
    pub fn form_body(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish()
    }
}

/// A request the transport can send as-is: endpoint, encoded body, and the
/// headers the signer produced (including authorization).
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub endpoint: String,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

/// Signing failed. The session treats this as an `http`-class failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("request signing failed: {0}")]
pub struct AuthError(pub String);

/// Produces a signed request context for one connection attempt.
pub trait RequestSigner {
    fn sign(&self, request: &StreamRequest) -> Result<SignedRequest, AuthError>;
}

/// Minimal in-tree signer: a static bearer token in the authorization
/// header. Vendors with a heavier handshake (OAuth 1.0a signatures,
/// rotating nonces) implement `RequestSigner` outside this crate.
#[derive(Debug, Clone)]
pub struct BearerSigner {
    token: String,
}

impl BearerSigner {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl RequestSigner for BearerSigner {
    fn sign(&self, request: &StreamRequest) -> Result<SignedRequest, AuthError> {
        if self.token.trim().is_empty() {
            return Err(AuthError("empty bearer token".to_string()));
        }
        Ok(SignedRequest {
            endpoint: request.endpoint.clone(),
            body: request.form_body(),
            headers: vec![
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", self.token.trim()),
                ),
                (
                    "Content-Type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                ),
            ],
        })
    }
}
