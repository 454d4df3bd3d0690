//! Selcom transport error types
//!
//! Everything here is a failure to exchange a request with the gateway.
//! A response that arrived with HTTP 2xx but carries a non-success
//! `resultcode` is not an error at this layer; see [`crate::outcome`].

use thiserror::Error;

/// Selcom API transport error
#[derive(Debug, Error)]
pub enum Error {
    /// Path could not be joined onto the base URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Connection, timeout or TLS failure
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// Gateway answered with a non-2xx status
    #[error("Selcom gateway returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Signed header could not be encoded
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    /// Request did not serialise to a JSON object
    #[error("Invalid payload: {0}")]
    Payload(String),

    /// Detached request task did not finish
    #[error("Request task failed: {0}")]
    Join(String),
}

impl Error {
    /// True for failures on the wire (network, TLS, timeout, HTTP status)
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Reqwest(_) | Error::Status { .. } | Error::Join(_))
    }

    /// True when the request timed out
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Reqwest(e) if e.is_timeout())
    }

    /// HTTP status if the gateway answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            Error::Reqwest(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
