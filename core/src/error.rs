//! Error types for route calls.
//!
//! # Design
//! Every failure a route call can produce lands in `ApiError` and is returned
//! to the immediate caller of the route. Nothing here is retried or
//! swallowed. Transport-level failures keep their own small enum so the
//! fetch and XHR bindings can report network errors and aborts uniformly.

use std::fmt;

/// Failure reported by a transport before a response was available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be completed (DNS, connect, TLS, I/O...).
    Network(String),

    /// The request was aborted before it completed.
    Aborted,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Network(msg) => write!(f, "network error: {msg}"),
            TransportError::Aborted => write!(f, "request aborted"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Errors returned by route calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Mocking was explicitly enabled for a call or route, but neither level
    /// supplied a handler.
    MissingMockHandler { path: String },

    /// The XHR binding was asked to send a streaming body.
    UnsupportedStreamingBody,

    /// The transport failed or the request was aborted.
    TransportFailure(TransportError),

    /// A response handler or mock handler failed.
    HandlerFailure(String),

    /// The base URL and route path could not be joined.
    InvalidUrl(String),
}

impl ApiError {
    /// Shorthand for handler code: wraps any displayable error as a
    /// `HandlerFailure`.
    pub fn handler(err: impl fmt::Display) -> Self {
        ApiError::HandlerFailure(err.to_string())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::MissingMockHandler { path } => {
                write!(f, "mock enabled for {path} but no mock handler was supplied")
            }
            ApiError::UnsupportedStreamingBody => {
                write!(f, "streaming request bodies are not supported by the XHR transport")
            }
            ApiError::TransportFailure(err) => write!(f, "transport failure: {err}"),
            ApiError::HandlerFailure(msg) => write!(f, "handler failed: {msg}"),
            ApiError::InvalidUrl(msg) => write!(f, "invalid url: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::TransportFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::TransportFailure(err)
    }
}
