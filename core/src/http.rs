//! HTTP data types shared by both transports.
//!
//! # Design
//! Requests leave the pipeline as a URL plus `RequestOptions`; responses come
//! back as `HttpResponse`, plain owned data regardless of which transport
//! produced it. That lets one set of response handlers and one status bus
//! serve both the fetch and the XHR bindings.
//!
//! Bodies are the one piece of a request that cannot live in the JSON options
//! map, since a body may be a byte stream. `Body` carries them separately.

use std::fmt;
use std::future::Future;
use std::io::Read;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Boxed, sendable future used at every dynamic seam of the pipeline.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A request body.
#[derive(Clone)]
pub enum Body {
    Text(String),
    Bytes(Bytes),
    /// URL-encoded form fields, sent in order.
    Form(Vec<(String, String)>),
    /// A readable byte stream. Only the fetch transport can send these.
    Stream(BodyStream),
}

impl Body {
    pub fn is_stream(&self) -> bool {
        matches!(self, Body::Stream(_))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Body::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Body::Form(fields) => f.debug_tuple("Form").field(fields).finish(),
            Body::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(bytes))
    }
}

/// Shared handle to a streaming body source.
///
/// Cloning shares the underlying reader; the stream is consumed once by
/// whichever transport sends it.
#[derive(Clone)]
pub struct BodyStream(Arc<Mutex<Box<dyn Read + Send>>>);

impl BodyStream {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self(Arc::new(Mutex::new(Box::new(reader))))
    }

    /// Drain the remaining bytes of the stream.
    pub fn read_all(&self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.0.lock().read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// A completed HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// The URL the response was served from. The `reqwest` transport
    /// reports it after redirects; the `ureq` transport reports the URL
    /// that was opened.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(ApiError::handler)
    }
}
