//! Transport seams for the two route factories.
//!
//! # Design
//! The pipeline never talks to an HTTP library directly. Fetch routes go
//! through `FetchTransport`, a single async call. XHR routes go through an
//! `XhrRequest` object created per call by an `XhrFactory`, driven
//! imperatively (open, set headers, send) and reporting completion through
//! event listeners. Production implementations live in the submodules; tests
//! substitute recording fakes.

mod fetch_reqwest;
mod xhr_ureq;

use std::fmt;
use std::sync::Arc;

use crate::error::TransportError;
use crate::http::{Body, BoxFuture, HttpResponse};
use crate::options::RequestOptions;

pub use fetch_reqwest::ReqwestFetch;
pub use xhr_ureq::{UreqXhr, UreqXhrFactory};

/// A fetch-like request function.
pub trait FetchTransport: Send + Sync {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        options: &'a RequestOptions,
    ) -> BoxFuture<'a, Result<HttpResponse, TransportError>>;
}

/// Lifecycle of an `XhrRequest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Unsent,
    Opened,
    Loading,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XhrEventKind {
    Load,
    Error,
    Abort,
}

/// A terminal event emitted by an `XhrRequest`.
#[derive(Debug, Clone)]
pub enum XhrEvent {
    Load(HttpResponse),
    Error(TransportError),
    Abort,
}

impl XhrEvent {
    pub fn kind(&self) -> XhrEventKind {
        match self {
            XhrEvent::Load(_) => XhrEventKind::Load,
            XhrEvent::Error(_) => XhrEventKind::Error,
            XhrEvent::Abort => XhrEventKind::Abort,
        }
    }
}

pub type XhrListener = Arc<dyn Fn(&XhrEvent) + Send + Sync>;

/// An XHR-like imperative request object.
///
/// Methods take `&self`: the object is shared between the route pipeline and
/// the caller, who may attach listeners or abort at any point.
pub trait XhrRequest: Send + Sync {
    fn open(&self, method: &str, url: &str);
    fn set_request_header(&self, name: &str, value: &str);
    fn set_with_credentials(&self, enabled: bool);
    fn with_credentials(&self) -> bool;
    /// Register `listener` for `kind`. A `once` listener is removed after
    /// its first invocation.
    fn add_event_listener(&self, kind: XhrEventKind, listener: XhrListener, once: bool);
    fn send(&self, body: Option<Body>);
    fn abort(&self);
    fn ready_state(&self) -> ReadyState;
}

/// Creates a fresh `XhrRequest` for every call.
pub trait XhrFactory: Send + Sync {
    fn create(&self) -> Arc<dyn XhrRequest>;
}

impl<F> XhrFactory for F
where
    F: Fn() -> Arc<dyn XhrRequest> + Send + Sync,
{
    fn create(&self) -> Arc<dyn XhrRequest> {
        self()
    }
}

struct ListenerEntry {
    kind: XhrEventKind,
    listener: XhrListener,
    once: bool,
}

/// Listener bookkeeping for `XhrRequest` implementations.
#[derive(Default)]
pub struct EventListeners {
    entries: Vec<ListenerEntry>,
}

impl EventListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: XhrEventKind, listener: XhrListener, once: bool) {
        self.entries.push(ListenerEntry { kind, listener, once });
    }

    /// Listeners to invoke for `kind`, dropping the one-shot ones from the
    /// registry. Call them after releasing any lock around `self`.
    pub fn take_for(&mut self, kind: XhrEventKind) -> Vec<XhrListener> {
        let selected = self
            .entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.listener.clone())
            .collect();
        self.entries.retain(|entry| entry.kind != kind || !entry.once);
        selected
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners").field("len", &self.entries.len()).finish()
    }
}

/// Encode form fields as `application/x-www-form-urlencoded`.
pub(crate) fn encode_form(fields: &[(String, String)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}
