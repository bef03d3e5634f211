//! `XhrRequest` over a blocking `ureq` agent.
//!
//! `send` runs the round-trip on a worker thread and reports the outcome to
//! the registered listeners, the same way a browser XHR fires `load`,
//! `error` or `abort` from its own task.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use ureq::http;
use ureq::Agent;

use super::{encode_form, EventListeners, ReadyState, XhrEvent, XhrEventKind, XhrFactory, XhrListener, XhrRequest};
use crate::error::TransportError;
use crate::http::{Body, HttpResponse};

#[derive(Debug)]
struct XhrState {
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    with_credentials: bool,
    ready_state: ReadyState,
    aborted: bool,
}

/// An XHR-like request backed by `ureq`.
///
/// Non-2xx statuses are delivered as `load` events, like a browser XHR.
/// `with_credentials` is recorded but has no effect on the wire; the agent
/// keeps no cookie jar.
pub struct UreqXhr {
    inner: Arc<Inner>,
}

struct Inner {
    agent: Agent,
    state: Mutex<XhrState>,
    listeners: Mutex<EventListeners>,
}

impl UreqXhr {
    pub fn new(agent: Agent) -> Self {
        Self {
            inner: Arc::new(Inner {
                agent,
                state: Mutex::new(XhrState {
                    method: String::new(),
                    url: String::new(),
                    headers: Vec::new(),
                    with_credentials: false,
                    ready_state: ReadyState::Unsent,
                    aborted: false,
                }),
                listeners: Mutex::new(EventListeners::new()),
            }),
        }
    }

    /// Headers set so far, in call order.
    pub fn request_headers(&self) -> Vec<(String, String)> {
        self.inner.state.lock().headers.clone()
    }
}

impl Inner {
    fn emit(&self, event: XhrEvent) {
        let listeners = self.listeners.lock().take_for(event.kind());
        for listener in listeners {
            listener(&event);
        }
    }

    fn finish(&self, outcome: Result<HttpResponse, TransportError>) {
        {
            let mut state = self.state.lock();
            if state.aborted {
                return;
            }
            state.ready_state = ReadyState::Done;
        }
        match outcome {
            Ok(response) => self.emit(XhrEvent::Load(response)),
            Err(err) => self.emit(XhrEvent::Error(err)),
        }
    }
}

fn network(err: impl std::fmt::Display) -> TransportError {
    TransportError::Network(err.to_string())
}

fn run(
    agent: &Agent,
    method: &str,
    url: &str,
    headers: &[(String, String)],
    body: Option<Body>,
) -> Result<HttpResponse, TransportError> {
    let mut builder = http::Request::builder().method(method).uri(url);
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    let result = match body {
        None => agent.run(builder.body(()).map_err(network)?),
        Some(Body::Text(text)) => agent.run(builder.body(text).map_err(network)?),
        Some(Body::Bytes(bytes)) => agent.run(builder.body(bytes.to_vec()).map_err(network)?),
        Some(Body::Form(fields)) => {
            let has_content_type = headers
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case("content-type"));
            if !has_content_type {
                builder = builder.header("content-type", "application/x-www-form-urlencoded");
            }
            agent.run(builder.body(encode_form(&fields)).map_err(network)?)
        }
        Some(Body::Stream(stream)) => {
            let bytes = stream.read_all().map_err(network)?;
            agent.run(builder.body(bytes).map_err(network)?)
        }
    };

    let mut response = result.map_err(network)?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
        .collect();
    let body = response.body_mut().read_to_vec().map_err(network)?;

    Ok(HttpResponse {
        status,
        url: url.to_string(),
        headers,
        body: Bytes::from(body),
    })
}

impl XhrRequest for UreqXhr {
    fn open(&self, method: &str, url: &str) {
        let mut state = self.inner.state.lock();
        state.method = method.to_uppercase();
        state.url = url.to_string();
        state.headers.clear();
        state.aborted = false;
        state.ready_state = ReadyState::Opened;
    }

    fn set_request_header(&self, name: &str, value: &str) {
        self.inner.state.lock().headers.push((name.to_string(), value.to_string()));
    }

    fn set_with_credentials(&self, enabled: bool) {
        self.inner.state.lock().with_credentials = enabled;
    }

    fn with_credentials(&self) -> bool {
        self.inner.state.lock().with_credentials
    }

    fn add_event_listener(&self, kind: XhrEventKind, listener: XhrListener, once: bool) {
        self.inner.listeners.lock().add(kind, listener, once);
    }

    fn send(&self, body: Option<Body>) {
        let (method, url, headers) = {
            let mut state = self.inner.state.lock();
            if state.ready_state != ReadyState::Opened {
                drop(state);
                self.inner.emit(XhrEvent::Error(TransportError::Network(
                    "send called before open".to_string(),
                )));
                return;
            }
            state.ready_state = ReadyState::Loading;
            (state.method.clone(), state.url.clone(), state.headers.clone())
        };

        let inner = self.inner.clone();
        std::thread::spawn(move || {
            let outcome = run(&inner.agent, &method, &url, &headers, body);
            tracing::debug!(%method, %url, ok = outcome.is_ok(), "xhr round-trip finished");
            inner.finish(outcome);
        });
    }

    fn abort(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.ready_state != ReadyState::Loading {
                return;
            }
            state.aborted = true;
            state.ready_state = ReadyState::Done;
        }
        self.inner.emit(XhrEvent::Abort);
    }

    fn ready_state(&self) -> ReadyState {
        self.inner.state.lock().ready_state
    }
}

/// Creates a `UreqXhr` per call, all sharing one agent.
#[derive(Clone)]
pub struct UreqXhrFactory {
    agent: Agent,
}

impl UreqXhrFactory {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqXhrFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl XhrFactory for UreqXhrFactory {
    fn create(&self) -> Arc<dyn XhrRequest> {
        Arc::new(UreqXhr::new(self.agent.clone()))
    }
}
