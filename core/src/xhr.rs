//! Route factory over the XHR transport.
//!
//! # Design
//! Calling an `XhrRoute` does the route/option/mock work immediately and, for
//! a real request, opens the transport and applies headers and credentials.
//! The caller gets back the live transport handle plus a deferred
//! `send_request`, so listeners can be attached or state inspected before
//! anything goes on the wire.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;

use crate::controller::Shared;
use crate::error::{ApiError, TransportError};
use crate::http::BoxFuture;
use crate::options::RequestOptions;
use crate::route::{self, CallOptions, Prepared, RouteFn};
use crate::transport::{XhrEvent, XhrEventKind, XhrListener, XhrRequest};

/// A callable API route over the XHR transport.
pub struct XhrRoute<P, T> {
    shared: Arc<Shared>,
    route_fn: RouteFn<P, T>,
}

impl<P, T> Clone for XhrRoute<P, T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            route_fn: self.route_fn.clone(),
        }
    }
}

/// One in-flight XHR route call.
pub struct XhrCall<P, T> {
    handle: Arc<dyn XhrRequest>,
    shared: Arc<Shared>,
    prepared: Result<Prepared<P, T>, ApiError>,
}

impl<P, T> fmt::Debug for XhrCall<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XhrCall")
            .field("ready_state", &self.handle.ready_state())
            .field("mocked", &matches!(self.prepared, Ok(Prepared::Mock { .. })))
            .finish()
    }
}

/// Apply the resolved options that map onto the transport object.
fn configure(handle: &dyn XhrRequest, url: &str, options: &RequestOptions) {
    handle.open(options.method_str(), url);
    for (name, value) in options.string_headers() {
        handle.set_request_header(name, value);
    }
    if options.credentials_mode() == Some("include") {
        handle.set_with_credentials(true);
    }
}

impl<P, T> XhrRoute<P, T>
where
    P: Send + 'static,
    T: DeserializeOwned + Send + 'static,
{
    pub(crate) fn new(shared: Arc<Shared>, route_fn: RouteFn<P, T>) -> Self {
        Self { shared, route_fn }
    }

    pub fn call(&self, params: P) -> XhrCall<P, T> {
        self.call_with(params, CallOptions::default())
    }

    pub fn call_with(&self, params: P, options: CallOptions<P, T>) -> XhrCall<P, T> {
        let handle = self.shared.xhr.create();
        let prepared = route::prepare(&self.shared, &self.route_fn, params, options);
        if let Ok(Prepared::Real(pending)) = &prepared {
            configure(handle.as_ref(), &pending.url, &pending.options);
        }
        XhrCall {
            handle,
            shared: self.shared.clone(),
            prepared,
        }
    }
}

impl<P, T> XhrCall<P, T>
where
    P: Send + 'static,
    T: DeserializeOwned + Send + 'static,
{
    /// The transport object for this call. Opened already unless the call
    /// is mocked or failed to prepare.
    pub fn handle(&self) -> &Arc<dyn XhrRequest> {
        &self.handle
    }

    /// Send the request and resolve with the response handler's result.
    pub fn send_request(self) -> BoxFuture<'static, Result<T, ApiError>> {
        let XhrCall {
            handle,
            shared,
            prepared,
        } = self;
        Box::pin(async move {
            let pending = match prepared? {
                Prepared::Mock { handler, params } => return handler(params).await,
                Prepared::Real(pending) => pending,
            };

            let body = pending.options.body_ref().cloned();
            if body.as_ref().is_some_and(|body| body.is_stream()) {
                return Err(ApiError::UnsupportedStreamingBody);
            }

            let (tx, rx) = oneshot::channel::<XhrEvent>();
            let tx = Arc::new(Mutex::new(Some(tx)));
            for kind in [XhrEventKind::Load, XhrEventKind::Error, XhrEventKind::Abort] {
                let tx = tx.clone();
                let listener: XhrListener = Arc::new(move |event: &XhrEvent| {
                    if let Some(tx) = tx.lock().take() {
                        let _ = tx.send(event.clone());
                    }
                });
                handle.add_event_listener(kind, listener, true);
            }

            handle.send(body);

            let event = rx.await.map_err(|_| {
                TransportError::Network("transport dropped the request without completing".to_string())
            })?;
            match event {
                XhrEvent::Load(response) => route::complete(&shared, response, pending).await,
                XhrEvent::Error(err) => Err(ApiError::TransportFailure(err)),
                XhrEvent::Abort => Err(ApiError::TransportFailure(TransportError::Aborted)),
            }
        })
    }
}
