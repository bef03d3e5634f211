//! # Status Event Bus
//!
//! Status-code keyed observers notified after every real (non-mocked)
//! response, before the response handler's result reaches the caller.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::http::HttpResponse;
use crate::options::RequestOptions;

/// What a status handler sees about a completed request.
#[derive(Debug, Clone, Copy)]
pub struct ResponseMeta<'a> {
    pub status: u16,
    pub response: &'a HttpResponse,
    pub url: &'a str,
    pub options: &'a RequestOptions,
}

/// A status observer. Identity is the `Arc` pointer, so keep the returned
/// handle around to remove it later.
pub type StatusHandler = Arc<dyn Fn(&ResponseMeta<'_>) + Send + Sync>;

/// Registry of status observers.
///
/// Each status maps to a set of handlers; a status whose set becomes empty
/// is removed from the map.
#[derive(Default)]
pub struct StatusEventBus {
    handlers: HashMap<u16, Vec<StatusHandler>>,
}

impl StatusEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `status`. Registering the same handle twice is
    /// a no-op.
    pub fn on(&mut self, status: u16, handler: StatusHandler) {
        let set = self.handlers.entry(status).or_default();
        if !set.iter().any(|existing| Arc::ptr_eq(existing, &handler)) {
            set.push(handler);
        }
    }

    /// Remove `handler` from `status`, or every handler for `status` when
    /// `handler` is `None`.
    pub fn off(&mut self, status: u16, handler: Option<&StatusHandler>) {
        let Some(handler) = handler else {
            self.handlers.remove(&status);
            return;
        };
        if let Some(set) = self.handlers.get_mut(&status) {
            set.retain(|existing| !Arc::ptr_eq(existing, handler));
            if set.is_empty() {
                self.handlers.remove(&status);
            }
        }
    }

    /// Handlers currently registered for `status`.
    pub fn handlers_for(&self, status: u16) -> Vec<StatusHandler> {
        self.handlers.get(&status).cloned().unwrap_or_default()
    }

    pub fn has_handlers(&self, status: u16) -> bool {
        self.handlers.contains_key(&status)
    }

    /// Statuses with at least one handler.
    pub fn statuses(&self) -> impl Iterator<Item = u16> + '_ {
        self.handlers.keys().copied()
    }
}

/// Invoke every handler in `handlers` with `meta`.
///
/// Takes a snapshot rather than the bus itself so the registry lock is not
/// held while handlers run. A panicking handler is logged and skipped.
pub fn dispatch(handlers: &[StatusHandler], meta: &ResponseMeta<'_>) {
    for handler in handlers {
        if catch_unwind(AssertUnwindSafe(|| handler(meta))).is_err() {
            tracing::warn!(
                status = meta.status,
                url = meta.url,
                "status handler panicked; continuing"
            );
        }
    }
}
