//! Mock descriptors and the per-call mock decision.
//!
//! # Design
//! Mocks exist at two levels, on the route definition and on the call
//! options. The handler is taken from the call first, then the route.
//! Mocking is attempted when the controller's mock mode is on or either
//! level sets `enabled`. Mock mode alone is advisory: a route without a
//! handler falls through to the real transport. An explicit `enabled` with
//! no handler is a configuration error.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::ApiError;
use crate::http::BoxFuture;

/// A mock handler: receives the call params, produces the call result.
pub type MockHandler<P, T> = Arc<dyn Fn(P) -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

/// Mock settings for a route or a single call.
pub struct MockDescriptor<P, T> {
    pub enabled: Option<bool>,
    pub handler: Option<MockHandler<P, T>>,
}

impl<P, T> MockDescriptor<P, T> {
    /// A descriptor that only turns mocking on.
    pub fn enabled() -> Self {
        Self {
            enabled: Some(true),
            handler: None,
        }
    }

    /// A descriptor carrying an async handler. Enablement is left unset, so
    /// the handler only runs when something else activates mocking.
    pub fn with_handler<F, Fut>(handler: F) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        P: 'static,
        T: 'static,
    {
        Self {
            enabled: None,
            handler: Some(Arc::new(
                move |params| -> BoxFuture<'static, Result<T, ApiError>> { Box::pin(handler(params)) },
            )),
        }
    }

    /// A descriptor carrying a synchronous handler.
    pub fn with_sync_handler<F>(handler: F) -> Self
    where
        F: Fn(P) -> Result<T, ApiError> + Send + Sync + 'static,
        P: 'static,
        T: Send + 'static,
    {
        Self {
            enabled: None,
            handler: Some(Arc::new(move |params| -> BoxFuture<'static, Result<T, ApiError>> {
                let result = handler(params);
                Box::pin(async move { result })
            })),
        }
    }

    pub fn set_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    fn is_enabled(&self) -> bool {
        self.enabled == Some(true)
    }
}

impl<P, T> Default for MockDescriptor<P, T> {
    fn default() -> Self {
        Self {
            enabled: None,
            handler: None,
        }
    }
}

impl<P, T> Clone for MockDescriptor<P, T> {
    fn clone(&self) -> Self {
        Self {
            enabled: self.enabled,
            handler: self.handler.clone(),
        }
    }
}

impl<P, T> fmt::Debug for MockDescriptor<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockDescriptor")
            .field("enabled", &self.enabled)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// Decide which mock handler, if any, serves this call.
///
/// Returns `Ok(None)` when the real transport should be used.
pub fn resolve_mock_handler<P, T>(
    call: Option<&MockDescriptor<P, T>>,
    route: Option<&MockDescriptor<P, T>>,
    mock_mode_enabled: bool,
    path: &str,
) -> Result<Option<MockHandler<P, T>>, ApiError> {
    let explicitly_enabled =
        call.is_some_and(MockDescriptor::is_enabled) || route.is_some_and(MockDescriptor::is_enabled);
    if !mock_mode_enabled && !explicitly_enabled {
        return Ok(None);
    }

    let handler = call
        .and_then(|mock| mock.handler.clone())
        .or_else(|| route.and_then(|mock| mock.handler.clone()));

    match handler {
        Some(handler) => Ok(Some(handler)),
        None if explicitly_enabled => Err(ApiError::MissingMockHandler {
            path: path.to_string(),
        }),
        None => Ok(None),
    }
}
