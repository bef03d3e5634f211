//! Route factory over the fetch transport.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::controller::Shared;
use crate::error::ApiError;
use crate::http::BoxFuture;
use crate::route::{self, CallOptions, Prepared, RouteFn};

/// A callable API route bound to a controller.
///
/// Each call re-evaluates the route definition, merges options, consults the
/// mock resolver, and only then reaches the transport.
pub struct FetchRoute<P, T> {
    shared: Arc<Shared>,
    route_fn: RouteFn<P, T>,
}

impl<P, T> Clone for FetchRoute<P, T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            route_fn: self.route_fn.clone(),
        }
    }
}

impl<P, T> FetchRoute<P, T>
where
    P: Send + 'static,
    T: DeserializeOwned + Send + 'static,
{
    pub(crate) fn new(shared: Arc<Shared>, route_fn: RouteFn<P, T>) -> Self {
        Self { shared, route_fn }
    }

    pub fn call(&self, params: P) -> BoxFuture<'static, Result<T, ApiError>> {
        self.call_with(params, CallOptions::default())
    }

    /// Call with per-call overrides.
    ///
    /// The route definition, option merge and mock decision run before this
    /// returns; the transport and response handling run when the future is
    /// polled.
    pub fn call_with(&self, params: P, options: CallOptions<P, T>) -> BoxFuture<'static, Result<T, ApiError>> {
        let prepared = route::prepare(&self.shared, &self.route_fn, params, options);
        let shared = self.shared.clone();
        Box::pin(async move {
            match prepared? {
                Prepared::Mock { handler, params } => handler(params).await,
                Prepared::Real(pending) => {
                    let response = shared.fetch.fetch(&pending.url, &pending.options).await?;
                    route::complete(&shared, response, pending).await
                }
            }
        })
    }
}
