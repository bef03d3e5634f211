//! Route definitions, call options, and the pipeline shared by both route
//! factories.
//!
//! # Design
//! A route call runs: route definition → option resolution → mock check →
//! transport → status bus → response handler. Everything except the
//! transport step lives here. `prepare` covers the steps up to the mock
//! decision and `complete` covers everything after a response arrives; the
//! fetch and XHR bindings only differ in how they get from one to the other.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::controller::Shared;
use crate::error::ApiError;
use crate::events::{dispatch, ResponseMeta};
use crate::http::{BoxFuture, HttpResponse};
use crate::mock::{resolve_mock_handler, MockDescriptor, MockHandler};
use crate::options::{resolve_options, RequestOptions};

/// Turns a raw response into the call's result.
///
/// Receives the response, the final URL and the final options.
pub type ResponseHandler<T> =
    Arc<dyn Fn(HttpResponse, String, RequestOptions) -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

/// Wrap an async closure as a `ResponseHandler`.
pub fn response_handler<T, F, Fut>(f: F) -> ResponseHandler<T>
where
    F: Fn(HttpResponse, String, RequestOptions) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    T: 'static,
{
    Arc::new(
        move |response, url, options| -> BoxFuture<'static, Result<T, ApiError>> {
            Box::pin(f(response, url, options))
        },
    )
}

/// Wrap a synchronous closure as a `ResponseHandler`.
pub fn sync_response_handler<T, F>(f: F) -> ResponseHandler<T>
where
    F: Fn(HttpResponse, String, RequestOptions) -> Result<T, ApiError> + Send + Sync + 'static,
    T: Send + 'static,
{
    Arc::new(
        move |response, url, options| -> BoxFuture<'static, Result<T, ApiError>> {
            let result = f(response, url, options);
            Box::pin(async move { result })
        },
    )
}

/// What a route-definition function returns for one call.
pub struct RouteDefinition<P, T> {
    pub path: String,
    pub request_options: Option<RequestOptions>,
    pub mock: Option<MockDescriptor<P, T>>,
    pub response_handler: Option<ResponseHandler<T>>,
}

impl<P, T> RouteDefinition<P, T> {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            request_options: None,
            mock: None,
            response_handler: None,
        }
    }

    pub fn request_options(mut self, options: RequestOptions) -> Self {
        self.request_options = Some(options);
        self
    }

    pub fn mock(mut self, mock: MockDescriptor<P, T>) -> Self {
        self.mock = Some(mock);
        self
    }

    pub fn response_handler(mut self, handler: ResponseHandler<T>) -> Self {
        self.response_handler = Some(handler);
        self
    }
}

impl<P, T> fmt::Debug for RouteDefinition<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("path", &self.path)
            .field("request_options", &self.request_options)
            .field("mock", &self.mock)
            .field("response_handler", &self.response_handler.is_some())
            .finish()
    }
}

/// The user function behind a route, evaluated fresh on every call.
pub type RouteFn<P, T> = Arc<dyn Fn(&P) -> RouteDefinition<P, T> + Send + Sync>;

/// Per-call overrides.
pub struct CallOptions<P, T> {
    pub custom_request_options: Option<RequestOptions>,
    pub mock: Option<MockDescriptor<P, T>>,
    pub custom_response_handler: Option<ResponseHandler<T>>,
}

impl<P, T> CallOptions<P, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_options(mut self, options: RequestOptions) -> Self {
        self.custom_request_options = Some(options);
        self
    }

    pub fn mock(mut self, mock: MockDescriptor<P, T>) -> Self {
        self.mock = Some(mock);
        self
    }

    pub fn response_handler(mut self, handler: ResponseHandler<T>) -> Self {
        self.custom_response_handler = Some(handler);
        self
    }
}

impl<P, T> Default for CallOptions<P, T> {
    fn default() -> Self {
        Self {
            custom_request_options: None,
            mock: None,
            custom_response_handler: None,
        }
    }
}

/// The handler that will process a real response, picked at prepare time.
enum EffectiveHandler<T> {
    Custom(ResponseHandler<T>),
    ConfigDefault(ResponseHandler<Value>),
    Json,
}

impl<T: DeserializeOwned> EffectiveHandler<T> {
    async fn handle(self, response: HttpResponse, url: String, options: RequestOptions) -> Result<T, ApiError> {
        match self {
            EffectiveHandler::Custom(handler) => handler(response, url, options).await,
            EffectiveHandler::ConfigDefault(handler) => {
                let value = handler(response, url, options).await?;
                serde_json::from_value(value).map_err(ApiError::handler)
            }
            EffectiveHandler::Json => response.json(),
        }
    }
}

/// A real request ready to hand to a transport.
pub(crate) struct PendingRequest<T> {
    pub url: String,
    pub options: RequestOptions,
    handler: EffectiveHandler<T>,
}

/// Outcome of the pre-transport steps.
pub(crate) enum Prepared<P, T> {
    Mock { handler: MockHandler<P, T>, params: P },
    Real(PendingRequest<T>),
}

/// Join `path` onto `base` with standard URL resolution. An empty base
/// requires `path` to be absolute.
pub fn join_url(base: &str, path: &str) -> Result<String, ApiError> {
    let url = if base.is_empty() {
        Url::parse(path)
    } else {
        Url::parse(base).and_then(|base| base.join(path))
    };
    url.map(String::from)
        .map_err(|e| ApiError::InvalidUrl(format!("{base} + {path}: {e}")))
}

/// Route definition, option resolution, URL join and mock decision.
pub(crate) fn prepare<P, T>(
    shared: &Shared,
    route_fn: &RouteFn<P, T>,
    params: P,
    call: CallOptions<P, T>,
) -> Result<Prepared<P, T>, ApiError> {
    let route = route_fn(&params);
    let config = shared.config_snapshot();

    let options = resolve_options(
        &config.shared_request_options,
        route.request_options.as_ref(),
        call.custom_request_options.as_ref(),
    );
    let url = join_url(&config.base, &route.path)?;
    tracing::debug!(path = %route.path, %url, method = options.method_str(), "resolved route");

    if let Some(handler) = resolve_mock_handler(call.mock.as_ref(), route.mock.as_ref(), shared.mock_mode_enabled(), &route.path)? {
        config.log_info(&format!("making a mock request to {}", route.path));
        return Ok(Prepared::Mock { handler, params });
    }

    let handler = match (call.custom_response_handler, route.response_handler) {
        (Some(handler), _) | (None, Some(handler)) => EffectiveHandler::Custom(handler),
        (None, None) => match config.default_response_handler {
            Some(handler) => EffectiveHandler::ConfigDefault(handler),
            None => EffectiveHandler::Json,
        },
    };

    Ok(Prepared::Real(PendingRequest { url, options, handler }))
}

/// Status bus fan-out followed by the effective response handler.
pub(crate) async fn complete<T: DeserializeOwned>(
    shared: &Shared,
    response: HttpResponse,
    pending: PendingRequest<T>,
) -> Result<T, ApiError> {
    let PendingRequest { url, options, handler } = pending;
    tracing::debug!(status = response.status, %url, "response received");

    let observers = shared.status_handlers(response.status);
    if !observers.is_empty() {
        let meta = ResponseMeta {
            status: response.status,
            response: &response,
            url: &url,
            options: &options,
        };
        dispatch(&observers, &meta);
    }

    handler.handle(response, url, options).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_appends_absolute_path() {
        assert_eq!(
            join_url("https://api.example.com", "/users/1").unwrap(),
            "https://api.example.com/users/1"
        );
    }

    #[test]
    fn join_url_resolves_relative_to_base_directory() {
        assert_eq!(
            join_url("https://api.example.com/v1/", "users/1").unwrap(),
            "https://api.example.com/v1/users/1"
        );
    }

    #[test]
    fn join_url_absolute_path_overrides_authority() {
        assert_eq!(
            join_url("https://api.example.com", "https://other.example.com/x").unwrap(),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn join_url_empty_base_needs_absolute_path() {
        assert!(matches!(join_url("", "/users/1"), Err(ApiError::InvalidUrl(_))));
        assert_eq!(
            join_url("", "http://localhost:3000/users").unwrap(),
            "http://localhost:3000/users"
        );
    }
}
