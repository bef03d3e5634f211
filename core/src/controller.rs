//! The API controller: owns one configuration and one status bus and hands
//! out route functions bound to them.
//!
//! # Design
//! All mutable state sits in `Shared` behind a single `Arc`. Every route
//! created by a controller keeps a clone, so configuration changes and
//! status handler registrations made after a route was created are seen by
//! its next call. Locks are held only for the duration of a read or write,
//! never across an await.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;

use crate::config::{Config, ControllerConfig};
use crate::events::{ResponseMeta, StatusEventBus, StatusHandler};
use crate::fetch::FetchRoute;
use crate::options::{RequestOptions, SharedOptions};
use crate::route::{RouteDefinition, RouteFn};
use crate::transport::{FetchTransport, ReqwestFetch, UreqXhrFactory, XhrFactory};
use crate::xhr::XhrRoute;

/// State shared between a controller and its routes.
pub(crate) struct Shared {
    config: RwLock<Config>,
    bus: RwLock<StatusEventBus>,
    mock_mode: AtomicBool,
    pub(crate) fetch: Arc<dyn FetchTransport>,
    pub(crate) xhr: Arc<dyn XhrFactory>,
}

impl Shared {
    pub(crate) fn config_snapshot(&self) -> Config {
        self.config.read().clone()
    }

    pub(crate) fn mock_mode_enabled(&self) -> bool {
        self.mock_mode.load(Ordering::SeqCst)
    }

    pub(crate) fn status_handlers(&self, status: u16) -> Vec<StatusHandler> {
        self.bus.read().handlers_for(status)
    }
}

/// Entry point: configure once, then create routes.
#[derive(Clone)]
pub struct ApiController {
    shared: Arc<Shared>,
}

impl ApiController {
    /// Create a controller using `reqwest` for fetch routes and `ureq` for
    /// XHR routes.
    pub fn new(config: ControllerConfig) -> Self {
        Self::with_transports(config, Arc::new(ReqwestFetch::new()), Arc::new(UreqXhrFactory::new()))
    }

    pub fn with_transports(
        config: ControllerConfig,
        fetch: Arc<dyn FetchTransport>,
        xhr: Arc<dyn XhrFactory>,
    ) -> Self {
        let config = Config::from(config);
        tracing::debug!(base = %config.base, "creating api controller");
        Self {
            shared: Arc::new(Shared {
                config: RwLock::new(config),
                bus: RwLock::new(StatusEventBus::new()),
                mock_mode: AtomicBool::new(false),
                fetch,
                xhr,
            }),
        }
    }

    pub fn base(&self) -> String {
        self.shared.config.read().base.clone()
    }

    /// Replace the shared request options.
    pub fn set_shared_request_options(&self, options: impl Into<SharedOptions>) {
        self.shared.config.write().shared_request_options = options.into();
    }

    /// Replace the shared request options with `update(current)`, where
    /// `current` is the resolved snapshot of the existing value.
    ///
    /// The configuration stays write-locked while `update` runs, so
    /// concurrent updates apply one after another. `update` must not call
    /// back into this controller.
    pub fn update_shared_request_options<F>(&self, update: F)
    where
        F: FnOnce(RequestOptions) -> RequestOptions,
    {
        let mut config = self.shared.config.write();
        let next = update(config.shared_request_options.resolve());
        config.shared_request_options = SharedOptions::Static(next);
    }

    /// The shared request options as the next call would see them.
    pub fn shared_request_options(&self) -> RequestOptions {
        let shared = self.shared.config.read().shared_request_options.clone();
        shared.resolve()
    }

    pub fn set_mock_mode(&self, enabled: bool) {
        self.shared.mock_mode.store(enabled, Ordering::SeqCst);
    }

    pub fn mock_mode_enabled(&self) -> bool {
        self.shared.mock_mode_enabled()
    }

    /// Observe every real response with `status`. Returns the registered
    /// handle for use with `off`.
    pub fn on<F>(&self, status: u16, handler: F) -> StatusHandler
    where
        F: Fn(&ResponseMeta<'_>) + Send + Sync + 'static,
    {
        let handler: StatusHandler = Arc::new(handler);
        self.on_handler(status, handler.clone());
        handler
    }

    /// Register an existing handle. Registering the same handle twice for
    /// one status is a no-op.
    pub fn on_handler(&self, status: u16, handler: StatusHandler) {
        self.shared.bus.write().on(status, handler);
    }

    /// Remove one handler, or all handlers for `status` when `handler` is
    /// `None`.
    pub fn off(&self, status: u16, handler: Option<&StatusHandler>) {
        self.shared.bus.write().off(status, handler);
    }

    pub fn has_status_handlers(&self, status: u16) -> bool {
        self.shared.bus.read().has_handlers(status)
    }

    /// Create a route over the fetch transport.
    pub fn create_route<P, T, F>(&self, definition: F) -> FetchRoute<P, T>
    where
        F: Fn(&P) -> RouteDefinition<P, T> + Send + Sync + 'static,
        P: Send + 'static,
        T: DeserializeOwned + Send + 'static,
    {
        let route_fn: RouteFn<P, T> = Arc::new(definition);
        FetchRoute::new(self.shared.clone(), route_fn)
    }

    /// Create a route over the XHR transport.
    pub fn create_xhr_route<P, T, F>(&self, definition: F) -> XhrRoute<P, T>
    where
        F: Fn(&P) -> RouteDefinition<P, T> + Send + Sync + 'static,
        P: Send + 'static,
        T: DeserializeOwned + Send + 'static,
    {
        let route_fn: RouteFn<P, T> = Arc::new(definition);
        XhrRoute::new(self.shared.clone(), route_fn)
    }
}
