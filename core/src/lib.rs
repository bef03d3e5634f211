//! Declarative API routes over fetch-style and XHR-style transports.
//!
//! # Overview
//! An `ApiController` holds a base URL, shared request options and a status
//! event bus. Routes are created from a function that maps call params to a
//! `RouteDefinition` (path, options, mock, response handler); every call
//! merges shared, route and call options, optionally short-circuits to a
//! mock, performs the request, notifies status observers, and runs the
//! response handler.
//!
//! # Design
//! - Option merging and mock selection are pure functions (`options`,
//!   `mock`) so they can be tested without a transport.
//! - The pipeline is written once (`route`) and bound twice: `fetch` for a
//!   single async request call, `xhr` for an imperative request object.
//! - Transports sit behind traits (`transport`); `reqwest` and `ureq` backed
//!   implementations are the defaults.
//! - Each controller owns its state; there are no globals.

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod fetch;
pub mod http;
pub mod mock;
pub mod options;
pub mod route;
pub mod transport;
pub mod xhr;

pub use config::{ControllerConfig, Logger, TracingLogger};
pub use controller::ApiController;
pub use error::{ApiError, TransportError};
pub use events::{ResponseMeta, StatusHandler};
pub use fetch::FetchRoute;
pub use http::{Body, BodyStream, BoxFuture, HttpResponse};
pub use mock::MockDescriptor;
pub use options::{deep_merge, resolve_options, RequestOptions, SharedOptions};
pub use route::{response_handler, sync_response_handler, CallOptions, ResponseHandler, RouteDefinition};
pub use xhr::{XhrCall, XhrRoute};
