//! Controller configuration.
//!
//! # Design
//! `ControllerConfig` is the partial input a caller hands to the controller;
//! `Config` is what the controller keeps after merging that input over the
//! built-in defaults (`method: GET` shared options, JSON response handling).
//! Only the shared options change after construction, and only through the
//! controller's setters.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::options::SharedOptions;
use crate::route::ResponseHandler;

/// Environment variable that supplies a base URL to `ControllerConfig::from_env`.
pub const BASE_URL_ENV_VAR: &str = "ROUTEWIRE_BASE_URL";

/// Diagnostic sink for messages such as "making a mock request to /users/1".
pub trait Logger: Send + Sync {
    fn info(&self, message: &str);
}

/// Forwards logger messages to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: "routewire", "{message}");
    }
}

/// Construction-time configuration. Every field is optional.
#[derive(Clone, Default)]
pub struct ControllerConfig {
    pub base: Option<String>,
    pub shared_request_options: Option<SharedOptions>,
    pub default_response_handler: Option<ResponseHandler<Value>>,
    pub logger: Option<Arc<dyn Logger>>,
}

impl ControllerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the environment: the base URL comes from
    /// `ROUTEWIRE_BASE_URL` when set.
    pub fn from_env() -> Self {
        let base = std::env::var_os(BASE_URL_ENV_VAR).and_then(|val| val.into_string().ok());
        Self {
            base,
            ..Self::default()
        }
    }

    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn shared_request_options(mut self, options: impl Into<SharedOptions>) -> Self {
        self.shared_request_options = Some(options.into());
        self
    }

    pub fn default_response_handler(mut self, handler: ResponseHandler<Value>) -> Self {
        self.default_response_handler = Some(handler);
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }
}

impl fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("base", &self.base)
            .field("shared_request_options", &self.shared_request_options)
            .field("default_response_handler", &self.default_response_handler.is_some())
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

/// The controller's resolved configuration.
#[derive(Clone)]
pub struct Config {
    pub base: String,
    pub shared_request_options: SharedOptions,
    /// `None` means the built-in JSON handler.
    pub default_response_handler: Option<ResponseHandler<Value>>,
    pub logger: Option<Arc<dyn Logger>>,
}

impl From<ControllerConfig> for Config {
    fn from(input: ControllerConfig) -> Self {
        Self {
            base: input.base.unwrap_or_default(),
            shared_request_options: input.shared_request_options.unwrap_or_default(),
            default_response_handler: input.default_response_handler,
            logger: input.logger,
        }
    }
}

impl Config {
    pub fn log_info(&self, message: &str) {
        if let Some(logger) = &self.logger {
            logger.info(message);
        }
    }
}
