//! Request options and the three-layer option resolver.
//!
//! # Design
//! Options are an ordered JSON object so arbitrary keys (`method`, `headers`,
//! `credentials`, `mode`, ...) merge uniformly. Merging is key-presence
//! based: nested objects merge recursively, every other value kind
//! (arrays included) is replaced by the later source.
//!
//! Precedence, lowest first: built-in default (`method: GET`), shared
//! options, route-defined options, call-time options.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::http::Body;

pub const DEFAULT_METHOD: &str = "GET";

/// Options for a single request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    fields: Map<String, Value>,
    body: Option<Body>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from a JSON value. Anything but an object yields empty
    /// options.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields, body: None },
            _ => Self::default(),
        }
    }

    pub fn method(mut self, method: &str) -> Self {
        self.fields
            .insert("method".to_string(), Value::String(method.to_uppercase()));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        let headers = self
            .fields
            .entry("headers")
            .or_insert_with(|| Value::Object(Map::new()));
        if !headers.is_object() {
            *headers = Value::Object(Map::new());
        }
        if let Value::Object(map) = headers {
            map.insert(name.to_string(), Value::String(value.to_string()));
        }
        self
    }

    pub fn credentials(mut self, mode: &str) -> Self {
        self.fields
            .insert("credentials".to_string(), Value::String(mode.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the body and mark it `application/json`.
    pub fn json_body(self, value: &Value) -> Self {
        self.header("content-type", "application/json")
            .body(value.to_string())
    }

    /// Set an arbitrary option key.
    pub fn set(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The resolved method, `GET` when unset or not a string.
    pub fn method_str(&self) -> &str {
        self.fields
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_METHOD)
    }

    /// The `headers` record, if present and an object.
    pub fn headers(&self) -> Option<&Map<String, Value>> {
        self.fields.get("headers").and_then(Value::as_object)
    }

    /// Header entries whose values are strings, in insertion order.
    pub fn string_headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers()
            .into_iter()
            .flat_map(|headers| headers.iter())
            .filter_map(|(name, value)| value.as_str().map(|value| (name.as_str(), value)))
    }

    pub fn credentials_mode(&self) -> Option<&str> {
        self.fields.get("credentials").and_then(Value::as_str)
    }

    pub fn body_ref(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// The option fields as a JSON object; the body is not included.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Merge `other` over `self`, `other` winning on conflicts.
    pub fn merged_with(&self, other: &RequestOptions) -> RequestOptions {
        let mut fields = self.fields.clone();
        deep_merge(&mut fields, &other.fields);
        RequestOptions {
            fields,
            body: other.body.clone().or_else(|| self.body.clone()),
        }
    }
}

impl From<Map<String, Value>> for RequestOptions {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields, body: None }
    }
}

/// Deep-merge `source` into `target`.
///
/// For each key of `source`: when both values are objects they merge
/// recursively, otherwise the source value replaces the target value.
pub fn deep_merge(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, incoming) in source {
        match (target.get_mut(key), incoming) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), incoming.clone());
            }
        }
    }
}

/// Shared options: a fixed value or a function evaluated on every call.
#[derive(Clone)]
pub enum SharedOptions {
    Static(RequestOptions),
    Computed(Arc<dyn Fn() -> RequestOptions + Send + Sync>),
}

impl SharedOptions {
    pub fn computed(f: impl Fn() -> RequestOptions + Send + Sync + 'static) -> Self {
        SharedOptions::Computed(Arc::new(f))
    }

    /// The current snapshot.
    pub fn resolve(&self) -> RequestOptions {
        match self {
            SharedOptions::Static(options) => options.clone(),
            SharedOptions::Computed(f) => f(),
        }
    }
}

impl Default for SharedOptions {
    fn default() -> Self {
        SharedOptions::Static(RequestOptions::new().method(DEFAULT_METHOD))
    }
}

impl From<RequestOptions> for SharedOptions {
    fn from(options: RequestOptions) -> Self {
        SharedOptions::Static(options)
    }
}

impl fmt::Debug for SharedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SharedOptions::Static(options) => f.debug_tuple("Static").field(options).finish(),
            SharedOptions::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Merge the three option layers over the built-in default.
pub fn resolve_options(
    shared: &SharedOptions,
    route: Option<&RequestOptions>,
    call: Option<&RequestOptions>,
) -> RequestOptions {
    let mut resolved = RequestOptions::new()
        .method(DEFAULT_METHOD)
        .merged_with(&shared.resolve());
    for layer in [route, call].into_iter().flatten() {
        resolved = resolved.merged_with(layer);
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn opts(value: Value) -> RequestOptions {
        RequestOptions::from_value(value)
    }

    #[test]
    fn later_scalar_replaces_earlier() {
        let resolved = resolve_options(
            &SharedOptions::Static(opts(json!({"method": "GET", "mode": "cors"}))),
            Some(&opts(json!({"method": "POST"}))),
            None,
        );
        assert_eq!(resolved.to_value(), json!({"method": "POST", "mode": "cors"}));
    }

    #[test]
    fn nested_objects_merge_recursively() {
        let resolved = resolve_options(
            &SharedOptions::Static(opts(json!({"headers": {"authorization": "Bearer a", "x-app": "1"}}))),
            Some(&opts(json!({"headers": {"x-route": "users"}}))),
            Some(&opts(json!({"headers": {"authorization": "Bearer b"}}))),
        );
        assert_eq!(
            resolved.to_value(),
            json!({
                "method": "GET",
                "headers": {"authorization": "Bearer b", "x-app": "1", "x-route": "users"}
            })
        );
    }

    #[test]
    fn arrays_are_replaced_not_concatenated() {
        let resolved = resolve_options(
            &SharedOptions::Static(opts(json!({"tags": [1, 2]}))),
            None,
            Some(&opts(json!({"tags": [3]}))),
        );
        assert_eq!(resolved.get("tags"), Some(&json!([3])));
    }

    #[test]
    fn object_replaced_by_scalar_and_back() {
        let mut target = json!({"a": {"b": 1}, "c": 1}).as_object().unwrap().clone();
        let source = json!({"a": null, "c": {"d": 2}}).as_object().unwrap().clone();
        deep_merge(&mut target, &source);
        assert_eq!(Value::Object(target), json!({"a": null, "c": {"d": 2}}));
    }

    #[test]
    fn inputs_are_not_mutated() {
        let shared = opts(json!({"headers": {"a": "1"}}));
        let route = opts(json!({"headers": {"b": "2"}}));
        let _ = resolve_options(&SharedOptions::Static(shared.clone()), Some(&route), None);
        assert_eq!(shared.to_value(), json!({"headers": {"a": "1"}}));
        assert_eq!(route.to_value(), json!({"headers": {"b": "2"}}));
    }

    #[test]
    fn computed_shared_options_run_on_every_resolve() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let shared = SharedOptions::computed(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            RequestOptions::new().header("authorization", &format!("Bearer {n}"))
        });

        let first = resolve_options(&shared, None, None);
        let second = resolve_options(&shared, None, None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(first.headers().unwrap()["authorization"], "Bearer 1");
        assert_eq!(second.headers().unwrap()["authorization"], "Bearer 2");
    }

    #[test]
    fn empty_layers_yield_default_method() {
        let resolved = resolve_options(&SharedOptions::Static(RequestOptions::new()), None, None);
        assert_eq!(resolved.to_value(), json!({"method": "GET"}));
        assert_eq!(resolved.method_str(), "GET");
    }

    #[test]
    fn later_body_wins() {
        let route = RequestOptions::new().body("route");
        let call = RequestOptions::new().body("call");
        let resolved = resolve_options(&SharedOptions::default(), Some(&route), Some(&call));
        assert!(matches!(resolved.body_ref(), Some(Body::Text(text)) if text == "call"));

        let resolved = resolve_options(&SharedOptions::default(), Some(&route), None);
        assert!(matches!(resolved.body_ref(), Some(Body::Text(text)) if text == "route"));
    }

    #[test]
    fn string_headers_skip_other_values() {
        let options = opts(json!({"headers": {"a": "1", "b": 2, "c": null, "d": "4"}}));
        let headers: Vec<_> = options.string_headers().collect();
        assert_eq!(headers, vec![("a", "1"), ("d", "4")]);
    }

    #[test]
    fn json_body_sets_content_type() {
        let options = RequestOptions::new().json_body(&json!({"name": "John Doe"}));
        assert_eq!(options.headers().unwrap()["content-type"], "application/json");
        assert!(matches!(options.body_ref(), Some(Body::Text(text)) if text == r#"{"name":"John Doe"}"#));
    }
}
