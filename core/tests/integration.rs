//! Route calls against the live mock server.
//!
//! # Design
//! Each test starts its own mock server on a random port, then drives fetch
//! routes through `reqwest` and XHR routes through `ureq`, the default
//! transports. Validates option merging, header and credential translation,
//! status observers and response handling over real HTTP.

use std::sync::{Arc, Mutex};

use routewire_core::{
    sync_response_handler, ApiController, ApiError, Body, BodyStream, CallOptions, ControllerConfig,
    HttpResponse, MockDescriptor, RequestOptions, ResponseMeta, RouteDefinition, SharedOptions,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: u64,
    name: String,
}

/// Start the mock server on a random port and return its base URL.
fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn controller(base: &str) -> ApiController {
    ApiController::new(
        ControllerConfig::new()
            .base(base)
            .shared_request_options(RequestOptions::new().method("GET")),
    )
}

#[tokio::test]
async fn fetch_route_returns_json_and_notifies_observers() {
    let base = start_server();
    let api = controller(&base);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    api.on(200, move |meta: &ResponseMeta<'_>| {
        log.lock().unwrap().push((meta.url.to_string(), meta.options.to_value()));
    });

    let get_user = api.create_route(|id: &u64| RouteDefinition::<u64, Value>::new(format!("/users/{id}")));
    let user = get_user.call(1).await.unwrap();

    assert_eq!(user, json!({"id": 1, "name": "John Doe"}));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![(format!("{base}/users/1"), json!({"method": "GET"}))]
    );
}

#[tokio::test]
async fn fetch_route_posts_json_into_typed_result() {
    let base = start_server();
    let api = controller(&base);
    let created = Arc::new(Mutex::new(0));
    let counter = created.clone();
    api.on(201, move |_: &ResponseMeta<'_>| *counter.lock().unwrap() += 1);

    let create_user = api.create_route(|name: &String| {
        RouteDefinition::<String, User>::new("/users")
            .request_options(RequestOptions::new().method("POST").json_body(&json!({ "name": name })))
    });
    let user = create_user.call("Jane Roe".to_string()).await.unwrap();

    assert_eq!(
        user,
        User {
            id: 2,
            name: "Jane Roe".to_string()
        }
    );
    assert_eq!(*created.lock().unwrap(), 1);
}

#[tokio::test]
async fn not_found_reaches_status_observer_and_custom_handler() {
    let base = start_server();
    let api = controller(&base);
    let missing = Arc::new(Mutex::new(Vec::new()));
    let log = missing.clone();
    api.on(404, move |meta: &ResponseMeta<'_>| log.lock().unwrap().push(meta.url.to_string()));

    let get_user = api.create_route(|id: &u64| {
        RouteDefinition::new(format!("/users/{id}")).response_handler(sync_response_handler(
            |resp: HttpResponse, _, _| match resp.status {
                404 => Ok(None),
                _ => resp.json::<User>().map(Some),
            },
        ))
    });

    assert_eq!(get_user.call(999).await.unwrap(), None);
    assert_eq!(*missing.lock().unwrap(), vec![format!("{base}/users/999")]);
    assert_eq!(get_user.call(1).await.unwrap().map(|u| u.name), Some("John Doe".to_string()));
}

#[tokio::test]
async fn computed_shared_options_are_read_per_call() {
    let base = start_server();
    let api = controller(&base);
    let token = Arc::new(Mutex::new("first".to_string()));
    let current = token.clone();
    api.set_shared_request_options(SharedOptions::computed(move || {
        RequestOptions::new().header("authorization", &format!("Bearer {}", current.lock().unwrap()))
    }));

    let echo = api.create_route(|_: &()| RouteDefinition::<(), Value>::new("/echo"));
    let first = echo.call(()).await.unwrap();
    *token.lock().unwrap() = "second".to_string();
    let second = echo.call(()).await.unwrap();

    assert_eq!(first["headers"]["authorization"], "Bearer first");
    assert_eq!(second["headers"]["authorization"], "Bearer second");
    assert_eq!(first["method"], "GET");
}

#[tokio::test]
async fn fetch_route_sends_streaming_body() {
    let base = start_server();
    let api = controller(&base);
    let upload = api.create_route(|_: &()| {
        RouteDefinition::<(), Value>::new("/echo").request_options(
            RequestOptions::new()
                .method("POST")
                .body(Body::Stream(BodyStream::new(std::io::Cursor::new(b"streamed".to_vec())))),
        )
    });

    let echoed = upload.call(()).await.unwrap();
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["body"], "streamed");
}

#[tokio::test]
async fn mock_mode_is_advisory_against_live_server() {
    let base = start_server();
    let api = controller(&base);
    api.set_mock_mode(true);

    let mocked = api.create_route(|id: &u64| {
        RouteDefinition::<u64, Value>::new(format!("/users/{id}"))
            .mock(MockDescriptor::with_handler(|id: u64| async move {
                Ok(json!({"name": format!("User: {id}: John Doe")}))
            }))
    });
    let unmocked = api.create_route(|id: &u64| RouteDefinition::<u64, Value>::new(format!("/users/{id}")));

    assert_eq!(mocked.call(1).await.unwrap(), json!({"name": "User: 1: John Doe"}));
    assert_eq!(unmocked.call(1).await.unwrap(), json!({"id": 1, "name": "John Doe"}));
}

#[tokio::test]
async fn xhr_route_translates_headers_and_resolves() {
    let base = start_server();
    let api = controller(&base);
    let observed = Arc::new(Mutex::new(Vec::new()));
    let log = observed.clone();
    api.on(200, move |meta: &ResponseMeta<'_>| log.lock().unwrap().push(meta.status));

    let echo = api.create_xhr_route(|_: &()| {
        RouteDefinition::<(), Value>::new("/echo").request_options(RequestOptions::from_value(json!({
            "method": "PUT",
            "credentials": "include",
            "headers": {"x-app": "routewire", "x-retries": 3}
        })))
    });

    let call = echo.call_with((), CallOptions::new().request_options(RequestOptions::new().body("hello")));
    assert!(call.handle().with_credentials());

    let echoed = call.send_request().await.unwrap();
    assert_eq!(echoed["method"], "PUT");
    assert_eq!(echoed["headers"]["x-app"], "routewire");
    assert!(echoed["headers"].get("x-retries").is_none());
    assert_eq!(echoed["body"], "hello");
    assert_eq!(*observed.lock().unwrap(), vec![200]);
}

#[tokio::test]
async fn xhr_route_returns_typed_user() {
    let base = start_server();
    let api = controller(&base);
    let get_user = api.create_xhr_route(|id: &u64| RouteDefinition::<u64, User>::new(format!("/users/{id}")));

    let user = get_user.call(1).send_request().await.unwrap();
    assert_eq!(
        user,
        User {
            id: 1,
            name: "John Doe".to_string()
        }
    );
}

#[tokio::test]
async fn xhr_route_rejects_streaming_body() {
    let base = start_server();
    let api = controller(&base);
    let upload = api.create_xhr_route(|_: &()| {
        RouteDefinition::<(), Value>::new("/echo").request_options(
            RequestOptions::new()
                .method("POST")
                .body(Body::Stream(BodyStream::new(std::io::Cursor::new(b"streamed".to_vec())))),
        )
    });

    let err = upload.call(()).send_request().await.unwrap_err();
    assert_eq!(err, ApiError::UnsupportedStreamingBody);
}

#[tokio::test]
async fn unreachable_server_is_a_transport_failure() {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    drop(std_listener);

    let api = controller(&format!("http://{addr}"));
    let route = api.create_route(|_: &()| RouteDefinition::<(), Value>::new("/users"));
    assert!(matches!(route.call(()).await, Err(ApiError::TransportFailure(_))));

    let xhr_route = api.create_xhr_route(|_: &()| RouteDefinition::<(), Value>::new("/users"));
    assert!(matches!(
        xhr_route.call(()).send_request().await,
        Err(ApiError::TransportFailure(_))
    ));
}

#[tokio::test]
async fn form_bodies_are_urlencoded_by_both_transports() {
    let base = start_server();
    let api = controller(&base);
    let response_urls = Arc::new(Mutex::new(Vec::new()));
    let log = response_urls.clone();
    api.on(200, move |meta: &ResponseMeta<'_>| log.lock().unwrap().push(meta.response.url.clone()));

    let form = || {
        RequestOptions::new().method("POST").body(Body::Form(vec![
            ("name".to_string(), "John Doe".to_string()),
            ("q".to_string(), "a&b=c".to_string()),
        ]))
    };
    let fetch_echo = api.create_route(move |_: &()| RouteDefinition::<(), Value>::new("/echo").request_options(form()));
    let xhr_echo = api.create_xhr_route(move |_: &()| RouteDefinition::<(), Value>::new("/echo").request_options(form()));

    for echoed in [
        fetch_echo.call(()).await.unwrap(),
        xhr_echo.call(()).send_request().await.unwrap(),
    ] {
        assert_eq!(echoed["body"], "name=John+Doe&q=a%26b%3Dc");
        assert_eq!(echoed["headers"]["content-type"], "application/x-www-form-urlencoded");
    }
    assert_eq!(*response_urls.lock().unwrap(), vec![format!("{base}/echo"), format!("{base}/echo")]);
}
