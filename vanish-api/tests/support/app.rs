use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use vanish_api::{create_router, AppState, DEFAULT_MAX_CONCURRENT_REQUESTS};
use vanish_test_utils::fixtures::{test_tiers, TestTiers};

/// Router over fresh flaky in-memory tiers, plus the tiers themselves.
pub fn test_app() -> (Router, TestTiers) {
    let tiers = test_tiers();
    let state = AppState::new(tiers.service.clone());
    (create_router(state, DEFAULT_MAX_CONCURRENT_REQUESTS), tiers)
}

/// Send one request and decode the body as JSON (`Value::Null` when empty
/// or not JSON).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// POST a secret and return its key, asserting the request succeeded.
pub async fn create(app: &Router, body: Value) -> String {
    let (status, json) = send(app, Method::POST, "/secret", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {json}");
    json["secret_key"]
        .as_str()
        .expect("response carries a secret_key")
        .to_string()
}
