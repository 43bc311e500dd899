//! HTTP-level tests for the secret endpoints
//!
//! Every test runs against the full router over in-memory tiers that share
//! a manual clock, so expiry is driven without sleeping.

use axum::http::{Method, StatusCode};
use serde_json::json;

#[path = "support/app.rs"]
mod app_support;
use app_support::{create, send, test_app};

#[tokio::test]
async fn test_secret_is_readable_exactly_once() {
    let (app, _tiers) = test_app();
    let key = create(&app, json!({ "secret": "Meow" })).await;

    let (status, body) = send(&app, Method::GET, &format!("/secret/{key}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["secret"], "Meow");

    let (status, body) = send(&app, Method::GET, &format!("/secret/{key}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SECRET_NOT_FOUND");
}

#[tokio::test]
async fn test_create_reports_absolute_expiry() {
    let (app, _tiers) = test_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/secret",
        Some(json!({ "secret": "s", "ttl_seconds": 300 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["expires_at"].is_string());
    assert_eq!(body["warnings"], json!([]));

    let (_, body) = send(&app, Method::POST, "/secret", Some(json!({ "secret": "s" }))).await;
    assert!(body.get("expires_at").is_none());
}

#[tokio::test]
async fn test_passphrase_delete_flow() {
    let (app, _tiers) = test_app();
    let key = create(&app, json!({ "secret": "Meow", "passphrase": "Woof" })).await;
    let uri = format!("/secret/{key}");

    let (status, body) = send(&app, Method::DELETE, &uri, Some(json!({ "passphrase": "Meow" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "INVALID_PASSPHRASE");

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::DELETE, &uri, Some(json!({ "passphrase": "Woof" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "deleted");

    let (status, _) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(json!({ "passphrase": "Woof" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_forbidden_delete_keeps_secret_readable() {
    let (app, _tiers) = test_app();
    let key = create(&app, json!({ "secret": "kept", "passphrase": "right" })).await;
    let uri = format!("/secret/{key}");

    let (status, _) = send(&app, Method::DELETE, &uri, Some(json!({ "passphrase": "wrong" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["secret"], "kept");
}

#[tokio::test]
async fn test_delete_without_passphrase_on_unprotected_secret() {
    let (app, _tiers) = test_app();
    let key = create(&app, json!({ "secret": "open" })).await;

    let (status, _) = send(&app, Method::DELETE, &format!("/secret/{key}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_key_is_not_found() {
    let (app, _tiers) = test_app();

    let (status, body) = send(&app, Method::GET, "/secret/not-a-key", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SECRET_NOT_FOUND");

    let (status, _) = send(&app, Method::DELETE, "/secret/not-a-key", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_validation_errors() {
    let (app, tiers) = test_app();
    let max = tiers.service.config().max_secret_bytes;

    let (status, body) = send(
        &app,
        Method::POST,
        "/secret",
        Some(json!({ "secret": "x".repeat(max + 1) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "SECRET_TOO_LARGE");

    for ttl in [0, -5] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/secret",
            Some(json!({ "secret": "x", "ttl_seconds": ttl })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_LIFETIME");
    }

    let (status, _) = send(
        &app,
        Method::POST,
        "/secret",
        Some(json!({ "secret": "x", "passphrase": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(tiers.durable.row_count(), 0);
}

#[tokio::test]
async fn test_expired_secret_is_not_found() {
    let (app, tiers) = test_app();
    let key = create(&app, json!({ "secret": "brief", "ttl_seconds": 60 })).await;

    tiers.advance_secs(61);

    let (status, _) = send(&app, Method::GET, &format!("/secret/{key}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_read_falls_back_to_durable_after_cache_ceiling() {
    let (app, tiers) = test_app();
    let key = create(&app, json!({ "secret": "Meow", "ttl_seconds": 3600 })).await;

    tiers.advance_secs(11 * 60);

    let (status, body) = send(&app, Method::GET, &format!("/secret/{key}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["secret"], "Meow");
    assert_eq!(tiers.durable.row_count(), 0);
}

#[tokio::test]
async fn test_cache_write_failure_is_a_warning() {
    let (app, tiers) = test_app();
    tiers.cache.set_fail_writes(true);

    let (status, body) = send(&app, Method::POST, "/secret", Some(json!({ "secret": "Meow" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["warnings"].as_array().map(Vec::len), Some(1));

    tiers.cache.set_fail_writes(false);
    let key = body["secret_key"].as_str().unwrap_or_default().to_string();
    let (status, body) = send(&app, Method::GET, &format!("/secret/{key}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["secret"], "Meow");
}

#[tokio::test]
async fn test_durable_outage_is_service_unavailable() {
    let (app, tiers) = test_app();
    tiers.durable.set_down(true);

    let (status, body) = send(&app, Method::POST, "/secret", Some(json!({ "secret": "Meow" }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
    assert!(!body["message"].as_str().unwrap_or_default().contains("injected"));
}

#[tokio::test]
async fn test_malformed_create_body_is_rejected() {
    let (app, tiers) = test_app();

    let (status, _) = send(&app, Method::POST, "/secret", Some(json!({ "passphrase": "p" }))).await;
    assert!(status.is_client_error());
    assert_eq!(tiers.durable.row_count(), 0);
}

// ============================================================================
// HEALTH AND METRICS
// ============================================================================

#[tokio::test]
async fn test_readiness_tracks_tier_health() {
    let (app, tiers) = test_app();

    let (status, body) = send(&app, Method::GET, "/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    tiers.cache.set_fail_reads(true);
    let (status, body) = send(&app, Method::GET, "/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["details"]["cache"]["status"], "unhealthy");

    tiers.durable.set_down(true);
    let (status, body) = send(&app, Method::GET, "/health/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["details"]["durable"]["status"], "unhealthy");
}

#[tokio::test]
async fn test_liveness_and_metrics() {
    let (app, _tiers) = test_app();

    let (status, body) = send(&app, Method::GET, "/health/live", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let _ = create(&app, json!({ "secret": "counted" })).await;
    let (status, _) = send(&app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_fresh_secret_is_served_from_cache() {
    let (app, tiers) = test_app();
    let key = create(&app, json!({ "secret": "Meow" })).await;

    let (status, _) = send(&app, Method::GET, &format!("/secret/{key}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let stats = tiers.cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.entry_count, 0);
    assert_eq!(tiers.durable.row_count(), 0);
}
