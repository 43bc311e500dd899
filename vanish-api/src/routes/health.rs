//! Health Check Endpoints
//!
//! - /health/ping - Simple liveness check
//! - /health/live - Process alive check
//! - /health/ready - Probes both storage tiers
//!
//! Readiness fails only when the durable tier is down. A cache outage
//! degrades latency but not correctness, so it reports `degraded` with 200.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use vanish_core::VanishResult;
use vanish_storage::SecretService;

use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDetails {
    pub durable: ComponentHealth,
    pub cache: ComponentHealth,
    pub probe_ms: u64,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    fn from_probe(result: &VanishResult<()>) -> Self {
        match result {
            Ok(()) => Self {
                status: HealthStatus::Healthy,
                error: None,
            },
            Err(e) => Self {
                status: HealthStatus::Unhealthy,
                error: Some(e.to_string()),
            },
        }
    }
}

fn overall_status(durable: HealthStatus, cache: HealthStatus) -> HealthStatus {
    match (durable, cache) {
        (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
        (HealthStatus::Healthy, _) => HealthStatus::Degraded,
        _ => HealthStatus::Unhealthy,
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping - Simple pong response
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live - Process liveness check
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready - Readiness check (both tiers)
pub async fn readiness(
    State(service): State<Arc<SecretService>>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let probe_start = Instant::now();
    let probe = service.probe().await;
    let probe_ms = probe_start.elapsed().as_millis() as u64;

    let durable = ComponentHealth::from_probe(&probe.durable);
    let cache = ComponentHealth::from_probe(&probe.cache);
    let status = overall_status(durable.status, cache.status);

    if status != HealthStatus::Healthy {
        tracing::warn!(
            durable = ?durable.status,
            cache = ?cache.status,
            "Readiness probe not healthy"
        );
    }

    let response = HealthResponse {
        status,
        message: None,
        details: Some(HealthDetails {
            durable,
            cache,
            probe_ms,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: start_time.elapsed().as_secs(),
        }),
    };

    let status_code = if status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status_code, Json(response))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create health check router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() -> Result<(), serde_json::Error> {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            message: Some("All systems operational".to_string()),
            details: None,
        };

        let json = serde_json::to_string(&response)?;
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(!json.contains("details"));
        Ok(())
    }

    #[test]
    fn test_overall_status() {
        use HealthStatus::*;
        assert_eq!(overall_status(Healthy, Healthy), Healthy);
        assert_eq!(overall_status(Healthy, Unhealthy), Degraded);
        assert_eq!(overall_status(Unhealthy, Healthy), Unhealthy);
        assert_eq!(overall_status(Unhealthy, Unhealthy), Unhealthy);
    }

    #[test]
    fn test_component_health_with_error() -> Result<(), serde_json::Error> {
        let component = ComponentHealth {
            status: HealthStatus::Unhealthy,
            error: Some("Connection refused".to_string()),
        };

        let json = serde_json::to_string(&component)?;
        assert!(json.contains("\"status\":\"unhealthy\""));
        assert!(json.contains("Connection refused"));
        Ok(())
    }
}
