//! Secret REST API Routes
//!
//! Handlers translate HTTP into `SecretService` calls. An unparsable key is
//! reported exactly like an unknown one.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use vanish_core::{SecretKey, VanishError};
use vanish_storage::SecretService;

use crate::{
    error::{ApiError, ApiResult},
    telemetry::{metrics, DeleteOutcome},
    types::{
        CreateSecretRequest, CreateSecretResponse, DeleteSecretRequest, DeleteSecretResponse,
        RetrieveSecretResponse,
    },
};

fn parse_key(raw: &str) -> ApiResult<SecretKey> {
    raw.parse::<SecretKey>().map_err(|_| ApiError::not_found())
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /secret - Store a new one-time secret
pub async fn create_secret(
    State(service): State<Arc<SecretService>>,
    Json(req): Json<CreateSecretRequest>,
) -> ApiResult<impl IntoResponse> {
    let created = service
        .create(req.secret.as_bytes(), req.passphrase, req.ttl_seconds)
        .await?;

    if let Some(m) = metrics() {
        m.record_created();
    }

    let response = CreateSecretResponse {
        secret_key: created.key,
        expires_at: created.expires_at,
        warnings: created.warnings,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /secret/:key - Read and consume a secret
pub async fn retrieve_secret(
    State(service): State<Arc<SecretService>>,
    Path(key): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let key = parse_key(&key)?;
    let retrieved = service.retrieve(key).await?;

    if let Some(m) = metrics() {
        m.record_read(retrieved.served_from);
    }

    Ok(Json(RetrieveSecretResponse {
        secret: String::from_utf8_lossy(&retrieved.secret).into_owned(),
    }))
}

/// DELETE /secret/:key - Delete a secret without reading it
///
/// The body is optional; without one no passphrase is supplied.
pub async fn delete_secret(
    State(service): State<Arc<SecretService>>,
    Path(key): Path<String>,
    body: Option<Json<DeleteSecretRequest>>,
) -> ApiResult<impl IntoResponse> {
    let key = parse_key(&key)?;
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let result = service.delete(key, req.passphrase.as_deref()).await;

    if let Some(m) = metrics() {
        m.record_delete(match &result {
            Ok(_) => DeleteOutcome::Deleted,
            Err(VanishError::Forbidden) => DeleteOutcome::Forbidden,
            Err(VanishError::NotFound) => DeleteOutcome::NotFound,
            Err(_) => DeleteOutcome::Error,
        });
    }

    result?;
    Ok(Json(DeleteSecretResponse::deleted()))
}
