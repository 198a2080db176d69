//! HTTP handlers and the OpenAPI document.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{error, info, warn};
use utoipa::OpenApi;
use uuid::Uuid;

use crate::app::AppState;
use crate::domain::envelope::ParsedHook;
use crate::domain::error::{AppError, DatabaseError};
use crate::domain::types::{
    ErrorResponse, HealthResponse, HealthStatus, StoredTransaction, WebhookResponse,
};

#[derive(OpenApi)]
#[openapi(
    paths(handle_webhook, get_transaction, get_wallet_transactions, health, liveness, readiness),
    components(schemas(WebhookResponse, StoredTransaction, HealthResponse, ErrorResponse)),
    info(
        title = "Soroban Webhook Relayer",
        description = "Ingests Soroban transaction webhooks, reconciles them against registered wallets, and notifies mapped users."
    )
)]
pub struct ApiDoc;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::Database(DatabaseError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::Authentication(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Database(DatabaseError::Connection(_) | DatabaseError::Timeout(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "DATABASE_UNAVAILABLE")
            }
            Self::ExternalService(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        (status, Json(ErrorResponse::new(code, self.to_string()))).into_response()
    }
}

/// Webhook ingestion endpoint.
///
/// Responses are shaped to steer upstream redelivery: only retryable
/// infrastructure failures return 500; any other processing failure is
/// acknowledged with the error embedded in the body so the indexer does not
/// redeliver a payload that would fail identically again.
#[utoipa::path(
    post,
    path = "/api/soroban-hooks",
    request_body(content = serde_json::Value, content_type = "application/json"),
    responses(
        (status = 200, description = "Webhook processed or acknowledged", body = WebhookResponse),
        (status = 400, description = "Non-JSON content type or malformed JSON", body = ErrorResponse),
        (status = 401, description = "Missing or wrong webhook secret", body = ErrorResponse),
        (status = 500, description = "Retryable infrastructure failure", body = ErrorResponse),
    ),
    tag = "webhooks"
)]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = &state.webhook_secret {
        let presented = match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            Some(value) => value,
            None => {
                warn!("rejecting webhook without Authorization header");
                return AppError::Authentication("Missing Authorization header".to_string())
                    .into_response();
            }
        };
        if presented != secret.as_ref() {
            warn!("rejecting webhook with wrong secret");
            return AppError::Authentication("Invalid webhook secret".to_string())
                .into_response();
        }
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with("application/json") {
        warn!(content_type, "rejecting webhook with unsupported content type");
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "UNSUPPORTED_CONTENT_TYPE",
                "Content-Type must be application/json",
            )),
        )
            .into_response();
    }

    if body.is_empty() {
        info!("empty webhook body acknowledged");
        return Json(WebhookResponse::ack("Empty webhook body acknowledged")).into_response();
    }

    let parsed = match ParsedHook::from_slice(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "rejecting malformed webhook JSON");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("INVALID_JSON", e.to_string())),
            )
                .into_response();
        }
    };

    match state.service.process_webhook(&parsed).await {
        Ok(response) => Json(response).into_response(),
        Err(e) if e.is_retryable() => {
            error!(error = %e, "retryable failure, inviting redelivery");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("RETRYABLE_ERROR", e.to_string())),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "non-retryable failure, acknowledging to suppress redelivery");
            Json(WebhookResponse::ack(format!(
                "Webhook acknowledged with processing error: {e}"
            )))
            .into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/transactions/{hash}",
    params(("hash" = String, Path, description = "Transaction hash")),
    responses(
        (status = 200, description = "Stored transaction", body = StoredTransaction),
        (status = 404, description = "Unknown transaction hash", body = ErrorResponse),
    ),
    tag = "transactions"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<StoredTransaction>, AppError> {
    Ok(Json(state.service.get_transaction(&hash).await?))
}

#[derive(Debug, Deserialize)]
pub struct WalletTransactionsQuery {
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/wallets/{wallet_id}/transactions",
    params(
        ("wallet_id" = Uuid, Path, description = "Wallet identifier"),
        ("limit" = Option<i64>, Query, description = "Maximum rows, defaults to 50"),
    ),
    responses(
        (status = 200, description = "Transactions touching the wallet", body = Vec<StoredTransaction>),
    ),
    tag = "transactions"
)]
pub async fn get_wallet_transactions(
    State(state): State<AppState>,
    Path(wallet_id): Path<Uuid>,
    Query(query): Query<WalletTransactionsQuery>,
) -> Result<Json<Vec<StoredTransaction>>, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    Ok(Json(
        state.service.get_wallet_transactions(wallet_id, limit).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse),
    ),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> Response {
    match state.service.health_check().await {
        Ok(()) => Json(HealthResponse::new(HealthStatus::Healthy)).into_response(),
        Err(e) => {
            error!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::new(HealthStatus::Unhealthy)),
            )
                .into_response()
        }
    }
}

/// Process liveness probe. Succeeds whenever the server can answer at all.
#[utoipa::path(
    get,
    path = "/health/live",
    responses((status = 200, description = "Process is alive")),
    tag = "health"
)]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe. Ready only when the database answers.
#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "Ready to accept traffic"),
        (status = 503, description = "Database unreachable"),
    ),
    tag = "health"
)]
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.service.health_check().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            error!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
