//! Router assembly and HTTP middleware.

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::app::AppState;

use super::handlers::{self, ApiDoc};

/// Webhook payloads are bounded; anything larger is not a transaction
/// envelope.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Respond well before typical webhook sender timeouts to avoid
/// redelivery storms.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/soroban-hooks", post(handlers::handle_webhook))
        .route("/api/transactions/{hash}", get(handlers::get_transaction))
        .route(
            "/api/wallets/{wallet_id}/transactions",
            get(handlers::get_wallet_transactions),
        )
        .route("/health", get(handlers::health))
        .route("/health/live", get(handlers::liveness))
        .route("/health/ready", get(handlers::readiness))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
