//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::cache::CacheStats;
use crate::limiter::Throttle;
use crate::mcp::{self, Capabilities, Invocation, InvocationResponse};
use crate::sleeper::Upstream;

use super::dto::*;
use super::state::AppState;

/// Create the application router. Any origin may call it.
pub fn create_router<U, L>(state: AppState<U, L>) -> Router
where
    U: Upstream,
    L: Throttle,
{
    Router::new()
        .route("/health", get(health::<U, L>))
        .route("/capabilities", get(capabilities))
        .route("/invoke", post(invoke::<U, L>))
        .route("/cache/stats", get(cache_stats::<U, L>))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check: healthy only if Sleeper is reachable.
async fn health<U, L>(State(state): State<AppState<U, L>>) -> Json<HealthResponse>
where
    U: Upstream,
    L: Throttle,
{
    match state.sleeper.get_nfl_state().await {
        Ok(_) => Json(HealthResponse {
            status: HealthStatus::Healthy,
            message: "Application is running and can connect to Sleeper API".to_string(),
        }),
        Err(e) => {
            error!(error = %e, "health check failed");
            Json(HealthResponse {
                status: HealthStatus::Unhealthy,
                message: format!("Health check failed: {e}"),
            })
        }
    }
}

async fn capabilities() -> Json<Capabilities> {
    Json(mcp::capabilities())
}

/// Invoke a function. Failures are reported inside the envelope.
async fn invoke<U, L>(
    State(state): State<AppState<U, L>>,
    payload: Result<Json<Invocation>, JsonRejection>,
) -> Result<Json<InvocationResponse>, AppError>
where
    U: Upstream,
    L: Throttle,
{
    let Json(invocation) = payload.map_err(|e| AppError::BadRequest {
        message: e.body_text(),
    })?;

    Ok(Json(mcp::invoke(&state.sleeper, &invocation).await))
}

async fn cache_stats<U, L>(State(state): State<AppState<U, L>>) -> Json<CacheStats>
where
    U: Upstream,
    L: Throttle,
{
    Json(state.sleeper.cache_stats())
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
        };

        warn!(%status, %message, "rejected request");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
