use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::json;

use crate::auth::{Principal, Role};

/// Shared state for the built-in API routes
#[derive(Clone)]
pub struct ApiState {
    pub cloud_version: String,
}

/// Built-in control plane routes behind the gate
pub fn api_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/version", get(get_version).fallback(not_found))
        .route("/api/session", get(get_session).fallback(not_found))
        .with_state(state)
}

/// Routes that never require a badge
pub fn public_router() -> Router {
    Router::new().route("/health", get(health_check).fallback(not_found))
}

// ===== Route Handlers =====

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn get_version(State(state): State<ApiState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        version: state.cloud_version,
    })
}

/// Echo the role the caller was authenticated with
async fn get_session(principal: Principal) -> Json<SessionResponse> {
    Json(SessionResponse {
        role: principal.role,
    })
}

/// Fallback for unmatched paths and for methods a matched path does not serve
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Custom 404" }))).into_response()
}

// ===== Response Types =====

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    version: String,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    role: Role,
}
