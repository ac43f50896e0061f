//! Authentication API Endpoints
//! Mission: Issue session badges on login

use crate::auth::{
    credentials::{CredentialVerifier, Credentials},
    issuer::TokenIssuer,
    middleware::BADGE_COOKIE,
    models::Role,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub issuer: Arc<TokenIssuer>,
    pub verifier: Arc<dyn CredentialVerifier>,
    /// Role granted to every successful login
    pub login_role: Role,
    pub secure_cookie: bool,
}

/// Login endpoint - POST /auth
///
/// Credentials arrive as `username` / `password` headers. The badge is
/// returned as the `Badge` cookie; the body is an empty JSON object.
pub async fn login(
    State(state): State<AuthState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Value>), AuthApiError> {
    let credentials = Credentials::from_headers(&headers);

    if !state.verifier.verify(&credentials).await {
        warn!(username = ?credentials.username, "Failed login attempt");
        return Err(AuthApiError::InvalidCredentials);
    }

    let token = state.issuer.issue(state.login_role).map_err(|e| {
        error!(error = %e, "Failed to issue session token");
        AuthApiError::InternalError
    })?;

    info!(
        username = ?credentials.username,
        role = %state.login_role,
        expires_at = %token.expires_at,
        "Session issued"
    );

    let cookie = Cookie::build((BADGE_COOKIE, token.into_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.secure_cookie);

    Ok((jar.add(cookie), Json(json!({}))))
}

/// Auth API errors
#[derive(Debug)]
pub enum AuthApiError {
    InvalidCredentials,
    InternalError,
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        match self {
            AuthApiError::InvalidCredentials => StatusCode::UNAUTHORIZED.into_response(),
            AuthApiError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal" })),
            )
                .into_response(),
        }
    }
}
