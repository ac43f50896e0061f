//! Request logging middleware.
//!
//! Logs every HTTP request with method, canonical path, status, latency and
//! the access gate's outcome.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::auth::{canonicalize_path, GateRejection, Principal};

/// Middleware that logs HTTP requests with timing information.
///
/// Runs outside the gate, so the path is canonicalized here the same way the
/// gate does it. Gate rejections are logged with their reason, admitted
/// requests with the granted role. Health checks only log at DEBUG.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = canonicalize_path(request.uri().path());

    let start = Instant::now();
    let response = next.run(request).await;
    let latency_ms = start.elapsed().as_millis();
    let status = response.status().as_u16();

    if path == "/health" {
        debug!(status, latency_ms, "Health check");
        return response;
    }

    if let Some(rejection) = response.extensions().get::<GateRejection>() {
        info!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            reason = ?rejection,
            "Request denied"
        );
    } else if status >= 500 {
        warn!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            "Request failed (5xx)"
        );
    } else {
        let role = response
            .extensions()
            .get::<Principal>()
            .map(|principal| principal.role.as_str());
        info!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            role = role.unwrap_or("-"),
            "Request completed"
        );
    }

    response
}
