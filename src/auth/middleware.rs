//! Access Gate Middleware
//! Mission: Authenticate and authorize every protected request before it is routed

use crate::auth::{
    models::Principal,
    policy::{canonicalize_path, AccessPolicy},
    validator::TokenValidator,
};
use axum::{
    extract::{Request, State},
    http::{uri::PathAndQuery, HeaderMap, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    extract::CookieJar,
    headers::{authorization::Bearer, Authorization, HeaderMapExt},
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

/// Cookie carrying the session token
pub const BADGE_COOKIE: &str = "Badge";

/// Gate state shared by every request
#[derive(Clone)]
pub struct AccessGate {
    validator: Arc<TokenValidator>,
    policy: Arc<AccessPolicy>,
}

impl AccessGate {
    pub fn new(validator: Arc<TokenValidator>, policy: AccessPolicy) -> Self {
        Self {
            validator,
            policy: Arc::new(policy),
        }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Decide access for a canonical path.
    ///
    /// `Ok(None)` means the path is unprotected, `Ok(Some(_))` carries the
    /// authenticated principal of a protected path.
    pub fn decide(
        &self,
        canonical_path: &str,
        headers: &HeaderMap,
    ) -> Result<Option<Principal>, GateRejection> {
        let Some(min_role) = self.policy.required_role(canonical_path) else {
            return Ok(None);
        };

        let principal = self.authenticate(headers)?;

        if !principal.role.satisfies(min_role) {
            debug!(
                path = canonical_path,
                role = %principal.role,
                required = %min_role,
                "Insufficient role"
            );
            return Err(GateRejection::Forbidden);
        }

        Ok(Some(principal))
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, GateRejection> {
        let token = extract_token(headers).ok_or_else(|| {
            debug!("No session token presented");
            GateRejection::Unauthenticated
        })?;

        self.validator.validate(&token).map_err(|err| {
            debug!(error = %err, "Session token rejected");
            GateRejection::Unauthenticated
        })
    }
}

/// Token from the `Badge` cookie, else from `Authorization: Bearer`
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = CookieJar::from_headers(headers)
        .get(BADGE_COOKIE)
        .map(|c| c.value().trim().to_string())
        .filter(|t| !t.is_empty());

    from_cookie.or_else(|| {
        headers
            .typed_get::<Authorization<Bearer>>()
            .map(|auth| auth.token().trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

/// Replace the path of `uri`, keeping its query
fn with_path(uri: &Uri, path: &str) -> Option<Uri> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}

/// Gate middleware. Must wrap the router (not be added with
/// `Router::layer`) so the canonical path it writes is the one routed.
pub async fn access_gate(
    State(gate): State<AccessGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, GateRejection> {
    let canonical = canonicalize_path(req.uri().path());
    if canonical != req.uri().path() {
        let uri = with_path(req.uri(), &canonical).ok_or_else(|| {
            warn!(path = %req.uri().path(), "Could not rewrite request path");
            GateRejection::BadPath
        })?;
        *req.uri_mut() = uri;
    }

    // Preflight stays reachable without a token
    if req.method() == Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let principal = gate.decide(&canonical, req.headers())?;
    if let Some(principal) = principal {
        req.extensions_mut().insert(principal);
    }

    let mut response = next.run(req).await;
    // Outer layers see who was let through
    if let Some(principal) = principal {
        response.extensions_mut().insert(principal);
    }
    Ok(response)
}

/// Gate outcomes visible to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    Unauthenticated,
    Forbidden,
    BadPath,
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            GateRejection::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "Authentication required",
            ),
            GateRejection::Forbidden => (StatusCode::FORBIDDEN, "forbidden", "Insufficient role"),
            GateRejection::BadPath => (StatusCode::BAD_REQUEST, "bad_request", "Invalid path"),
        };

        let mut response =
            (status, Json(json!({ "error": error, "message": message }))).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{issuer::TokenIssuer, keys::SigningKeyStore, models::Role};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request as HttpRequest},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::{Layer, ServiceExt};

    struct Fixture {
        issuer: TokenIssuer,
        gate: AccessGate,
    }

    fn fixture() -> Fixture {
        let keys = Arc::new(SigningKeyStore::initialize().unwrap());
        let policy = AccessPolicy::new()
            .protect("/api", Role::User)
            .protect("/api/admin", Role::Admin);
        Fixture {
            issuer: TokenIssuer::new(keys.clone(), Duration::hours(2)),
            gate: AccessGate::new(Arc::new(TokenValidator::new(keys)), policy),
        }
    }

    fn counted(hits: &Arc<AtomicUsize>) -> axum::routing::MethodRouter {
        let hits = hits.clone();
        get(move || {
            hits.fetch_add(1, Ordering::SeqCst);
            async { "ok" }
        })
    }

    fn gated_app(gate: AccessGate, hits: &Arc<AtomicUsize>) -> Router {
        let inner = Router::new()
            .route("/api/version", counted(hits))
            .route("/api/admin/stats", counted(hits))
            .route("/auth", counted(hits));
        Router::new().fallback_service(from_fn_with_state(gate, access_gate).layer(inner))
    }

    fn headers_with(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, value.parse().unwrap());
        headers
    }

    #[tokio::test]
    async fn test_rejection_bodies() {
        let response = GateRejection::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "unauthenticated");

        let response = GateRejection::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = GateRejection::BadPath.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.extensions().get::<GateRejection>(),
            Some(&GateRejection::BadPath)
        );
    }

    #[test]
    fn test_extract_token_sources() {
        assert_eq!(extract_token(&HeaderMap::new()), None);

        let cookie = headers_with(header::COOKIE, "theme=dark; Badge=abc.def.ghi");
        assert_eq!(extract_token(&cookie).as_deref(), Some("abc.def.ghi"));

        let bearer = headers_with(header::AUTHORIZATION, "Bearer abc.def.ghi");
        assert_eq!(extract_token(&bearer).as_deref(), Some("abc.def.ghi"));

        let empty_cookie = headers_with(header::COOKIE, "Badge=");
        assert_eq!(extract_token(&empty_cookie), None);

        let basic = headers_with(header::AUTHORIZATION, "Basic dXNlcjpwYXNz");
        assert_eq!(extract_token(&basic), None);
    }

    #[test]
    fn test_cookie_preferred_over_header() {
        let mut headers = headers_with(header::COOKIE, "Badge=from-cookie");
        headers.insert(header::AUTHORIZATION, "Bearer from-header".parse().unwrap());
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_decide() {
        let fx = fixture();
        let user = fx.issuer.issue(Role::User).unwrap();
        let bearer = format!("Bearer {}", user.as_str());
        let user_headers = headers_with(header::AUTHORIZATION, &bearer);

        assert_eq!(fx.gate.decide("/auth", &HeaderMap::new()), Ok(None));
        assert_eq!(
            fx.gate.decide("/api/version", &HeaderMap::new()),
            Err(GateRejection::Unauthenticated)
        );
        assert_eq!(
            fx.gate.decide("/api/version", &user_headers),
            Ok(Some(Principal { role: Role::User }))
        );
        assert_eq!(
            fx.gate.decide("/api/admin/stats", &user_headers),
            Err(GateRejection::Forbidden)
        );
    }

    #[tokio::test]
    async fn test_missing_token_never_reaches_handler() {
        let fx = fixture();
        let hits = Arc::new(AtomicUsize::new(0));
        let app = gated_app(fx.gate, &hits);

        let response = app
            .oneshot(HttpRequest::builder().uri("/api/version").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_garbage_token_never_reaches_handler() {
        let fx = fixture();
        let hits = Arc::new(AtomicUsize::new(0));
        let app = gated_app(fx.gate, &hits);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/version")
                    .header(header::COOKIE, "Badge=not-a-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_insufficient_role_never_reaches_handler() {
        let fx = fixture();
        let hits = Arc::new(AtomicUsize::new(0));
        let token = fx.issuer.issue(Role::User).unwrap();
        let app = gated_app(fx.gate, &hits);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/admin/stats")
                    .header(header::COOKIE, format!("Badge={}", token.as_str()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_admin_passes_admin_route() {
        let fx = fixture();
        let hits = Arc::new(AtomicUsize::new(0));
        let token = fx.issuer.issue(Role::Admin).unwrap();
        let app = gated_app(fx.gate, &hits);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/admin/stats")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token.as_str()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.extensions().get::<Principal>(),
            Some(&Principal { role: Role::Admin })
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unprotected_path_needs_no_token() {
        let fx = fixture();
        let hits = Arc::new(AtomicUsize::new(0));
        let app = gated_app(fx.gate, &hits);

        let response = app
            .oneshot(HttpRequest::builder().uri("/auth").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dot_segments_cannot_bypass() {
        let fx = fixture();
        let hits = Arc::new(AtomicUsize::new(0));
        let app = gated_app(fx.gate, &hits);

        for path in ["/static/../api/version", "//api//version", "/api/./version/"] {
            let response = app
                .clone()
                .oneshot(HttpRequest::builder().uri(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "path={path}");
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_canonical_path_is_routed() {
        let fx = fixture();
        let hits = Arc::new(AtomicUsize::new(0));
        let token = fx.issuer.issue(Role::User).unwrap();
        let app = gated_app(fx.gate, &hits);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/x/../api//version?verbose=1")
                    .header(header::COOKIE, format!("Badge={}", token.as_str()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_options_is_not_gated() {
        let fx = fixture();
        let hits = Arc::new(AtomicUsize::new(0));
        let app = gated_app(fx.gate, &hits);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/version")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_with_path_keeps_query() {
        let uri: Uri = "/a//b?x=1".parse().unwrap();
        assert_eq!(with_path(&uri, "/a/b").unwrap(), "/a/b?x=1");
    }
}
