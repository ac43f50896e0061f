//! Gateway composition root
//!
//! Wires the signing key store into issuer, validator and gate, and stacks
//! the layers around the router.

use axum::{
    http::{header, HeaderValue},
    middleware::{from_fn, from_fn_with_state},
    routing::post,
    Router,
};
use std::sync::Arc;
use tower::Layer;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer};
use tracing::{info, warn};

use crate::{
    api::{self, ApiState},
    auth::{
        api as auth_api, access_gate, AcceptAll, AccessGate, AuthState, CredentialVerifier,
        SigningKeyStore, TokenIssuer, TokenValidator,
    },
    config::GatewayConfig,
    middleware::request_logging,
};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("signing key store was not initialized before building the gateway")]
    KeyStoreUninitialized,
}

pub struct Gateway;

impl Gateway {
    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        GatewayBuilder {
            config,
            key_store: None,
            verifier: Arc::new(AcceptAll),
            routes: Router::new(),
        }
    }
}

pub struct GatewayBuilder {
    config: GatewayConfig,
    key_store: Option<Arc<SigningKeyStore>>,
    verifier: Arc<dyn CredentialVerifier>,
    routes: Router,
}

impl GatewayBuilder {
    pub fn key_store(mut self, key_store: Arc<SigningKeyStore>) -> Self {
        self.key_store = Some(key_store);
        self
    }

    pub fn credential_verifier(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Additional downstream routes. They sit behind the gate like the
    /// built-in ones and can extract the caller's `Principal`. Give their
    /// method routers `.fallback(api::not_found)` to answer unsupported
    /// methods with the same 404 as unknown paths.
    pub fn routes(mut self, routes: Router) -> Self {
        self.routes = self.routes.merge(routes);
        self
    }

    pub fn build(self) -> Result<Router, StartupError> {
        let keys = self.key_store.ok_or(StartupError::KeyStoreUninitialized)?;
        let config = self.config;

        if !self.verifier.enforces() {
            warn!("Login accepts any credentials; every caller receives a badge");
        }

        let policy = config.access_policy();
        for rule in policy.rules() {
            info!(prefix = %rule.prefix, min_role = %rule.min_role, "Protected prefix");
        }

        let issuer = Arc::new(TokenIssuer::new(keys.clone(), config.token_ttl()));
        let validator = Arc::new(TokenValidator::new(keys));
        let gate = AccessGate::new(validator, policy);

        let auth_state = AuthState {
            issuer,
            verifier: self.verifier,
            login_role: config.login_role,
            secure_cookie: config.secure_cookie,
        };
        let auth_router = Router::new()
            .route("/auth", post(auth_api::login).fallback(api::not_found))
            .with_state(auth_state);

        let api_state = ApiState {
            cloud_version: config.cloud_version,
        };

        let router = Router::new()
            .merge(api::public_router())
            .merge(auth_router)
            .merge(api::api_router(api_state))
            .merge(self.routes)
            .fallback(api::not_found);

        // The gate wraps the router instead of being one of its layers, so it
        // runs before routing and the canonical path it writes is what routes.
        let gated = from_fn_with_state(gate, access_gate).layer(router);

        Ok(Router::new()
            .fallback_service(gated)
            .layer(CorsLayer::permissive())
            .layer(SetResponseHeaderLayer::if_not_present(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            ))
            .layer(from_fn(request_logging)))
    }
}
