//! Credential checking seam for the login endpoint
//!
//! The gateway keeps no user database. Login currently accepts any caller;
//! [`CredentialVerifier`] is where a real check plugs in without touching
//! token issuance or validation.

use async_trait::async_trait;
use axum::http::HeaderMap;

/// Credentials as presented on `POST /auth`
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// Read the `username` / `password` request headers
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            username: read("username"),
            password: read("password"),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, credentials: &Credentials) -> bool;

    /// Whether this verifier actually checks anything
    fn enforces(&self) -> bool {
        true
    }
}

/// Accepts every caller. Placeholder until a credential source exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

#[async_trait]
impl CredentialVerifier for AcceptAll {
    async fn verify(&self, _credentials: &Credentials) -> bool {
        true
    }

    fn enforces(&self) -> bool {
        false
    }
}
