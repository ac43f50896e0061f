//! Token Validator
//! Mission: Verify signature, shape and expiry of presented tokens

use crate::auth::{
    issuer::TOKEN_ALGORITHM,
    keys::SigningKeyStore,
    models::{Claims, Principal},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, errors::ErrorKind, Validation};
use std::sync::Arc;
use tracing::debug;

/// Why a token was refused. Only used for diagnostics; callers outside the
/// gateway see a single "unauthenticated" outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("token signature does not verify")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

pub struct TokenValidator {
    keys: Arc<SigningKeyStore>,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(keys: Arc<SigningKeyStore>) -> Self {
        let mut validation = Validation::new(TOKEN_ALGORITHM);
        // Expiry is checked below against an explicit clock, with no leeway
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self { keys, validation }
    }

    /// Validate against the wall clock
    pub fn validate(&self, token: &str) -> Result<Principal, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Validate as if the current time were `now`
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, TokenError> {
        if token.split('.').count() != 3 {
            return Err(TokenError::Malformed("expected three segments".to_string()));
        }

        let data = decode::<Claims>(token, self.keys.decoding_key(), &self.validation)?;
        let claims = data.claims;

        if claims.exp <= now.timestamp() {
            debug!(role = %claims.role, exp = claims.exp, "Rejected expired token");
            return Err(TokenError::Expired);
        }

        Ok(Principal::from(&claims))
    }
}
