//! Token Issuer
//! Mission: Mint signed session tokens for a role

use crate::auth::{
    keys::SigningKeyStore,
    models::{Claims, Role, Token},
};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, Header};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Algorithm used for every token this gateway issues
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

pub struct TokenIssuer {
    keys: Arc<SigningKeyStore>,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(keys: Arc<SigningKeyStore>, ttl: Duration) -> Self {
        Self { keys, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `role`, valid from now for the configured TTL
    pub fn issue(&self, role: Role) -> Result<Token> {
        self.issue_at(role, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(&self, role: Role, now: DateTime<Utc>) -> Result<Token> {
        // Claims carry whole seconds
        let issued_at =
            DateTime::<Utc>::from_timestamp(now.timestamp(), 0).context("Invalid timestamp")?;
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .context("Invalid timestamp")?;

        let claims = Claims {
            role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().simple().to_string(),
        };

        let value = encode(
            &Header::new(TOKEN_ALGORITHM),
            &claims,
            self.keys.encoding_key(),
        )
        .context("Failed to sign token")?;

        debug!(
            role = %role,
            expires_at = %expires_at,
            "Issued session token"
        );

        Ok(Token::new(value, issued_at, expires_at))
    }
}
