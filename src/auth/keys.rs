//! Signing Key Store
//! Mission: Hold the single process-wide secret used to sign and verify tokens

use base64::{engine::general_purpose::STANDARD, Engine as _};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rand::{rngs::OsRng, RngCore};
use std::fmt;
use tracing::info;

/// Length of a freshly generated secret
pub const GENERATED_KEY_LEN: usize = 64;

/// Shortest secret accepted from configuration
pub const MIN_KEY_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("secure randomness source unavailable: {0}")]
    EntropyUnavailable(#[from] rand::Error),
    #[error("signing secret is not valid base64")]
    InvalidEncoding,
    #[error("signing secret is {len} bytes, at least {MIN_KEY_LEN} required")]
    SecretTooShort { len: usize },
}

/// Secret material created once at startup and read-only afterwards.
///
/// Owned by the composition root and shared as `Arc<SigningKeyStore>`.
pub struct SigningKeyStore {
    secret: Vec<u8>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SigningKeyStore {
    /// Generate a fresh random secret from the OS randomness source
    pub fn initialize() -> Result<Self, KeyStoreError> {
        let mut secret = vec![0u8; GENERATED_KEY_LEN];
        OsRng.try_fill_bytes(&mut secret)?;
        info!(bytes = GENERATED_KEY_LEN, "Generated process signing key");
        Ok(Self::from_bytes(secret))
    }

    /// Load an operator-supplied secret (standard base64)
    pub fn from_base64(encoded: &str) -> Result<Self, KeyStoreError> {
        let secret = STANDARD
            .decode(encoded.trim())
            .map_err(|_| KeyStoreError::InvalidEncoding)?;
        if secret.len() < MIN_KEY_LEN {
            return Err(KeyStoreError::SecretTooShort { len: secret.len() });
        }
        info!(bytes = secret.len(), "Loaded configured signing key");
        Ok(Self::from_bytes(secret))
    }

    fn from_bytes(secret: Vec<u8>) -> Self {
        let encoding_key = EncodingKey::from_secret(&secret);
        let decoding_key = DecodingKey::from_secret(&secret);
        Self {
            secret,
            encoding_key,
            decoding_key,
        }
    }

    pub fn current_key(&self) -> &[u8] {
        &self.secret
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for SigningKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyStore")
            .field("secret", &format_args!("<{} bytes redacted>", self.secret.len()))
            .finish()
    }
}
