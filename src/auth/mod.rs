//! Authentication Module
//! Mission: Signed session badges and role-gated access to the control plane API

pub mod api;
pub mod credentials;
pub mod issuer;
pub mod keys;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod validator;

pub use api::AuthState;
pub use credentials::{AcceptAll, CredentialVerifier, Credentials};
pub use issuer::TokenIssuer;
pub use keys::{KeyStoreError, SigningKeyStore};
pub use middleware::{access_gate, AccessGate, GateRejection, BADGE_COOKIE};
pub use models::{Principal, Role, Token};
pub use policy::{canonicalize_path, AccessPolicy, ProtectedPrefix};
pub use validator::{TokenError, TokenValidator};
