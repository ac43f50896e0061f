//! Gateway configuration
//!
//! Every option can be given on the command line or through the environment
//! (a `.env` file is loaded first by the binary).

use chrono::Duration;
use clap::Parser;
use std::net::SocketAddr;

use crate::auth::{AccessPolicy, ProtectedPrefix, Role};

pub const DEFAULT_BIND: &str = "0.0.0.0:4567";
pub const DEFAULT_TOKEN_TTL_HOURS: u32 = 2;
pub const DEFAULT_PROTECTED: &str = "/api=USER";

#[derive(Parser, Debug, Clone)]
#[command(name = "cloud-gateway")]
#[command(about = "Authenticating HTTP gateway for the cloud control plane")]
pub struct GatewayConfig {
    /// Address to listen on
    #[arg(long, env = "GATEWAY_BIND", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Session token lifetime in hours
    #[arg(
        long,
        env = "GATEWAY_TOKEN_TTL_HOURS",
        default_value_t = DEFAULT_TOKEN_TTL_HOURS,
        value_parser = clap::value_parser!(u32).range(1..=720)
    )]
    pub token_ttl_hours: u32,

    /// Base64 signing secret (at least 32 bytes). Generated per process when unset.
    #[arg(long, env = "GATEWAY_SIGNING_SECRET", hide_env_values = true)]
    pub signing_secret: Option<String>,

    /// Protected path prefixes as PREFIX=ROLE (comma-separated)
    #[arg(
        long = "protect",
        env = "GATEWAY_PROTECTED",
        value_delimiter = ',',
        default_value = DEFAULT_PROTECTED
    )]
    pub protected: Vec<ProtectedPrefix>,

    /// Role granted by the login endpoint
    #[arg(long, env = "GATEWAY_LOGIN_ROLE", default_value = "USER")]
    pub login_role: Role,

    /// Mark the badge cookie `Secure`
    #[arg(long, env = "GATEWAY_SECURE_COOKIE")]
    pub secure_cookie: bool,

    /// Version reported by /api/version
    #[arg(long, env = "GATEWAY_CLOUD_VERSION", default_value = env!("CARGO_PKG_VERSION"))]
    pub cloud_version: String,
}

impl GatewayConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::hours(i64::from(self.token_ttl_hours))
    }

    pub fn access_policy(&self) -> AccessPolicy {
        self.protected.iter().cloned().collect()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 4567)),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            signing_secret: None,
            protected: vec![ProtectedPrefix::new("/api", Role::User)],
            login_role: Role::User,
            secure_cookie: false,
            cloud_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
