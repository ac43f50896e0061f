//! Cloud Gateway
//!
//! Authenticating HTTP gateway in front of the cloud orchestration control
//! plane: issues signed session badges on login and gates every protected
//! route by role.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod middleware;

pub use app::{Gateway, GatewayBuilder, StartupError};
pub use config::GatewayConfig;
