//! Cloud Gateway - authenticating front door for the control plane API
//!
//! Usage:
//!   cloud-gateway --bind 0.0.0.0:4567 --token-ttl-hours 2
//!
//! Environment:
//!   GATEWAY_BIND - Listen address (default: 0.0.0.0:4567)
//!   GATEWAY_TOKEN_TTL_HOURS - Badge lifetime (default: 2)
//!   GATEWAY_SIGNING_SECRET - Base64 signing secret (default: generated per process)
//!   GATEWAY_PROTECTED - Protected prefixes, PREFIX=ROLE comma-separated (default: /api=USER)
//!   RUST_LOG - Log filter

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cloud_gateway::{auth::SigningKeyStore, Gateway, GatewayConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    let config = GatewayConfig::parse();

    info!("🚀 Cloud Gateway starting");

    let key_store = match config.signing_secret.as_deref() {
        Some(secret) => SigningKeyStore::from_base64(secret),
        None => {
            info!("🔐 No signing secret configured; badges will not survive a restart");
            SigningKeyStore::initialize()
        }
    }
    .context("Failed to initialize signing key store")?;

    let bind = config.bind;
    let app = Gateway::builder(config)
        .key_store(Arc::new(key_store))
        .build()
        .context("Failed to assemble gateway")?;

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!("🎯 Gateway listening on {}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Gateway stopped");
    Ok(())
}

/// Initialize tracing with env-filter support
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloud_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
