//! HTTP Server Module
//!
//! JSON API over the oracle for browser and script clients.
//! Only compiled when the `server` feature is enabled.

mod api;
mod types;

pub use api::create_router;
pub use types::*;

use anyhow::Context;
use std::sync::Arc;

use crate::oracle::PriceOracle;

/// Start the HTTP server
pub async fn start_server(oracle: Arc<PriceOracle>, addr: &str) -> anyhow::Result<()> {
    let app = create_router(oracle);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("🖥️ Price oracle API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .context("HTTP server failed")?;
    Ok(())
}
