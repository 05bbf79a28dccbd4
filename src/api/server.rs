// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::handlers::{
    chatbot_handler, health_handler, index_handler, not_found_handler, version_handler,
};
use crate::rag::AppContext;
use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/chatbot", post(chatbot_handler))
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// HTTP server running in a background task
pub struct ApiServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl ApiServer {
    /// Bind `listen_addr` (port 0 picks a free port) and start serving
    pub async fn start(listen_addr: &str, ctx: Arc<AppContext>) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", listen_addr))?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = build_router(ctx);
        let handle = tokio::spawn(async move {
            let serve_future = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve_future.await {
                warn!("HTTP server stopped with error: {}", e);
            }
        });

        info!("Listening on http://{}", addr);
        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.handle.await.context("HTTP server task panicked")?;
        Ok(())
    }
}

/// Serve until Ctrl-C
pub async fn serve(listen_addr: &str, ctx: Arc<AppContext>) -> Result<()> {
    let server = ApiServer::start(listen_addr, ctx).await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutdown signal received, draining connections");

    server.shutdown().await
}
