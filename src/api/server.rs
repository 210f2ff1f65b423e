//! HTTP server exposing the rating service
//!
//! The router is built over a shared `AppState`; the server owns the listener
//! and a broadcast channel used to trigger graceful shutdown.

use crate::api::handlers::{
    health_handler, leaderboard_handler, load_data_handler, metrics_handler,
    predict_batch_handler, predict_match_handler, predict_team_handler, push_results_handler,
    recalculate_handler, root_handler, update_handler, upload_data_handler,
};
use crate::service::app::AppState;
use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Build the router for every endpoint
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/update", post(update_handler))
        .route("/push_results", post(push_results_handler))
        .route("/predict_team", get(predict_team_handler))
        .route("/predict_match", post(predict_match_handler))
        .route("/predict_batch", post(predict_batch_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .route("/upload_data", post(upload_data_handler))
        .route("/load_data", post(load_data_handler))
        .route("/recalculate", post(recalculate_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(app_state)
}

/// HTTP server for the rating API
pub struct ApiServer {
    app_state: Arc<AppState>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ApiServer {
    /// Create a new server over the application state
    pub fn new(app_state: Arc<AppState>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            app_state,
            shutdown_tx,
        }
    }

    /// Bind the configured address and serve until `stop` is called
    pub async fn start(&self) -> Result<()> {
        let bind = self.app_state.config().http_bind_address();
        let addr: SocketAddr = bind
            .parse()
            .with_context(|| format!("Invalid HTTP bind address: {}", bind))?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let app = router(self.app_state.clone());
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!("API server listening on http://{}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("API server shutdown signal received");
            })
            .await?;

        info!("API server stopped");
        Ok(())
    }

    /// Ask a running server to finish in-flight requests and exit
    pub fn stop(&self) {
        info!("Stopping API server...");

        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to API server: {}", e);
        }
    }
}
