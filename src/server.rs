//! HTTP API consumed by the monitoring dashboard.
//!
//! ## Routes
//!
//! - `GET  /api/pipeline` - Current status document
//! - `POST /api/pipeline` - Trigger a run
//! - `GET  /health`       - Liveness probe

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::core::{PipelineError, PipelineGateway};
use crate::domain::PipelineRun;

/// Body of every non-200 response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub error: String,
    /// Prior successful run, a placeholder if there is none, or null if
    /// the store could not be read
    pub last_run: Option<PipelineRun>,
}

/// Build the API router
pub fn router(gateway: PipelineGateway) -> Router {
    Router::new()
        .route("/api/pipeline", get(get_status).post(trigger_run))
        .route("/health", get(health))
        .with_state(gateway)
}

/// Bind `address` and serve until Ctrl-C
pub async fn serve(gateway: PipelineGateway, address: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!(address = %listener.local_addr()?, "Serving pipeline API");

    axum::serve(listener, router(gateway))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutting down");
}

pub async fn get_status(State(gateway): State<PipelineGateway>) -> Response {
    match gateway.status().await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(err) => error_response(&gateway, err).await,
    }
}

pub async fn trigger_run(State(gateway): State<PipelineGateway>) -> Response {
    // Detached so a client disconnect cannot interrupt an accepted run
    let task_gateway = gateway.clone();
    let outcome = tokio::spawn(async move { task_gateway.trigger().await })
        .await
        .unwrap_or_else(|e| Err(PipelineError::execution_failed(format!("run task aborted: {}", e))));

    match outcome {
        Ok(run) => (StatusCode::OK, Json(run)).into_response(),
        Err(err) => error_response(&gateway, err).await,
    }
}

pub async fn health() -> &'static str {
    "ok"
}

async fn error_response(gateway: &PipelineGateway, err: PipelineError) -> Response {
    let last_run = match gateway.status().await {
        Ok(status) => Some(status.last_run.unwrap_or_else(PipelineRun::placeholder)),
        Err(_) => None,
    };

    let envelope = ErrorEnvelope {
        error: err.to_string(),
        last_run,
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(envelope)).into_response()
}
