//! HTTP surface of the ingestion gate

use crate::gate::IngestionGate;
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::routing::post;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Builds the router exposing `POST /kickoff`
pub fn router(gate: Arc<IngestionGate>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/kickoff", post(kickoff))
        .with_state(gate)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn kickoff(State(gate): State<Arc<IngestionGate>>, body: String) -> (StatusCode, String) {
    let response = gate.handle(&body).await;
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, response.body)
}

/// Serves the gate on an already bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, gate: Arc<IngestionGate>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .context("Failed to read listener address")?;
    info!("Ingestion gate listening on http://{}/kickoff", addr);

    axum::serve(listener, router(gate))
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Ingestion gate shutting down");
        })
        .await
        .context("HTTP server error")?;

    Ok(())
}
