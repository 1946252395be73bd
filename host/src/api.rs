//! ==============================================================================
//! api.rs - web server
//! ==============================================================================
//!
//! purpose:
//!     serves the dashboard page and the read-only json api over the shared
//!     snapshot cell.
//!
//! routes:
//!     GET /                 dashboard html (polls /api/latest_data)
//!     GET /api/latest_data  current snapshot, always 200
//!     GET /api/health       liveness + ingest counters
//!
//! relationships:
//!     - reads: state.rs (SnapshotCell::read)
//!     - used by: main.rs (hub role)
//!
//! ==============================================================================

use axum::{extract::State, response::Html, routing::get, Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::domain::Snapshot;
use crate::state::{IngestStats, SnapshotCell};

const DASHBOARD_HTML: &str = include_str!("../static/dashboard.html");

/// build the router. no listener involved, so tests can drive it directly.
pub fn build_router(cell: Arc<SnapshotCell>) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/api/latest_data", get(latest_data_handler))
        .route("/api/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(cell)
}

/// bind `addr` and serve until the process stops
pub async fn serve(addr: SocketAddr, cell: Arc<SnapshotCell>) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    info!(%addr, "dashboard live at http://{addr}");
    axum::serve(listener, build_router(cell))
        .await
        .map_err(ServerError::Serve)
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

async fn dashboard_handler() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

/// json api endpoint for the dashboard
/// returns the latest reading and its status; the INITIALIZING sentinel
/// until the first message arrives
async fn latest_data_handler(State(cell): State<Arc<SnapshotCell>>) -> Json<Snapshot> {
    Json(cell.read().await)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    #[serde(flatten)]
    ingest: IngestStats,
}

async fn health_handler(State(cell): State<Arc<SnapshotCell>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        ingest: cell.stats(),
    })
}
