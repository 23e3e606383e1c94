// src/routes/health.rs
//! API health check endpoint for the leakwatch backend.
//!
//! Defines the `/health` route used by container orchestrators and CI
//! pipelines to verify that the service is running and able to respond to
//! HTTP requests. It is a sibling module in the `routes` directory and
//! follows the Explicit Module Boundary Pattern (EMBP):
//! - Internal to this file: endpoint handler(s) and related types
//! - Exports to the gateway (`mod.rs`): a subrouter containing the route
//!
//! Beyond liveness, the body reports which data source feeds the pipeline
//! (`remote` or `fixture`) and the last transport error, if any; that is
//! the non-fatal error surface from the ingestion side. The handler
//! touches no external service.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

// ---

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    // ---
    status: &'static str,
    service: &'static str,
    source: &'static str,
    last_transport_error: Option<String>,
}

/// Handle `GET /health`.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    // ---
    Json(HealthResponse {
        status: "ok",
        service: "leakwatch",
        source: state.status.source().as_str(),
        last_transport_error: state.status.last_error(),
    })
}

/// Create a subrouter containing the `/health` route.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
