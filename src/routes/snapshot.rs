//! On-demand monitoring snapshot endpoint.
//!
//! The snapshot is recomputed from the registry on every request, never
//! cached, so it is always consistent with the registry at the moment of
//! the call.

use axum::{extract::State, routing::get, Json, Router};

use super::AppState;
use crate::metrics;
use crate::models::MonitoringSnapshot;

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/monitoring/snapshot", get(snapshot))
}

async fn snapshot(State(state): State<AppState>) -> Json<MonitoringSnapshot> {
    // ---
    let readings = state.registry.snapshot();
    let threshold = state.settings.read().threshold;

    Json(metrics::monitoring_snapshot(&readings, threshold))
}
