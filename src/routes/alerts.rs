//! Session alert log endpoint.
//!
//! Serves the alerts emitted since startup, oldest first. Nothing is
//! persisted across restarts; the session ring is bounded and drops its
//! oldest entries when full.

use axum::{extract::State, routing::get, Json, Router};

use super::AppState;
use crate::models::LeakAlert;

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/alerts", get(alerts))
}

async fn alerts(State(state): State<AppState>) -> Json<Vec<LeakAlert>> {
    Json(state.sink.session_alerts())
}
