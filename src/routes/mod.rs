//! Route gateway for the `leakwatch` API (EMBP).
//!
//! Sibling modules own their endpoints and export a subrouter; this
//! gateway merges them over the shared [`AppState`] so that `main.rs` does
//! not need to know about individual endpoints.

use std::sync::Arc;

use axum::Router;
use serde::Serialize;

use crate::config::SharedSettings;
use crate::pipeline::{AlertSink, PipelineStatus};
use crate::predict::PredictClient;
use crate::registry::SharedRegistry;

mod alerts;
mod health;
mod model;
mod sensors;
mod settings;
mod snapshot;

// ---

/// Shared handles for all routes. Everything here is a cheap Arc clone;
/// handlers only ever read copy-on-read snapshots of the underlying state.
#[derive(Clone)]
pub struct AppState {
    // ---
    pub registry: SharedRegistry,
    pub settings: SharedSettings,
    pub sink: Arc<AlertSink>,
    pub status: Arc<PipelineStatus>,
    pub predict: Arc<PredictClient>,
}

/// JSON error body shared by the endpoints that can reject a request.
#[derive(Serialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

// ---

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(alerts::router())
        .merge(health::router())
        .merge(model::router())
        .merge(sensors::router())
        .merge(settings::router())
        .merge(snapshot::router())
        .with_state(state)
}
