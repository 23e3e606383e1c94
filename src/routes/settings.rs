//! Runtime settings endpoints.
//!
//! The leak threshold and refresh interval are operator-tunable. The
//! evaluation cycle re-reads the threshold on every batch, so a `PUT` takes
//! effect on the next cycle; a threshold change never itself fires an
//! alert. The refresh interval applies to subscriptions created after the
//! change; the running poller keeps the interval it was started with.

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};

use super::{AppState, ErrorBody};
use crate::config::Settings;

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/settings", get(get_settings).put(put_settings))
}

async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(*state.settings.read())
}

/// Handle `PUT /settings`.
///
/// The threshold's [0, 1] domain bound is enforced here, at the mutation
/// boundary; readers trust it.
async fn put_settings(
    State(state): State<AppState>,
    Json(body): Json<Settings>,
) -> impl IntoResponse {
    // ---
    if !(0.0..=1.0).contains(&body.threshold) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorBody {
                error: format!("threshold must be within [0, 1], got {}", body.threshold),
            }),
        )
            .into_response();
    }

    if body.refresh_interval_seconds == 0 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorBody {
                error: "refresh_interval_seconds must be >= 1".to_string(),
            }),
        )
            .into_response();
    }

    *state.settings.write() = body;
    tracing::info!(
        "Settings updated: threshold {}, refresh interval {}s",
        body.threshold,
        body.refresh_interval_seconds
    );

    (StatusCode::OK, Json(body)).into_response()
}
