//! Model management proxy endpoints.
//!
//! Thin pass-throughs to the external prediction service. These share the
//! HTTP surface for the dashboard's convenience but are independent of the
//! telemetry pipeline, which never calls the prediction service.

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, routing::post, Json,
    Router,
};
use tracing::error;

use super::{AppState, ErrorBody};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/model/metrics", get(model_metrics))
        .route("/model/retrain", post(retrain))
}

async fn model_metrics(State(state): State<AppState>) -> impl IntoResponse {
    // ---
    match state.predict.get_model_metrics().await {
        Ok(metrics) => (StatusCode::OK, Json(metrics)).into_response(),
        Err(e) => {
            error!("Failed to fetch model metrics: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn retrain(State(state): State<AppState>) -> impl IntoResponse {
    // ---
    match state.predict.retrain_model().await {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(e) => {
            error!("Failed to queue model retrain: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
