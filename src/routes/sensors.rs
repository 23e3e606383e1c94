//! Sensor snapshot endpoints.

use axum::{
    extract::Path, extract::Query, extract::State, http::StatusCode, response::IntoResponse,
    routing::get, Json, Router,
};
use serde::Deserialize;

use super::{AppState, ErrorBody};
use crate::models::SensorReading;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/sensors", get(list_sensors))
        .route("/sensors/{id}", get(get_sensor))
}

/// Query parameters for filtering the sensor list.
#[derive(Debug, Deserialize)]
pub struct SensorsQuery {
    // ---
    id: Option<String>,
    min_probability: Option<f64>,
    limit: Option<u32>,
}

async fn list_sensors(
    Query(params): Query<SensorsQuery>,
    State(state): State<AppState>,
) -> Json<Vec<SensorReading>> {
    // ---
    Json(apply_filters(state.registry.snapshot(), &params))
}

async fn get_sensor(Path(id): Path<String>, State(state): State<AppState>) -> impl IntoResponse {
    // ---
    match state.registry.get(&id) {
        Some(reading) => (StatusCode::OK, Json(reading)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: format!("unknown sensor id {id}"),
            }),
        )
            .into_response(),
    }
}

/// Apply query filters to a registry snapshot.
fn apply_filters(readings: Vec<SensorReading>, params: &SensorsQuery) -> Vec<SensorReading> {
    // ---
    readings
        .into_iter()
        .filter(|r| params.id.as_ref().map_or(true, |id| &r.id == id))
        .filter(|r| {
            params
                .min_probability
                .map_or(true, |p| r.leak_probability >= p)
        })
        .take(params.limit.unwrap_or(1000) as usize)
        .collect()
}

// ---

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::Utc;

    fn reading(id: &str, probability: f64) -> SensorReading {
        // ---
        SensorReading {
            id: id.to_string(),
            lat: 0.0,
            lng: 0.0,
            pressure: 60.0,
            flow: 100.0,
            temperature: 21.0,
            leak_probability: probability,
            timestamp: Utc::now(),
        }
    }

    fn query(id: Option<&str>, min_probability: Option<f64>, limit: Option<u32>) -> SensorsQuery {
        // ---
        SensorsQuery {
            id: id.map(String::from),
            min_probability,
            limit,
        }
    }

    #[test]
    fn test_filter_by_id() {
        // ---
        let readings = vec![reading("S001", 0.1), reading("S002", 0.8)];
        let filtered = apply_filters(readings, &query(Some("S002"), None, None));

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "S002");
    }

    #[test]
    fn test_filter_by_min_probability_is_inclusive() {
        // ---
        let readings = vec![
            reading("S001", 0.69),
            reading("S002", 0.7),
            reading("S003", 0.9),
        ];
        let filtered = apply_filters(readings, &query(None, Some(0.7), None));

        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_limit_caps_results() {
        // ---
        let readings = (0..20).map(|i| reading(&format!("S{i:03}"), 0.1)).collect();
        let filtered = apply_filters(readings, &query(None, None, Some(5)));

        assert_eq!(filtered.len(), 5);
    }
}
