//! Data models for the leak monitoring pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---

/// Latest reading from one physical sensor.
///
/// Field names match the upstream feed's snake_case wire format. A reading
/// is replaced wholesale on every batch; it is never partially mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    // ---
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub pressure: f64,
    pub flow: f64,
    pub temperature: f64,
    pub leak_probability: f64,
    pub timestamp: DateTime<Utc>,
}

/// Alert emitted on a sensor's false→true threshold crossing.
#[derive(Debug, Clone, Serialize)]
pub struct LeakAlert {
    // ---
    pub id: Uuid,
    pub sensor_id: String,
    pub probability: f64,
    pub timestamp: DateTime<Utc>,
}

/// System-wide derived view, recomputed on every request so it is always
/// consistent with the registry at the moment of the call.
#[derive(Debug, Clone, Serialize)]
pub struct MonitoringSnapshot {
    // ---
    pub total_sensors: usize,
    pub leak_count: usize,
    pub average_pressure: f64,
    pub estimated_water_saved_liters: f64,
    pub estimated_carbon_reduced_kg: f64,
    pub status_breakdown: StatusBreakdown,
}

/// Count of sensors per monitoring status.
#[derive(Debug, Clone, Serialize)]
pub struct StatusBreakdown {
    // ---
    pub normal: usize,
    pub leaking: usize,
}

// ---

/// Convert a loosely-typed feed record into a canonical [`SensorReading`].
///
/// Total: never fails. Missing or non-numeric fields coerce to `0.0`; a
/// missing or unparseable timestamp coerces to `now` (passed in by the
/// caller so the function stays deterministic and testable);
/// `leak_probability` is clamped to `[0, 1]` regardless of what the source
/// delivered.
pub fn normalize(raw_id: &str, raw: &Value, now: DateTime<Utc>) -> SensorReading {
    // ---
    SensorReading {
        id: raw_id.to_string(),
        lat: num_field(raw, "lat"),
        lng: num_field(raw, "lng"),
        pressure: num_field(raw, "pressure"),
        flow: num_field(raw, "flow"),
        temperature: num_field(raw, "temperature"),
        leak_probability: num_field(raw, "leak_probability").clamp(0.0, 1.0),
        timestamp: raw
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<DateTime<Utc>>().ok())
            .unwrap_or(now),
    }
}

fn num_field(raw: &Value, key: &str) -> f64 {
    raw.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

// ---
