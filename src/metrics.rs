//! System-wide derived statistics over a registry snapshot.
//!
//! Every function here is pure: deterministic output for deterministic
//! input, no clock reads, no failure modes. The snapshot view is recomputed
//! on every request rather than cached, so it can never drift from the
//! registry contents it was derived from.

use crate::models::{MonitoringSnapshot, SensorReading, StatusBreakdown};

// ---

/// Reported system average when no sensors have been delivered yet.
pub const DEFAULT_AVERAGE_PRESSURE_PSI: f64 = 68.5;

/// Assumed waste rate of a single unremediated leak.
pub const DEFAULT_LEAK_RATE_LITERS_PER_DAY: f64 = 100.0;

/// Days in the monthly savings projection window.
pub const PROJECTION_WINDOW_DAYS: f64 = 30.0;

/// Rough CO₂ cost of treating and pumping one liter of water.
pub const CARBON_KG_PER_LITER: f64 = 0.0004;

// ---

/// Number of readings strictly above the leak threshold.
///
/// A reading exactly at the threshold is NOT counted as a leak.
pub fn leak_count(readings: &[SensorReading], threshold: f64) -> usize {
    // ---
    readings
        .iter()
        .filter(|r| r.leak_probability > threshold)
        .count()
}

/// Arithmetic mean of sensor pressures.
///
/// Returns [`DEFAULT_AVERAGE_PRESSURE_PSI`] for an empty field instead of
/// dividing by zero.
pub fn average_pressure(readings: &[SensorReading]) -> f64 {
    // ---
    if readings.is_empty() {
        return DEFAULT_AVERAGE_PRESSURE_PSI;
    }

    let total: f64 = readings.iter().map(|r| r.pressure).sum();
    total / readings.len() as f64
}

/// Monthly water-savings projection, in liters.
///
/// Models each detected leak as wasting `avg_leak_rate_liters_per_day` until
/// remediated. Deliberately a simple linear model, not a calibrated physical
/// estimate; the rate stays injectable so the projection can be tuned.
pub fn estimated_water_saved_liters(
    leaks_detected: usize,
    avg_leak_rate_liters_per_day: f64,
) -> f64 {
    // ---
    leaks_detected as f64 * avg_leak_rate_liters_per_day * PROJECTION_WINDOW_DAYS
}

/// CO₂ reduction corresponding to a volume of saved water, in kilograms.
pub fn estimated_carbon_reduced_kg(liters_saved: f64) -> f64 {
    liters_saved * CARBON_KG_PER_LITER
}

/// Assemble the full derived view for one registry snapshot.
pub fn monitoring_snapshot(readings: &[SensorReading], threshold: f64) -> MonitoringSnapshot {
    // ---
    let total_sensors = readings.len();
    let leaks = leak_count(readings, threshold);
    let water_saved = estimated_water_saved_liters(leaks, DEFAULT_LEAK_RATE_LITERS_PER_DAY);

    MonitoringSnapshot {
        total_sensors,
        leak_count: leaks,
        average_pressure: average_pressure(readings),
        estimated_water_saved_liters: water_saved,
        estimated_carbon_reduced_kg: estimated_carbon_reduced_kg(water_saved),
        status_breakdown: StatusBreakdown {
            normal: total_sensors - leaks,
            leaking: leaks,
        },
    }
}

// ---
