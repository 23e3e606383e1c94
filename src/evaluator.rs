//! Threshold evaluator and alert deduplicator.
//!
//! Edge-triggered, not level-triggered: each sensor carries a two-state
//! machine (NORMAL / ALERTED) and an alert fires only on the false→true
//! crossing of `leak_probability > threshold`. A sensor hovering above the
//! threshold across consecutive batches emits nothing after its first
//! alert; once it drops back to or below the threshold it silently returns
//! to NORMAL and becomes re-alertable.

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{LeakAlert, SensorReading};

// ---

/// Per-sensor evaluation state, created lazily on first observation.
///
/// Entries are never destroyed during a session: evaluation only touches
/// ids present in the current snapshot, so state left behind by sensors
/// that vanished from the feed is inert.
#[derive(Debug, Clone, Copy)]
struct AlertState {
    // ---
    is_above_threshold: bool,
    last_probability: f64,
}

#[derive(Default)]
pub struct ThresholdEvaluator {
    // ---
    states: HashMap<String, AlertState>,
}

impl ThresholdEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate one full snapshot against the current threshold.
    ///
    /// Called once per ingestion cycle. Processes every sensor id present,
    /// updating or creating its state, and returns only the alerts whose
    /// false→true transition fired in this call. The threshold is passed in
    /// per call and compared against each sensor's own previous state, so a
    /// threshold change between cycles can never by itself emit an alert.
    pub fn evaluate(&mut self, readings: &[SensorReading], threshold: f64) -> Vec<LeakAlert> {
        // ---
        let mut alerts = Vec::new();

        for reading in readings {
            let above = reading.leak_probability > threshold;
            let state = self
                .states
                .entry(reading.id.clone())
                .or_insert(AlertState {
                    is_above_threshold: false,
                    last_probability: 0.0,
                });

            if above && !state.is_above_threshold {
                alerts.push(LeakAlert {
                    id: Uuid::new_v4(),
                    sensor_id: reading.id.clone(),
                    probability: reading.leak_probability,
                    timestamp: reading.timestamp,
                });
            } else if !above && state.is_above_threshold {
                // Recovery is silent; the sensor may re-alert later.
                tracing::info!(
                    "sensor {} recovered ({:.2} -> {:.2})",
                    reading.id,
                    state.last_probability,
                    reading.leak_probability
                );
            }

            state.is_above_threshold = above;
            state.last_probability = reading.leak_probability;
        }

        alerts
    }
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

    #[test]
    fn test_alerts_fire_only_on_crossings() {
        // ---
        // Probability sequence [0.5, 0.8, 0.6, 0.9] against threshold 0.7
        // must alert at the 2nd and 4th observations only.
        let mut evaluator = ThresholdEvaluator::new();

        assert!(evaluator.evaluate(&[reading("S001", 0.5)], 0.7).is_empty());

        let second = evaluator.evaluate(&[reading("S001", 0.8)], 0.7);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].sensor_id, "S001");
        assert_eq!(second[0].probability, 0.8);

        assert!(evaluator.evaluate(&[reading("S001", 0.6)], 0.7).is_empty());

        let fourth = evaluator.evaluate(&[reading("S001", 0.9)], 0.7);
        assert_eq!(fourth.len(), 1);
    }

    #[test]
    fn test_no_realert_while_staying_above() {
        // ---
        // Batches {0.2}, {0.9}, {0.95}: one alert total, after the second.
        let mut evaluator = ThresholdEvaluator::new();

        assert!(evaluator.evaluate(&[reading("S1", 0.2)], 0.7).is_empty());
        assert_eq!(evaluator.evaluate(&[reading("S1", 0.9)], 0.7).len(), 1);
        assert!(evaluator.evaluate(&[reading("S1", 0.95)], 0.7).is_empty());
    }

    #[test]
    fn test_reevaluating_unchanged_snapshot_is_quiet() {
        // ---
        let mut evaluator = ThresholdEvaluator::new();
        let snapshot = vec![reading("S001", 0.9), reading("S002", 0.3)];

        assert_eq!(evaluator.evaluate(&snapshot, 0.7).len(), 1);
        assert!(evaluator.evaluate(&snapshot, 0.7).is_empty());
    }

    #[test]
    fn test_exactly_at_threshold_is_not_a_leak() {
        // ---
        let mut evaluator = ThresholdEvaluator::new();
        assert!(evaluator.evaluate(&[reading("S001", 0.7)], 0.7).is_empty());
    }

    #[test]
    fn test_unseen_sensor_above_threshold_alerts_immediately() {
        // ---
        let mut evaluator = ThresholdEvaluator::new();
        let alerts = evaluator.evaluate(&[reading("S009", 0.95)], 0.7);
        assert_eq!(alerts.len(), 1);
    }

    #[test]
    fn test_threshold_change_alone_does_not_alert() {
        // ---
        let mut evaluator = ThresholdEvaluator::new();

        // S001 crosses at threshold 0.7 and stays ALERTED.
        assert_eq!(evaluator.evaluate(&[reading("S001", 0.8)], 0.7).len(), 1);

        // Raising then restoring the threshold with an unchanged probability
        // produces no new alert for a sensor that ends up where it started:
        // at 0.9 the sensor drops to NORMAL silently...
        assert!(evaluator.evaluate(&[reading("S001", 0.8)], 0.9).is_empty());
        // ...and at 0.7 again its own state crosses false→true, which is a
        // genuine crossing for this sensor, so it re-alerts.
        assert_eq!(evaluator.evaluate(&[reading("S001", 0.8)], 0.7).len(), 1);
    }

    #[test]
    fn test_lowered_threshold_alerts_on_next_cycle() {
        // ---
        let mut evaluator = ThresholdEvaluator::new();

        assert!(evaluator.evaluate(&[reading("S001", 0.6)], 0.7).is_empty());
        // Operator lowers the threshold below the sensor's probability; the
        // sensor's own state crosses on the next evaluation.
        assert_eq!(evaluator.evaluate(&[reading("S001", 0.6)], 0.5).len(), 1);
    }

    #[test]
    fn test_independent_state_per_sensor() {
        // ---
        let mut evaluator = ThresholdEvaluator::new();

        let alerts = evaluator.evaluate(
            &[reading("S001", 0.9), reading("S002", 0.8), reading("S003", 0.1)],
            0.7,
        );
        assert_eq!(alerts.len(), 2);

        // S002 recovers and re-crosses; S001 stays up and stays quiet.
        assert!(evaluator
            .evaluate(&[reading("S001", 0.95), reading("S002", 0.2)], 0.7)
            .is_empty());
        let alerts = evaluator.evaluate(&[reading("S001", 0.95), reading("S002", 0.85)], 0.7);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].sensor_id, "S002");
    }
}
