//! Ingestion pipeline: the single writer over registry and alert state.
//!
//! One task owns the whole update cycle. Each batch is handled to
//! completion (normalize → dedup → registry replace → evaluate → publish
//! alerts) before the next event is taken from the subscription, so update
//! cycles are serialized without locks around the cycle itself. Everything
//! outside this task only reads copy-on-read snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::SharedSettings;
use crate::evaluator::ThresholdEvaluator;
use crate::models::{normalize, LeakAlert, SensorReading};
use crate::registry::SharedRegistry;
use crate::transport::{Subscription, TransportEvent};

// ---

/// Where the pipeline's batches come from, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Remote,
    Fixture,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Remote => "remote",
            DataSource::Fixture => "fixture",
        }
    }
}

/// Pipeline health readable from the HTTP surface.
///
/// A transport failure is non-fatal: it is recorded here (and surfaced as
/// an error string), while the registry retains its last-known-good
/// snapshot. The error clears on the next successful batch.
pub struct PipelineStatus {
    // ---
    source: DataSource,
    last_error: RwLock<Option<String>>,
}

impl PipelineStatus {
    pub fn new(source: DataSource) -> Arc<Self> {
        Arc::new(Self {
            source,
            last_error: RwLock::new(None),
        })
    }

    pub fn source(&self) -> DataSource {
        self.source
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn record_error(&self, message: String) {
        *self.last_error.write() = Some(message);
    }

    fn clear_error(&self) {
        *self.last_error.write() = None;
    }
}

// ---

/// Alerts retained for the current session. Older entries are dropped
/// first; nothing is persisted across restarts.
pub const MAX_SESSION_ALERTS: usize = 1000;

/// Outbound alert surface: a broadcast bus for in-process subscribers plus
/// the session log served over HTTP. The pipeline publishes here at most
/// once per false→true transition.
pub struct AlertSink {
    // ---
    session: RwLock<Vec<LeakAlert>>,
    bus: broadcast::Sender<LeakAlert>,
}

impl AlertSink {
    pub fn new() -> Arc<Self> {
        // ---
        let (bus, _) = broadcast::channel(64);
        Arc::new(Self {
            session: RwLock::new(Vec::new()),
            bus,
        })
    }

    /// Subscribe to live alert events.
    pub fn subscribe(&self) -> broadcast::Receiver<LeakAlert> {
        self.bus.subscribe()
    }

    /// All alerts emitted this session, oldest first.
    pub fn session_alerts(&self) -> Vec<LeakAlert> {
        self.session.read().clone()
    }

    fn publish(&self, alert: LeakAlert) {
        // ---
        {
            let mut session = self.session.write();
            if session.len() == MAX_SESSION_ALERTS {
                session.remove(0);
            }
            session.push(alert.clone());
        }

        // A send error only means there are no live subscribers
        let _ = self.bus.send(alert);
    }
}

// ---

/// Normalize a raw batch into the deduplicated reading set for
/// `replace_all`.
///
/// Records without a usable string id cannot be keyed and are skipped with
/// a debug log; duplicate ids resolve last-writer-wins. Every surviving
/// record normalizes successfully (the normalizer is total).
pub fn build_batch(records: &[Value], now: DateTime<Utc>) -> Vec<SensorReading> {
    // ---
    let mut by_id: HashMap<String, SensorReading> = HashMap::new();

    for record in records {
        let Some(id) = record
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
        else {
            tracing::debug!("Skipping feed record without usable id: {}", record);
            continue;
        };

        by_id.insert(id.to_string(), normalize(id, record, now));
    }

    by_id.into_values().collect()
}

/// Spawn the ingestion loop onto the runtime.
pub fn spawn(
    subscription: Subscription,
    registry: SharedRegistry,
    settings: SharedSettings,
    sink: Arc<AlertSink>,
    status: Arc<PipelineStatus>,
) -> JoinHandle<()> {
    // ---
    tokio::spawn(run(subscription, registry, settings, sink, status))
}

/// Consume the subscription until it closes.
///
/// The threshold is re-read from the shared settings once per batch, so an
/// operator change takes effect on the next cycle and never mid-cycle.
pub async fn run(
    mut subscription: Subscription,
    registry: SharedRegistry,
    settings: SharedSettings,
    sink: Arc<AlertSink>,
    status: Arc<PipelineStatus>,
) {
    // ---
    let mut evaluator = ThresholdEvaluator::new();

    while let Some(event) = subscription.next_event().await {
        match event {
            TransportEvent::Batch(records) => {
                // ---
                let readings = build_batch(&records, Utc::now());
                let threshold = settings.read().threshold;

                tracing::debug!(
                    "Batch received: {} records, {} readings after dedup, threshold {}",
                    records.len(),
                    readings.len(),
                    threshold
                );

                registry.replace_all(readings.clone());
                let alerts = evaluator.evaluate(&readings, threshold);
                status.clear_error();

                for alert in alerts {
                    tracing::warn!(
                        "Leak alert: sensor {} at {:.1}% probability",
                        alert.sensor_id,
                        alert.probability * 100.0
                    );
                    sink.publish(alert);
                }
            }
            TransportEvent::Error(message) => {
                // ---
                // Registry retains its last-known-good snapshot
                tracing::error!("Transport error: {}", message);
                status.record_error(message);
            }
        }
    }

    tracing::info!("Ingestion pipeline stopped");
}

// ---

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::config::Settings;
    use crate::registry::SensorRegistry;
    use crate::transport::subscription_pair;
    use serde_json::json;

    fn shared_settings(threshold: f64) -> SharedSettings {
        Arc::new(RwLock::new(Settings {
            threshold,
            refresh_interval_seconds: 30,
        }))
    }

    fn record(id: &str, probability: f64) -> Value {
        json!({
            "id": id,
            "lat": 40.758,
            "lng": -73.9855,
            "pressure": 60.0,
            "flow": 100.0,
            "temperature": 21.0,
            "leak_probability": probability,
            "timestamp": "2025-06-01T12:00:00Z",
        })
    }

    #[test]
    fn test_build_batch_dedups_and_skips_unkeyed() {
        // ---
        let records = vec![
            record("S001", 0.2),
            record("S001", 0.8), // duplicate id: last writer wins
            json!({ "pressure": 55.0 }),
            json!({ "id": "", "pressure": 55.0 }),
            record("S002", 0.1),
        ];

        let mut readings = build_batch(&records, Utc::now());
        readings.sort_by(|a, b| a.id.cmp(&b.id));

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].id, "S001");
        assert_eq!(readings[0].leak_probability, 0.8);
        assert_eq!(readings[1].id, "S002");
    }

    #[tokio::test]
    async fn test_pipeline_alerts_once_across_batches() {
        // ---
        let (events_tx, _cancel_rx, subscription) = subscription_pair();
        let registry = SensorRegistry::new();
        let settings = shared_settings(0.7);
        let sink = AlertSink::new();
        let status = PipelineStatus::new(DataSource::Fixture);

        let mut live_alerts = sink.subscribe();
        let pipeline = spawn(
            subscription,
            registry.clone(),
            settings,
            sink.clone(),
            status,
        );

        for probability in [0.2, 0.9, 0.95] {
            events_tx
                .send(TransportEvent::Batch(vec![record("S1", probability)]))
                .await
                .unwrap();
        }
        drop(events_tx);
        pipeline.await.unwrap();

        // One crossing, one alert, and the bus saw the same single event
        let alerts = sink.session_alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].sensor_id, "S1");
        assert_eq!(alerts[0].probability, 0.9);

        assert_eq!(live_alerts.recv().await.unwrap().sensor_id, "S1");
        assert!(live_alerts.try_recv().is_err());

        // Registry mirrors the latest batch
        assert_eq!(registry.get("S1").unwrap().leak_probability, 0.95);
    }

    #[tokio::test]
    async fn test_transport_error_keeps_last_known_good() {
        // ---
        let (events_tx, _cancel_rx, subscription) = subscription_pair();
        let registry = SensorRegistry::new();
        let settings = shared_settings(0.7);
        let sink = AlertSink::new();
        let status = PipelineStatus::new(DataSource::Remote);

        let pipeline = spawn(
            subscription,
            registry.clone(),
            settings,
            sink.clone(),
            status.clone(),
        );

        events_tx
            .send(TransportEvent::Batch(vec![record("S1", 0.9)]))
            .await
            .unwrap();
        events_tx
            .send(TransportEvent::Error("connection reset".to_string()))
            .await
            .unwrap();
        drop(events_tx);
        pipeline.await.unwrap();

        assert_eq!(status.last_error().as_deref(), Some("connection reset"));
        assert_eq!(registry.len(), 1, "registry must retain last-known-good");
        assert_eq!(sink.session_alerts().len(), 1);
    }

    #[tokio::test]
    async fn test_good_batch_clears_transport_error() {
        // ---
        let (events_tx, _cancel_rx, subscription) = subscription_pair();
        let registry = SensorRegistry::new();
        let settings = shared_settings(0.7);
        let sink = AlertSink::new();
        let status = PipelineStatus::new(DataSource::Remote);

        let pipeline = spawn(subscription, registry, settings, sink, status.clone());

        events_tx
            .send(TransportEvent::Error("timeout".to_string()))
            .await
            .unwrap();
        events_tx
            .send(TransportEvent::Batch(vec![record("S1", 0.1)]))
            .await
            .unwrap();
        drop(events_tx);
        pipeline.await.unwrap();

        assert_eq!(status.last_error(), None);
    }
}
