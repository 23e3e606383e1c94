//! In-memory registry of the latest reading per sensor.
//!
//! The registry mirrors exactly the most recent delivered batch: entries
//! for sensors absent from the latest batch are removed, it is not a union
//! of historical ids. One writer (the ingestion pipeline) and many readers
//! (HTTP handlers); readers only ever receive cloned-out snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::models::SensorReading;

// ---

#[derive(Default)]
pub struct SensorRegistry {
    // ---
    readings: RwLock<HashMap<String, SensorReading>>,
}

pub type SharedRegistry = Arc<SensorRegistry>;

impl SensorRegistry {
    pub fn new() -> SharedRegistry {
        Arc::new(Self::default())
    }

    /// Atomically swap the entire keyed store.
    ///
    /// The next map is built off to the side and published in a single
    /// assignment under the write lock, so concurrent readers observe the
    /// store either in its pre-update or post-update state, never partially
    /// updated. The caller passes an already-deduplicated sequence; when it
    /// does not, last-writer-wins applies.
    pub fn replace_all(&self, readings: Vec<SensorReading>) {
        // ---
        let next: HashMap<String, SensorReading> = readings
            .into_iter()
            .map(|reading| (reading.id.clone(), reading))
            .collect();

        *self.readings.write() = next;
    }

    /// Current readings, one per sensor id. Insertion order is not
    /// meaningful.
    pub fn snapshot(&self) -> Vec<SensorReading> {
        // ---
        self.readings.read().values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<SensorReading> {
        self.readings.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.readings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.read().is_empty()
    }
}

// ---
