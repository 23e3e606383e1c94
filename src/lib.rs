//! Core library for the `leakwatch` backend service.
//!
//! The crate is split into leaf modules per the Explicit Module Boundary
//! Pattern (EMBP): ingestion transport, reading normalization, the sensor
//! registry, derived metrics, the threshold evaluator, and a `routes`
//! gateway that is the only module aware of individual HTTP endpoints.
//! `main.rs` wires these together; integration tests drive the same wiring
//! in-process.

pub mod config;
pub mod evaluator;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod predict;
pub mod registry;
pub mod routes;
pub mod transport;

pub use config::{Config, Settings, SharedSettings};
pub use models::{LeakAlert, MonitoringSnapshot, SensorReading};
