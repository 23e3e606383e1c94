//! Configuration loader for the `leakwatch` backend service.
//!
//! This module centralizes all runtime configuration values and their
//! defaults, loading from environment variables (with optional `.env` file
//! support provided by the caller). By consolidating configuration logic
//! here, we avoid scattering `env::var` calls throughout the codebase.
//!
//! Two kinds of configuration live here:
//! - [`Config`]: immutable after loading, a consistent snapshot for the
//!   lifetime of the process (feed URL, pagination limits, ...).
//! - [`Settings`]: the operator-tunable values (leak threshold, refresh
//!   interval) seeded from the environment but mutable at runtime through
//!   the settings API. The evaluation cycle re-reads them on every batch.

use std::env;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

// ---

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse an optional u64 environment variable with a default value.
macro_rules! parse_env_u64 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u64>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse an optional float environment variable with a default value.
macro_rules! parse_env_f64 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<f64>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

// ---

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent
/// configuration snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Sensor feed base URL. `None` selects the built-in sample dataset,
    /// which keeps the service fully functional for demo/offline use.
    pub feed_url: Option<String>,

    /// Feed collection path segment (the logical sensor set to subscribe to).
    pub collection: String,

    /// Maximum number of records requested per poll.
    pub sensor_limit: u32,

    /// Maximum number of feed pages to fetch per poll (safety limit).
    pub feed_max_pages: u32,

    /// Leak probability threshold seeded into the runtime settings.
    pub leak_threshold: f64,

    /// Poll interval seeded into the runtime settings, in seconds.
    pub refresh_interval_seconds: u64,

    /// Prediction service base URL (model metrics / retrain proxy).
    pub predict_api_url: String,
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `SENSOR_FEED_URL` – feed base URL (unset: built-in sample data)
/// - `SENSOR_COLLECTION` – collection path segment (default: `sensors`)
/// - `SENSOR_LIMIT` – records per poll (default: 100)
/// - `FEED_MAX_PAGES` – max pages per poll (default: 100)
/// - `LEAK_THRESHOLD` – alert threshold in [0, 1] (default: 0.7)
/// - `REFRESH_INTERVAL_SECONDS` – poll interval, >= 1 (default: 30)
/// - `PREDICT_API_URL` – prediction service (default: `http://localhost:8000`)
///
/// Returns an error if any variable is present but invalid or out of domain.
pub fn load_from_env() -> Result<Config> {
    // ---
    let feed_url = env::var("SENSOR_FEED_URL").ok().filter(|v| !v.is_empty());
    let collection = env::var("SENSOR_COLLECTION").unwrap_or_else(|_| "sensors".to_string());
    let sensor_limit = parse_env_u32!("SENSOR_LIMIT", 100);
    let feed_max_pages = parse_env_u32!("FEED_MAX_PAGES", 100);
    let leak_threshold = parse_env_f64!("LEAK_THRESHOLD", 0.7);
    let refresh_interval_seconds = parse_env_u64!("REFRESH_INTERVAL_SECONDS", 30);
    let predict_api_url =
        env::var("PREDICT_API_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());

    if !(0.0..=1.0).contains(&leak_threshold) {
        return Err(anyhow!(
            "LEAK_THRESHOLD must be within [0, 1], got {leak_threshold}"
        ));
    }
    if refresh_interval_seconds == 0 {
        return Err(anyhow!("REFRESH_INTERVAL_SECONDS must be >= 1"));
    }

    Ok(Config {
        feed_url,
        collection,
        sensor_limit,
        feed_max_pages,
        leak_threshold,
        refresh_interval_seconds,
        predict_api_url,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!(
            "  SENSOR_FEED_URL          : {}",
            self.feed_url.as_deref().unwrap_or("(unset, sample data)")
        );
        tracing::info!("  SENSOR_COLLECTION        : {}", self.collection);
        tracing::info!("  SENSOR_LIMIT             : {}", self.sensor_limit);
        tracing::info!("  FEED_MAX_PAGES           : {}", self.feed_max_pages);
        tracing::info!("  LEAK_THRESHOLD           : {}", self.leak_threshold);
        tracing::info!("  REFRESH_INTERVAL_SECONDS : {}", self.refresh_interval_seconds);
        tracing::info!("  PREDICT_API_URL          : {}", self.predict_api_url);
    }

    /// Seed the runtime-mutable settings from this configuration.
    pub fn runtime_settings(&self) -> SharedSettings {
        // ---
        Arc::new(RwLock::new(Settings {
            threshold: self.leak_threshold,
            refresh_interval_seconds: self.refresh_interval_seconds,
        }))
    }
}

// ---

/// Operator-tunable settings, re-read by the evaluation cycle on every
/// batch. The threshold's [0, 1] domain bound is enforced at the mutation
/// boundary (settings API / env loader), not by the readers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Settings {
    // ---
    pub threshold: f64,
    pub refresh_interval_seconds: u64,
}

pub type SharedSettings = Arc<RwLock<Settings>>;

// ---
