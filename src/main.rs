//! Application entry point for the `leakwatch` backend service.
//!
//! This binary orchestrates the full startup sequence for the leak
//! monitoring pipeline, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Selecting the batch transport once at startup: the remote sensor feed
//!   when `SENSOR_FEED_URL` is configured, the built-in sample dataset
//!   otherwise (demo/offline operation)
//! - Spawning the single-writer ingestion pipeline
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving requests
//!
//! # Environment Variables
//! - `SENSOR_FEED_URL` (optional) – sensor feed base URL; unset selects the
//!   built-in sample data
//! - `LEAK_THRESHOLD` (optional) – alert threshold in [0, 1] (default: 0.7)
//! - `REFRESH_INTERVAL_SECONDS` (optional) – poll interval (default: 30)
//! - `LEAKWATCH_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `LEAKWATCH_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! This module follows the Explicit Module Boundary Pattern (EMBP) by
//! delegating configuration parsing to `config`, transport selection to
//! `transport`, and route registration to `routes`.
use std::{env, io::IsTerminal, net::SocketAddr, sync::Arc};

use axum::Router;
use dotenvy::dotenv;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::Result;

use leakwatch::config;
use leakwatch::pipeline::{self, AlertSink, DataSource, PipelineStatus};
use leakwatch::predict::PredictClient;
use leakwatch::registry::SensorRegistry;
use leakwatch::routes::{self, AppState};
use leakwatch::transport;

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let registry = SensorRegistry::new();
    let settings = cfg.runtime_settings();
    let sink = AlertSink::new();

    // Strategy selection happens exactly once, here, not as a runtime
    // conditional inside the ingestion path.
    let (subscription, status) = match &cfg.feed_url {
        Some(url) => {
            tracing::info!("Subscribing to sensor feed at {}", url);
            (
                transport::subscribe_remote(url, &cfg),
                PipelineStatus::new(DataSource::Remote),
            )
        }
        None => {
            tracing::warn!("SENSOR_FEED_URL not set; serving built-in sample data");
            (
                transport::subscribe_fixture(cfg.refresh_interval_seconds),
                PipelineStatus::new(DataSource::Fixture),
            )
        }
    };

    pipeline::spawn(
        subscription,
        registry.clone(),
        settings.clone(),
        sink.clone(),
        status.clone(),
    );

    let predict = Arc::new(PredictClient::new(cfg.predict_api_url.clone()));

    // Build app from routes gateway (EMBP)
    let app: Router = routes::router(AppState {
        registry,
        settings,
        sink,
        status,
        predict,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], 8080));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `LEAKWATCH_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by the `LEAKWATCH_LOG_LEVEL` env var
///
/// This should be called once at application startup before any logging
/// or tracing macros are invoked. It installs the subscriber globally
/// for the lifetime of the process.
fn init_tracing() {
    // ---
    let span_events = match env::var("LEAKWATCH_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to LEAKWATCH_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("LEAKWATCH_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},hyper=warn,reqwest=warn"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
