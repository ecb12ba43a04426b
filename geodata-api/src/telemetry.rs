//! Tracing initialization for the API binary.
//!
//! Structured logging via tracing-subscriber with an env-filter
//! (`RUST_LOG`) and optional JSON output for log shippers.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Fallback filter directive when `RUST_LOG` is not set.
    pub default_filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_filter: "info,geodata_api=debug,geodata_store=debug".to_string(),
            json: std::env::var("GEODATA_LOG_JSON")
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(false),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Safe to call once at process start; returns an error message if a
/// subscriber is already installed.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };

    result.map_err(|e| format!("Failed to initialize tracing: {}", e))
}
