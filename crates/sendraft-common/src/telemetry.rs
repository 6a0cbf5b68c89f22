//! Tracing setup for sendraft binaries.
//!
//! Log output goes to stderr so that stdout stays free for document output.
//!
//! # Usage
//!
//! ```ignore
//! use sendraft_common::telemetry::{self, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env("sendraft");
//! telemetry::init(config);
//!
//! tracing::info!("starting");
//! telemetry::count("sendraft_drafts_total");
//! ```

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for labeling
    pub service_name: String,
    /// Console log level (default: INFO, DEBUG in debug builds)
    pub console_level: Level,
}

impl TelemetryConfig {
    /// Load config from environment variables.
    ///
    /// - `RUST_LOG`: Standard env filter (optional, overrides console_level)
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        Self {
            service_name: service_name.into(),
            console_level,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.console_level = level;
        self
    }
}

/// Initialize tracing.
///
/// Call once at application startup. Calling it again is a no-op.
pub fn init(config: TelemetryConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.console_level.as_str().to_lowercase()));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(env_filter);

    if tracing_subscriber::registry()
        .with(console_layer)
        .try_init()
        .is_ok()
    {
        tracing::debug!(service = %config.service_name, "telemetry initialized");
    }
}

/// Increment a counter by one. Does nothing unless the `metrics` feature is enabled
/// and the binary has installed a recorder.
#[inline]
pub fn count(name: &'static str) {
    #[cfg(feature = "metrics")]
    metrics::counter!(name).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = name;
}
