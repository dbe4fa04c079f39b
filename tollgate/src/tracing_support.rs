//! Tracing and logging support.
//!
//! Every decision path in this crate emits `tracing` events (denials at
//! debug or info, evaluations at debug, availability at trace). This
//! module installs a subscriber for applications that do not bring their
//! own.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[cfg(feature = "subscriber")]
use tracing_subscriber::{
    layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TracingFormat {
    /// Human-readable, multi-line.
    #[default]
    Pretty,

    /// Single line per event.
    Compact,

    /// JSON lines (recommended for production).
    Json,
}

/// Tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Filter directives such as `"info"` or `"info,tollgate=debug"`.
    ///
    /// If None, uses the RUST_LOG environment variable or defaults to "info".
    pub level: Option<String>,

    pub format: TracingFormat,

    /// Include timestamps in output.
    pub timestamps: bool,

    /// Include target module names in output.
    pub target: bool,

    pub thread_ids: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: TracingFormat::Pretty,
            timestamps: true,
            target: true,
            thread_ids: false,
        }
    }
}

#[cfg(feature = "subscriber")]
fn build_filter(config: &TracingConfig) -> Result<EnvFilter, ConfigError> {
    match &config.level {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| ConfigError::Load(format!("invalid log filter {directives:?}: {e}"))),
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))),
    }
}

#[cfg(feature = "subscriber")]
fn fmt_layer<S>(config: &TracingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_target(config.target)
        .with_thread_ids(config.thread_ids);

    match (config.format, config.timestamps) {
        (TracingFormat::Pretty, true) => layer.pretty().boxed(),
        (TracingFormat::Pretty, false) => layer.pretty().without_time().boxed(),
        (TracingFormat::Compact, true) => layer.compact().boxed(),
        (TracingFormat::Compact, false) => layer.compact().without_time().boxed(),
        (TracingFormat::Json, true) => layer.json().boxed(),
        (TracingFormat::Json, false) => layer.json().without_time().boxed(),
    }
}

/// Install a global subscriber with default settings.
///
/// Uses RUST_LOG for level filtering, "info" when unset.
///
/// # Environment Variables
///
/// - `RUST_LOG=debug` - Include guard denials and evaluations
/// - `RUST_LOG=info,tollgate=trace` - Also include availability checks
#[cfg(feature = "subscriber")]
pub fn init_subscriber() -> Result<(), ConfigError> {
    init_subscriber_with_config(TracingConfig::default())
}

/// Install a global subscriber from `config`.
///
/// Fails for invalid filter directives or when a global subscriber is
/// already set.
///
/// # Example
///
/// ```no_run
/// use tollgate::tracing_support::{init_subscriber_with_config, TracingConfig, TracingFormat};
///
/// init_subscriber_with_config(TracingConfig {
///     level: Some("info,tollgate=debug".to_string()),
///     format: TracingFormat::Json,
///     ..Default::default()
/// })
/// .unwrap();
/// ```
#[cfg(feature = "subscriber")]
pub fn init_subscriber_with_config(config: TracingConfig) -> Result<(), ConfigError> {
    let filter = build_filter(&config)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(&config))
        .try_init()
        .map_err(|e| ConfigError::Load(format!("tracing subscriber: {e}")))
}

// Without the subscriber feature the application owns subscriber setup
#[cfg(not(feature = "subscriber"))]
pub fn init_subscriber() -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(not(feature = "subscriber"))]
pub fn init_subscriber_with_config(_config: TracingConfig) -> Result<(), ConfigError> {
    Ok(())
}
