//! Tracing subscriber installation and metric descriptions.

use std::sync::Once;

use metrics::{Unit, describe_counter};
use thiserror::Error;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

static METRIC_DESCRIPTIONS: Once = Once::new();

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Install a global tracing subscriber using the provided logging settings.
///
/// Library consumers that already run their own subscriber should skip this
/// and call [`describe_metrics`] alone.
pub fn init(logging: &LoggingSettings) -> Result<(), TelemetryError> {
    describe_metrics();

    let default_directive = logging.level.as_deref().unwrap_or("info");
    let env_filter = EnvFilter::builder()
        .with_default_directive(
            default_directive
                .parse()
                .map_err(|err| TelemetryError::Init(format!("bad level directive: {err}")))?,
        )
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|err| TelemetryError::Init(err.to_string()))
}

/// Register metric descriptions with the installed recorder.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "riserva_cache_hit_total",
            Unit::Count,
            "Requests served from the primary cache."
        );
        describe_counter!(
            "riserva_cache_miss_total",
            Unit::Count,
            "Requests that missed the primary cache and went upstream."
        );
        describe_counter!(
            "riserva_backup_hit_total",
            Unit::Count,
            "Requests served from the backup tier after an upstream failure."
        );
        describe_counter!(
            "riserva_upstream_failure_total",
            Unit::Count,
            "Upstream calls that timed out, errored, or returned a non-success status."
        );
        describe_counter!(
            "riserva_store_error_total",
            Unit::Count,
            "Store operations that failed and were degraded or swallowed."
        );
        describe_counter!(
            "riserva_passthrough_total",
            Unit::Count,
            "Requests forwarded without any cache involvement."
        );
    });
}
