//! Logging and metric registration for the dossier server and CLI.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the process-wide subscriber: `RUST_LOG` overrides `logging.level`,
/// and `logging.format` picks compact lines or JSON records.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register help text for the cache and post-render metrics.
fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "dossier_cache_hit_total",
            Unit::Count,
            "Content cache lookups answered from storage."
        );
        describe_counter!(
            "dossier_cache_miss_total",
            Unit::Count,
            "Content cache lookups that fell back to the content host."
        );
        describe_counter!(
            "dossier_cache_expired_total",
            Unit::Count,
            "Content cache entries dropped for exceeding their TTL."
        );
        describe_counter!(
            "dossier_post_render_failures_total",
            Unit::Count,
            "Posts that failed to load or compile."
        );
        describe_histogram!(
            "dossier_post_compile_ms",
            Unit::Milliseconds,
            "MDX compile latency in milliseconds."
        );
    });
}
