use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::views::{METRIC_CACHE_HIT_TOTAL, METRIC_CACHE_MISS_TOTAL};
use crate::cache::{
    METRIC_CACHE_EVICT_TOTAL, METRIC_CACHE_INVALIDATION_FAILURE_TOTAL,
    METRIC_CACHE_INVALIDATION_MS,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Events go to stderr; stdout carries command output.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .with_writer(std::io::stderr)
            .compact()
            .with_target(true)
            .boxed(),
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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT_TOTAL,
            Unit::Count,
            "Read-through view requests served from the cache, by key family."
        );
        describe_counter!(
            METRIC_CACHE_MISS_TOTAL,
            Unit::Count,
            "Read-through view requests loaded from the repositories, by key family."
        );
        describe_counter!(
            METRIC_CACHE_EVICT_TOTAL,
            Unit::Count,
            "Populated cache keys evicted by mutation-driven invalidation."
        );
        describe_counter!(
            METRIC_CACHE_INVALIDATION_FAILURE_TOTAL,
            Unit::Count,
            "Cache evictions that failed and turned their mutation into an error."
        );
        describe_histogram!(
            METRIC_CACHE_INVALIDATION_MS,
            Unit::Milliseconds,
            "Time spent applying one invalidation plan."
        );
    });
}
