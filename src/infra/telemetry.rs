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

/// Install a global tracing subscriber using the provided logging settings.
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
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
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
            "cachebind_events_received_total",
            Unit::Count,
            "Total number of domain events handed to the binder."
        );
        describe_counter!(
            "cachebind_events_dropped_total",
            Unit::Count,
            "Total number of events dropped because no handler matched."
        );
        describe_counter!(
            "cachebind_handlers_invoked_total",
            Unit::Count,
            "Total number of cache handlers run to completion."
        );
        describe_histogram!(
            "cachebind_dispatch_ms",
            Unit::Milliseconds,
            "Event batch dispatch latency in milliseconds."
        );
        describe_counter!(
            "cachebind_cache_hit_total",
            Unit::Count,
            "Total number of application cache hits."
        );
        describe_counter!(
            "cachebind_cache_miss_total",
            Unit::Count,
            "Total number of application cache misses."
        );
        describe_counter!(
            "cachebind_cache_evict_total",
            Unit::Count,
            "Total number of application cache evictions due to capacity."
        );
        describe_counter!(
            "cachebind_instructions_dropped_total",
            Unit::Count,
            "Total number of refresh instructions dropped due to queue overflow."
        );
    });
}
