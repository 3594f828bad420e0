use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::follow::{FOLLOWS_CREATED_METRIC, FOLLOWS_REMOVED_METRIC};
use crate::cache::{INDEX_CACHE_CLEARS_METRIC, INDEX_CACHE_HITS_METRIC, INDEX_CACHE_MISSES_METRIC};
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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            INDEX_CACHE_HITS_METRIC,
            Unit::Count,
            "Index page requests served from the response cache."
        );
        describe_counter!(
            INDEX_CACHE_MISSES_METRIC,
            Unit::Count,
            "Index page requests that had to render the feed."
        );
        describe_counter!(
            INDEX_CACHE_CLEARS_METRIC,
            Unit::Count,
            "Explicit clears of the index page cache."
        );
        describe_counter!(
            FOLLOWS_CREATED_METRIC,
            Unit::Count,
            "Follow relations created."
        );
        describe_counter!(
            FOLLOWS_REMOVED_METRIC,
            Unit::Count,
            "Follow relations removed."
        );
    });
}
