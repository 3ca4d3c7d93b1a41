//! Observability infrastructure: tracing and metrics.

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod metrics;

/// Port the Prometheus scrape endpoint listens on.
const PORT_METRICS: u16 = 9432;

/// Initialize the global observability infrastructure.
///
/// This must be called once at application startup before any other
/// operations. Library consumers embedding corral-core into a larger daemon
/// should install their own subscriber instead.
///
/// # Panics
/// Panics if called more than once.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(true).with_level(true))
        .init();

    // Set up Prometheus metrics exporter
    PrometheusBuilder::new().with_http_listener(([0, 0, 0, 0], PORT_METRICS)).install()?;

    // Register core metrics
    metrics::register_core_metrics();

    Ok(())
}
