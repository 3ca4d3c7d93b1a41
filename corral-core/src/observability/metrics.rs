//! Core metrics definitions.
//!
//! All metrics follow Prometheus naming conventions:
//! - `_total` suffix for counters
//! - `_seconds` suffix for histograms measuring duration

use metrics::{describe_counter, describe_histogram};

/// Register all core metrics with descriptions.
///
/// This ensures metrics appear in `/metrics` with proper metadata.
pub fn register_core_metrics() {
    describe_counter!(
        "corral_db_errors_total",
        "Total database failures in the volume directory (by operation)"
    );
    describe_counter!("corral_volumes_created_total", "Total number of storage volumes created");
    describe_histogram!(
        "corral_db_query_duration_seconds",
        "Database query duration (by operation)"
    );
}
