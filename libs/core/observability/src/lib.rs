//! Observability utilities for the node autoscaler.
//!
//! This crate provides:
//! - Prometheus metrics recording and export
//! - Custom metrics for provisioning, offerings and pricing
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, render_metrics, ProvisioningMetrics};
//!
//! // Initialize metrics recorder
//! init_metrics();
//!
//! // Record a provisioning outcome
//! ProvisioningMetrics::record_provisioned("Standard_D2s_v3", "westus-1", "on-demand");
//!
//! // Serve the text exposition from a handler
//! let body = render_metrics();
//! ```

pub mod offerings;
pub mod pricing;
pub mod provisioning;

pub use offerings::OfferingsMetrics;
pub use pricing::PricingMetrics;
pub use provisioning::ProvisioningMetrics;

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize the Prometheus metrics recorder.
///
/// This should be called once at application startup.
/// Returns the PrometheusHandle for rendering metrics.
pub fn init_metrics() -> &'static PrometheusHandle {
    METRICS_HANDLE.get_or_init(|| {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("Failed to install Prometheus recorder");

        info!("Prometheus metrics recorder initialized");

        register_metric_descriptions();

        handle
    })
}

/// Get the metrics handle (must call init_metrics first)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Render the current text exposition, for the /metrics endpoint
pub fn render_metrics() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

/// Register metric descriptions for documentation
fn register_metric_descriptions() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Provisioning metrics
    describe_counter!(
        "provisioning_attempts_total",
        "Provisioning attempts by outcome"
    );
    describe_histogram!(
        "provisioning_duration_seconds",
        "Wall time of one provisioning attempt"
    );

    // Offerings cache metrics
    describe_gauge!(
        "unavailable_offerings_entries",
        "Live unavailability records by tier"
    );
    describe_counter!(
        "unavailable_offerings_flushes_total",
        "Explicit cache flushes"
    );

    // Pricing metrics
    describe_gauge!(
        "pricing_snapshot_age_seconds",
        "Seconds since the last successful price refresh"
    );
}
