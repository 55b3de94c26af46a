//! Provisioning-specific metrics.

use metrics::{counter, histogram};

/// Provisioning metrics recorder
pub struct ProvisioningMetrics;

impl ProvisioningMetrics {
    /// Record a satisfied claim
    pub fn record_provisioned(instance_type: &str, zone: &str, capacity_type: &str) {
        counter!(
            "provisioning_attempts_total",
            "outcome" => "provisioned",
            "instance_type" => instance_type.to_string(),
            "zone" => zone.to_string(),
            "capacity_type" => capacity_type.to_string()
        )
        .increment(1);
    }

    /// Record a retryable failure
    pub fn record_retry() {
        counter!("provisioning_attempts_total", "outcome" => "retry").increment(1);
    }

    /// Record a terminal failure
    pub fn record_failed() {
        counter!("provisioning_attempts_total", "outcome" => "failed").increment(1);
    }

    /// Record the wall time of one attempt
    pub fn record_duration(outcome: &str, duration_secs: f64) {
        histogram!(
            "provisioning_duration_seconds",
            "outcome" => outcome.to_string()
        )
        .record(duration_secs);
    }
}
