//! Pricing-snapshot metrics.

use metrics::gauge;

/// Pricing metrics recorder
pub struct PricingMetrics;

impl PricingMetrics {
    /// Publish the age of the current snapshot
    pub fn set_snapshot_age(region: &str, age_secs: f64) {
        gauge!(
            "pricing_snapshot_age_seconds",
            "region" => region.to_string()
        )
        .set(age_secs);
    }
}
