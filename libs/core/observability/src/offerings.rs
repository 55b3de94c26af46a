//! Unavailability-cache metrics.

use metrics::{counter, gauge};

/// Offerings cache metrics recorder
pub struct OfferingsMetrics;

impl OfferingsMetrics {
    /// Publish live record counts per tier, typically from a status sweep
    pub fn set_entry_counts(instance_grained: usize, family_grained: usize, spot_wide: bool) {
        gauge!("unavailable_offerings_entries", "tier" => "instance").set(instance_grained as f64);
        gauge!("unavailable_offerings_entries", "tier" => "family").set(family_grained as f64);
        gauge!("unavailable_offerings_entries", "tier" => "spot_wide")
            .set(if spot_wide { 1.0 } else { 0.0 });
    }

    /// Record an explicit cache flush
    pub fn record_flush() {
        counter!("unavailable_offerings_flushes_total").increment(1);
    }
}
