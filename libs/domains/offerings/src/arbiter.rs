//! Offerings arbiter.
//!
//! For one node claim, orders candidate instance types by price, drops the
//! ones the unavailability cache has fully masked (the pre-launch circuit
//! breaker), then picks the SKU, purchase priority and zone to launch.

use crate::cache::UnavailableOfferings;
use crate::models::{CapacityType, InstanceType, NodeClaim, Offering, Requirements, SkuCatalog};
use std::cmp::Ordering;
use tracing::debug;

/// The arbiter's answer: which instance type to launch, how to pay for it,
/// and where.
#[derive(Debug, Clone)]
pub struct Selection {
    pub instance_type: InstanceType,
    pub capacity_type: CapacityType,
    pub zone: String,
}

/// Stateless per-call arbitration over a candidate list.
///
/// The candidate list is recomputed by the caller per arbitration; the only
/// shared state consulted here is the unavailability cache. Constructing
/// without a cache handle disables the pre-launch filter (fail-open).
pub struct Arbiter<'a> {
    catalog: &'a SkuCatalog,
    cache: Option<&'a UnavailableOfferings>,
}

impl<'a> Arbiter<'a> {
    pub fn new(catalog: &'a SkuCatalog, cache: Option<&'a UnavailableOfferings>) -> Self {
        Self { catalog, cache }
    }

    /// Sort candidates by the price of their cheapest available,
    /// requirement-compatible offering, ascending; ties break by name so
    /// the ordering is stable under re-ordered input.
    pub fn order_by_price(requirements: &Requirements, instance_types: &mut [InstanceType]) {
        instance_types.sort_by(|a, b| {
            let pa = a.cheapest_compatible_price(requirements);
            let pb = b.cheapest_compatible_price(requirements);
            pa.partial_cmp(&pb)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
    }

    /// Drop every instance type whose requirement-compatible offerings are
    /// all masked by the unavailability cache, re-checked live per call.
    ///
    /// This is what stops dozens of parallel claims from each burning an
    /// Azure call to rediscover the same quota wall: the first failure
    /// mutates the cache and later arbitrations skip the instance type
    /// within milliseconds. Without a cache handle the input is returned
    /// unchanged.
    pub fn pre_launch_filter(
        &self,
        requirements: &Requirements,
        instance_types: Vec<InstanceType>,
    ) -> Vec<InstanceType> {
        let Some(cache) = self.cache else {
            return instance_types;
        };

        instance_types
            .into_iter()
            .filter(|it| {
                let Some(sku) = self.catalog.get(&it.name) else {
                    // Unknown SKU: nothing to check against, let it through
                    return true;
                };
                let viable = it.offerings.iter().any(|o| {
                    o.available
                        && requirements.allows_capacity_type(o.capacity_type)
                        && requirements.allows_zone(&o.zone)
                        && !cache.is_unavailable(sku, &o.zone, o.capacity_type)
                });
                if !viable {
                    debug!(
                        instance_type = %it.name,
                        "Pre-launch filter dropped instance type; all offerings unavailable"
                    );
                }
                viable
            })
            .collect()
    }

    /// Run the full arbitration: order, filter, then pick SKU, priority
    /// and zone. Returns `None` when no viable triple can be formed.
    pub fn select(&self, claim: &NodeClaim, mut instance_types: Vec<InstanceType>) -> Option<Selection> {
        Self::order_by_price(&claim.requirements, &mut instance_types);
        let mut remaining = self.pre_launch_filter(&claim.requirements, instance_types);
        if remaining.is_empty() {
            return None;
        }
        let instance_type = remaining.remove(0);

        let capacity_type = self.pick_priority(claim, &instance_type)?;
        let zone = self.pick_zone(claim, &instance_type, capacity_type)?;

        debug!(
            claim = %claim.name,
            instance_type = %instance_type.name,
            capacity_type = %capacity_type,
            zone = %zone,
            "Arbitration complete"
        );

        Some(Selection {
            instance_type,
            capacity_type,
            zone,
        })
    }

    /// On-demand unless the claim admits spot and the instance type has a
    /// viable spot offering in a requested zone.
    fn pick_priority(&self, claim: &NodeClaim, instance_type: &InstanceType) -> Option<CapacityType> {
        if claim.requirements.allows_capacity_type(CapacityType::Spot)
            && instance_type
                .offerings
                .iter()
                .any(|o| self.offering_viable(claim, instance_type, o, CapacityType::Spot))
        {
            return Some(CapacityType::Spot);
        }

        if claim.requirements.allows_capacity_type(CapacityType::OnDemand) {
            return Some(CapacityType::OnDemand);
        }

        None
    }

    /// Smallest admissible zone among viable offerings of the chosen
    /// priority. Zone choice is price-blind, so the tie-break is simply
    /// lexicographic.
    fn pick_zone(
        &self,
        claim: &NodeClaim,
        instance_type: &InstanceType,
        capacity_type: CapacityType,
    ) -> Option<String> {
        instance_type
            .offerings
            .iter()
            .filter(|o| self.offering_viable(claim, instance_type, o, capacity_type))
            .map(|o| o.zone.clone())
            .min()
    }

    fn offering_viable(
        &self,
        claim: &NodeClaim,
        instance_type: &InstanceType,
        offering: &Offering,
        capacity_type: CapacityType,
    ) -> bool {
        if offering.capacity_type != capacity_type
            || !offering.available
            || !claim.requirements.allows_zone(&offering.zone)
        {
            return false;
        }
        match (self.cache, self.catalog.get(&instance_type.name)) {
            (Some(cache), Some(sku)) => {
                !cache.is_unavailable(sku, &offering.zone, offering.capacity_type)
            }
            _ => true,
        }
    }
}
