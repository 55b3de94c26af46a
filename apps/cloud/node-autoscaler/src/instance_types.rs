//! Instance-type candidate construction.
//!
//! Folds the SKU catalogue, the pricing snapshot and the live
//! unavailability state into the candidate list one arbitration consumes.
//! Rebuilt per reconcile pass; nothing here is cached.

use domain_offerings::{
    CapacityType, InstanceType, Offering, Requirements, ResourceCapacity, Sku, SkuCatalog,
    UnavailableOfferings, INSTANCE_TYPE_LABEL, ZONE_LABEL,
};
use domain_pricing::PricingProvider;

/// Seed catalogue for the common VM sizes; the SKU catalogue refresh
/// replaces this out of band in production deployments
pub fn default_sku_catalog() -> SkuCatalog {
    [
        ("Standard_B1s", "standardBSFamily", 1),
        ("Standard_B2s", "standardBSFamily", 2),
        ("Standard_D2s_v3", "standardDSv3Family", 2),
        ("Standard_D4s_v3", "standardDSv3Family", 4),
        ("Standard_D8s_v3", "standardDSv3Family", 8),
        ("Standard_D16s_v3", "standardDSv3Family", 16),
        ("Standard_D32s_v3", "standardDSv3Family", 32),
        ("Standard_D2s_v5", "standardDSv5Family", 2),
        ("Standard_D4s_v5", "standardDSv5Family", 4),
        ("Standard_D8s_v5", "standardDSv5Family", 8),
        ("Standard_D2ads_v5", "standardDADSv5Family", 2),
        ("Standard_D4ads_v5", "standardDADSv5Family", 4),
        ("Standard_D64ads_v5", "standardDADSv5Family", 64),
        ("Standard_E2s_v3", "standardESv3Family", 2),
        ("Standard_E4s_v3", "standardESv3Family", 4),
        ("Standard_E8s_v3", "standardESv3Family", 8),
        ("Standard_F2s_v2", "standardFSv2Family", 2),
        ("Standard_F4s_v2", "standardFSv2Family", 4),
        ("Standard_F8s_v2", "standardFSv2Family", 8),
        ("Standard_NV8as_v4", "standardNVasv4Family", 8),
        ("Standard_NV16as_v4", "standardNVasv4Family", 16),
        ("Standard_NV24as_v4", "standardNVasv4Family", 24),
    ]
    .into_iter()
    .map(|(name, family, vcpus)| Sku::new(name, family, vcpus))
    .collect()
}

/// One candidate per catalogued SKU, with an offering per zone and
/// capacity type. Availability is derived here, at arbitration time, from
/// the live cache.
pub fn build_instance_types(
    catalog: &SkuCatalog,
    pricing: &PricingProvider,
    cache: &UnavailableOfferings,
    zones: &[String],
) -> Vec<InstanceType> {
    catalog
        .iter()
        .map(|sku| {
            let mut instance_type = InstanceType::new(&sku.name, capacity_for(sku))
                .with_requirements(
                    Requirements::new()
                        .with(INSTANCE_TYPE_LABEL, [sku.name.as_str()])
                        .with(ZONE_LABEL, zones.iter().map(String::as_str)),
                );

            for zone in zones {
                if let Some(price) = pricing.on_demand_price(&sku.name) {
                    instance_type = instance_type.with_offering(offering(
                        sku,
                        cache,
                        CapacityType::OnDemand,
                        zone,
                        price,
                    ));
                }
                if let Some(price) = pricing.spot_price(&sku.name) {
                    instance_type = instance_type.with_offering(offering(
                        sku,
                        cache,
                        CapacityType::Spot,
                        zone,
                        price,
                    ));
                }
            }

            instance_type
        })
        .collect()
}

fn offering(
    sku: &Sku,
    cache: &UnavailableOfferings,
    capacity_type: CapacityType,
    zone: &str,
    price: f64,
) -> Offering {
    let offering = Offering::new(capacity_type, zone, price);
    if cache.is_unavailable(sku, zone, capacity_type) {
        offering.unavailable()
    } else {
        offering
    }
}

/// Coarse capacity model: the arbitration core only needs enough to rank
/// and label; exact allocatable figures come from the node once it joins
fn capacity_for(sku: &Sku) -> ResourceCapacity {
    ResourceCapacity {
        cpu_milli: u64::from(sku.vcpus) * 1000,
        memory_mib: u64::from(sku.vcpus) * 4096,
        ephemeral_disk_gib: 128,
    }
}
