//! Compiled-in price tables.
//!
//! Sovereign and air-gapped clouds have no public retail catalogue, and
//! public-cloud deployments need something to serve before the first fetch
//! lands. The tables are a coarse snapshot; the refresher replaces them as
//! soon as live data arrives.

use crate::models::RegionalPrices;

/// Sentinel for SKUs the catalogue is known to omit: high enough that the
/// arbiter never prefers them, but still purchasable when a claim names
/// them explicitly.
pub const MISSING_PRICE_SENTINEL: f64 = 999.0;

/// SKUs known to be absent from the retail catalogue
pub(crate) const MISSING_PRICE_SKUS: &[&str] = &[
    "Standard_A2",
    "Standard_D1",
    "Standard_DC2s",
    "Standard_DC4s",
    "Standard_M64",
    "Standard_M64m",
];

const STATIC_ON_DEMAND: &[(&str, f64)] = &[
    ("Standard_B1s", 0.0104),
    ("Standard_B2s", 0.0416),
    ("Standard_D2s_v3", 0.096),
    ("Standard_D4s_v3", 0.192),
    ("Standard_D8s_v3", 0.384),
    ("Standard_D16s_v3", 0.768),
    ("Standard_D32s_v3", 1.536),
    ("Standard_D2s_v5", 0.096),
    ("Standard_D4s_v5", 0.192),
    ("Standard_D8s_v5", 0.384),
    ("Standard_D2ads_v5", 0.103),
    ("Standard_D4ads_v5", 0.206),
    ("Standard_D64ads_v5", 3.296),
    ("Standard_E2s_v3", 0.126),
    ("Standard_E4s_v3", 0.252),
    ("Standard_E8s_v3", 0.504),
    ("Standard_F2s_v2", 0.085),
    ("Standard_F4s_v2", 0.169),
    ("Standard_F8s_v2", 0.338),
    ("Standard_NV8as_v4", 0.466),
    ("Standard_NV16as_v4", 0.932),
    ("Standard_NV24as_v4", 1.864),
];

const STATIC_SPOT: &[(&str, f64)] = &[
    ("Standard_B1s", 0.0021),
    ("Standard_B2s", 0.0083),
    ("Standard_D2s_v3", 0.0192),
    ("Standard_D4s_v3", 0.0384),
    ("Standard_D8s_v3", 0.0768),
    ("Standard_D16s_v3", 0.1536),
    ("Standard_D32s_v3", 0.3072),
    ("Standard_D2s_v5", 0.0192),
    ("Standard_D4s_v5", 0.0384),
    ("Standard_D8s_v5", 0.0768),
    ("Standard_D2ads_v5", 0.0206),
    ("Standard_D4ads_v5", 0.0412),
    ("Standard_D64ads_v5", 0.6592),
    ("Standard_E2s_v3", 0.0252),
    ("Standard_E4s_v3", 0.0504),
    ("Standard_E8s_v3", 0.1008),
    ("Standard_F2s_v2", 0.017),
    ("Standard_F4s_v2", 0.0338),
    ("Standard_F8s_v2", 0.0676),
    ("Standard_NV8as_v4", 0.0932),
    ("Standard_NV16as_v4", 0.1864),
    ("Standard_NV24as_v4", 0.3728),
];

/// Build the compiled-in snapshot
pub(crate) fn static_prices() -> RegionalPrices {
    let mut prices = RegionalPrices::default();
    for (name, price) in STATIC_ON_DEMAND {
        prices.on_demand.insert((*name).to_string(), *price);
    }
    for (name, price) in STATIC_SPOT {
        prices.spot.insert((*name).to_string(), *price);
    }
    prices
}
