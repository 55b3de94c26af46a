use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use strum::{Display, EnumString};

/// Scheduling label carrying the capacity type of a node
pub const CAPACITY_TYPE_LABEL: &str = "scheduling.azure.com/capacity-type";

/// Well-known Kubernetes zone topology label
pub const ZONE_LABEL: &str = "topology.kubernetes.io/zone";

/// Well-known Kubernetes instance type label
pub const INSTANCE_TYPE_LABEL: &str = "node.kubernetes.io/instance-type";

/// Purchase model for a virtual machine
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CapacityType {
    #[default]
    OnDemand,
    Spot,
}

/// A virtual machine SKU as reported by the compute catalogue.
///
/// Immutable per refresh. The family is Azure's coarse grouping of related
/// sizes sharing a quota pool; `vcpus` is the quota-relevant core count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    /// Canonical name, e.g. "Standard_D64ads_v5"
    pub name: String,
    /// Family name, e.g. "standardDadsv5Family"
    pub family: String,
    /// vCPU count
    pub vcpus: u32,
}

impl Sku {
    pub fn new(name: impl Into<String>, family: impl Into<String>, vcpus: u32) -> Self {
        Self {
            name: name.into(),
            family: family.into(),
            vcpus,
        }
    }
}

/// Lookup from SKU name to its family and vCPU count.
///
/// A mapping, once learned, is stable for the process lifetime; re-learning
/// an already-known SKU is a no-op.
#[derive(Debug, Clone, Default)]
pub struct SkuCatalog {
    skus: HashMap<String, Sku>,
}

impl SkuCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn learn(&mut self, sku: Sku) {
        self.skus.entry(sku.name.clone()).or_insert(sku);
    }

    pub fn get(&self, name: &str) -> Option<&Sku> {
        self.skus.get(name)
    }

    pub fn require(&self, name: &str) -> crate::error::OfferingResult<&Sku> {
        self.get(name)
            .ok_or_else(|| crate::error::OfferingError::UnknownSku(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sku> {
        self.skus.values()
    }

    pub fn len(&self) -> usize {
        self.skus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skus.is_empty()
    }
}

impl FromIterator<Sku> for SkuCatalog {
    fn from_iter<I: IntoIterator<Item = Sku>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for sku in iter {
            catalog.learn(sku);
        }
        catalog
    }
}

/// One purchasable combination of SKU, zone and capacity type.
///
/// `zone` may be empty in non-zonal regions. `available` is derived at
/// arbitration time from the compute catalogue restrictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offering {
    pub capacity_type: CapacityType,
    pub zone: String,
    pub price: f64,
    pub available: bool,
}

impl Offering {
    pub fn new(capacity_type: CapacityType, zone: impl Into<String>, price: f64) -> Self {
        Self {
            capacity_type,
            zone: zone.into(),
            price,
            available: true,
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

/// Node-relevant resource capacity of a SKU
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCapacity {
    pub cpu_milli: u64,
    pub memory_mib: u64,
    pub ephemeral_disk_gib: u64,
}

/// Multi-valued label constraints.
///
/// A key that is not present places no constraint on that label; an empty
/// value set for a present key admits nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    constraints: BTreeMap<String, BTreeSet<String>>,
}

impl Requirements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style constraint insertion
    pub fn with<I, S>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(key, values);
        self
    }

    pub fn insert<I, S>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.constraints.entry(key.to_string()).or_default();
        for value in values {
            entry.insert(value.into());
        }
    }

    /// True when the key is unconstrained or the value is admitted
    pub fn allows(&self, key: &str, value: &str) -> bool {
        match self.constraints.get(key) {
            None => true,
            Some(values) => values.contains(value),
        }
    }

    pub fn get(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.constraints.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.constraints.contains_key(key)
    }

    /// Shorthand for the capacity-type constraint
    pub fn allows_capacity_type(&self, capacity_type: CapacityType) -> bool {
        self.allows(CAPACITY_TYPE_LABEL, &capacity_type.to_string())
    }

    /// Shorthand for the zone constraint
    pub fn allows_zone(&self, zone: &str) -> bool {
        self.allows(ZONE_LABEL, zone)
    }
}

/// A SKU together with its modeled offerings and scheduling constraints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceType {
    /// SKU name, doubles as the instance type name
    pub name: String,
    pub capacity: ResourceCapacity,
    pub offerings: Vec<Offering>,
    pub requirements: Requirements,
}

impl InstanceType {
    pub fn new(name: impl Into<String>, capacity: ResourceCapacity) -> Self {
        Self {
            name: name.into(),
            capacity,
            offerings: Vec::new(),
            requirements: Requirements::new(),
        }
    }

    pub fn with_offering(mut self, offering: Offering) -> Self {
        self.offerings.push(offering);
        self
    }

    pub fn with_requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }

    /// Every zone that appears in any offering of this instance type
    pub fn zones(&self) -> BTreeSet<&str> {
        self.offerings.iter().map(|o| o.zone.as_str()).collect()
    }

    /// Offerings that are available and admitted by the given requirements
    pub fn compatible_offerings(&self, requirements: &Requirements) -> Vec<&Offering> {
        self.offerings
            .iter()
            .filter(|o| {
                o.available
                    && requirements.allows_capacity_type(o.capacity_type)
                    && requirements.allows_zone(&o.zone)
            })
            .collect()
    }

    /// Price of the cheapest available, requirement-compatible offering.
    ///
    /// Instance types with no such offering rank at positive infinity so
    /// they sort behind everything purchasable.
    pub fn cheapest_compatible_price(&self, requirements: &Requirements) -> f64 {
        self.compatible_offerings(requirements)
            .iter()
            .map(|o| o.price)
            .fold(f64::INFINITY, f64::min)
    }
}

/// An abstract "a node of this shape is needed" directive from the
/// scheduler core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeClaim {
    pub name: String,
    pub requirements: Requirements,
    pub requests: ResourceCapacity,
}

impl NodeClaim {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requirements: Requirements::new(),
            requests: ResourceCapacity::default(),
        }
    }

    pub fn with_requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn with_requests(mut self, requests: ResourceCapacity) -> Self {
        self.requests = requests;
        self
    }
}
