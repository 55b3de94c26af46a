//! Unavailable-offerings cache.
//!
//! Records which `(SKU, zone, capacity-type)` tuples must be skipped by the
//! arbiter, at three granularities:
//!
//! - instance-grained: one SKU in one zone for one capacity type;
//! - family-grained: a whole SKU family in one zone, optionally bounded
//!   below by a vCPU threshold (Azure quota is CPU-denominated, so a
//!   32-vCPU failure implies a 64-vCPU failure in the same family);
//! - spot-wide: every spot offering at once.
//!
//! Family records obey monotonic restrictiveness: within a TTL window a
//! record may only get stricter. The sequence number advances on every
//! eviction so downstream price orderings know when to rebuild.

use crate::models::{CapacityType, Sku};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default TTL for instance-grained marks with no more specific policy.
/// Error-specific TTLs are chosen by the error classifier.
pub const UNAVAILABLE_TTL_DEFAULT: Duration = Duration::from_secs(3 * 60);

/// Family record threshold meaning "the entire family is blocked"
const WHOLE_FAMILY: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct OfferingKey {
    capacity_type: CapacityType,
    sku: String,
    zone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FamilyKey {
    capacity_type: CapacityType,
    family: String,
    zone: String,
}

#[derive(Debug, Clone)]
struct FamilyRecord {
    /// `WHOLE_FAMILY` (-1) blocks everything; a non-negative value blocks
    /// SKUs whose vCPU count is >= the threshold
    cpu_threshold: i64,
    deadline: Instant,
}

impl FamilyRecord {
    /// Strictness order: -1 beats any threshold; lower thresholds beat
    /// higher ones.
    fn is_at_least_as_strict_as(&self, threshold: i64) -> bool {
        if self.cpu_threshold == WHOLE_FAMILY {
            return true;
        }
        threshold != WHOLE_FAMILY && self.cpu_threshold <= threshold
    }
}

#[derive(Debug, Default)]
struct Inner {
    offerings: HashMap<OfferingKey, Instant>,
    families: HashMap<FamilyKey, FamilyRecord>,
    spot_wide: Option<Instant>,
}

/// Two-tier TTL cache of offerings the arbiter must skip.
///
/// Shared process-wide by all reconcilers; pass it explicitly through
/// constructors.
#[derive(Debug, Default)]
pub struct UnavailableOfferings {
    inner: Mutex<Inner>,
    seq: AtomicU64,
}

/// Serializable view of the live cache contents, for debug surfaces
#[derive(Debug, Clone, Serialize)]
pub struct UnavailableSnapshot {
    pub offerings: Vec<OfferingEntry>,
    pub families: Vec<FamilyEntry>,
    pub spot_wide_remaining_secs: Option<u64>,
    pub seq_num: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OfferingEntry {
    pub capacity_type: CapacityType,
    pub sku: String,
    pub zone: String,
    pub remaining_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FamilyEntry {
    pub capacity_type: CapacityType,
    pub family: String,
    pub zone: String,
    pub cpu_threshold: i64,
    pub remaining_secs: u64,
}

impl UnavailableOfferings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic sequence number; strictly increases on every eviction and
    /// on flush, never on insertion. Consumers compare a cached snapshot
    /// against this to decide when to rebuild price-ordered candidate
    /// lists.
    pub fn seq_num(&self) -> u64 {
        self.seq.load(Ordering::Acquire)
    }

    /// True when any live record masks the given offering:
    /// the spot-wide entry (spot queries only), an instance-grained record,
    /// or a family-grained record whose threshold covers this SKU's vCPUs.
    pub fn is_unavailable(&self, sku: &Sku, zone: &str, capacity_type: CapacityType) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        self.purge_expired(&mut inner, now);

        if capacity_type == CapacityType::Spot && inner.spot_wide.is_some() {
            return true;
        }

        let offering_key = OfferingKey {
            capacity_type,
            sku: sku.name.clone(),
            zone: zone.to_string(),
        };
        if inner.offerings.contains_key(&offering_key) {
            return true;
        }

        let family_key = FamilyKey {
            capacity_type,
            family: sku.family.clone(),
            zone: zone.to_string(),
        };
        match inner.families.get(&family_key) {
            Some(record) => {
                record.cpu_threshold == WHOLE_FAMILY
                    || record.cpu_threshold <= i64::from(sku.vcpus)
            }
            None => false,
        }
    }

    /// Insert or refresh an instance-grained record
    pub fn mark_unavailable_with_ttl(
        &self,
        reason: &str,
        sku_name: &str,
        zone: &str,
        capacity_type: CapacityType,
        ttl: Duration,
    ) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        self.purge_expired(&mut inner, now);

        debug!(
            reason = reason,
            sku = sku_name,
            zone = zone,
            capacity_type = %capacity_type,
            ttl_secs = ttl.as_secs(),
            "Marking offering unavailable"
        );

        inner.offerings.insert(
            OfferingKey {
                capacity_type,
                sku: sku_name.to_string(),
                zone: zone.to_string(),
            },
            now + ttl,
        );
    }

    /// Insert or refresh the spot-wide entry masking every spot offering
    pub fn mark_spot_unavailable_with_ttl(&self, ttl: Duration) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        self.purge_expired(&mut inner, now);

        debug!(ttl_secs = ttl.as_secs(), "Marking spot capacity unavailable region-wide");
        inner.spot_wide = Some(now + ttl);
    }

    /// Block every SKU of `family` in `zone` whose vCPU count is at least
    /// `cpu_threshold`. No-op when a live record is already at least as
    /// strict; an accepted write refreshes the TTL.
    pub fn mark_family_unavailable_at_cpu(
        &self,
        family: &str,
        zone: &str,
        capacity_type: CapacityType,
        cpu_threshold: u32,
        ttl: Duration,
    ) {
        self.mark_family(family, zone, capacity_type, i64::from(cpu_threshold), ttl);
    }

    /// Block every SKU of `family` in `zone` regardless of size
    pub fn mark_family_unavailable(
        &self,
        family: &str,
        zone: &str,
        capacity_type: CapacityType,
        ttl: Duration,
    ) {
        self.mark_family(family, zone, capacity_type, WHOLE_FAMILY, ttl);
    }

    fn mark_family(
        &self,
        family: &str,
        zone: &str,
        capacity_type: CapacityType,
        cpu_threshold: i64,
        ttl: Duration,
    ) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        self.purge_expired(&mut inner, now);

        let key = FamilyKey {
            capacity_type,
            family: family.to_string(),
            zone: zone.to_string(),
        };

        if let Some(existing) = inner.families.get(&key) {
            if existing.is_at_least_as_strict_as(cpu_threshold) {
                debug!(
                    family = family,
                    zone = zone,
                    capacity_type = %capacity_type,
                    existing_threshold = existing.cpu_threshold,
                    requested_threshold = cpu_threshold,
                    "Discarding less restrictive family mark"
                );
                return;
            }
        }

        debug!(
            family = family,
            zone = zone,
            capacity_type = %capacity_type,
            cpu_threshold = cpu_threshold,
            ttl_secs = ttl.as_secs(),
            "Marking SKU family unavailable"
        );

        inner.families.insert(
            key,
            FamilyRecord {
                cpu_threshold,
                deadline: now + ttl,
            },
        );
    }

    /// Wipe every record and advance the sequence number
    pub fn flush(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.offerings.clear();
        inner.families.clear();
        inner.spot_wide = None;
        self.seq.fetch_add(1, Ordering::Release);
    }

    /// Serializable view of the live contents, for debug endpoints
    pub fn snapshot(&self) -> UnavailableSnapshot {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        self.purge_expired(&mut inner, now);

        let offerings = inner
            .offerings
            .iter()
            .map(|(key, deadline)| OfferingEntry {
                capacity_type: key.capacity_type,
                sku: key.sku.clone(),
                zone: key.zone.clone(),
                remaining_secs: deadline.saturating_duration_since(now).as_secs(),
            })
            .collect();

        let families = inner
            .families
            .iter()
            .map(|(key, record)| FamilyEntry {
                capacity_type: key.capacity_type,
                family: key.family.clone(),
                zone: key.zone.clone(),
                cpu_threshold: record.cpu_threshold,
                remaining_secs: record.deadline.saturating_duration_since(now).as_secs(),
            })
            .collect();

        UnavailableSnapshot {
            offerings,
            families,
            spot_wide_remaining_secs: inner
                .spot_wide
                .map(|deadline| deadline.saturating_duration_since(now).as_secs()),
            seq_num: self.seq_num(),
        }
    }

    /// Drop expired records, bumping the sequence number once per evicted
    /// record. Runs under the lock on every query and mutation, so the
    /// bump is observable only after the record stops matching.
    fn purge_expired(&self, inner: &mut Inner, now: Instant) {
        let mut evicted = 0u64;

        inner.offerings.retain(|_, deadline| {
            let live = *deadline > now;
            if !live {
                evicted += 1;
            }
            live
        });

        inner.families.retain(|_, record| {
            let live = record.deadline > now;
            if !live {
                evicted += 1;
            }
            live
        });

        if let Some(deadline) = inner.spot_wide {
            if deadline <= now {
                inner.spot_wide = None;
                evicted += 1;
            }
        }

        if evicted > 0 {
            self.seq.fetch_add(evicted, Ordering::Release);
        }
    }
}
