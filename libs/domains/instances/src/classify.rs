//! Error classifier.
//!
//! Maps Azure provisioning errors to cache mutations and classified error
//! kinds. Azure hands back two shapes for the same failures: typed
//! response errors from SDK calls and the `ErrorDetail` struct from the
//! managed-agent-pool path. Both are viewed through [`ErrorView`] and run
//! against one ordered matcher table; first match wins. The handler
//! functions are shared between the two instantiations, and a test pins
//! their identities so the shapes cannot drift apart.

use crate::client::ClientError;
use crate::error::InstanceError;
use crate::models::ErrorDetail;
use domain_offerings::{CapacityType, InstanceType, Sku, UnavailableOfferings};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

// Azure error codes, matched exactly
pub const SKU_NOT_AVAILABLE_CODE: &str = "SkuNotAvailable";
pub const ZONAL_ALLOCATION_FAILED_CODE: &str = "ZonalAllocationFailed";
pub const ALLOCATION_FAILED_CODE: &str = "AllocationFailed";
pub const OVERCONSTRAINED_ZONAL_CODE: &str = "OverconstrainedZonalAllocationRequest";
pub const OVERCONSTRAINED_CODE: &str = "OverconstrainedAllocationRequest";

// Message cues, matched by substring. These track Azure response text and
// must stay bit-exact.
pub const LOW_PRIORITY_QUOTA_CUE: &str = "LowPriorityCores quota";
pub const FAMILY_QUOTA_CUE: &str = "Family Cores quota";
pub const ZERO_LIMIT_CUE: &str = "Current Limit: 0";
pub const REGIONAL_QUOTA_CUE: &str = "Total Regional Cores quota";

/// Quota-driven marks: quota windows do not relax within minutes
const QUOTA_TTL: Duration = Duration::from_secs(60 * 60);

/// Allocation failures typically recover within the hour
const ALLOCATION_FAILURE_TTL: Duration = Duration::from_secs(60 * 60);

/// Spot SKU reported outright unavailable
const SKU_UNAVAILABLE_SPOT_TTL: Duration = Duration::from_secs(60 * 60);

/// On-demand SKU unavailability lingers; long enough for operators to
/// surface the problem without permanently blinding the autoscaler
const SKU_UNAVAILABLE_ON_DEMAND_TTL: Duration = Duration::from_secs(23 * 60 * 60);

/// Uniform view over the two Azure error shapes
pub trait ErrorView {
    fn code(&self) -> &str;
    fn message(&self) -> &str;
}

impl ErrorView for ErrorDetail {
    fn code(&self) -> &str {
        &self.code
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Adapter over typed response errors from SDK calls
pub struct ResponseErrorView<'a>(pub &'a ClientError);

impl ErrorView for ResponseErrorView<'_> {
    fn code(&self) -> &str {
        match self.0 {
            ClientError::Response { code, .. } => code,
            ClientError::Transport(_) => "",
        }
    }

    fn message(&self) -> &str {
        match self.0 {
            ClientError::Response { message, .. } => message,
            ClientError::Transport(message) => message,
        }
    }
}

/// What the failure was about: the attempted launch
#[derive(Debug, Clone, Copy)]
pub struct ClassifyContext<'a> {
    pub sku: &'a Sku,
    pub instance_type: &'a InstanceType,
    pub zone: &'a str,
    pub capacity_type: CapacityType,
}

type MatchFn = fn(&ClassifyContext, &dyn ErrorView) -> bool;
type HandleFn = fn(&UnavailableOfferings, &ClassifyContext, &dyn ErrorView) -> InstanceError;

struct Matcher {
    kind: &'static str,
    matches: MatchFn,
    handle: HandleFn,
}

/// Ordered matcher table; first match wins
fn matcher_table() -> Vec<Matcher> {
    vec![
        Matcher {
            kind: "LowPriorityQuota",
            matches: match_low_priority_quota,
            handle: handle_low_priority_quota,
        },
        Matcher {
            kind: "SKUFamilyQuota",
            matches: match_family_quota,
            handle: handle_family_quota,
        },
        Matcher {
            kind: "SKUNotAvailable",
            matches: match_sku_not_available,
            handle: handle_sku_not_available,
        },
        Matcher {
            kind: "ZonalAllocationFailure",
            matches: match_zonal_allocation_failure,
            handle: handle_zonal_allocation_failure,
        },
        Matcher {
            kind: "AllocationFailure",
            matches: match_allocation_failure,
            handle: handle_allocation_failure,
        },
        Matcher {
            kind: "OverconstrainedZonal",
            matches: match_overconstrained_zonal,
            handle: handle_overconstrained_zonal,
        },
        Matcher {
            kind: "Overconstrained",
            matches: match_overconstrained,
            handle: handle_overconstrained,
        },
        Matcher {
            kind: "RegionalQuota",
            matches: match_regional_quota,
            handle: handle_regional_quota,
        },
    ]
}

fn match_low_priority_quota(ctx: &ClassifyContext, error: &dyn ErrorView) -> bool {
    ctx.capacity_type == CapacityType::Spot && error.message().contains(LOW_PRIORITY_QUOTA_CUE)
}

fn match_family_quota(_ctx: &ClassifyContext, error: &dyn ErrorView) -> bool {
    error.message().contains(FAMILY_QUOTA_CUE)
}

fn match_sku_not_available(_ctx: &ClassifyContext, error: &dyn ErrorView) -> bool {
    error.code() == SKU_NOT_AVAILABLE_CODE
}

fn match_zonal_allocation_failure(_ctx: &ClassifyContext, error: &dyn ErrorView) -> bool {
    error.code() == ZONAL_ALLOCATION_FAILED_CODE
}

fn match_allocation_failure(_ctx: &ClassifyContext, error: &dyn ErrorView) -> bool {
    error.code() == ALLOCATION_FAILED_CODE
}

fn match_overconstrained_zonal(_ctx: &ClassifyContext, error: &dyn ErrorView) -> bool {
    error.code() == OVERCONSTRAINED_ZONAL_CODE
}

fn match_overconstrained(_ctx: &ClassifyContext, error: &dyn ErrorView) -> bool {
    error.code() == OVERCONSTRAINED_CODE
}

fn match_regional_quota(_ctx: &ClassifyContext, error: &dyn ErrorView) -> bool {
    error.message().contains(REGIONAL_QUOTA_CUE)
}

/// Spot core quota: mask every spot offering region-wide
fn handle_low_priority_quota(
    cache: &UnavailableOfferings,
    _ctx: &ClassifyContext,
    error: &dyn ErrorView,
) -> InstanceError {
    cache.mark_spot_unavailable_with_ttl(QUOTA_TTL);
    InstanceError::SpotQuotaExceeded(error.message().to_string())
}

/// Family core quota: mask every offering of this instance type for the
/// attempted capacity type. A hard zero limit and a plain exhaustion both
/// get the quota TTL; for records a parallel claim already planted, the
/// mark acts as a TTL refresh.
fn handle_family_quota(
    cache: &UnavailableOfferings,
    ctx: &ClassifyContext,
    error: &dyn ErrorView,
) -> InstanceError {
    let reason = if error.message().contains(ZERO_LIMIT_CUE) {
        "family quota limit zero"
    } else {
        "family quota exhausted"
    };
    for offering in &ctx.instance_type.offerings {
        if offering.capacity_type == ctx.capacity_type {
            cache.mark_unavailable_with_ttl(
                reason,
                &ctx.sku.name,
                &offering.zone,
                ctx.capacity_type,
                QUOTA_TTL,
            );
        }
    }
    InstanceError::FamilyQuotaExceeded {
        sku: ctx.sku.name.clone(),
        message: error.message().to_string(),
    }
}

/// SKU withdrawn for this capacity type: mask it across all its zones
fn handle_sku_not_available(
    cache: &UnavailableOfferings,
    ctx: &ClassifyContext,
    error: &dyn ErrorView,
) -> InstanceError {
    let ttl = match ctx.capacity_type {
        CapacityType::Spot => SKU_UNAVAILABLE_SPOT_TTL,
        CapacityType::OnDemand => SKU_UNAVAILABLE_ON_DEMAND_TTL,
    };
    for offering in &ctx.instance_type.offerings {
        if offering.capacity_type == ctx.capacity_type {
            cache.mark_unavailable_with_ttl(
                "sku not available",
                &ctx.sku.name,
                &offering.zone,
                ctx.capacity_type,
                ttl,
            );
        }
    }
    InstanceError::SkuNotAvailable {
        sku: ctx.sku.name.clone(),
        capacity_type: ctx.capacity_type.to_string(),
        message: error.message().to_string(),
    }
}

/// Zone out of capacity for this size and up: mask the whole family in
/// this zone, both capacity types, at the failing vCPU count. Azure quota
/// is CPU-denominated; if this size failed, larger sizes in the family
/// cannot succeed, but smaller ones may.
fn handle_zonal_allocation_failure(
    cache: &UnavailableOfferings,
    ctx: &ClassifyContext,
    error: &dyn ErrorView,
) -> InstanceError {
    for capacity_type in [CapacityType::OnDemand, CapacityType::Spot] {
        cache.mark_family_unavailable_at_cpu(
            &ctx.sku.family,
            ctx.zone,
            capacity_type,
            ctx.sku.vcpus,
            ALLOCATION_FAILURE_TTL,
        );
    }
    InstanceError::ZonalAllocationFailed {
        sku: ctx.sku.name.clone(),
        zone: ctx.zone.to_string(),
        message: error.message().to_string(),
    }
}

/// Region-wide allocation failure for this SKU: mask it in every zone it
/// offers, both capacity types
fn handle_allocation_failure(
    cache: &UnavailableOfferings,
    ctx: &ClassifyContext,
    error: &dyn ErrorView,
) -> InstanceError {
    for zone in ctx.instance_type.zones() {
        for capacity_type in [CapacityType::OnDemand, CapacityType::Spot] {
            cache.mark_unavailable_with_ttl(
                "allocation failure",
                &ctx.sku.name,
                zone,
                capacity_type,
                ALLOCATION_FAILURE_TTL,
            );
        }
    }
    InstanceError::AllocationFailed {
        sku: ctx.sku.name.clone(),
        message: error.message().to_string(),
    }
}

/// The request over-constrained one zone: mask just the attempted tuple
fn handle_overconstrained_zonal(
    cache: &UnavailableOfferings,
    ctx: &ClassifyContext,
    error: &dyn ErrorView,
) -> InstanceError {
    cache.mark_unavailable_with_ttl(
        "overconstrained zonal allocation",
        &ctx.sku.name,
        ctx.zone,
        ctx.capacity_type,
        ALLOCATION_FAILURE_TTL,
    );
    InstanceError::OverconstrainedZonal {
        sku: ctx.sku.name.clone(),
        zone: ctx.zone.to_string(),
        message: error.message().to_string(),
    }
}

/// The request over-constrained every zone: mask this capacity type in
/// each zone the instance type offers
fn handle_overconstrained(
    cache: &UnavailableOfferings,
    ctx: &ClassifyContext,
    error: &dyn ErrorView,
) -> InstanceError {
    for offering in &ctx.instance_type.offerings {
        if offering.capacity_type == ctx.capacity_type {
            cache.mark_unavailable_with_ttl(
                "overconstrained allocation",
                &ctx.sku.name,
                &offering.zone,
                ctx.capacity_type,
                ALLOCATION_FAILURE_TTL,
            );
        }
    }
    InstanceError::Overconstrained {
        sku: ctx.sku.name.clone(),
        message: error.message().to_string(),
    }
}

/// Regional core quota: no SKU substitution helps, so no cache mutation;
/// bubbles up as insufficient capacity
fn handle_regional_quota(
    _cache: &UnavailableOfferings,
    _ctx: &ClassifyContext,
    error: &dyn ErrorView,
) -> InstanceError {
    InstanceError::InsufficientCapacity(error.message().to_string())
}

/// Runs provisioning errors through the matcher table, mutating the
/// unavailability cache as a side effect. The sole producer of classified
/// errors; callers forward without inspecting.
pub struct ErrorClassifier {
    cache: Arc<UnavailableOfferings>,
    matchers: Vec<Matcher>,
}

impl ErrorClassifier {
    /// Classifier instance for typed response errors from SDK calls
    pub fn for_response_errors(cache: Arc<UnavailableOfferings>) -> Self {
        Self {
            cache,
            matchers: matcher_table(),
        }
    }

    /// Classifier instance for agent-pool `ErrorDetail` payloads
    pub fn for_error_details(cache: Arc<UnavailableOfferings>) -> Self {
        Self {
            cache,
            matchers: matcher_table(),
        }
    }

    /// First matching kind mutates the cache and yields the classified
    /// error; `None` when the error is unrecognised (no cache effect).
    pub fn classify(&self, ctx: &ClassifyContext, error: &dyn ErrorView) -> Option<InstanceError> {
        for matcher in &self.matchers {
            if (matcher.matches)(ctx, error) {
                debug!(
                    kind = matcher.kind,
                    sku = %ctx.sku.name,
                    zone = ctx.zone,
                    capacity_type = %ctx.capacity_type,
                    code = error.code(),
                    "Classified provisioning error"
                );
                return Some((matcher.handle)(&self.cache, ctx, error));
            }
        }
        None
    }

    /// Kind names and handler function identities in matcher order; pinned
    /// by the equivalence test across both instantiations
    pub fn handler_identities(&self) -> Vec<(&'static str, usize)> {
        self.matchers
            .iter()
            .map(|m| (m.kind, m.handle as usize))
            .collect()
    }
}
