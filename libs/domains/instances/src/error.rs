use crate::client::ClientError;
use crate::poller::PollerError;
use thiserror::Error;

pub type InstanceResult<T> = Result<T, InstanceError>;

/// Classified outcome of a failed provisioning attempt.
///
/// Produced by the error classifier (which also mutates the
/// unavailable-offerings cache) and by the orchestration layer itself; the
/// reconciler only looks at `is_retryable`.
#[derive(Debug, Clone, Error)]
pub enum InstanceError {
    #[error("No viable offering for claim '{0}'")]
    NoViableOffering(String),

    /// Regional core quota: no SKU substitution helps, terminal for this
    /// round
    #[error("Insufficient regional capacity: {0}")]
    InsufficientCapacity(String),

    /// Low-priority core quota: all spot purchases blocked for a while
    #[error("Spot core quota exceeded: {0}")]
    SpotQuotaExceeded(String),

    /// Family core quota: other families may still fit
    #[error("SKU family core quota exceeded for {sku}: {message}")]
    FamilyQuotaExceeded { sku: String, message: String },

    #[error("SKU {sku} not available for {capacity_type}: {message}")]
    SkuNotAvailable {
        sku: String,
        capacity_type: String,
        message: String,
    },

    #[error("Zonal allocation failed for {sku} in zone '{zone}': {message}")]
    ZonalAllocationFailed {
        sku: String,
        zone: String,
        message: String,
    },

    #[error("Allocation failed for {sku}: {message}")]
    AllocationFailed { sku: String, message: String },

    #[error("Overconstrained allocation request for {sku} in zone '{zone}': {message}")]
    OverconstrainedZonal {
        sku: String,
        zone: String,
        message: String,
    },

    #[error("Overconstrained allocation request for {sku}: {message}")]
    Overconstrained { sku: String, message: String },

    /// Provisioning error the classifier did not recognise; propagated raw
    #[error("Unclassified provisioning error {code}: {message}")]
    Unclassified { code: String, message: String },

    /// The arbitration inputs were inconsistent (e.g. an instance type
    /// with no SKU catalogue entry)
    #[error(transparent)]
    Offering(#[from] domain_offerings::OfferingError),

    /// The create call itself failed with a non-provisioning error
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Poller gave up: cancellation, retry exhaustion or protocol
    /// violation. No cache effect.
    #[error(transparent)]
    Poller(#[from] PollerError),
}

impl InstanceError {
    /// Whether the reconciler should schedule another attempt, typically
    /// with a different SKU or zone now masked in the cache
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::SpotQuotaExceeded(_)
            | Self::FamilyQuotaExceeded { .. }
            | Self::SkuNotAvailable { .. }
            | Self::ZonalAllocationFailed { .. }
            | Self::AllocationFailed { .. }
            | Self::OverconstrainedZonal { .. }
            | Self::Overconstrained { .. } => true,
            Self::NoViableOffering(_)
            | Self::InsufficientCapacity(_)
            | Self::Unclassified { .. }
            | Self::Offering(_)
            | Self::Client(_)
            | Self::Poller(_) => false,
        }
    }
}
