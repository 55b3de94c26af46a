//! Offerings Domain
//!
//! This module models what can be bought from the Azure compute control
//! plane and which of it is currently worth trying to buy:
//!
//! ```text
//! ┌──────────────┐
//! │   Arbiter    │  ← price ordering, pre-launch filter, SKU/zone pick
//! └──────┬───────┘
//!        │
//! ┌──────▼───────────────┐
//! │ UnavailableOfferings │  ← two-tier TTL cache with sequence number
//! └──────┬───────────────┘
//!        │
//! ┌──────▼───────┐
//! │    Models    │  ← SKUs, offerings, instance types, requirements
//! └──────────────┘
//! ```

pub mod arbiter;
pub mod cache;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use arbiter::{Arbiter, Selection};
pub use cache::{UnavailableOfferings, UnavailableSnapshot, UNAVAILABLE_TTL_DEFAULT};
pub use error::{OfferingError, OfferingResult};
pub use models::{
    CapacityType, InstanceType, NodeClaim, Offering, Requirements, ResourceCapacity, Sku,
    SkuCatalog, CAPACITY_TYPE_LABEL, INSTANCE_TYPE_LABEL, ZONE_LABEL,
};
