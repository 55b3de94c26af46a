//! Instances Domain
//!
//! Turns one abstract node claim into one running Azure machine:
//!
//! ```text
//! ┌──────────────┐
//! │  Reconciler  │  ← per-claim timeout, outcome vocabulary
//! └──────┬───────┘
//!        │
//! ┌──────▼───────────┐
//! │ InstanceService  │  ← arbitrate, create, poll, classify
//! └──┬───────┬───────┘
//!    │       │
//! ┌──▼────┐ ┌▼──────────────┐
//! │Poller │ │ErrorClassifier│  ← LRO state machine / cache mutations
//! └──┬────┘ └───────────────┘
//!    │
//! ┌──▼───────────┐
//! │MachineClient │  ← Azure machine API seam (trait)
//! └──────────────┘
//! ```

pub mod classify;
pub mod client;
pub mod error;
pub mod handlers;
pub mod models;
pub mod poller;
pub mod reconciler;
pub mod service;

// Re-export commonly used types
pub use classify::{ClassifyContext, ErrorClassifier, ErrorView, ResponseErrorView};
pub use client::{ClientError, MachineClient};
pub use error::{InstanceError, InstanceResult};
pub use models::{
    ClusterIdentity, ErrorDetail, LroHandle, MachineRecord, MachineSpec, ProvisionedMachine,
    ProvisioningState,
};
pub use poller::{LroPoller, PollerConfig, PollerError};
pub use reconciler::{ClaimQueue, ReconcileOutcome, Reconciler};
pub use service::InstanceService;
