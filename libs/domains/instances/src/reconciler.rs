//! Reconcile adaptor.
//!
//! Bridges the scheduler core to the instance provider: one invocation per
//! unsatisfied node claim, with a per-claim deadline, translating
//! classified errors into the scheduler's retry/fail vocabulary.

use crate::client::MachineClient;
use crate::models::ProvisionedMachine;
use crate::service::InstanceService;
use domain_offerings::{InstanceType, NodeClaim};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// What the scheduler core hears back about one claim
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ReconcileOutcome {
    /// Machine is up; the claim is satisfied
    Provisioned(ProvisionedMachine),
    /// Worth another pass; the cache now masks what just failed
    Retry { reason: String },
    /// Terminal for this round
    Failed { reason: String },
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Claim queue is full")]
    Full,
    #[error("Claim queue is closed")]
    Closed,
}

/// Bounded handoff from claim producers (the HTTP surface, the scheduler
/// core) to reconcile workers
#[derive(Clone)]
pub struct ClaimQueue {
    tx: mpsc::Sender<NodeClaim>,
}

impl ClaimQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<NodeClaim>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Non-blocking submit, used by request handlers
    pub fn try_submit(&self, claim: NodeClaim) -> Result<(), QueueError> {
        self.tx.try_send(claim).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }

    /// Backpressuring submit, used by in-process producers
    pub async fn submit(&self, claim: NodeClaim) -> Result<(), QueueError> {
        self.tx.send(claim).await.map_err(|_| QueueError::Closed)
    }
}

/// Per-claim reconcile pass
pub struct Reconciler<C: MachineClient> {
    service: Arc<InstanceService<C>>,
    claim_timeout: Duration,
}

impl<C: MachineClient> Reconciler<C> {
    pub fn new(service: Arc<InstanceService<C>>, claim_timeout: Duration) -> Self {
        Self {
            service,
            claim_timeout,
        }
    }

    pub fn service(&self) -> &Arc<InstanceService<C>> {
        &self.service
    }

    /// Drive one provisioning attempt under the claim deadline and fold
    /// the result into the scheduler vocabulary
    pub async fn reconcile(
        &self,
        claim: &NodeClaim,
        instance_types: Vec<InstanceType>,
        shutdown: watch::Receiver<bool>,
    ) -> ReconcileOutcome {
        let attempt = self.service.create(claim, instance_types, shutdown);

        match tokio::time::timeout(self.claim_timeout, attempt).await {
            Err(_elapsed) => {
                warn!(claim = %claim.name, "Claim deadline exceeded");
                ReconcileOutcome::Failed {
                    reason: format!(
                        "provisioning exceeded claim deadline of {:?}",
                        self.claim_timeout
                    ),
                }
            }
            Ok(Ok(machine)) => {
                info!(claim = %claim.name, machine = %machine.machine_name, "Claim satisfied");
                ReconcileOutcome::Provisioned(machine)
            }
            Ok(Err(error)) if error.is_retryable() => {
                info!(claim = %claim.name, error = %error, "Claim will be retried");
                ReconcileOutcome::Retry {
                    reason: error.to_string(),
                }
            }
            Ok(Err(error)) => {
                warn!(claim = %claim.name, error = %error, "Claim failed");
                ReconcileOutcome::Failed {
                    reason: error.to_string(),
                }
            }
        }
    }
}
