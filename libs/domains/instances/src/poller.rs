//! Long-running-operation poller.
//!
//! Drives a machine create to a terminal state by repeated GETs. Healthy
//! non-terminal observations (`Creating`, `Updating`) reset the retry
//! budget and backoff so a long-but-progressing operation cannot be killed
//! by intermittent transient errors; indeterminate observations and
//! transient GET failures consume bounded, exponentially backed-off
//! retries.

use crate::client::{ClientError, MachineClient};
use crate::models::{ClusterIdentity, ErrorDetail, ProvisioningState};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Interval between GETs while the operation is progressing
    pub poll_interval: Duration,
    /// First backoff delay after a transient failure
    pub initial_retry_delay: Duration,
    /// Backoff ceiling
    pub max_retry_delay: Duration,
    /// Transient failures tolerated between healthy observations
    pub max_retries: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            initial_retry_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(30),
            max_retries: 10,
        }
    }
}

/// Failure of the polling machinery itself, as opposed to a provisioning
/// error surfaced from Azure. Never causes cache evictions.
#[derive(Debug, Clone, Error)]
pub enum PollerError {
    #[error("Polling canceled")]
    Canceled,

    #[error("Canceled provisioning state")]
    CanceledProvisioning,

    #[error("Retry budget exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// The API broke its own contract (e.g. Failed with no error detail)
    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Non-retryable response {status}: {message}")]
    NonRetryable { status: u16, message: String },
}

/// Polls one machine create to completion
pub struct LroPoller<C: MachineClient> {
    client: Arc<C>,
    config: PollerConfig,
}

impl<C: MachineClient> LroPoller<C> {
    pub fn new(client: Arc<C>, config: PollerConfig) -> Self {
        Self { client, config }
    }

    /// Drive the operation to a terminal state.
    ///
    /// - `Ok(None)`: the machine provisioned successfully.
    /// - `Ok(Some(detail))`: Azure reported a provisioning failure; the
    ///   detail goes to the error classifier.
    /// - `Err(_)`: the polling machinery failed (cancellation, retry
    ///   exhaustion, protocol violation, non-retryable response).
    ///
    /// The first GET is issued immediately, without waiting a poll
    /// interval.
    pub async fn wait_for_terminal(
        &self,
        cluster: &ClusterIdentity,
        machine_name: &str,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Option<ErrorDetail>, PollerError> {
        let mut retries_left = self.config.max_retries;
        let mut delay = self.config.initial_retry_delay;

        loop {
            if *shutdown.borrow() {
                return Err(PollerError::Canceled);
            }

            let observed = tokio::select! {
                result = self.client.get(cluster, machine_name) => result,
                _ = shutdown_signal(&mut shutdown) => return Err(PollerError::Canceled),
            };

            match observed {
                Ok(record) => match record.provisioning_state() {
                    Some(state) if state.is_healthy_non_terminal() => {
                        debug!(machine = machine_name, state = %state, "Provisioning in progress");
                        retries_left = self.config.max_retries;
                        delay = self.config.initial_retry_delay;
                        self.sleep(self.config.poll_interval, &mut shutdown).await?;
                    }
                    Some(ProvisioningState::Succeeded) => {
                        debug!(machine = machine_name, "Provisioning succeeded");
                        return Ok(None);
                    }
                    Some(ProvisioningState::Failed) => {
                        return match record.provisioning_error() {
                            Some(detail) => Ok(Some(detail.clone())),
                            None => Err(PollerError::Protocol(
                                "Failed provisioning state carried no error detail".to_string(),
                            )),
                        };
                    }
                    Some(ProvisioningState::Deleting) => {
                        return Err(PollerError::CanceledProvisioning);
                    }
                    // Creating/Updating handled above; remaining arms are
                    // unreachable for parsed states
                    Some(state) => {
                        return Err(PollerError::Protocol(format!(
                            "Unhandled provisioning state {state}"
                        )));
                    }
                    None => {
                        let raw = record
                            .properties
                            .provisioning_state
                            .clone()
                            .unwrap_or_else(|| "<nil>".to_string());
                        warn!(machine = machine_name, state = %raw, "Indeterminate provisioning state");
                        self.consume_retry(
                            &mut retries_left,
                            &mut delay,
                            &mut shutdown,
                            format!("indeterminate provisioning state '{raw}'"),
                        )
                        .await?;
                    }
                },
                Err(error) if error.is_transient() => {
                    warn!(machine = machine_name, error = %error, "Transient GET failure");
                    self.consume_retry(&mut retries_left, &mut delay, &mut shutdown, error.to_string())
                        .await?;
                }
                Err(error) => {
                    let (status, message) = match error {
                        ClientError::Response { status, message, .. } => (status, message),
                        // Transport errors are always transient and were
                        // handled above; this arm exists for exhaustiveness
                        ClientError::Transport(message) => (0, message),
                    };
                    return Err(PollerError::NonRetryable { status, message });
                }
            }
        }
    }

    /// Burn one retry, sleeping the current backoff delay and doubling it
    /// up to the ceiling
    async fn consume_retry(
        &self,
        retries_left: &mut u32,
        delay: &mut Duration,
        shutdown: &mut watch::Receiver<bool>,
        last_error: String,
    ) -> Result<(), PollerError> {
        if *retries_left == 0 {
            return Err(PollerError::RetriesExhausted {
                attempts: self.config.max_retries,
                last_error,
            });
        }
        *retries_left -= 1;
        self.sleep(*delay, shutdown).await?;
        *delay = (*delay * 2).min(self.config.max_retry_delay);
        Ok(())
    }

    async fn sleep(
        &self,
        duration: Duration,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), PollerError> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = shutdown_signal(shutdown) => Err(PollerError::Canceled),
        }
    }
}

/// Resolves when shutdown is requested or the sender is gone
async fn shutdown_signal(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockMachineClient;
    use crate::models::{MachineProperties, MachineRecord, MachineStatus};

    fn cluster() -> ClusterIdentity {
        ClusterIdentity {
            resource_group: "rg-nodes".to_string(),
            cluster_name: "prod-cluster".to_string(),
            agent_pool: "nodepool1".to_string(),
        }
    }

    fn record(state: Option<&str>) -> MachineRecord {
        MachineRecord {
            name: "m1".to_string(),
            properties: MachineProperties {
                provisioning_state: state.map(str::to_string),
                ..Default::default()
            },
        }
    }

    fn failed_record(detail: Option<ErrorDetail>) -> MachineRecord {
        MachineRecord {
            name: "m1".to_string(),
            properties: MachineProperties {
                provisioning_state: Some("Failed".to_string()),
                status: Some(MachineStatus {
                    provisioning_error: detail,
                }),
                ..Default::default()
            },
        }
    }

    fn fast_config(max_retries: u32) -> PollerConfig {
        PollerConfig {
            poll_interval: Duration::from_millis(10),
            initial_retry_delay: Duration::from_millis(5),
            max_retry_delay: Duration::from_millis(40),
            max_retries,
        }
    }

    fn poller(client: MockMachineClient, max_retries: u32) -> LroPoller<MockMachineClient> {
        LroPoller::new(Arc::new(client), fast_config(max_retries))
    }

    fn no_shutdown() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_performs_one_get() {
        let mut client = MockMachineClient::new();
        client
            .expect_get()
            .times(1)
            .returning(|_, _| Ok(record(Some("Succeeded"))));

        let (_tx, rx) = no_shutdown();
        let result = poller(client, 3)
            .wait_for_terminal(&cluster(), "m1", rx)
            .await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_canceled_before_first_poll() {
        let mut client = MockMachineClient::new();
        client.expect_get().times(0);

        let (tx, rx) = watch::channel(true);
        let result = poller(client, 3)
            .wait_for_terminal(&cluster(), "m1", rx)
            .await;
        drop(tx);

        assert!(matches!(result, Err(PollerError::Canceled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_backoff() {
        let mut client = MockMachineClient::new();
        client
            .expect_get()
            .returning(|_, _| Ok(record(Some("Creating"))));

        let (tx, rx) = watch::channel(false);
        let poller = poller(client, 3);
        let cluster = cluster();

        let handle = tokio::spawn(async move {
            poller.wait_for_terminal(&cluster, "m1", rx).await
        });
        tokio::time::sleep(Duration::from_millis(2)).await;
        tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("poller did not observe cancellation")
            .unwrap();
        assert!(matches!(result, Err(PollerError::Canceled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_with_detail_returns_provisioning_error() {
        let mut client = MockMachineClient::new();
        client.expect_get().times(1).returning(|_, _| {
            Ok(failed_record(Some(ErrorDetail::new(
                "ZonalAllocationFailed",
                "no capacity",
            ))))
        });

        let (_tx, rx) = no_shutdown();
        let result = poller(client, 3)
            .wait_for_terminal(&cluster(), "m1", rx)
            .await;
        let detail = result.unwrap().expect("expected provisioning error");
        assert_eq!(detail.code, "ZonalAllocationFailed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_without_detail_is_protocol_error() {
        let mut client = MockMachineClient::new();
        client
            .expect_get()
            .times(1)
            .returning(|_, _| Ok(failed_record(None)));

        let (_tx, rx) = no_shutdown();
        let result = poller(client, 3)
            .wait_for_terminal(&cluster(), "m1", rx)
            .await;
        assert!(matches!(result, Err(PollerError::Protocol(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleting_is_canceled_provisioning() {
        let mut client = MockMachineClient::new();
        client
            .expect_get()
            .times(1)
            .returning(|_, _| Ok(record(Some("Deleting"))));

        let (_tx, rx) = no_shutdown();
        let result = poller(client, 3)
            .wait_for_terminal(&cluster(), "m1", rx)
            .await;
        assert!(matches!(result, Err(PollerError::CanceledProvisioning)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_status_fails_immediately() {
        for status in [401u16, 403, 404] {
            let mut client = MockMachineClient::new();
            client
                .expect_get()
                .times(1)
                .returning(move |_, _| Err(ClientError::response(status, "Denied", "denied")));

            let (_tx, rx) = no_shutdown();
            let result = poller(client, 3)
                .wait_for_terminal(&cluster(), "m1", rx)
                .await;
            assert!(
                matches!(result, Err(PollerError::NonRetryable { status: s, .. }) if s == status)
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_consume_bounded_retries() {
        let mut client = MockMachineClient::new();
        // max_retries = 3 tolerates exactly 3 failures after the first
        // GET; the 4th failing GET exhausts the budget
        client
            .expect_get()
            .times(4)
            .returning(|_, _| Err(ClientError::response(503, "ServerBusy", "busy")));

        let (_tx, rx) = no_shutdown();
        let result = poller(client, 3)
            .wait_for_terminal(&cluster(), "m1", rx)
            .await;
        assert!(matches!(
            result,
            Err(PollerError::RetriesExhausted { attempts: 3, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_nil_state_retries_then_exhausts() {
        let mut client = MockMachineClient::new();
        client.expect_get().times(3).returning(|_, _| Ok(record(None)));

        let (_tx, rx) = no_shutdown();
        let result = poller(client, 2)
            .wait_for_terminal(&cluster(), "m1", rx)
            .await;
        assert!(matches!(result, Err(PollerError::RetriesExhausted { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecognised_state_retries_then_exhausts() {
        let mut client = MockMachineClient::new();
        client
            .expect_get()
            .times(3)
            .returning(|_, _| Ok(record(Some("Migrating"))));

        let (_tx, rx) = no_shutdown();
        let result = poller(client, 2)
            .wait_for_terminal(&cluster(), "m1", rx)
            .await;
        assert!(matches!(result, Err(PollerError::RetriesExhausted { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_healthy_observation_resets_retry_budget() {
        let mut client = MockMachineClient::new();
        let mut call = 0u32;
        // With max_retries = 2: two transient failures leave the budget
        // empty, the healthy observation refills it, two more failures
        // spend it again, then success. Without reset-on-progress the
        // fourth call would already exhaust.
        client.expect_get().times(6).returning(move |_, _| {
            call += 1;
            match call {
                1 | 2 | 4 | 5 => Err(ClientError::response(500, "InternalError", "boom")),
                3 => Ok(record(Some("Creating"))),
                _ => Ok(record(Some("Succeeded"))),
            }
        });

        let (_tx, rx) = no_shutdown();
        let result = poller(client, 2)
            .wait_for_terminal(&cluster(), "m1", rx)
            .await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_then_terminal_failure() {
        let mut client = MockMachineClient::new();
        let mut call = 0u32;
        client.expect_get().times(3).returning(move |_, _| {
            call += 1;
            match call {
                1 => Ok(record(Some("Creating"))),
                2 => Ok(record(Some("Updating"))),
                _ => Ok(failed_record(Some(ErrorDetail::new(
                    "AllocationFailed",
                    "no capacity",
                )))),
            }
        });

        let (_tx, rx) = no_shutdown();
        let result = poller(client, 3)
            .wait_for_terminal(&cluster(), "m1", rx)
            .await;
        let detail = result.unwrap().expect("expected provisioning error");
        assert_eq!(detail.code, "AllocationFailed");
    }
}
