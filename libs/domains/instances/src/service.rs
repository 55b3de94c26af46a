//! Instance provider: one provisioning attempt end-to-end.

use crate::classify::{ClassifyContext, ErrorClassifier, ResponseErrorView};
use crate::client::MachineClient;
use crate::error::{InstanceError, InstanceResult};
use crate::models::{ClusterIdentity, MachineSpec, ProvisionedMachine};
use crate::poller::{LroPoller, PollerConfig};
use domain_offerings::{Arbiter, InstanceType, NodeClaim, Selection, SkuCatalog, UnavailableOfferings};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Orchestrates arbitration, machine create, LRO polling and error
/// classification for a single node claim.
///
/// Shared by all reconcilers; the unavailability cache is the only
/// mutable state and all of its mutations flow through the classifier.
pub struct InstanceService<C: MachineClient> {
    client: Arc<C>,
    cluster: ClusterIdentity,
    cache: Arc<UnavailableOfferings>,
    catalog: Arc<SkuCatalog>,
    /// Classifier over typed response errors (the create call)
    create_classifier: ErrorClassifier,
    /// Classifier over nested provisioning error details (the poller)
    provisioning_classifier: ErrorClassifier,
    poller: LroPoller<C>,
}

impl<C: MachineClient> InstanceService<C> {
    pub fn new(
        client: Arc<C>,
        cluster: ClusterIdentity,
        cache: Arc<UnavailableOfferings>,
        catalog: Arc<SkuCatalog>,
        poller_config: PollerConfig,
    ) -> Self {
        Self {
            poller: LroPoller::new(Arc::clone(&client), poller_config),
            create_classifier: ErrorClassifier::for_response_errors(Arc::clone(&cache)),
            provisioning_classifier: ErrorClassifier::for_error_details(Arc::clone(&cache)),
            client,
            cluster,
            cache,
            catalog,
        }
    }

    pub fn cache(&self) -> &Arc<UnavailableOfferings> {
        &self.cache
    }

    pub fn catalog(&self) -> &Arc<SkuCatalog> {
        &self.catalog
    }

    /// Provision one machine for the claim.
    ///
    /// Candidates arrive pre-filtered on capacity fit by the scheduler
    /// core; arbitration, the create call and polling all happen here.
    /// Classified errors come out of the classifier untouched.
    pub async fn create(
        &self,
        claim: &NodeClaim,
        instance_types: Vec<InstanceType>,
        shutdown: watch::Receiver<bool>,
    ) -> InstanceResult<ProvisionedMachine> {
        let arbiter = Arbiter::new(&self.catalog, Some(&self.cache));
        let Some(selection) = arbiter.select(claim, instance_types) else {
            warn!(claim = %claim.name, "No viable offering");
            return Err(InstanceError::NoViableOffering(claim.name.clone()));
        };

        let spec = MachineSpec {
            machine_name: claim.name.clone(),
            sku_name: selection.instance_type.name.clone(),
            zone: selection.zone.clone(),
            capacity_type: selection.capacity_type,
        };
        info!(
            claim = %claim.name,
            sku = %spec.sku_name,
            zone = %spec.zone,
            capacity_type = %spec.capacity_type,
            "Submitting machine create"
        );

        let handle = match self.client.create_or_update(&self.cluster, &spec).await {
            Ok(handle) => handle,
            Err(error) => {
                return Err(self.classify_create_error(&selection, error)?);
            }
        };

        match self
            .poller
            .wait_for_terminal(&self.cluster, &handle.machine_name, shutdown)
            .await
        {
            Ok(None) => {
                let record = self.client.get(&self.cluster, &handle.machine_name).await?;
                info!(
                    claim = %claim.name,
                    machine = %handle.machine_name,
                    "Machine provisioned"
                );
                Ok(ProvisionedMachine {
                    machine_name: handle.machine_name,
                    resource_group: handle.resource_group,
                    instance_type_name: selection.instance_type.name.clone(),
                    zone: record.properties.zone.unwrap_or(selection.zone),
                    capacity_type: selection.capacity_type,
                })
            }
            Ok(Some(detail)) => {
                let sku = self.catalog.require(&selection.instance_type.name)?;
                let ctx = ClassifyContext {
                    sku,
                    instance_type: &selection.instance_type,
                    zone: &selection.zone,
                    capacity_type: selection.capacity_type,
                };
                match self.provisioning_classifier.classify(&ctx, &detail) {
                    Some(classified) => Err(classified),
                    None => Err(InstanceError::Unclassified {
                        code: detail.code,
                        message: detail.message,
                    }),
                }
            }
            Err(poller_error) => Err(poller_error.into()),
        }
    }

    /// The create call can fail with the same Azure error catalogue as the
    /// poll path, just in the typed response shape
    fn classify_create_error(
        &self,
        selection: &Selection,
        error: crate::client::ClientError,
    ) -> InstanceResult<InstanceError> {
        let sku = self.catalog.require(&selection.instance_type.name)?;
        let ctx = ClassifyContext {
            sku,
            instance_type: &selection.instance_type,
            zone: &selection.zone,
            capacity_type: selection.capacity_type,
        };
        Ok(self
            .create_classifier
            .classify(&ctx, &ResponseErrorView(&error))
            .unwrap_or(InstanceError::Client(error)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockMachineClient;
    use crate::client::ClientError;
    use crate::models::{LroHandle, MachineProperties, MachineRecord};
    use domain_offerings::{
        CapacityType, Offering, Requirements, ResourceCapacity, Sku, CAPACITY_TYPE_LABEL,
    };
    use std::time::Duration;

    fn cluster() -> ClusterIdentity {
        ClusterIdentity {
            resource_group: "rg-nodes".to_string(),
            cluster_name: "prod-cluster".to_string(),
            agent_pool: "nodepool1".to_string(),
        }
    }

    fn catalog() -> Arc<SkuCatalog> {
        Arc::new(
            [
                Sku::new("Standard_D2s_v3", "standardDSv3Family", 2),
                Sku::new("Standard_D4s_v3", "standardDSv3Family", 4),
            ]
            .into_iter()
            .collect(),
        )
    }

    fn candidates() -> Vec<InstanceType> {
        vec![
            InstanceType::new("Standard_D2s_v3", ResourceCapacity::default())
                .with_offering(Offering::new(CapacityType::OnDemand, "westus-1", 0.096)),
            InstanceType::new("Standard_D4s_v3", ResourceCapacity::default())
                .with_offering(Offering::new(CapacityType::OnDemand, "westus-1", 0.192)),
        ]
    }

    fn on_demand_claim() -> NodeClaim {
        NodeClaim::new("claim-a")
            .with_requirements(Requirements::new().with(CAPACITY_TYPE_LABEL, ["on-demand"]))
    }

    fn fast_poller() -> PollerConfig {
        PollerConfig {
            poll_interval: Duration::from_millis(10),
            initial_retry_delay: Duration::from_millis(5),
            max_retry_delay: Duration::from_millis(20),
            max_retries: 2,
        }
    }

    fn succeeded_record(zone: &str) -> MachineRecord {
        MachineRecord {
            name: "claim-a".to_string(),
            properties: MachineProperties {
                provisioning_state: Some("Succeeded".to_string()),
                zone: Some(zone.to_string()),
                ..Default::default()
            },
        }
    }

    fn service(client: MockMachineClient) -> InstanceService<MockMachineClient> {
        InstanceService::new(
            Arc::new(client),
            cluster(),
            Arc::new(UnavailableOfferings::new()),
            catalog(),
            fast_poller(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_happy_path_picks_cheapest() {
        let mut client = MockMachineClient::new();
        client
            .expect_create_or_update()
            .times(1)
            .withf(|_, spec| {
                spec.sku_name == "Standard_D2s_v3"
                    && spec.zone == "westus-1"
                    && spec.capacity_type == CapacityType::OnDemand
            })
            .returning(|_, spec| {
                Ok(LroHandle {
                    resource_group: "rg-nodes".to_string(),
                    machine_name: spec.machine_name.clone(),
                })
            });
        // One poller GET plus the read-back
        client
            .expect_get()
            .times(2)
            .returning(|_, _| Ok(succeeded_record("westus-1")));

        let (_tx, rx) = watch::channel(false);
        let machine = service(client)
            .create(&on_demand_claim(), candidates(), rx)
            .await
            .unwrap();

        assert_eq!(machine.instance_type_name, "Standard_D2s_v3");
        assert_eq!(machine.zone, "westus-1");
        assert_eq!(machine.capacity_type, CapacityType::OnDemand);
        assert_eq!(machine.resource_group, "rg-nodes");
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_no_viable_offering() {
        let client = MockMachineClient::new();
        let (_tx, rx) = watch::channel(false);

        let result = service(client)
            .create(&on_demand_claim(), Vec::new(), rx)
            .await;
        assert!(matches!(result, Err(InstanceError::NoViableOffering(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_error_is_classified() {
        let mut client = MockMachineClient::new();
        client.expect_create_or_update().times(1).returning(|_, _| {
            Err(ClientError::response(
                409,
                "SkuNotAvailable",
                "The requested SKU is unavailable",
            ))
        });

        let (_tx, rx) = watch::channel(false);
        let svc = service(client);
        let result = svc.create(&on_demand_claim(), candidates(), rx).await;

        assert!(matches!(result, Err(InstanceError::SkuNotAvailable { .. })));
        // The classifier masked the SKU for on-demand
        let sku = Sku::new("Standard_D2s_v3", "standardDSv3Family", 2);
        assert!(svc.cache().is_unavailable(&sku, "westus-1", CapacityType::OnDemand));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_unrecognised_client_error_passes_through() {
        let mut client = MockMachineClient::new();
        client
            .expect_create_or_update()
            .times(1)
            .returning(|_, _| Err(ClientError::response(400, "BadRequest", "malformed")));

        let (_tx, rx) = watch::channel(false);
        let result = service(client)
            .create(&on_demand_claim(), candidates(), rx)
            .await;
        assert!(matches!(result, Err(InstanceError::Client(_))));
    }
}
