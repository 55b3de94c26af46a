//! End-to-end provisioning scenarios against the scripted fake client.
//!
//! These exercise the full create path: arbitration, the create call, LRO
//! polling, error classification and the resulting cache state.

use domain_instances::{
    ClientError, ClusterIdentity, InstanceError, InstanceService, PollerConfig,
};
use domain_offerings::{
    CapacityType, InstanceType, NodeClaim, Offering, Requirements, ResourceCapacity, Sku,
    SkuCatalog, UnavailableOfferings, CAPACITY_TYPE_LABEL, INSTANCE_TYPE_LABEL, ZONE_LABEL,
};
use std::sync::Arc;
use std::time::Duration;
use test_utils::{records, FakeMachineClient};
use tokio::sync::watch;

fn cluster() -> ClusterIdentity {
    ClusterIdentity {
        resource_group: "rg-nodes".to_string(),
        cluster_name: "prod-cluster".to_string(),
        agent_pool: "nodepool1".to_string(),
    }
}

fn catalog() -> SkuCatalog {
    [
        Sku::new("Standard_D2s_v3", "standardDSv3Family", 2),
        Sku::new("Standard_D4s_v3", "standardDSv3Family", 4),
        Sku::new("Standard_NV8as_v4", "standardNVasv4Family", 8),
        Sku::new("Standard_NV16as_v4", "standardNVasv4Family", 16),
        Sku::new("Standard_NV24as_v4", "standardNVasv4Family", 24),
    ]
    .into_iter()
    .collect()
}

fn fast_poller() -> PollerConfig {
    PollerConfig {
        poll_interval: Duration::from_millis(10),
        initial_retry_delay: Duration::from_millis(5),
        max_retry_delay: Duration::from_millis(20),
        max_retries: 2,
    }
}

fn service(
    client: Arc<FakeMachineClient>,
    cache: Arc<UnavailableOfferings>,
) -> InstanceService<FakeMachineClient> {
    InstanceService::new(client, cluster(), cache, Arc::new(catalog()), fast_poller())
}

fn d_series_candidates() -> Vec<InstanceType> {
    vec![
        InstanceType::new("Standard_D2s_v3", ResourceCapacity::default())
            .with_offering(Offering::new(CapacityType::OnDemand, "westus-1", 0.096))
            .with_offering(Offering::new(CapacityType::Spot, "westus-1", 0.019)),
        InstanceType::new("Standard_D4s_v3", ResourceCapacity::default())
            .with_offering(Offering::new(CapacityType::OnDemand, "westus-1", 0.192))
            .with_offering(Offering::new(CapacityType::Spot, "westus-1", 0.038)),
    ]
}

fn nv16_candidates() -> Vec<InstanceType> {
    vec![InstanceType::new("Standard_NV16as_v4", ResourceCapacity::default())
        .with_offering(Offering::new(CapacityType::OnDemand, "westus-1", 0.932))
        .with_offering(Offering::new(CapacityType::OnDemand, "westus-2", 0.932))]
}

fn no_shutdown() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

// ============================================================================
// Fast success
// ============================================================================

#[tokio::test]
async fn test_fast_success_returns_machine_without_cache_mutations() {
    let claim = NodeClaim::new("claim-fast").with_requirements(
        Requirements::new()
            .with(INSTANCE_TYPE_LABEL, ["Standard_D2s_v3"])
            .with(CAPACITY_TYPE_LABEL, ["on-demand"]),
    );

    let client = Arc::new(
        FakeMachineClient::new().with_get(Ok(records::succeeded("claim-fast", "westus-1"))),
    );
    let cache = Arc::new(UnavailableOfferings::new());
    let service = service(Arc::clone(&client), Arc::clone(&cache));

    let (_tx, rx) = no_shutdown();
    let machine = service
        .create(&claim, d_series_candidates(), rx)
        .await
        .unwrap();

    assert_eq!(machine.instance_type_name, "Standard_D2s_v3");
    assert_eq!(machine.zone, "westus-1");
    assert_eq!(machine.capacity_type, CapacityType::OnDemand);

    // One poll observed Succeeded immediately, one read-back
    assert_eq!(client.get_calls(), 2);
    assert_eq!(client.create_calls(), 1);

    // No cache mutations on success
    let snapshot = cache.snapshot();
    assert!(snapshot.offerings.is_empty());
    assert!(snapshot.families.is_empty());
    assert!(snapshot.spot_wide_remaining_secs.is_none());
}

// ============================================================================
// Zonal allocation failure cascades
// ============================================================================

#[tokio::test]
async fn test_zonal_allocation_failure_masks_family_in_zone() {
    let claim = NodeClaim::new("claim-nv").with_requirements(
        Requirements::new()
            .with(INSTANCE_TYPE_LABEL, ["Standard_NV16as_v4"])
            .with(CAPACITY_TYPE_LABEL, ["on-demand"])
            .with(ZONE_LABEL, ["westus-1"]),
    );

    let client = Arc::new(FakeMachineClient::new().with_get(Ok(records::failed(
        "claim-nv",
        "ZonalAllocationFailed",
        "Allocation failed. We do not have sufficient capacity for the requested VM size in this zone.",
    ))));
    let cache = Arc::new(UnavailableOfferings::new());
    let service = service(client, Arc::clone(&cache));

    let (_tx, rx) = no_shutdown();
    let result = service.create(&claim, nv16_candidates(), rx).await;

    let error = result.unwrap_err();
    assert!(matches!(error, InstanceError::ZonalAllocationFailed { .. }));
    assert!(error.is_retryable());

    // The whole family is blocked at >= 16 vCPUs in the failing zone,
    // both capacity types
    let snapshot = cache.snapshot();
    assert_eq!(snapshot.families.len(), 2);
    for family in &snapshot.families {
        assert_eq!(family.family, "standardNVasv4Family");
        assert_eq!(family.zone, "westus-1");
        assert_eq!(family.cpu_threshold, 16);
    }

    let nv24 = Sku::new("Standard_NV24as_v4", "standardNVasv4Family", 24);
    let nv16 = Sku::new("Standard_NV16as_v4", "standardNVasv4Family", 16);
    let nv8 = Sku::new("Standard_NV8as_v4", "standardNVasv4Family", 8);

    assert!(cache.is_unavailable(&nv24, "westus-1", CapacityType::OnDemand));
    assert!(!cache.is_unavailable(&nv8, "westus-1", CapacityType::OnDemand));
    assert!(!cache.is_unavailable(&nv16, "westus-2", CapacityType::OnDemand));
}

// ============================================================================
// Regional quota bubbles up
// ============================================================================

#[tokio::test]
async fn test_regional_quota_is_terminal_with_no_cache_effect() {
    let claim = NodeClaim::new("claim-reg")
        .with_requirements(Requirements::new().with(CAPACITY_TYPE_LABEL, ["on-demand"]));

    let client = Arc::new(FakeMachineClient::new().with_get(Ok(records::failed(
        "claim-reg",
        "OperationNotAllowed",
        "Operation could not be completed as it results in exceeding approved Total Regional Cores quota.",
    ))));
    let cache = Arc::new(UnavailableOfferings::new());
    let service = service(client, Arc::clone(&cache));

    let (_tx, rx) = no_shutdown();
    let result = service.create(&claim, d_series_candidates(), rx).await;

    let error = result.unwrap_err();
    assert!(matches!(error, InstanceError::InsufficientCapacity(_)));
    assert!(!error.is_retryable());

    let snapshot = cache.snapshot();
    assert!(snapshot.offerings.is_empty());
    assert!(snapshot.families.is_empty());
}

// ============================================================================
// Circuit breaker across attempts
// ============================================================================

#[tokio::test]
async fn test_second_attempt_skips_masked_sku() {
    let claim = NodeClaim::new("claim-cb")
        .with_requirements(Requirements::new().with(CAPACITY_TYPE_LABEL, ["on-demand"]));
    let cache = Arc::new(UnavailableOfferings::new());

    // First attempt: the cheapest SKU fails with SkuNotAvailable
    let first_client = Arc::new(FakeMachineClient::new().with_get(Ok(records::failed(
        "claim-cb",
        "SkuNotAvailable",
        "The requested VM size is not available in the current region.",
    ))));
    let first = service(Arc::clone(&first_client), Arc::clone(&cache));
    let (_tx, rx) = no_shutdown();
    let error = first
        .create(&claim, d_series_candidates(), rx)
        .await
        .unwrap_err();
    assert!(matches!(error, InstanceError::SkuNotAvailable { .. }));
    assert_eq!(first_client.last_spec().unwrap().sku_name, "Standard_D2s_v3");

    // Second attempt with the same candidates lands on the next-priced SKU
    let second_client = Arc::new(
        FakeMachineClient::new().with_get(Ok(records::succeeded("claim-cb", "westus-1"))),
    );
    let second = service(Arc::clone(&second_client), Arc::clone(&cache));
    let (_tx2, rx2) = no_shutdown();
    let machine = second
        .create(&claim, d_series_candidates(), rx2)
        .await
        .unwrap();

    assert_eq!(machine.instance_type_name, "Standard_D4s_v3");
    assert_eq!(second_client.last_spec().unwrap().sku_name, "Standard_D4s_v3");
}

// ============================================================================
// Spot-wide masking
// ============================================================================

#[tokio::test]
async fn test_spot_quota_error_flips_next_claim_to_on_demand() {
    // Spot is cheapest, so an open claim starts on spot
    let claim = NodeClaim::new("claim-spot");
    let cache = Arc::new(UnavailableOfferings::new());

    let first_client = Arc::new(FakeMachineClient::new().with_get(Ok(records::failed(
        "claim-spot",
        "OperationNotAllowed",
        "Operation could not be completed as it results in exceeding approved LowPriorityCores quota.",
    ))));
    let first = service(Arc::clone(&first_client), Arc::clone(&cache));
    let (_tx, rx) = no_shutdown();
    let error = first
        .create(&claim, d_series_candidates(), rx)
        .await
        .unwrap_err();

    assert!(matches!(error, InstanceError::SpotQuotaExceeded(_)));
    assert_eq!(
        first_client.last_spec().unwrap().capacity_type,
        CapacityType::Spot
    );

    // Every spot offering is masked now; on-demand is untouched
    let d2 = Sku::new("Standard_D2s_v3", "standardDSv3Family", 2);
    assert!(cache.is_unavailable(&d2, "westus-1", CapacityType::Spot));
    assert!(!cache.is_unavailable(&d2, "westus-1", CapacityType::OnDemand));

    // The next claim falls back to on-demand
    let second_client = Arc::new(
        FakeMachineClient::new().with_get(Ok(records::succeeded("claim-spot", "westus-1"))),
    );
    let second = service(Arc::clone(&second_client), Arc::clone(&cache));
    let (_tx2, rx2) = no_shutdown();
    let machine = second
        .create(&claim, d_series_candidates(), rx2)
        .await
        .unwrap();

    assert_eq!(machine.capacity_type, CapacityType::OnDemand);
}

// ============================================================================
// Progress then failure, classified from the nested detail
// ============================================================================

#[tokio::test]
async fn test_slow_failure_still_classified() {
    let claim = NodeClaim::new("claim-slow")
        .with_requirements(Requirements::new().with(CAPACITY_TYPE_LABEL, ["on-demand"]));

    let client = Arc::new(
        FakeMachineClient::new()
            .with_get(Ok(records::creating("claim-slow")))
            .with_get(Ok(records::creating("claim-slow")))
            .with_get(Ok(records::failed(
                "claim-slow",
                "AllocationFailed",
                "Allocation failed. Please retry later.",
            ))),
    );
    let cache = Arc::new(UnavailableOfferings::new());
    let service = service(Arc::clone(&client), Arc::clone(&cache));

    let (_tx, rx) = no_shutdown();
    let error = service
        .create(&claim, d_series_candidates(), rx)
        .await
        .unwrap_err();

    assert!(matches!(error, InstanceError::AllocationFailed { .. }));
    assert_eq!(client.get_calls(), 3);

    // Both capacity types masked in every zone the SKU offers
    let d2 = Sku::new("Standard_D2s_v3", "standardDSv3Family", 2);
    assert!(cache.is_unavailable(&d2, "westus-1", CapacityType::OnDemand));
    assert!(cache.is_unavailable(&d2, "westus-1", CapacityType::Spot));
}

// ============================================================================
// Transient GET failures during polling
// ============================================================================

#[tokio::test]
async fn test_transient_get_failures_tolerated_then_success() {
    let claim = NodeClaim::new("claim-flaky")
        .with_requirements(Requirements::new().with(CAPACITY_TYPE_LABEL, ["on-demand"]));

    let client = Arc::new(
        FakeMachineClient::new()
            .with_get(Err(ClientError::response(503, "ServerBusy", "busy")))
            .with_get(Ok(records::creating("claim-flaky")))
            .with_get(Err(ClientError::response(500, "InternalError", "oops")))
            .with_get(Ok(records::succeeded("claim-flaky", "westus-1"))),
    );
    let cache = Arc::new(UnavailableOfferings::new());
    let service = service(client, cache);

    let (_tx, rx) = no_shutdown();
    let machine = service
        .create(&claim, d_series_candidates(), rx)
        .await
        .unwrap();
    assert_eq!(machine.instance_type_name, "Standard_D2s_v3");
}

// ============================================================================
// Deleting state cancels the attempt without cache effects
// ============================================================================

#[tokio::test]
async fn test_deleting_state_is_poller_error() {
    let claim = NodeClaim::new("claim-del")
        .with_requirements(Requirements::new().with(CAPACITY_TYPE_LABEL, ["on-demand"]));

    let client = Arc::new(FakeMachineClient::new().with_get(Ok(records::deleting("claim-del"))));
    let cache = Arc::new(UnavailableOfferings::new());
    let service = service(client, Arc::clone(&cache));

    let (_tx, rx) = no_shutdown();
    let error = service
        .create(&claim, d_series_candidates(), rx)
        .await
        .unwrap_err();

    assert!(matches!(error, InstanceError::Poller(_)));
    assert!(!error.is_retryable());
    assert!(cache.snapshot().offerings.is_empty());
}
