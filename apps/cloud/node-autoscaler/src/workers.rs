//! Reconcile workers and the status gauge publisher.

use crate::client::ArmMachineClient;
use crate::instance_types::build_instance_types;
use domain_instances::{ReconcileOutcome, Reconciler};
use domain_offerings::{NodeClaim, SkuCatalog, UnavailableOfferings};
use domain_pricing::PricingProvider;
use observability::{OfferingsMetrics, PricingMetrics, ProvisioningMetrics};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Everything one reconcile worker needs
#[derive(Clone)]
pub struct WorkerContext {
    pub reconciler: Arc<Reconciler<ArmMachineClient>>,
    pub pricing: Arc<PricingProvider>,
    pub cache: Arc<UnavailableOfferings>,
    pub catalog: Arc<SkuCatalog>,
    pub zones: Vec<String>,
    pub shutdown: watch::Receiver<bool>,
}

/// Fan claims out over a fixed pool of reconcile workers
pub async fn run_reconcile_workers(
    ctx: WorkerContext,
    claims: mpsc::Receiver<NodeClaim>,
    workers: usize,
) {
    let claims = Arc::new(Mutex::new(claims));
    let mut set = JoinSet::new();

    for worker_id in 0..workers {
        let ctx = ctx.clone();
        let claims = Arc::clone(&claims);
        set.spawn(worker_loop(worker_id, ctx, claims));
    }

    while set.join_next().await.is_some() {}
    info!("Reconcile workers stopped");
}

async fn worker_loop(
    worker_id: usize,
    mut ctx: WorkerContext,
    claims: Arc<Mutex<mpsc::Receiver<NodeClaim>>>,
) {
    loop {
        let claim = {
            let mut claims = claims.lock().await;
            tokio::select! {
                claim = claims.recv() => match claim {
                    Some(claim) => claim,
                    None => return,
                },
                _ = ctx.shutdown.changed() => {
                    if *ctx.shutdown.borrow() {
                        return;
                    }
                    continue;
                }
            }
        };

        let start = Instant::now();
        // Candidates are rebuilt per pass so availability reflects the
        // live cache
        let candidates =
            build_instance_types(&ctx.catalog, &ctx.pricing, &ctx.cache, &ctx.zones);
        let outcome = ctx
            .reconciler
            .reconcile(&claim, candidates, ctx.shutdown.clone())
            .await;
        let elapsed = start.elapsed().as_secs_f64();

        match outcome {
            ReconcileOutcome::Provisioned(machine) => {
                ProvisioningMetrics::record_provisioned(
                    &machine.instance_type_name,
                    &machine.zone,
                    &machine.capacity_type.to_string(),
                );
                ProvisioningMetrics::record_duration("provisioned", elapsed);
                info!(
                    worker = worker_id,
                    claim = %claim.name,
                    machine = %machine.machine_name,
                    instance_type = %machine.instance_type_name,
                    "Provisioned"
                );
            }
            ReconcileOutcome::Retry { reason } => {
                ProvisioningMetrics::record_retry();
                ProvisioningMetrics::record_duration("retry", elapsed);
                info!(
                    worker = worker_id,
                    claim = %claim.name,
                    reason = %reason,
                    "Will be retried by the scheduler core"
                );
            }
            ReconcileOutcome::Failed { reason } => {
                ProvisioningMetrics::record_failed();
                ProvisioningMetrics::record_duration("failed", elapsed);
                warn!(
                    worker = worker_id,
                    claim = %claim.name,
                    reason = %reason,
                    "Provisioning failed"
                );
            }
        }
    }
}

/// Publish cache and pricing gauges on a slow tick
pub async fn run_status_publisher(
    cache: Arc<UnavailableOfferings>,
    pricing: Arc<PricingProvider>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(60));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = cache.snapshot();
                OfferingsMetrics::set_entry_counts(
                    snapshot.offerings.len(),
                    snapshot.families.len(),
                    snapshot.spot_wide_remaining_secs.is_some(),
                );
                if let Some(age) = snapshot_age_secs(&pricing) {
                    PricingMetrics::set_snapshot_age(pricing.region(), age);
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

/// Seconds since the last successful refresh, if any
fn snapshot_age_secs(pricing: &PricingProvider) -> Option<f64> {
    pricing.last_on_demand_update().map(|updated| {
        let age = chrono::Utc::now().signed_duration_since(updated);
        age.num_milliseconds() as f64 / 1000.0
    })
}
