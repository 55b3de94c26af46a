//! Health, metrics and claims HTTP surface.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use domain_instances::handlers::ApiState;
use domain_offerings::UnavailableOfferings;
use domain_pricing::PricingProvider;
use observability::OfferingsMetrics;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// Pricing snapshots older than this many refresh intervals fail the probe
const STALE_PRICING_INTERVALS: u32 = 3;

/// How long the probe waits on the cache lock before declaring a deadlock
const CACHE_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct HealthState {
    pub cache: Arc<UnavailableOfferings>,
    pub pricing: Arc<PricingProvider>,
}

/// Assemble the full router: probe endpoints plus the instances API
pub fn build_router(health: HealthState, api: ApiState) -> Router {
    let probe_routes = Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/v1/offerings/flush", post(flush_offerings))
        .with_state(health);

    probe_routes
        .nest("/v1", domain_instances::handlers::router(api))
        .layer(TraceLayer::new_for_http())
}

/// Liveness: fails when the unavailability cache lock cannot be acquired
/// in bounded time or the pricing snapshot has gone stale
async fn healthz(State(state): State<HealthState>) -> impl IntoResponse {
    let cache = Arc::clone(&state.cache);
    let probe = tokio::task::spawn_blocking(move || cache.snapshot());

    let snapshot = match tokio::time::timeout(CACHE_PROBE_TIMEOUT, probe).await {
        Ok(Ok(snapshot)) => snapshot,
        _ => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "reason": "offerings cache unresponsive" })),
            );
        }
    };

    if state.pricing.is_stale(STALE_PRICING_INTERVALS) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "reason": "pricing snapshot stale" })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "cache_seq_num": snapshot.seq_num,
            "pricing_last_update": state.pricing.last_on_demand_update(),
        })),
    )
}

async fn metrics() -> String {
    observability::render_metrics()
}

/// Operator escape hatch: wipe the unavailability cache
async fn flush_offerings(State(state): State<HealthState>) -> impl IntoResponse {
    state.cache.flush();
    OfferingsMetrics::record_flush();
    Json(json!({ "flushed": true }))
}
