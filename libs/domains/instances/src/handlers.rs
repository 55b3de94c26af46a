//! HTTP surface for claim submission and cache inspection.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use domain_offerings::{NodeClaim, UnavailableOfferings};
use serde_json::json;
use std::sync::Arc;

use crate::reconciler::{ClaimQueue, QueueError};

/// Shared state for the instances API surface
#[derive(Clone)]
pub struct ApiState {
    pub queue: ClaimQueue,
    pub cache: Arc<UnavailableOfferings>,
}

impl IntoResponse for QueueError {
    fn into_response(self) -> Response {
        let status = match self {
            QueueError::Full => StatusCode::SERVICE_UNAVAILABLE,
            QueueError::Closed => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = Json(json!({
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Create Axum router for claim and offerings endpoints
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/claims", post(submit_claim))
        .route("/offerings/unavailable", get(unavailable_offerings))
        .with_state(state)
}

/// Accept a node claim for asynchronous provisioning
async fn submit_claim(
    State(state): State<ApiState>,
    Json(claim): Json<NodeClaim>,
) -> Result<impl IntoResponse, QueueError> {
    let name = claim.name.clone();
    state.queue.try_submit(claim)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "accepted": name,
        })),
    ))
}

/// Dump the live unavailability cache for debugging
async fn unavailable_offerings(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.cache.snapshot())
}
