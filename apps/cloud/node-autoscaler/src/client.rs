//! ARM-backed machine client.
//!
//! Talks to the AKS machines API with a pre-resolved bearer token. Token
//! acquisition and rotation are the concern of the surrounding deployment;
//! this client only spends what it is given.

use async_trait::async_trait;
use domain_instances::models::{ClusterIdentity, LroHandle, MachineRecord, MachineSpec};
use domain_instances::{ClientError, MachineClient};
use domain_offerings::CapacityType;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const MACHINES_API_VERSION: &str = "2024-09-02-preview";

/// ARM error envelope
#[derive(Debug, Deserialize)]
struct ArmErrorBody {
    error: ArmErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ArmErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

pub struct ArmMachineClient {
    http: reqwest::Client,
    base_url: String,
    subscription_id: String,
    token: String,
}

impl ArmMachineClient {
    pub fn new(
        base_url: impl Into<String>,
        subscription_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            subscription_id: subscription_id.into(),
            token: token.into(),
        }
    }

    fn machine_url(&self, cluster: &ClusterIdentity, machine_name: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.ContainerService/managedClusters/{}/agentPools/{}/machines/{}?api-version={}",
            self.base_url,
            self.subscription_id,
            cluster.resource_group,
            cluster.cluster_name,
            cluster.agent_pool,
            machine_name,
            MACHINES_API_VERSION,
        )
    }

    /// Fold a non-success response into the typed error shape, keeping the
    /// ARM error code and message when the body carries them
    async fn response_error(status: StatusCode, response: reqwest::Response) -> ClientError {
        let raw = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ArmErrorBody>(&raw) {
            Ok(body) => ClientError::response(status.as_u16(), body.error.code, body.error.message),
            Err(_) => ClientError::response(status.as_u16(), "", raw),
        }
    }
}

#[async_trait]
impl MachineClient for ArmMachineClient {
    async fn get(
        &self,
        cluster: &ClusterIdentity,
        machine_name: &str,
    ) -> Result<MachineRecord, ClientError> {
        let url = self.machine_url(cluster, machine_name);
        debug!(machine = machine_name, "GET machine");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::response_error(status, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    async fn create_or_update(
        &self,
        cluster: &ClusterIdentity,
        spec: &MachineSpec,
    ) -> Result<LroHandle, ClientError> {
        let url = self.machine_url(cluster, &spec.machine_name);
        let priority = match spec.capacity_type {
            CapacityType::Spot => "Spot",
            CapacityType::OnDemand => "Regular",
        };
        let body = json!({
            "zones": [spec.zone],
            "properties": {
                "hardware": { "vmSize": spec.sku_name },
                "priority": priority,
            },
        });
        debug!(machine = %spec.machine_name, sku = %spec.sku_name, "PUT machine");

        let response = self
            .http
            .put(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::response_error(status, response).await);
        }

        Ok(LroHandle {
            resource_group: cluster.resource_group.clone(),
            machine_name: spec.machine_name.clone(),
        })
    }
}
