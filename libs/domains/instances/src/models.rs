use domain_offerings::CapacityType;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Resolved identity of the managed cluster machines are joined to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterIdentity {
    pub resource_group: String,
    pub cluster_name: String,
    pub agent_pool: String,
}

/// Provisioning states reported by the machine API.
///
/// The wire value is a free-form string; anything that does not parse into
/// one of these is treated as indeterminate by the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum ProvisioningState {
    Creating,
    Updating,
    Succeeded,
    Failed,
    Deleting,
}

impl ProvisioningState {
    /// Non-terminal states that indicate the operation is progressing
    pub fn is_healthy_non_terminal(&self) -> bool {
        matches!(self, Self::Creating | Self::Updating)
    }
}

/// Structured error detail nested in a failed machine record, and also the
/// error shape returned by the managed-agent-pool path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Machine record as read back from the machine API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MachineRecord {
    pub name: String,
    #[serde(default)]
    pub properties: MachineProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MachineProperties {
    #[serde(rename = "provisioningState")]
    pub provisioning_state: Option<String>,
    pub status: Option<MachineStatus>,
    /// Availability zone the machine landed in
    pub zone: Option<String>,
    /// SKU the machine was created with
    #[serde(rename = "vmSize")]
    pub vm_size: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MachineStatus {
    #[serde(rename = "provisioningError")]
    pub provisioning_error: Option<ErrorDetail>,
}

impl MachineRecord {
    /// Parsed provisioning state; `None` when absent or unrecognised
    pub fn provisioning_state(&self) -> Option<ProvisioningState> {
        self.properties
            .provisioning_state
            .as_deref()
            .and_then(|raw| raw.parse().ok())
    }

    pub fn provisioning_error(&self) -> Option<&ErrorDetail> {
        self.properties
            .status
            .as_ref()
            .and_then(|s| s.provisioning_error.as_ref())
    }
}

/// Create request for one machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineSpec {
    pub machine_name: String,
    pub sku_name: String,
    pub zone: String,
    pub capacity_type: CapacityType,
}

/// Handle to an in-flight machine create operation.
///
/// Lives from the moment the create call returns until a terminal state is
/// observed or the attempt is cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LroHandle {
    pub resource_group: String,
    pub machine_name: String,
}

/// Outcome of a successful provisioning attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionedMachine {
    pub machine_name: String,
    pub resource_group: String,
    pub instance_type_name: String,
    pub zone: String,
    pub capacity_type: CapacityType,
}
