//! Machine record builders for each provisioning state

use domain_instances::models::{MachineProperties, MachineRecord, MachineStatus};
use domain_instances::ErrorDetail;

/// Record in a named provisioning state with no error detail
pub fn in_state(name: &str, state: &str) -> MachineRecord {
    MachineRecord {
        name: name.to_string(),
        properties: MachineProperties {
            provisioning_state: Some(state.to_string()),
            ..Default::default()
        },
    }
}

/// Record with no provisioning state at all
pub fn stateless(name: &str) -> MachineRecord {
    MachineRecord {
        name: name.to_string(),
        properties: MachineProperties::default(),
    }
}

pub fn creating(name: &str) -> MachineRecord {
    in_state(name, "Creating")
}

pub fn succeeded(name: &str, zone: &str) -> MachineRecord {
    MachineRecord {
        name: name.to_string(),
        properties: MachineProperties {
            provisioning_state: Some("Succeeded".to_string()),
            zone: Some(zone.to_string()),
            ..Default::default()
        },
    }
}

pub fn deleting(name: &str) -> MachineRecord {
    in_state(name, "Deleting")
}

/// Failed record carrying the structured provisioning error
pub fn failed(name: &str, code: &str, message: &str) -> MachineRecord {
    MachineRecord {
        name: name.to_string(),
        properties: MachineProperties {
            provisioning_state: Some("Failed".to_string()),
            status: Some(MachineStatus {
                provisioning_error: Some(ErrorDetail::new(code, message)),
            }),
            ..Default::default()
        },
    }
}
