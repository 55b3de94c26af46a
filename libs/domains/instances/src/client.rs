//! Azure machine client seam.
//!
//! The provisioning core consumes this trait; the production
//! implementation (SDK-backed, with credential plumbing) lives with the
//! surrounding collaborators.

use crate::models::{ClusterIdentity, LroHandle, MachineRecord, MachineSpec};
use async_trait::async_trait;
use thiserror::Error;

/// HTTP statuses worth retrying: throttling, server faults, timeouts
const TRANSIENT_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Typed response error from the machine API
    #[error("Azure responded {status} {code}: {message}")]
    Response {
        status: u16,
        code: String,
        message: String,
    },

    /// Anything that never produced a typed response (DNS, connect reset,
    /// TLS); always treated as transient
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ClientError {
    pub fn response(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Response {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Response { status, .. } => TRANSIENT_STATUSES.contains(status),
        }
    }
}

/// Minimal machine API surface the provisioning core drives
#[async_trait]
pub trait MachineClient: Send + Sync {
    /// Read one machine record back
    async fn get(
        &self,
        cluster: &ClusterIdentity,
        machine_name: &str,
    ) -> Result<MachineRecord, ClientError>;

    /// Submit a machine create, returning the long-running-operation
    /// handle to poll
    async fn create_or_update(
        &self,
        cluster: &ClusterIdentity,
        spec: &MachineSpec,
    ) -> Result<LroHandle, ClientError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_transient() {
        assert!(ClientError::Transport("connection reset".to_string()).is_transient());
    }

    #[test]
    fn test_retryable_statuses() {
        for status in [408, 429, 500, 502, 503, 504] {
            assert!(
                ClientError::response(status, "", "").is_transient(),
                "{status} should be transient"
            );
        }
    }

    #[test]
    fn test_non_retryable_statuses() {
        for status in [400, 401, 403, 404, 409] {
            assert!(
                !ClientError::response(status, "", "").is_transient(),
                "{status} should not be transient"
            );
        }
    }
}
