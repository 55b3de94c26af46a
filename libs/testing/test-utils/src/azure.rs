//! Scripted fake of the Azure machine client.
//!
//! GET responses play back in order; when the script runs dry the last
//! response repeats, so "terminal state forever after" needs no padding.
//! Create responses default to returning a handle derived from the spec.

use async_trait::async_trait;
use domain_instances::models::{ClusterIdentity, LroHandle, MachineRecord, MachineSpec};
use domain_instances::{ClientError, MachineClient};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeMachineClient {
    gets: Mutex<VecDeque<Result<MachineRecord, ClientError>>>,
    creates: Mutex<VecDeque<Result<LroHandle, ClientError>>>,
    get_calls: AtomicUsize,
    create_calls: AtomicUsize,
    last_spec: Mutex<Option<MachineSpec>>,
}

impl FakeMachineClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a GET response to the script
    pub fn with_get(self, response: Result<MachineRecord, ClientError>) -> Self {
        self.gets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
        self
    }

    /// Append a create response to the script; without any, creates
    /// succeed with a handle derived from the spec
    pub fn with_create(self, response: Result<LroHandle, ClientError>) -> Self {
        self.creates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
        self
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// The spec from the most recent create call
    pub fn last_spec(&self) -> Option<MachineSpec> {
        self.last_spec
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl MachineClient for FakeMachineClient {
    async fn get(
        &self,
        _cluster: &ClusterIdentity,
        _machine_name: &str,
    ) -> Result<MachineRecord, ClientError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let mut gets = self.gets.lock().unwrap_or_else(|e| e.into_inner());
        match gets.len() {
            0 => Err(ClientError::response(
                404,
                "NotFound",
                "fake client has no scripted GET responses",
            )),
            1 => gets.front().cloned().unwrap_or_else(|| unreachable!()),
            _ => gets.pop_front().unwrap_or_else(|| unreachable!()),
        }
    }

    async fn create_or_update(
        &self,
        cluster: &ClusterIdentity,
        spec: &MachineSpec,
    ) -> Result<LroHandle, ClientError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_spec.lock().unwrap_or_else(|e| e.into_inner()) = Some(spec.clone());

        let mut creates = self.creates.lock().unwrap_or_else(|e| e.into_inner());
        match creates.pop_front() {
            Some(response) => response,
            None => Ok(LroHandle {
                resource_group: cluster.resource_group.clone(),
                machine_name: spec.machine_name.clone(),
            }),
        }
    }
}
