//! Shared test utilities for domain testing
//!
//! This crate provides reusable test infrastructure for the domain crates:
//! - `FakeMachineClient`: scripted Azure machine client with call counters
//! - `records`: machine record builders for each provisioning state
//! - `TestDataBuilder`: deterministic test data naming
//!
//! # Usage
//!
//! ```rust,no_run
//! use test_utils::{records, FakeMachineClient, TestDataBuilder};
//!
//! # async fn example() {
//! let builder = TestDataBuilder::from_test_name("fast_success");
//! let client = FakeMachineClient::new()
//!     .with_get(Ok(records::succeeded(&builder.machine_name("a"), "westus-1")));
//! # }
//! ```

pub mod azure;
pub mod records;

pub use azure::FakeMachineClient;

/// Deterministic test data naming, derived from the test name so
/// concurrent tests cannot collide
#[derive(Debug, Clone)]
pub struct TestDataBuilder {
    prefix: String,
}

impl TestDataBuilder {
    pub fn from_test_name(test_name: &str) -> Self {
        Self {
            prefix: test_name.replace('_', "-"),
        }
    }

    pub fn claim_name(&self, suffix: &str) -> String {
        format!("claim-{}-{}", self.prefix, suffix)
    }

    pub fn machine_name(&self, suffix: &str) -> String {
        format!("aks-{}-{}", self.prefix, suffix)
    }
}
