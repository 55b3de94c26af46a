//! Configuration for the node autoscaler

use core_config::cluster::ClusterConfig;
use core_config::pricing::PricingConfig;
use core_config::probe::ProbeConfig;
use core_config::provisioner::{PollerConfig, ReconcilerConfig};
use core_config::{parse_var_or, var_or, ConfigError, FromEnv};
use domain_instances::models::ClusterIdentity;

/// Default ARM management endpoint for public cloud
const DEFAULT_ARM_BASE_URL: &str = "https://management.azure.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub cluster: ClusterConfig,
    pub poller: PollerConfig,
    pub reconciler: ReconcilerConfig,
    pub pricing: PricingConfig,
    pub probe: ProbeConfig,
    /// Zone suffixes within the region, e.g. ["1", "2", "3"]
    pub zone_suffixes: Vec<String>,
    pub claim_queue_capacity: usize,
    pub reconcile_workers: usize,
    /// Pre-resolved ARM bearer token; acquisition (workload identity,
    /// managed identity) happens outside this process
    pub arm_token: Option<String>,
    pub arm_base_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cluster: ClusterConfig::from_env()?,
            poller: PollerConfig::from_env()?,
            reconciler: ReconcilerConfig::from_env()?,
            pricing: PricingConfig::from_env()?,
            probe: ProbeConfig::from_env()?,
            zone_suffixes: var_or("AVAILABILITY_ZONES", "1,2,3")
                .split(',')
                .map(|z| z.trim().to_string())
                .filter(|z| !z.is_empty())
                .collect(),
            claim_queue_capacity: parse_var_or("CLAIM_QUEUE_CAPACITY", 128)?,
            reconcile_workers: parse_var_or("RECONCILE_WORKERS", 8)?,
            arm_token: std::env::var("AZURE_ARM_TOKEN").ok(),
            arm_base_url: var_or("AZURE_ARM_BASE_URL", DEFAULT_ARM_BASE_URL),
        })
    }

    /// Fully-qualified zone names, e.g. "westus-1"
    pub fn zones(&self) -> Vec<String> {
        self.zone_suffixes
            .iter()
            .map(|suffix| format!("{}-{}", self.cluster.location, suffix))
            .collect()
    }

    pub fn cluster_identity(&self) -> ClusterIdentity {
        ClusterIdentity {
            resource_group: self.cluster.resource_group.clone(),
            cluster_name: self.cluster.cluster_name.clone(),
            agent_pool: self.cluster.agent_pool.clone(),
        }
    }

    /// The poller knobs in the shape the instances domain consumes
    pub fn domain_poller_config(&self) -> domain_instances::PollerConfig {
        domain_instances::PollerConfig {
            poll_interval: self.poller.poll_interval,
            initial_retry_delay: self.poller.initial_retry_delay,
            max_retry_delay: self.poller.max_retry_delay,
            max_retries: self.poller.max_retries,
        }
    }
}
