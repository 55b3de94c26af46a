use crate::{require_var, var_or, ConfigError, FromEnv};

/// Identity of the AKS cluster this autoscaler provisions nodes for.
///
/// All values are resolved here, at the edge; the provisioning core only
/// ever sees the resolved strings through constructor parameters.
#[derive(Clone, Debug)]
pub struct ClusterConfig {
    /// Azure subscription the cluster lives in
    pub subscription_id: String,
    /// Resource group holding the managed cluster
    pub resource_group: String,
    /// Managed cluster name
    pub cluster_name: String,
    /// Agent pool new machines are joined to
    pub agent_pool: String,
    /// Azure region, e.g. "westus"
    pub location: String,
}

impl FromEnv for ClusterConfig {
    /// Reads from environment variables:
    /// - ARM_SUBSCRIPTION_ID: required
    /// - AZURE_RESOURCE_GROUP: required
    /// - CLUSTER_NAME: required
    /// - AGENT_POOL: defaults to "nodepool1"
    /// - LOCATION: required
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            subscription_id: require_var("ARM_SUBSCRIPTION_ID")?,
            resource_group: require_var("AZURE_RESOURCE_GROUP")?,
            cluster_name: require_var("CLUSTER_NAME")?,
            agent_pool: var_or("AGENT_POOL", "nodepool1"),
            location: require_var("LOCATION")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_ENV: [(&str, Option<&str>); 5] = [
        ("ARM_SUBSCRIPTION_ID", Some("00000000-1111-2222-3333-444444444444")),
        ("AZURE_RESOURCE_GROUP", Some("rg-nodes")),
        ("CLUSTER_NAME", Some("prod-cluster")),
        ("AGENT_POOL", Some("pool-a")),
        ("LOCATION", Some("westus")),
    ];

    #[test]
    fn test_cluster_config_from_env() {
        temp_env::with_vars(FULL_ENV, || {
            let config = ClusterConfig::from_env().unwrap();
            assert_eq!(config.subscription_id, "00000000-1111-2222-3333-444444444444");
            assert_eq!(config.resource_group, "rg-nodes");
            assert_eq!(config.cluster_name, "prod-cluster");
            assert_eq!(config.agent_pool, "pool-a");
            assert_eq!(config.location, "westus");
        });
    }

    #[test]
    fn test_cluster_config_agent_pool_default() {
        let mut env = FULL_ENV;
        env[3] = ("AGENT_POOL", None);
        temp_env::with_vars(env, || {
            let config = ClusterConfig::from_env().unwrap();
            assert_eq!(config.agent_pool, "nodepool1");
        });
    }

    #[test]
    fn test_cluster_config_missing_subscription() {
        let mut env = FULL_ENV;
        env[0] = ("ARM_SUBSCRIPTION_ID", None);
        temp_env::with_vars(env, || {
            let result = ClusterConfig::from_env();
            assert!(matches!(result, Err(ConfigError::Missing(ref k)) if k == "ARM_SUBSCRIPTION_ID"));
        });
    }

    #[test]
    fn test_cluster_config_missing_location() {
        let mut env = FULL_ENV;
        env[4] = ("LOCATION", None);
        temp_env::with_vars(env, || {
            assert!(ClusterConfig::from_env().is_err());
        });
    }
}
