use crate::{parse_var_or, ConfigError, FromEnv};
use std::time::Duration;

/// Knobs for the retail price refresher.
#[derive(Clone, Debug)]
pub struct PricingConfig {
    /// How often the retail catalogue is re-fetched
    pub refresh_interval: Duration,
    /// Public clouds fetch live prices; sovereign/air-gapped clouds run
    /// off the compiled-in table only
    pub public_cloud: bool,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(12 * 60 * 60),
            public_cloud: true,
        }
    }
}

impl FromEnv for PricingConfig {
    /// Reads from environment variables with sensible defaults:
    /// - PRICING_REFRESH_HOURS: defaults to 12
    /// - PRICING_PUBLIC_CLOUD: defaults to true
    fn from_env() -> Result<Self, ConfigError> {
        let hours: u64 = parse_var_or("PRICING_REFRESH_HOURS", 12)?;
        Ok(Self {
            refresh_interval: Duration::from_secs(hours * 60 * 60),
            public_cloud: parse_var_or("PRICING_PUBLIC_CLOUD", true)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pricing_config_defaults() {
        temp_env::with_vars(
            [
                ("PRICING_REFRESH_HOURS", None::<&str>),
                ("PRICING_PUBLIC_CLOUD", None),
            ],
            || {
                let config = PricingConfig::from_env().unwrap();
                assert_eq!(config.refresh_interval, Duration::from_secs(12 * 3600));
                assert!(config.public_cloud);
            },
        );
    }

    #[test]
    fn test_pricing_config_sovereign_cloud() {
        temp_env::with_var("PRICING_PUBLIC_CLOUD", Some("false"), || {
            let config = PricingConfig::from_env().unwrap();
            assert!(!config.public_cloud);
        });
    }

    #[test]
    fn test_pricing_config_custom_interval() {
        temp_env::with_var("PRICING_REFRESH_HOURS", Some("1"), || {
            let config = PricingConfig::from_env().unwrap();
            assert_eq!(config.refresh_interval, Duration::from_secs(3600));
        });
    }
}
