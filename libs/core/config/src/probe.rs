use crate::{parse_var_or, var_or, ConfigError, FromEnv};
use std::net::{Ipv4Addr, SocketAddr};

/// Bind address for the health/metrics/claims HTTP surface.
#[derive(Clone, Debug)]
pub struct ProbeConfig {
    pub host: String,
    pub port: u16,
}

impl ProbeConfig {
    /// Resolve into a socket address, failing on an unparseable host
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let address = format!("{}:{}", self.host, self.port);
        address.parse().map_err(|e| ConfigError::Invalid {
            key: "PROBE_HOST".to_string(),
            value: address,
            reason: format!("{}", e),
        })
    }
}

impl FromEnv for ProbeConfig {
    /// Reads from environment variables with sensible defaults:
    /// - PROBE_HOST: defaults to 0.0.0.0 (all interfaces)
    /// - PROBE_PORT: defaults to 8081
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: var_or("PROBE_HOST", &Ipv4Addr::UNSPECIFIED.to_string()),
            port: parse_var_or("PROBE_PORT", 8081)?,
        })
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::UNSPECIFIED.to_string(),
            port: 8081,
        }
    }
}
