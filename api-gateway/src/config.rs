//! API gateway configuration.
//!
//! The HTTP listen address comes from `API_GATEWAY_LISTEN_ADDR` when set.
//! The underlying chain configuration is read from the JSON file named by
//! `SHARDCHAIN_CONFIG`, or taken from `ChainConfig::default()`.

use std::net::{Ipv4Addr, SocketAddr};

use shardchain::ChainConfig;

/// Environment variable naming the chain configuration file.
pub const CHAIN_CONFIG_ENV: &str = "SHARDCHAIN_CONFIG";

/// Environment variable overriding the HTTP listen address.
pub const LISTEN_ADDR_ENV: &str = "API_GATEWAY_LISTEN_ADDR";

/// Configuration for the API gateway HTTP server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        // Bind to all interfaces so a container port mapping (8081→8081) is
        // reachable from the host.
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8081)),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, String> {
        match std::env::var(LISTEN_ADDR_ENV) {
            Ok(raw) => {
                let listen_addr = raw
                    .parse()
                    .map_err(|e| format!("invalid {LISTEN_ADDR_ENV} {raw:?}: {e}"))?;
                Ok(Self { listen_addr })
            }
            Err(_) => Ok(Self::default()),
        }
    }
}

/// Loads the chain configuration named by [`CHAIN_CONFIG_ENV`], if any.
pub fn load_chain_config() -> Result<ChainConfig, String> {
    match std::env::var(CHAIN_CONFIG_ENV) {
        Ok(path) => ChainConfig::from_json_file(&path).map_err(|e| e.to_string()),
        Err(_) => Ok(ChainConfig::default()),
    }
}
