//! Top-level configuration for a fork-choice node.
//!
//! This module aggregates configuration for:
//!
//! - fork-choice parameters (`ForkChoiceConfig`),
//! - metrics exporter (enable flag + listen address).
//!
//! The goal is to have a single `ChainConfig` struct that higher-level
//! binaries (e.g. `main.rs`) can construct from defaults or a JSON file.
//! Every field is optional in the file and falls back to its default.

use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::consensus::ForkChoiceConfig;

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether to run a `/metrics` HTTP exporter.
    pub enabled: bool,
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 9898)),
        }
    }
}

/// Top-level configuration for a fork-choice node.
///
/// This aggregates the sub-configs needed to wire up a typical node:
///
/// - shard set and scheduling (`fork_choice`),
/// - Prometheus metrics exporter (`metrics`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub fork_choice: ForkChoiceConfig,
    pub metrics: MetricsConfig,
}

/// Errors that can occur while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ChainConfig {
    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }
}
