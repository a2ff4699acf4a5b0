//! Metrics and instrumentation for the chain.
//!
//! This module defines Prometheus-compatible metrics for sharded fork
//! choice and exposes a small HTTP exporter that serves `/metrics` in
//! Prometheus text format.
//!
//! Typical usage in a node:
//!
//! ```ignore
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use shardchain::metrics::{MetricsRegistry, run_prometheus_http_server};
//!
//! let registry = Arc::new(MetricsRegistry::new()?);
//! let addr: SocketAddr = "127.0.0.1:9898".parse()?;
//!
//! // Spawn the HTTP exporter in the background:
//! tokio::spawn(run_prometheus_http_server(registry.clone(), addr));
//!
//! // Hand the metrics to the resolver:
//! let resolver = resolver.with_metrics(registry.fork_choice.clone());
//! ```

pub mod prometheus;

pub use prometheus::{ForkChoiceMetrics, MetricsRegistry, run_prometheus_http_server};
