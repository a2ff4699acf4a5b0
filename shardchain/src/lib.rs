//! Sharded chain fork-choice library crate.
//!
//! This crate provides the building blocks for resolving, for every shard
//! of a tree of shards, which block is the current tip:
//!
//! - strongly-typed domain types (`types`),
//! - a modular fork-choice layer (`consensus`): the filtered GHOST walk,
//!   the cross-shard candidate filter, the tips cache and the sharded
//!   resolver,
//! - block validity predicates (`validation`),
//! - the in-memory block universe (`storage`),
//! - Prometheus-based metrics (`metrics`),
//! - JSON snapshots of fork-choice inputs (`snapshot`),
//! - and a top-level node configuration (`config`).
//!
//! Higher-level binaries can compose these pieces to build nodes,
//! simulators, and query services.

pub mod config;
pub mod consensus;
pub mod metrics;
pub mod snapshot;
pub mod storage;
pub mod types;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

// Re-export top-level configuration types.
pub use config::{ChainConfig, ConfigError, MetricsConfig};

// Re-export "core" fork-choice types and traits.
pub use consensus::{
    AcceptAllValidator, BlockStore, BlockValidator, CacheKey, CombinedValidator,
    CrossShardFilter, FilterReason, ForkChoice, ForkChoiceConfig, ForkChoiceError, GhostWalk,
    InvalidInput, InvariantViolation, ShardedResolver, StartingBlocks, TipsCache,
    ValidationError, Walk, WeightedVotes,
};

// Re-export the in-memory block universe.
pub use storage::BlockUniverse;

// Re-export validity predicates.
pub use validation::BaseValidity;

// Re-export snapshot types.
pub use snapshot::{ForkChoiceSnapshot, ShardTip, SnapshotError, StartingBlock, Vote};

// Re-export metrics registry and fork-choice metrics.
pub use metrics::{ForkChoiceMetrics, MetricsRegistry, run_prometheus_http_server};

// Re-export domain types at the crate root for convenience.
pub use types::*;

