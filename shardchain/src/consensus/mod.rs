//! Sharded fork choice and related abstractions.
//!
//! This module provides a modular, testable fork-choice layer consisting
//! of:
//!
//! - configuration parameters ([`config::ForkChoiceConfig`]),
//! - a block storage abstraction ([`store::BlockStore`]),
//! - pluggable validity predicates ([`validator::BlockValidator`]),
//! - the shard-local GHOST walk ([`fork_choice::GhostWalk`]),
//! - the cross-shard candidate filter ([`filter::CrossShardFilter`]),
//! - the memoized tips cache ([`cache::TipsCache`]),
//! - and the resolver that ties them together over the shard hierarchy
//!   ([`resolver::ShardedResolver`]).

pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod fork_choice;
pub mod resolver;
pub mod store;
pub mod validator;

pub use cache::{CacheKey, TipsCache};
pub use config::ForkChoiceConfig;
pub use error::{ForkChoiceError, InvalidInput, InvariantViolation, ValidationError};
pub use filter::{CrossShardFilter, FilterReason};
pub use fork_choice::{ForkChoice, GhostWalk, Walk, WeightedVotes};
pub use resolver::{ShardedResolver, StartingBlocks};
pub use store::BlockStore;
pub use validator::{AcceptAllValidator, BlockValidator, CombinedValidator};
