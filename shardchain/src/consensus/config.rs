use serde::Deserialize;

use crate::types::{ShardId, ShardRegistry};

/// Fork-choice configuration parameters.
///
/// This covers the protocol-level shard set as well as how resolution is
/// scheduled on the local machine.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ForkChoiceConfig {
    /// Recognized shard identifiers.
    pub shard_ids: Vec<ShardId>,
    /// Whether to resolve sibling shards concurrently.
    pub parallel: bool,
}

impl ForkChoiceConfig {
    /// The recognized shard set as a [`ShardRegistry`].
    pub fn registry(&self) -> ShardRegistry {
        self.shard_ids.iter().copied().collect()
    }
}

impl Default for ForkChoiceConfig {
    fn default() -> Self {
        Self {
            shard_ids: vec![ShardId(0), ShardId(1), ShardId(2)],
            parallel: false,
        }
    }
}
