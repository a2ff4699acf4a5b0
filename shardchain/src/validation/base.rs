//! Base validity predicate for blocks.
//!
//! This validator enforces cheap, deterministic invariants that only look
//! at the block itself, such as:
//!
//! - every shard the block mentions is a recognized shard,
//! - a block never points at its own shard as parent or source,
//! - genesis blocks (and only genesis blocks) have no predecessor,
//! - every message carries a positive TTL.
//!
//! Checks that need other blocks, such as height continuity with `prev`,
//! belong to the surrounding node.

use crate::consensus::config::ForkChoiceConfig;
use crate::consensus::error::ValidationError;
use crate::consensus::validator::BlockValidator;
use crate::types::{Block, MessageLog, ShardId, ShardRegistry};

/// Base validity predicate for blocks.
///
/// This struct is built from the recognized shard set and performs purely
/// block-local checks that are inexpensive to run.
#[derive(Clone, Debug)]
pub struct BaseValidity {
    registry: ShardRegistry,
}

impl BaseValidity {
    pub fn new(registry: ShardRegistry) -> Self {
        Self { registry }
    }

    /// Constructs a new `BaseValidity` from the fork-choice configuration.
    pub fn from_config(cfg: &ForkChoiceConfig) -> Self {
        Self::new(cfg.registry())
    }

    fn check_known(&self, shard: ShardId, role: &str) -> Result<(), ValidationError> {
        if !self.registry.contains(shard) {
            return Err(ValidationError::Custom(format!(
                "{role} shard {shard} is not a recognized shard"
            )));
        }
        Ok(())
    }

    fn check_shards(&self, block: &Block) -> Result<(), ValidationError> {
        let own = block.shard();
        self.check_known(own, "block")?;

        if let Some(parent) = block.parent_shard() {
            if parent == own {
                return Err(ValidationError::Invalid("shard is its own parent shard"));
            }
            self.check_known(parent, "parent")?;
        }

        for shard in block.sources.keys() {
            if *shard == own {
                return Err(ValidationError::Invalid("block lists its own shard as a source"));
            }
            self.check_known(*shard, "source")?;
        }

        Self::check_log_keys(&block.sent_log, own, "sent")?;
        Self::check_log_keys(&block.received_log, own, "received")?;
        for shard in block.sent_log.shards().chain(block.received_log.shards()) {
            self.check_known(shard, "message")?;
        }
        Ok(())
    }

    fn check_log_keys(log: &MessageLog, own: ShardId, kind: &str) -> Result<(), ValidationError> {
        if log.shards().any(|s| s == own) {
            return Err(ValidationError::Custom(format!(
                "{kind} log of shard {own} has an entry for its own shard"
            )));
        }
        Ok(())
    }

    fn check_height(&self, block: &Block) -> Result<(), ValidationError> {
        match (block.prev(), block.height()) {
            (None, 0) | (Some(_), 1..) => Ok(()),
            (None, _) => Err(ValidationError::Invalid(
                "block above height 0 has no predecessor",
            )),
            (Some(_), 0) => Err(ValidationError::Invalid("genesis block has a predecessor")),
        }
    }

    fn check_ttls(&self, block: &Block) -> Result<(), ValidationError> {
        let zero_ttl = block
            .sent_log
            .iter()
            .chain(block.received_log.iter())
            .any(|(_, m)| m.ttl == 0);
        if zero_ttl {
            return Err(ValidationError::Invalid("message TTL must be positive"));
        }
        Ok(())
    }
}

impl BlockValidator for BaseValidity {
    fn validate(&self, block: &Block) -> Result<(), ValidationError> {
        self.check_shards(block)?;
        self.check_height(block)?;
        self.check_ttls(block)?;
        Ok(())
    }
}
