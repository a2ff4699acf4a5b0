//! In-memory block universe.
//!
//! This is the snapshot every fork-choice session runs against. It keeps
//! all blocks in a `BTreeMap` keyed by `BlockHash` (so iteration follows
//! the canonical hash order) plus two secondary indexes: children by
//! predecessor and block hashes by shard.
//!
//! A universe is built once and never mutated afterwards; to change the
//! block set, build a new universe.

use std::collections::{BTreeMap, HashMap};

use crate::consensus::store::BlockStore;
use crate::types::{Block, BlockHash, ShardId};

/// Immutable in-memory implementation of [`BlockStore`].
#[derive(Clone, Debug, Default)]
pub struct BlockUniverse {
    blocks: BTreeMap<BlockHash, Block>,
    children: HashMap<BlockHash, Vec<BlockHash>>,
    by_shard: HashMap<ShardId, Vec<BlockHash>>,
}

impl BlockUniverse {
    /// Builds a universe from `blocks`. Duplicate blocks collapse into one.
    pub fn new(blocks: impl IntoIterator<Item = Block>) -> Self {
        let blocks: BTreeMap<BlockHash, Block> = blocks
            .into_iter()
            .map(|block| (block.compute_hash(), block))
            .collect();

        let mut children: HashMap<BlockHash, Vec<BlockHash>> = HashMap::new();
        let mut by_shard: HashMap<ShardId, Vec<BlockHash>> = HashMap::new();

        // Ascending iteration keeps every index list sorted.
        for (hash, block) in &blocks {
            if let Some(prev) = block.prev() {
                children.entry(*prev).or_default().push(*hash);
            }
            by_shard.entry(block.shard()).or_default().push(*hash);
        }

        Self {
            blocks,
            children,
            by_shard,
        }
    }

    /// Shards that have at least one block in the universe.
    pub fn shards(&self) -> impl Iterator<Item = ShardId> + '_ {
        self.by_shard.keys().copied()
    }
}

impl FromIterator<Block> for BlockUniverse {
    fn from_iter<I: IntoIterator<Item = Block>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl BlockStore for BlockUniverse {
    fn get_block(&self, hash: &BlockHash) -> Option<&Block> {
        self.blocks.get(hash)
    }

    fn len(&self) -> usize {
        self.blocks.len()
    }

    fn blocks(&self) -> Box<dyn Iterator<Item = (&BlockHash, &Block)> + '_> {
        Box::new(self.blocks.iter())
    }

    fn children(&self, hash: &BlockHash) -> &[BlockHash] {
        self.children.get(hash).map(Vec::as_slice).unwrap_or(&[])
    }

    fn blocks_in_shard(&self, shard: ShardId) -> &[BlockHash] {
        self.by_shard.get(&shard).map(Vec::as_slice).unwrap_or(&[])
    }
}
