//! Read-only view of the block universe used by fork choice.

use crate::types::{Block, BlockHash, ShardId};

/// Abstract view of the known block set.
///
/// Fork choice never writes to the store: one resolution session works on
/// an immutable snapshot. Enumeration order is part of the contract, since
/// GHOST tie-breaks depend on it: `blocks` and `children` yield hashes in
/// ascending [`BlockHash`] order.
pub trait BlockStore {
    /// Fetches a block by hash, if present.
    fn get_block(&self, hash: &BlockHash) -> Option<&Block>;

    /// Returns `true` if the block is part of the universe.
    fn contains(&self, hash: &BlockHash) -> bool {
        self.get_block(hash).is_some()
    }

    /// Number of blocks in the universe.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every block, in ascending hash order.
    fn blocks(&self) -> Box<dyn Iterator<Item = (&BlockHash, &Block)> + '_>;

    /// Blocks whose `prev` is `hash`, in ascending hash order.
    fn children(&self, hash: &BlockHash) -> &[BlockHash];

    /// Blocks belonging to `shard`, in ascending hash order.
    fn blocks_in_shard(&self, shard: ShardId) -> &[BlockHash];

    /// Chain-membership oracle.
    ///
    /// Returns `true` iff `ancestor` is on the chain ending at `block`,
    /// following `prev` links. Reflexive: every block is in-chain with
    /// itself, including hashes the store does not know.
    fn is_in_chain(&self, ancestor: &BlockHash, block: &BlockHash) -> bool {
        if ancestor == block {
            return true;
        }
        if !self.contains(ancestor) {
            return false;
        }

        let mut cursor = self.get_block(block).and_then(Block::prev);
        while let Some(hash) = cursor {
            if hash == ancestor {
                return true;
            }
            cursor = self.get_block(hash).and_then(Block::prev);
        }
        false
    }
}
