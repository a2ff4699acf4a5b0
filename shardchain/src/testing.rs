//! Block builders shared by unit tests.

use crate::types::{AccountId, Block, HASH_LEN, Hash256, ShardId, ShardRegistry};

pub(crate) fn account(byte: u8) -> AccountId {
    AccountId(Hash256([byte; HASH_LEN]))
}

/// Genesis of a shard without a parent.
pub(crate) fn root_genesis(shard: ShardId) -> Block {
    Block::genesis(shard, None, account(shard.0 as u8 + 1), 0)
}

/// Genesis of a shard hanging below `parent`.
pub(crate) fn child_genesis(shard: ShardId, parent: ShardId) -> Block {
    Block::genesis(shard, Some(parent), account(shard.0 as u8 + 1), 0)
}

/// `n` blocks extending `from` one after another, `from` itself excluded.
pub(crate) fn extend(from: &Block, n: usize) -> Vec<Block> {
    let mut out: Vec<Block> = Vec::with_capacity(n);
    for _ in 0..n {
        let next = Block::child_of(out.last().unwrap_or(from));
        out.push(next);
    }
    out
}

pub(crate) fn registry(ids: &[u16]) -> ShardRegistry {
    ids.iter().copied().map(ShardId).collect()
}
