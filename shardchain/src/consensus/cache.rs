//! Memoized per-shard tips.
//!
//! Resolving a child shard resolves its parent first, and every candidate
//! block of the child consults that parent tip. Without memoization the
//! same parent resolution would run over and over down the shard tree. The
//! cache is an explicit object owned by the caller and threaded through
//! each call; it is append-only for one resolution session.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::types::{BlockHash, ShardId};

/// Key of a cached tip: the shard and the block its walk started from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct CacheKey {
    pub shard: ShardId,
    pub start: BlockHash,
}

impl CacheKey {
    pub fn new(shard: ShardId, start: BlockHash) -> Self {
        Self { shard, start }
    }
}

/// Cache of resolved tips keyed by [`CacheKey`].
///
/// Entries are written at most once: the first value stored under a key
/// is canonical for the session and later inserts never replace it.
#[derive(Clone, Debug, Default)]
pub struct TipsCache {
    entries: HashMap<CacheKey, BlockHash>,
}

impl TipsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<BlockHash> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Stores `tip` under `key` unless the key is already resolved, and
    /// returns the canonical tip for the key.
    pub fn insert(&mut self, key: CacheKey, tip: BlockHash) -> BlockHash {
        match self.entries.entry(key) {
            Entry::Occupied(existing) => *existing.get(),
            Entry::Vacant(slot) => *slot.insert(tip),
        }
    }

    /// Folds every entry of `other` into this cache, first writer wins.
    ///
    /// A key already present keeps its tip even if `other` disagrees.
    pub fn merge(&mut self, other: TipsCache) {
        for (key, tip) in other.entries {
            self.insert(key, tip);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CacheKey, &BlockHash)> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HASH_LEN, Hash256};

    fn dummy_hash(byte: u8) -> BlockHash {
        BlockHash(Hash256([byte; HASH_LEN]))
    }

    #[test]
    fn first_insert_is_canonical() {
        let mut cache = TipsCache::new();
        let key = CacheKey::new(ShardId(0), dummy_hash(1));

        assert_eq!(cache.insert(key, dummy_hash(2)), dummy_hash(2));
        assert_eq!(cache.insert(key, dummy_hash(2)), dummy_hash(2));
        assert_eq!(cache.get(&key), Some(dummy_hash(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn keys_differ_by_starting_block() {
        let mut cache = TipsCache::new();
        cache.insert(CacheKey::new(ShardId(0), dummy_hash(1)), dummy_hash(3));

        assert!(!cache.contains(&CacheKey::new(ShardId(0), dummy_hash(2))));
        assert!(!cache.contains(&CacheKey::new(ShardId(1), dummy_hash(1))));
    }

    #[test]
    fn merge_keeps_existing_entries() {
        let mut a = TipsCache::new();
        let mut b = TipsCache::new();
        let shared = CacheKey::new(ShardId(0), dummy_hash(1));
        let only_b = CacheKey::new(ShardId(1), dummy_hash(4));

        a.insert(shared, dummy_hash(2));
        b.insert(shared, dummy_hash(2));
        b.insert(only_b, dummy_hash(5));

        a.merge(b);

        assert_eq!(a.len(), 2);
        assert_eq!(a.get(&only_b), Some(dummy_hash(5)));
    }

    #[test]
    fn merge_never_overwrites_a_conflicting_tip() {
        let mut a = TipsCache::new();
        let mut b = TipsCache::new();
        let key = CacheKey::new(ShardId(0), dummy_hash(1));

        a.insert(key, dummy_hash(2));
        b.insert(key, dummy_hash(9));
        a.merge(b);

        assert_eq!(a.get(&key), Some(dummy_hash(2)));
        assert_eq!(a.insert(key, dummy_hash(9)), dummy_hash(2));
    }
}
