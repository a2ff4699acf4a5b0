//! Per-shard tip resolution over the shard hierarchy.
//!
//! A root shard resolves with a plain GHOST walk from its starting block.
//! Any other shard first resolves its parent (recursively, through the
//! shared [`TipsCache`]), excludes every candidate block the
//! [`CrossShardFilter`] rejects against the parent tip, and then walks.
//!
//! All precondition checks run once, when the resolver is built. A
//! resolver borrows an immutable snapshot, so every tip it writes into a
//! cache stays valid for as long as that snapshot does.

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::metrics::ForkChoiceMetrics;
use crate::types::{Block, BlockHash, ShardId, ShardRegistry};

use super::cache::{CacheKey, TipsCache};
use super::error::{ForkChoiceError, InvalidInput, InvariantViolation};
use super::filter::CrossShardFilter;
use super::fork_choice::{ForkChoice, GhostWalk, WeightedVotes};
use super::store::BlockStore;
use super::validator::BlockValidator;

/// Starting block per shard: the block each shard's walk begins from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StartingBlocks(BTreeMap<ShardId, BlockHash>);

impl StartingBlocks {
    /// Builds the mapping, rejecting shard ids outside `registry` and
    /// shards given more than once.
    pub fn new(
        registry: &ShardRegistry,
        pairs: impl IntoIterator<Item = (ShardId, BlockHash)>,
    ) -> Result<Self, InvalidInput> {
        let mut map = BTreeMap::new();
        for (shard, block) in pairs {
            if !registry.contains(shard) {
                return Err(InvalidInput::UnknownShard(shard));
            }
            if map.insert(shard, block).is_some() {
                return Err(InvalidInput::DuplicateStartingBlock(shard));
            }
        }
        Ok(Self(map))
    }

    pub fn get(&self, shard: ShardId) -> Option<&BlockHash> {
        self.0.get(&shard)
    }

    pub fn shards(&self) -> impl Iterator<Item = ShardId> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShardId, &BlockHash)> + '_ {
        self.0.iter().map(|(s, b)| (*s, b))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Sharded fork choice over one validated snapshot.
pub struct ShardedResolver<'a, S: ?Sized, F = GhostWalk> {
    registry: &'a ShardRegistry,
    store: &'a S,
    votes: &'a WeightedVotes,
    starting: &'a StartingBlocks,
    fork_choice: F,
    metrics: Option<ForkChoiceMetrics>,
}

impl<'a, S> ShardedResolver<'a, S, GhostWalk>
where
    S: BlockStore + ?Sized,
{
    /// Validates the inputs and binds a resolver to them.
    ///
    /// Every block of the store must pass `validator`, and every message it
    /// logs must have its base in the store. Every starting block
    /// must be known and belong to the shard it is keyed by. Every weighted
    /// block must be known and carry a positive weight.
    pub fn new<V>(
        registry: &'a ShardRegistry,
        store: &'a S,
        votes: &'a WeightedVotes,
        starting: &'a StartingBlocks,
        validator: &V,
    ) -> Result<Self, ForkChoiceError>
    where
        V: BlockValidator + ?Sized,
    {
        for (shard, hash) in starting.iter() {
            if !registry.contains(shard) {
                return Err(InvalidInput::UnknownShard(shard).into());
            }
            let block = store
                .get_block(hash)
                .ok_or(InvalidInput::StartingBlockNotInUniverse {
                    shard,
                    block: *hash,
                })?;
            if block.shard() != shard {
                return Err(InvalidInput::StartingBlockShardMismatch {
                    shard,
                    block: *hash,
                    actual: block.shard(),
                }
                .into());
            }
        }

        for (hash, weight) in votes.iter() {
            if !store.contains(hash) {
                return Err(InvalidInput::VoteNotInUniverse(*hash).into());
            }
            if weight == 0 {
                return Err(InvalidInput::NonPositiveWeight(*hash).into());
            }
        }

        // Covers starting and weighted blocks as well.
        for (hash, block) in store.blocks() {
            validator
                .validate(block)
                .map_err(|reason| InvalidInput::InvalidBlock {
                    block: *hash,
                    reason,
                })?;

            let logged = block.sent_log.iter().chain(block.received_log.iter());
            for (_, message) in logged {
                if !store.contains(&message.base) {
                    return Err(InvalidInput::UnknownMessageBase {
                        block: *hash,
                        base: message.base,
                    }
                    .into());
                }
            }
        }

        Ok(Self {
            registry,
            store,
            votes,
            starting,
            fork_choice: GhostWalk,
            metrics: None,
        })
    }
}

impl<'a, S, F> ShardedResolver<'a, S, F>
where
    S: BlockStore + ?Sized,
    F: ForkChoice,
{
    /// Replaces the shard-local fork-choice rule.
    pub fn with_fork_choice<G: ForkChoice>(self, fork_choice: G) -> ShardedResolver<'a, S, G> {
        ShardedResolver {
            registry: self.registry,
            store: self.store,
            votes: self.votes,
            starting: self.starting,
            fork_choice,
            metrics: self.metrics,
        }
    }

    pub fn with_metrics(mut self, metrics: ForkChoiceMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn starting_blocks(&self) -> &StartingBlocks {
        self.starting
    }

    /// Resolves the tip of `shard`, reusing and extending `cache`.
    pub fn resolve(
        &self,
        shard: ShardId,
        cache: &mut TipsCache,
    ) -> Result<BlockHash, ForkChoiceError> {
        let mut resolving = Vec::new();
        self.resolve_with_stack(shard, cache, &mut resolving)
    }

    /// Resolves every shard that has a starting block, in shard order.
    pub fn resolve_all(
        &self,
        cache: &mut TipsCache,
    ) -> Result<BTreeMap<ShardId, BlockHash>, ForkChoiceError> {
        let mut tips = BTreeMap::new();
        for shard in self.starting.shards() {
            tips.insert(shard, self.resolve(shard, cache)?);
        }
        Ok(tips)
    }

    fn start_of(&self, shard: ShardId) -> Result<(BlockHash, &'a Block), ForkChoiceError> {
        if !self.registry.contains(shard) {
            return Err(InvalidInput::UnknownShard(shard).into());
        }
        let start = *self
            .starting
            .get(shard)
            .ok_or(InvalidInput::MissingStartingBlock(shard))?;
        let block = self
            .store
            .get_block(&start)
            .ok_or(InvalidInput::StartingBlockNotInUniverse {
                shard,
                block: start,
            })?;
        Ok((start, block))
    }

    fn resolve_with_stack(
        &self,
        shard: ShardId,
        cache: &mut TipsCache,
        resolving: &mut Vec<ShardId>,
    ) -> Result<BlockHash, ForkChoiceError> {
        if let Some(pos) = resolving.iter().position(|s| *s == shard) {
            let mut path = resolving[pos..].to_vec();
            path.push(shard);
            return Err(InvariantViolation::ShardCycle(path).into());
        }

        let (start, start_block) = self.start_of(shard)?;
        let key = CacheKey::new(shard, start);
        if let Some(tip) = cache.get(&key) {
            trace!(%shard, %tip, "tips cache hit");
            if let Some(m) = &self.metrics {
                m.cache_hits_total.inc();
            }
            return Ok(tip);
        }

        resolving.push(shard);
        let result = self.compute_tip(shard, start, start_block, cache, resolving);
        resolving.pop();

        Ok(cache.insert(key, result?))
    }

    fn compute_tip(
        &self,
        shard: ShardId,
        start: BlockHash,
        start_block: &Block,
        cache: &mut TipsCache,
        resolving: &mut Vec<ShardId>,
    ) -> Result<BlockHash, ForkChoiceError> {
        let started = Instant::now();

        let excluded = match start_block.parent_shard() {
            None => HashSet::new(),
            Some(parent) => {
                let parent_tip = self.resolve_with_stack(parent, cache, resolving)?;
                self.excluded_candidates(shard, parent, parent_tip)?
            }
        };

        let walk = self
            .fork_choice
            .walk(self.store, &start, self.votes, &excluded)?;

        debug!(
            %shard,
            tip = %walk.tip,
            steps = walk.steps,
            excluded = excluded.len(),
            "resolved shard tip"
        );
        if let Some(m) = &self.metrics {
            m.resolutions_total.inc();
            m.walk_steps.observe(walk.steps as f64);
            m.resolve_seconds.observe(started.elapsed().as_secs_f64());
        }

        Ok(walk.tip)
    }

    /// Blocks of `shard` that the filter bound to `parent_tip` rejects.
    fn excluded_candidates(
        &self,
        shard: ShardId,
        parent: ShardId,
        parent_tip: BlockHash,
    ) -> Result<HashSet<BlockHash>, ForkChoiceError> {
        let filter = CrossShardFilter::new(self.store, parent, parent_tip)?;
        let mut excluded = HashSet::new();

        for hash in self.store.blocks_in_shard(shard) {
            let Some(candidate) = self.store.get_block(hash) else {
                continue;
            };
            if candidate.parent_shard() != Some(parent) {
                return Err(InvalidInput::ParentShardMismatch {
                    shard,
                    block: *hash,
                }
                .into());
            }

            if let Some(m) = &self.metrics {
                m.filter_evaluations_total.inc();
            }
            if let Some(reason) = filter.evaluate_hashed(hash, candidate)? {
                debug!(%shard, block = %hash, %reason, "excluding block from walk");
                if let Some(m) = &self.metrics {
                    m.record_filtered(reason);
                }
                excluded.insert(*hash);
            }
        }

        Ok(excluded)
    }

    /// Groups the shards with starting blocks by their depth below a root
    /// shard.
    fn levels(&self) -> Result<Vec<Vec<ShardId>>, ForkChoiceError> {
        let mut depths: BTreeMap<ShardId, usize> = BTreeMap::new();
        for shard in self.starting.shards() {
            self.depth_of(shard, &mut depths, &mut Vec::new())?;
        }

        let mut levels: Vec<Vec<ShardId>> = Vec::new();
        for (shard, depth) in depths {
            if levels.len() <= depth {
                levels.resize_with(depth + 1, Vec::new);
            }
            levels[depth].push(shard);
        }
        Ok(levels)
    }

    fn depth_of(
        &self,
        shard: ShardId,
        depths: &mut BTreeMap<ShardId, usize>,
        visiting: &mut Vec<ShardId>,
    ) -> Result<usize, ForkChoiceError> {
        if let Some(depth) = depths.get(&shard) {
            return Ok(*depth);
        }
        if let Some(pos) = visiting.iter().position(|s| *s == shard) {
            let mut path = visiting[pos..].to_vec();
            path.push(shard);
            return Err(InvariantViolation::ShardCycle(path).into());
        }

        let (_, start_block) = self.start_of(shard)?;
        let depth = match start_block.parent_shard() {
            None => 0,
            Some(parent) => {
                visiting.push(shard);
                let parent_depth = self.depth_of(parent, depths, visiting);
                visiting.pop();
                parent_depth? + 1
            }
        };
        depths.insert(shard, depth);
        Ok(depth)
    }
}

impl<'a, S, F> ShardedResolver<'a, S, F>
where
    S: BlockStore + Sync + ?Sized,
    F: ForkChoice + Sync,
{
    /// Same result as [`ShardedResolver::resolve_all`], resolving sibling
    /// shards concurrently.
    ///
    /// Shards are processed one hierarchy level at a time, so every parent
    /// tip is in `cache` before any of its children start. Each worker
    /// resolves against its own copy of the cache; the copies are merged
    /// back once the level is done.
    pub fn resolve_all_parallel(
        &self,
        cache: &mut TipsCache,
    ) -> Result<BTreeMap<ShardId, BlockHash>, ForkChoiceError> {
        let mut tips = BTreeMap::new();

        for level in self.levels()? {
            let snapshot: &TipsCache = cache;
            let resolved: Vec<(ShardId, BlockHash, TipsCache)> = level
                .par_iter()
                .map(|&shard| {
                    let mut local = snapshot.clone();
                    let tip = self.resolve(shard, &mut local)?;
                    Ok::<_, ForkChoiceError>((shard, tip, local))
                })
                .collect::<Result<_, ForkChoiceError>>()?;

            for (shard, tip, local) in resolved {
                cache.merge(local);
                tips.insert(shard, tip);
            }
        }

        Ok(tips)
    }
}
