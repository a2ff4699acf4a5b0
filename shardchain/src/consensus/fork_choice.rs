//! Filtered GHOST fork choice within a single shard.
//!
//! Starting from a given block, the walk repeatedly descends into the
//! child whose subtree carries the most vote weight, skipping children in
//! an exclusion set, until it reaches a block without eligible children.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::types::BlockHash;

use super::error::{ForkChoiceError, InvalidInput, InvariantViolation};
use super::store::BlockStore;

/// Vote weight per block.
///
/// A vote for a block counts for every block on its chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WeightedVotes(BTreeMap<BlockHash, u64>);

impl WeightedVotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the vote set from `(block, weight)` pairs.
    ///
    /// A block may be weighted only once.
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (BlockHash, u64)>,
    ) -> Result<Self, InvalidInput> {
        let mut votes = Self::new();
        for (block, weight) in pairs {
            votes.insert(block, weight)?;
        }
        Ok(votes)
    }

    pub fn insert(&mut self, block: BlockHash, weight: u64) -> Result<(), InvalidInput> {
        if self.0.insert(block, weight).is_some() {
            return Err(InvalidInput::DuplicateVote(block));
        }
        Ok(())
    }

    pub fn weight(&self, block: &BlockHash) -> Option<u64> {
        self.0.get(block).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BlockHash, u64)> + '_ {
        self.0.iter().map(|(b, w)| (b, *w))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of a fork-choice walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Walk {
    /// Block at which the walk stopped.
    pub tip: BlockHash,
    /// Number of descents taken from the starting block.
    pub steps: usize,
}

/// Abstraction over shard-local fork-choice rules.
pub trait ForkChoice {
    /// Walks from `start` to the preferred tip, never entering a block in
    /// `excluded`.
    ///
    /// Fails with [`InvariantViolation::StartExcluded`] if `start` itself
    /// is excluded.
    fn walk<S: BlockStore + ?Sized>(
        &self,
        store: &S,
        start: &BlockHash,
        votes: &WeightedVotes,
        excluded: &HashSet<BlockHash>,
    ) -> Result<Walk, ForkChoiceError>;
}

/// Greedy heaviest-observed-subtree walk.
///
/// The score of a child is the total weight of votes whose chain contains
/// it. Children are compared in ascending hash order and only a strictly
/// greater score displaces the current winner, so equal scores resolve to
/// the lowest [`BlockHash`].
#[derive(Clone, Copy, Debug, Default)]
pub struct GhostWalk;

impl GhostWalk {
    /// Accumulates each vote's weight onto every block of its chain.
    pub fn subtree_weights<S: BlockStore + ?Sized>(
        store: &S,
        votes: &WeightedVotes,
    ) -> HashMap<BlockHash, u128> {
        let mut weights: HashMap<BlockHash, u128> = HashMap::new();
        for (voted, weight) in votes.iter() {
            let mut cursor = Some(voted);
            while let Some(hash) = cursor {
                *weights.entry(*hash).or_default() += u128::from(weight);
                cursor = store.get_block(hash).and_then(|b| b.prev());
            }
        }
        weights
    }

    /// Highest-scoring child of `block` outside `excluded`, if any.
    pub fn best_child<S: BlockStore + ?Sized>(
        &self,
        store: &S,
        block: &BlockHash,
        weights: &HashMap<BlockHash, u128>,
        excluded: &HashSet<BlockHash>,
    ) -> Option<BlockHash> {
        let mut best: Option<(BlockHash, u128)> = None;

        for child in store.children(block) {
            if excluded.contains(child) {
                continue;
            }
            let score = weights.get(child).copied().unwrap_or(0);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((*child, score)),
            }
        }

        best.map(|(hash, _)| hash)
    }
}

impl ForkChoice for GhostWalk {
    fn walk<S: BlockStore + ?Sized>(
        &self,
        store: &S,
        start: &BlockHash,
        votes: &WeightedVotes,
        excluded: &HashSet<BlockHash>,
    ) -> Result<Walk, ForkChoiceError> {
        if excluded.contains(start) {
            return Err(InvariantViolation::StartExcluded(*start).into());
        }

        let weights = Self::subtree_weights(store, votes);
        let mut tip = *start;
        let mut steps = 0;

        while let Some(next) = self.best_child(store, &tip, &weights, excluded) {
            tip = next;
            steps += 1;
        }

        Ok(Walk { tip, steps })
    }
}
