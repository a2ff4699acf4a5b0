//! Cross-shard block filtering.
//!
//! A block of a non-root shard only takes part in its shard's GHOST walk
//! if it is consistent with the fork choice already resolved for the
//! parent shard:
//!
//! 1. the parent tip's recorded view of this shard must be on the same
//!    branch as the candidate (ancestor or descendant),
//! 2. the candidate's reference into the parent shard must still be on the
//!    parent's canonical chain,
//! 3. every message the candidate newly sends upward must be anchored on
//!    the parent's canonical chain,
//! 4. no message between the two chains may have outlived its TTL without
//!    being received, in either direction.
//!
//! Conditions are checked in that order and the first failing one is
//! reported.

use std::collections::HashSet;
use std::fmt;

use crate::types::{Block, BlockHash, Message, ShardId};

use super::error::{ForkChoiceError, InvalidInput, InvariantViolation};
use super::store::BlockStore;

/// Why a candidate block was excluded from its shard's walk.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FilterReason {
    /// The parent tip references a block of this shard on another branch.
    SourceDisagreement,
    /// The candidate references a parent-shard block the parent abandoned.
    OrphanedSource,
    /// A message the candidate sends upward is anchored on an abandoned
    /// parent-shard block.
    OrphanedMessageBase,
    /// The candidate is past the deadline of a message the parent sent it.
    MissedDownwardDelivery,
    /// The parent tip is past the deadline of a message the candidate's
    /// chain sent it.
    MissedUpwardDelivery,
}

impl FilterReason {
    pub const ALL: [FilterReason; 5] = [
        FilterReason::SourceDisagreement,
        FilterReason::OrphanedSource,
        FilterReason::OrphanedMessageBase,
        FilterReason::MissedDownwardDelivery,
        FilterReason::MissedUpwardDelivery,
    ];

    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterReason::SourceDisagreement => "source_disagreement",
            FilterReason::OrphanedSource => "orphaned_source",
            FilterReason::OrphanedMessageBase => "orphaned_message_base",
            FilterReason::MissedDownwardDelivery => "missed_downward_delivery",
            FilterReason::MissedUpwardDelivery => "missed_upward_delivery",
        }
    }
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter for the candidate blocks of one child shard, bound to the
/// resolved tip of its parent shard.
pub struct CrossShardFilter<'a, S: ?Sized> {
    store: &'a S,
    parent_shard: ShardId,
    parent_tip_hash: BlockHash,
    parent_tip: &'a Block,
}

impl<'a, S> CrossShardFilter<'a, S>
where
    S: BlockStore + ?Sized,
{
    /// Binds the filter to `parent_tip`, the resolved tip of `parent_shard`.
    pub fn new(
        store: &'a S,
        parent_shard: ShardId,
        parent_tip: BlockHash,
    ) -> Result<Self, ForkChoiceError> {
        let block = store
            .get_block(&parent_tip)
            .ok_or(InvariantViolation::MissingTip(parent_tip))?;

        Ok(Self {
            store,
            parent_shard,
            parent_tip_hash: parent_tip,
            parent_tip: block,
        })
    }

    pub fn parent_shard(&self) -> ShardId {
        self.parent_shard
    }

    pub fn parent_tip(&self) -> &BlockHash {
        &self.parent_tip_hash
    }

    /// Returns the first rule `candidate` breaks, or `None` if it may take
    /// part in its shard's walk.
    pub fn evaluate(&self, candidate: &Block) -> Result<Option<FilterReason>, ForkChoiceError> {
        self.evaluate_hashed(&candidate.compute_hash(), candidate)
    }

    /// [`CrossShardFilter::evaluate`] for a candidate whose hash is already
    /// known. `hash` must be `candidate`'s hash.
    pub fn evaluate_hashed(
        &self,
        hash: &BlockHash,
        candidate: &Block,
    ) -> Result<Option<FilterReason>, ForkChoiceError> {
        if self.disagrees_with_parent_view(hash, candidate) {
            return Ok(Some(FilterReason::SourceDisagreement));
        }
        if self.has_orphaned_source(candidate) {
            return Ok(Some(FilterReason::OrphanedSource));
        }
        if self.has_orphaned_message_base(candidate) {
            return Ok(Some(FilterReason::OrphanedMessageBase));
        }
        if self.missed_downward_delivery(candidate)? {
            return Ok(Some(FilterReason::MissedDownwardDelivery));
        }
        if self.missed_upward_delivery(hash, candidate)? {
            return Ok(Some(FilterReason::MissedUpwardDelivery));
        }
        Ok(None)
    }

    /// Boolean form of [`CrossShardFilter::evaluate`].
    pub fn is_filtered(&self, candidate: &Block) -> Result<bool, ForkChoiceError> {
        Ok(self.evaluate(candidate)?.is_some())
    }

    fn disagrees_with_parent_view(&self, hash: &BlockHash, candidate: &Block) -> bool {
        match self.parent_tip.source(candidate.shard()) {
            Some(view) => {
                !self.store.is_in_chain(view, hash) && !self.store.is_in_chain(hash, view)
            }
            None => false,
        }
    }

    fn has_orphaned_source(&self, candidate: &Block) -> bool {
        match candidate.source(self.parent_shard) {
            Some(source) => !self.store.is_in_chain(source, &self.parent_tip_hash),
            None => false,
        }
    }

    fn has_orphaned_message_base(&self, candidate: &Block) -> bool {
        let prev = candidate.prev().and_then(|p| self.store.get_block(p));
        candidate
            .newly_sent(prev, self.parent_shard)
            .into_iter()
            .any(|m| !self.store.is_in_chain(&m.base, &self.parent_tip_hash))
    }

    fn missed_downward_delivery(&self, candidate: &Block) -> Result<bool, ForkChoiceError> {
        let received: HashSet<&Message> = candidate
            .received_log
            .messages(self.parent_shard)
            .iter()
            .collect();

        for message in self.parent_tip.sent_log.messages(candidate.shard()) {
            if received.contains(message) {
                continue;
            }
            let base_height = self.base_height(&self.parent_tip_hash, message)?;
            if message.is_expired_at(base_height, candidate.height()) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn missed_upward_delivery(
        &self,
        hash: &BlockHash,
        candidate: &Block,
    ) -> Result<bool, ForkChoiceError> {
        let received: HashSet<&Message> = self
            .parent_tip
            .received_log
            .messages(candidate.shard())
            .iter()
            .collect();

        for message in candidate.sent_log.messages(self.parent_shard) {
            if received.contains(message) {
                continue;
            }
            let base_height = self.base_height(hash, message)?;
            if message.is_expired_at(base_height, self.parent_tip.height()) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn base_height(&self, carrier: &BlockHash, message: &Message) -> Result<u64, ForkChoiceError> {
        self.store
            .get_block(&message.base)
            .map(Block::height)
            .ok_or_else(|| {
                InvalidInput::UnknownMessageBase {
                    block: *carrier,
                    base: message.base,
                }
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BlockUniverse;
    use crate::testing::{account, child_genesis, extend, root_genesis};

    const PARENT: ShardId = ShardId(0);
    const CHILD: ShardId = ShardId(1);

    fn filter<'a>(
        universe: &'a BlockUniverse,
        parent_tip: &Block,
    ) -> CrossShardFilter<'a, BlockUniverse> {
        CrossShardFilter::new(universe, PARENT, parent_tip.compute_hash()).expect("tip is known")
    }

    #[test]
    fn consistent_candidate_passes() {
        let p0 = root_genesis(PARENT);
        let p1 = Block::child_of(&p0);
        let c0 = child_genesis(CHILD, PARENT);
        let c1 = Block::child_of(&c0).with_source(PARENT, p1.compute_hash());
        let universe = BlockUniverse::new([p0, p1.clone(), c0, c1.clone()]);

        assert_eq!(filter(&universe, &p1).evaluate(&c1).unwrap(), None);
    }

    #[test]
    fn parent_view_on_another_branch_filters() {
        let p0 = root_genesis(PARENT);
        let c0 = child_genesis(CHILD, PARENT);
        let left = Block::child_of(&c0);
        let left2 = Block::child_of(&left);
        let right = Block::child_of(&c0).with_timestamp(30);
        let p1 = Block::child_of(&p0).with_source(CHILD, left.compute_hash());
        let universe = BlockUniverse::new([
            p0,
            p1.clone(),
            c0.clone(),
            left.clone(),
            left2.clone(),
            right.clone(),
        ]);
        let f = filter(&universe, &p1);

        assert_eq!(
            f.evaluate(&right).unwrap(),
            Some(FilterReason::SourceDisagreement)
        );
        // Ancestors and descendants of the recorded view agree with it.
        assert_eq!(f.evaluate(&c0).unwrap(), None);
        assert_eq!(f.evaluate(&left).unwrap(), None);
        assert_eq!(f.evaluate(&left2).unwrap(), None);
    }

    #[test]
    fn reference_to_abandoned_parent_block_filters() {
        let p0 = root_genesis(PARENT);
        let p1 = Block::child_of(&p0);
        let p1_fork = Block::child_of(&p0).with_proposer(account(42));
        let c0 = child_genesis(CHILD, PARENT);
        let good = Block::child_of(&c0).with_source(PARENT, p0.compute_hash());
        let bad = Block::child_of(&c0).with_source(PARENT, p1_fork.compute_hash());
        let universe = BlockUniverse::new([
            p0,
            p1.clone(),
            p1_fork,
            c0,
            good.clone(),
            bad.clone(),
        ]);
        let f = filter(&universe, &p1);

        assert!(!f.is_filtered(&good).unwrap());
        assert_eq!(f.evaluate(&bad).unwrap(), Some(FilterReason::OrphanedSource));
    }

    #[test]
    fn upward_message_on_abandoned_base_filters() {
        let p0 = root_genesis(PARENT);
        let p1 = Block::child_of(&p0);
        let p1_fork = Block::child_of(&p0).with_proposer(account(42));
        let c0 = child_genesis(CHILD, PARENT);
        let orphaned = Message::new(p1_fork.compute_hash(), 100, b"up".to_vec());
        let anchored = Message::new(p0.compute_hash(), 100, b"up".to_vec());
        let bad = Block::child_of(&c0).send(PARENT, orphaned);
        let good = Block::child_of(&c0).send(PARENT, anchored);
        let universe = BlockUniverse::new([
            p0,
            p1.clone(),
            p1_fork,
            c0,
            good.clone(),
            bad.clone(),
        ]);
        let f = filter(&universe, &p1);

        assert_eq!(
            f.evaluate(&bad).unwrap(),
            Some(FilterReason::OrphanedMessageBase)
        );
        assert_eq!(f.evaluate(&good).unwrap(), None);
    }

    #[test]
    fn inherited_upward_messages_are_not_rechecked_for_bases() {
        let p0 = root_genesis(PARENT);
        let p1 = Block::child_of(&p0);
        let p1_fork = Block::child_of(&p0).with_proposer(account(42));
        let c0 = child_genesis(CHILD, PARENT);
        let sender = Block::child_of(&c0)
            .send(PARENT, Message::new(p1_fork.compute_hash(), 100, Vec::new()));
        let follower = Block::child_of(&sender);
        let universe = BlockUniverse::new([
            p0,
            p1.clone(),
            p1_fork,
            c0,
            sender.clone(),
            follower.clone(),
        ]);
        let f = filter(&universe, &p1);

        assert_eq!(
            f.evaluate(&sender).unwrap(),
            Some(FilterReason::OrphanedMessageBase)
        );
        // The follower only inherits the message; excluding `sender` already
        // removes it from the walk.
        assert_eq!(f.evaluate(&follower).unwrap(), None);
    }

    #[test]
    fn downward_deadline_boundary() {
        // Child chain at heights 0..=15; the message is anchored at height 10
        // with a TTL of 5, so it expires at height 15.
        let c0 = child_genesis(CHILD, PARENT);
        let mut child_chain = vec![c0.clone()];
        child_chain.extend(extend(&c0, 15));
        let base = &child_chain[10];
        let message = Message::new(base.compute_hash(), 5, b"down".to_vec());

        let p0 = root_genesis(PARENT);
        let p1 = Block::child_of(&p0).send(CHILD, message.clone());
        let at_14 = child_chain[14].clone();
        let at_15 = child_chain[15].clone();
        let at_15_received = Block::child_of(&at_14)
            .with_timestamp(500)
            .receive(PARENT, message);

        let mut blocks = child_chain.clone();
        blocks.extend([p0, p1.clone(), at_15_received.clone()]);
        let universe = BlockUniverse::new(blocks);
        let f = filter(&universe, &p1);

        assert_eq!(at_14.height(), 14);
        assert_eq!(f.evaluate(&at_14).unwrap(), None);
        assert_eq!(
            f.evaluate(&at_15).unwrap(),
            Some(FilterReason::MissedDownwardDelivery)
        );
        assert_eq!(f.evaluate(&at_15_received).unwrap(), None);
    }

    #[test]
    fn upward_deadline_uses_parent_tip_height() {
        let p0 = root_genesis(PARENT);
        let parent_chain = extend(&p0, 2);
        let p1 = parent_chain[0].clone();
        let p2 = parent_chain[1].clone();

        let c0 = child_genesis(CHILD, PARENT);
        let message = Message::new(p0.compute_hash(), 2, b"up".to_vec());
        let sender = Block::child_of(&c0).send(PARENT, message.clone());
        let p2_received = Block::child_of(&p1)
            .with_timestamp(900)
            .receive(CHILD, message);

        let universe = BlockUniverse::new([
            p0,
            p1.clone(),
            p2.clone(),
            p2_received.clone(),
            c0,
            sender.clone(),
        ]);

        // Parent tip at height 1: deadline 0 + 2 not reached yet.
        assert_eq!(filter(&universe, &p1).evaluate(&sender).unwrap(), None);
        // Parent tip at height 2 without receipt: expired.
        assert_eq!(
            filter(&universe, &p2).evaluate(&sender).unwrap(),
            Some(FilterReason::MissedUpwardDelivery)
        );
        // Parent tip at height 2 that recorded receipt: fine.
        assert_eq!(
            filter(&universe, &p2_received).evaluate(&sender).unwrap(),
            None
        );
    }

    #[test]
    fn first_failing_rule_is_reported() {
        let p0 = root_genesis(PARENT);
        let p1 = Block::child_of(&p0);
        let p1_fork = Block::child_of(&p0).with_proposer(account(42));
        let c0 = child_genesis(CHILD, PARENT);
        // Orphaned source and an expired upward message at once.
        let candidate = Block::child_of(&c0)
            .with_source(PARENT, p1_fork.compute_hash())
            .send(PARENT, Message::new(p0.compute_hash(), 1, Vec::new()));
        let universe = BlockUniverse::new([p0, p1.clone(), p1_fork, c0, candidate.clone()]);

        assert_eq!(
            filter(&universe, &p1).evaluate(&candidate).unwrap(),
            Some(FilterReason::OrphanedSource)
        );
    }

    #[test]
    fn hashed_evaluation_matches_plain_evaluation() {
        let p0 = root_genesis(PARENT);
        let p1 = Block::child_of(&p0);
        let p1_fork = Block::child_of(&p0).with_proposer(account(42));
        let c0 = child_genesis(CHILD, PARENT);
        let kept = Block::child_of(&c0).with_source(PARENT, p1.compute_hash());
        let dropped = Block::child_of(&c0).with_source(PARENT, p1_fork.compute_hash());
        let universe = BlockUniverse::new([
            p0,
            p1.clone(),
            p1_fork,
            c0,
            kept.clone(),
            dropped.clone(),
        ]);
        let filter = filter(&universe, &p1);

        for candidate in [&kept, &dropped] {
            assert_eq!(
                filter.evaluate_hashed(&candidate.compute_hash(), candidate).unwrap(),
                filter.evaluate(candidate).unwrap()
            );
        }
        assert_eq!(
            filter.evaluate_hashed(&dropped.compute_hash(), &dropped).unwrap(),
            Some(FilterReason::OrphanedSource)
        );
    }

    #[test]
    fn unknown_message_base_is_an_input_error() {
        let p0 = root_genesis(PARENT);
        let c0 = child_genesis(CHILD, PARENT);
        let ghost_base = root_genesis(ShardId(7)).compute_hash();
        let p1 = Block::child_of(&p0).send(CHILD, Message::new(ghost_base, 3, Vec::new()));
        let universe = BlockUniverse::new([p0, p1.clone(), c0.clone()]);

        let err = filter(&universe, &p1).evaluate(&c0).unwrap_err();
        assert_eq!(
            err,
            ForkChoiceError::from(InvalidInput::UnknownMessageBase {
                block: p1.compute_hash(),
                base: ghost_base,
            })
        );
    }

    #[test]
    fn unknown_parent_tip_is_rejected() {
        let universe = BlockUniverse::new([root_genesis(PARENT)]);
        let missing = root_genesis(ShardId(9)).compute_hash();

        assert!(matches!(
            CrossShardFilter::new(&universe, PARENT, missing),
            Err(ForkChoiceError::InvariantViolation(
                InvariantViolation::MissingTip(_)
            ))
        ));
    }
}
