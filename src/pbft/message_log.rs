/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Per-sequence bookkeeping of pre-prepares and deduplicated votes.
//!
//! ## Window
//!
//! The log only holds slots for sequences in the window `(low_water_mark, low_water_mark + window_size]`.
//! The low-water mark is the replica's last stable checkpoint: every sequence at or below it is committed
//! and its slot has been [garbage collected](MessageLog::garbage_collect). Since slots are only created
//! inside the window, the log never holds more than `window_size` slots.
//!
//! ## Deduplication
//!
//! Each slot keeps at most one PREPARE and one COMMIT vote per sender, and at most one pre-prepare. The
//! first pre-prepare accepted for a sequence wins: later ones are rejected whether they repeat it or
//! equivocate.

use std::collections::{BTreeMap, HashMap};

use crate::types::{
    block::Block,
    data_types::{CryptoHash, NodeId, SequenceNumber, ViewNumber},
    node_set::NodeSet,
};

use super::{
    roles::select_leader,
    types::{DropReason, Phase, SlotPhase},
};

/// The pre-prepare accepted for a slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrePrepareRecord {
    pub sender: NodeId,
    pub view: ViewNumber,
    pub block: Block,
}

/// Everything a replica knows about a single sequence number that has not yet been garbage collected.
#[derive(Clone, Debug)]
pub struct PendingSlot {
    pre_prepare: Option<PrePrepareRecord>,
    prepare_votes: HashMap<NodeId, CryptoHash>,
    commit_votes: HashMap<NodeId, CryptoHash>,
    phase: SlotPhase,
    resolved: bool,
    faulted: bool,
}

impl PendingSlot {
    fn new() -> PendingSlot {
        PendingSlot {
            pre_prepare: None,
            prepare_votes: HashMap::new(),
            commit_votes: HashMap::new(),
            phase: SlotPhase::Idle,
            resolved: false,
            faulted: false,
        }
    }

    pub fn pre_prepare(&self) -> Option<&PrePrepareRecord> {
        self.pre_prepare.as_ref()
    }

    /// Hash of the block of the accepted pre-prepare. Votes only count towards this hash.
    pub fn block_hash(&self) -> Option<CryptoHash> {
        self.pre_prepare.as_ref().map(|record| record.block.hash)
    }

    pub fn phase(&self) -> SlotPhase {
        self.phase
    }

    /// Whether the slot's block has been appended to the ledger.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Whether the slot's block failed an integrity check when it was about to be appended.
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    pub fn votes(&self, phase: Phase) -> &HashMap<NodeId, CryptoHash> {
        match phase {
            Phase::Prepare => &self.prepare_votes,
            Phase::Commit => &self.commit_votes,
        }
    }

    fn count_votes(&self, phase: Phase, block_hash: &CryptoHash) -> usize {
        self.votes(phase).values().filter(|hash| *hash == block_hash).count()
    }
}

pub struct MessageLog {
    node_set: NodeSet,
    current_view: ViewNumber,
    slots: BTreeMap<SequenceNumber, PendingSlot>,
    low_water_mark: SequenceNumber,
    window_size: u64,
}

impl MessageLog {
    pub fn new(
        node_set: NodeSet,
        current_view: ViewNumber,
        low_water_mark: SequenceNumber,
        window_size: u64,
    ) -> MessageLog {
        MessageLog {
            node_set,
            current_view,
            slots: BTreeMap::new(),
            low_water_mark,
            window_size,
        }
    }

    pub fn node_set(&self) -> &NodeSet {
        &self.node_set
    }

    pub fn quorum(&self) -> usize {
        self.node_set.quorum()
    }

    pub fn current_view(&self) -> ViewNumber {
        self.current_view
    }

    /// Move to a later view. Pre-prepares for older views are rejected from then on. Slots that were
    /// pre-prepared in older views keep their pre-prepare.
    pub fn enter_view(&mut self, view: ViewNumber) {
        if view > self.current_view {
            self.current_view = view
        }
    }

    pub fn low_water_mark(&self) -> SequenceNumber {
        self.low_water_mark
    }

    pub fn high_water_mark(&self) -> SequenceNumber {
        self.low_water_mark + self.window_size
    }

    /// Check that `sequence` is inside the window.
    pub fn check_window(&self, sequence: SequenceNumber) -> Result<(), DropReason> {
        if sequence <= self.low_water_mark {
            Err(DropReason::StaleMessage)
        } else if sequence > self.high_water_mark() {
            Err(DropReason::OutsideWindow)
        } else {
            Ok(())
        }
    }

    /// Accept `block` as the pre-prepare for `sequence`, or explain why not.
    pub fn record_pre_prepare(
        &mut self,
        sequence: SequenceNumber,
        sender: &NodeId,
        view: ViewNumber,
        block: Block,
    ) -> Result<(), DropReason> {
        self.check_window(sequence)?;
        if view < self.current_view {
            return Err(DropReason::StaleMessage);
        }
        if &select_leader(view, &self.node_set) != sender {
            return Err(DropReason::UnknownOrWrongSender);
        }

        let slot = self.slots.entry(sequence).or_insert_with(PendingSlot::new);
        if let Some(existing) = &slot.pre_prepare {
            return if existing.block.hash == block.hash {
                Err(DropReason::DuplicatePrePrepare)
            } else {
                Err(DropReason::Equivocation)
            };
        }

        slot.pre_prepare = Some(PrePrepareRecord {
            sender: sender.clone(),
            view,
            block,
        });
        slot.phase = SlotPhase::PrePrepared;
        Ok(())
    }

    /// Record `sender`'s PREPARE vote for `block_hash`. Returns whether a new vote was introduced.
    pub fn record_prepare(
        &mut self,
        sequence: SequenceNumber,
        sender: &NodeId,
        block_hash: CryptoHash,
    ) -> bool {
        self.record_vote(Phase::Prepare, sequence, sender, block_hash)
    }

    /// Record `sender`'s COMMIT vote for `block_hash`. Returns whether a new vote was introduced.
    pub fn record_commit(
        &mut self,
        sequence: SequenceNumber,
        sender: &NodeId,
        block_hash: CryptoHash,
    ) -> bool {
        self.record_vote(Phase::Commit, sequence, sender, block_hash)
    }

    fn record_vote(
        &mut self,
        phase: Phase,
        sequence: SequenceNumber,
        sender: &NodeId,
        block_hash: CryptoHash,
    ) -> bool {
        if self.check_window(sequence).is_err() || !self.node_set.contains(sender) {
            return false;
        }

        let slot = self.slots.entry(sequence).or_insert_with(PendingSlot::new);
        let votes = match phase {
            Phase::Prepare => &mut slot.prepare_votes,
            Phase::Commit => &mut slot.commit_votes,
        };
        if votes.contains_key(sender) {
            return false;
        }
        votes.insert(sender.clone(), block_hash);
        true
    }

    /// Number of distinct senders that voted for `block_hash` in `phase` for `sequence`.
    pub fn count_votes(&self, sequence: SequenceNumber, phase: Phase, block_hash: &CryptoHash) -> usize {
        self.slots
            .get(&sequence)
            .map(|slot| slot.count_votes(phase, block_hash))
            .unwrap_or(0)
    }

    pub fn slot(&self, sequence: SequenceNumber) -> Option<&PendingSlot> {
        self.slots.get(&sequence)
    }

    /// Number of slots currently held.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Move `sequence` from `PrePrepared` to `Prepared`. Returns `false` if the slot was not
    /// `PrePrepared`.
    pub(crate) fn mark_prepared(&mut self, sequence: SequenceNumber) -> bool {
        match self.slots.get_mut(&sequence) {
            Some(slot) if slot.phase == SlotPhase::PrePrepared => {
                slot.phase = SlotPhase::Prepared;
                true
            }
            _ => false,
        }
    }

    /// Move `sequence` from `Prepared` to `Committed` and resolve it. Returns `false` if the slot was not
    /// `Prepared` or is already resolved.
    pub(crate) fn mark_committed(&mut self, sequence: SequenceNumber) -> bool {
        match self.slots.get_mut(&sequence) {
            Some(slot) if slot.phase == SlotPhase::Prepared && !slot.resolved => {
                slot.phase = SlotPhase::Committed;
                slot.resolved = true;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn mark_faulted(&mut self, sequence: SequenceNumber) {
        if let Some(slot) = self.slots.get_mut(&sequence) {
            slot.faulted = true;
        }
    }

    /// Evict every slot at or below `checkpoint` and make `checkpoint` the new low-water mark. Returns the
    /// number of slots evicted.
    pub fn garbage_collect(&mut self, checkpoint: SequenceNumber) -> usize {
        if checkpoint <= self.low_water_mark {
            return 0;
        }
        let retained = self.slots.split_off(&(checkpoint + 1));
        let evicted = self.slots.len();
        self.slots = retained;
        self.low_water_mark = checkpoint;
        evicted
    }
}
