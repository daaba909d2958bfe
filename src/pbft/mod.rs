/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Three-phase protocol for committing `Block`s.
//!
//! ## Phases
//!
//! For every sequence number, the replicas of a cluster of `N` members agree on exactly one block in
//! three phases, tolerating up to `f = floor((N - 1) / 3)` members that crash, stay silent, or lie:
//! 1. **Pre-prepare**: the leader of the current view assigns the payload the next sequence number,
//!    builds a block that links to the hash of the previous one, and broadcasts it in a
//!    [`PrePrepare`](messages::EnvelopeType::PrePrepare) envelope. Every replica that accepts the
//!    pre-prepare broadcasts a [`Prepare`](messages::EnvelopeType::Prepare) vote for the block's hash.
//! 2. **Prepare**: once a replica has collected a quorum of `2f + 1` PREPARE votes matching its accepted
//!    pre-prepare, the block is "prepared" and the replica broadcasts a
//!    [`Commit`](messages::EnvelopeType::Commit) vote.
//! 3. **Commit**: once a replica has collected a quorum of COMMIT votes, it checks the block once more
//!    and appends it to its [ledger](crate::ledger::Ledger).
//!
//! Any two quorums intersect in at least one correct replica, and correct replicas accept at most one
//! pre-prepare per sequence, so no two correct replicas can commit different blocks at the same sequence.
//!
//! ## Ordering
//!
//! Blocks are appended strictly in sequence order. A block whose commit quorum completes before its
//! predecessor is committed waits until the predecessor is appended. The leader may have several
//! sequences in flight at once; each new block links to the block the leader pre-prepared just before it.
//!
//! ## Leader selection
//!
//! The leader of view `v` is the member at position `v mod N` of the lexicographically sorted member
//! list. See [`roles`].
//!
//! ## Views
//!
//! Replicas only process envelopes from their current view. Views advance by operator command
//! ([`advance_view`](implementation::ConsensusEngine::advance_view)). There is no view change
//! sub-protocol: sequences left in flight by a faulty leader stay uncommitted.
//!
//! Envelopes for a view the replica has not entered yet, or for sequences above its high-water mark, are
//! held in a bounded buffer and processed once the replica catches up.
//!
//! ## Checkpoints
//!
//! Every `checkpoint_interval` commits, a replica takes a local stable checkpoint: it discards all
//! bookkeeping for sequences at or below the checkpoint, and raises the low-water mark of its
//! [message log](message_log) to it.

pub(crate) mod envelope_buffer;

pub mod implementation;

pub mod message_log;

pub mod messages;

pub mod roles;

pub mod types;
