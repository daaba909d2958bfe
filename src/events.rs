/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of pbft_rs events for event handling and logging.
//!
//! An event for a given action indicates that the action has been completed. Every event carries the
//! `timestamp` at which it was emitted.
//!
//! Events are published by the algorithm thread onto an `mpsc` channel, and consumed by the
//! [event bus](crate::event_bus) thread, which fires the handlers registered for each event type in the
//! [`ReplicaSpec`](crate::replica::ReplicaSpec). No event is published if no handler is registered.

use std::sync::mpsc::Sender;
use std::time::SystemTime;

use crate::{
    ledger::LedgerEntry,
    pbft::{
        messages::{Envelope, EnvelopeType},
        types::{DropReason, IntegrityFailure, Phase},
    },
    types::{
        block::Block,
        data_types::{CryptoHash, NodeId, Payload, SequenceNumber, ViewNumber},
    },
};

pub enum Event {
    // Events that change persistent state.
    CommitBlock(CommitBlockEvent),
    // Events that involve broadcasting/sending a message.
    Propose(ProposeEvent),
    Vote(VoteEvent),
    ForwardRequest(ForwardRequestEvent),
    // Events that involve receiving a message.
    ReceivePrePrepare(ReceivePrePrepareEvent),
    ReceiveVote(ReceiveVoteEvent),
    ReceiveRequest(ReceiveRequestEvent),
    // Progress events.
    CollectQuorum(CollectQuorumEvent),
    AdvanceView(AdvanceViewEvent),
    Checkpoint(CheckpointEvent),
    // Failure events.
    DropMessage(DropMessageEvent),
    RejectPayload(RejectPayloadEvent),
    IntegrityFailure(IntegrityFailureEvent),
}

impl Event {
    /// Send the event to the event bus, if there is one.
    ///
    /// Events published after the event bus has shut down are discarded.
    pub(crate) fn publish(self, event_publisher: &Option<Sender<Event>>) {
        if let Some(event_publisher) = event_publisher {
            let _ = event_publisher.send(self);
        }
    }
}

/// A block was appended to the ledger.
pub struct CommitBlockEvent {
    pub timestamp: SystemTime,
    pub entry: LedgerEntry,
}

/// The leader broadcast a PRE-PREPARE for `block`.
pub struct ProposeEvent {
    pub timestamp: SystemTime,
    pub view: ViewNumber,
    pub block: Block,
}

/// The replica broadcast a PREPARE or COMMIT vote.
pub struct VoteEvent {
    pub timestamp: SystemTime,
    pub phase: Phase,
    pub view: ViewNumber,
    pub sequence: SequenceNumber,
    pub block_hash: CryptoHash,
}

/// A replica that is not the leader forwarded a client payload to the `leader`.
pub struct ForwardRequestEvent {
    pub timestamp: SystemTime,
    pub leader: NodeId,
    pub payload: Payload,
}

pub struct ReceivePrePrepareEvent {
    pub timestamp: SystemTime,
    pub origin: NodeId,
    pub envelope: Envelope,
}

pub struct ReceiveVoteEvent {
    pub timestamp: SystemTime,
    pub origin: NodeId,
    pub envelope: Envelope,
}

/// A forwarded client payload arrived from `origin`.
pub struct ReceiveRequestEvent {
    pub timestamp: SystemTime,
    pub origin: NodeId,
    pub payload: Payload,
}

/// A quorum of votes in `phase` was collected for `block_hash` at `sequence`.
pub struct CollectQuorumEvent {
    pub timestamp: SystemTime,
    pub phase: Phase,
    pub view: ViewNumber,
    pub sequence: SequenceNumber,
    pub block_hash: CryptoHash,
}

/// The replica moved to `view`, which is led by `leader`.
pub struct AdvanceViewEvent {
    pub timestamp: SystemTime,
    pub view: ViewNumber,
    pub leader: NodeId,
}

/// The replica took a stable checkpoint at `sequence` and evicted `pruned_slots` slots.
pub struct CheckpointEvent {
    pub timestamp: SystemTime,
    pub sequence: SequenceNumber,
    pub pruned_slots: usize,
}

/// An envelope from `origin` was dropped without affecting consensus state.
pub struct DropMessageEvent {
    pub timestamp: SystemTime,
    pub origin: NodeId,
    pub envelope_type: EnvelopeType,
    pub view: ViewNumber,
    pub sequence: SequenceNumber,
    pub reason: DropReason,
}

/// The leader could not pre-prepare the client `payload` at `sequence`, because the sequence already holds
/// a pre-prepare from an earlier view. The payload is not ordered.
pub struct RejectPayloadEvent {
    pub timestamp: SystemTime,
    pub view: ViewNumber,
    pub sequence: SequenceNumber,
    pub payload: Payload,
    pub reason: DropReason,
}

/// A commit-certified block at `sequence` failed an integrity check and was not appended.
pub struct IntegrityFailureEvent {
    pub timestamp: SystemTime,
    pub sequence: SequenceNumber,
    pub failure: IntegrityFailure,
}
