/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types specific to the PBFT protocol.

use std::fmt::{self, Display, Formatter};

use crate::types::data_types::{CryptoHash, NodeId, SequenceNumber, ViewNumber};

/// The two voting phases of the protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Prepare,
    Commit,
}

/// Where a sequence number is in its progression towards the ledger.
///
/// Slots only ever move forward through these states, one step at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SlotPhase {
    /// No pre-prepare has been accepted. Votes may already have been recorded.
    Idle,

    /// A pre-prepare from the leader has been accepted and this replica has voted PREPARE for its block.
    PrePrepared,

    /// A quorum of PREPARE votes for the pre-prepared block was collected and this replica has voted
    /// COMMIT for it.
    Prepared,

    /// The block was appended to the ledger.
    Committed,
}

/// Why an envelope was dropped without affecting consensus state.
///
/// None of these are fatal: the envelope is discarded and the replica carries on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// The signature does not verify against the claimed sender.
    AuthenticationFailure,

    /// The claimed sender is not a member of the cluster.
    NotAMember,

    /// The envelope belongs to an older view, or to a sequence at or below the low-water mark.
    StaleMessage,

    /// The envelope belongs to a view this replica has not entered, and the buffer of early envelopes is
    /// full.
    FutureView,

    /// The sequence is above the high-water mark, and the buffer of early envelopes is full.
    OutsideWindow,

    /// A pre-prepare from a replica that is not the leader of its view.
    UnknownOrWrongSender,

    /// The envelope is structurally invalid: a pre-prepare without a block, a vote with one, or a block
    /// whose sequence, hash, or contents do not match the envelope.
    MalformedEnvelope,

    /// The sender already voted in this phase for this sequence.
    DuplicateVote,

    /// A second pre-prepare for a sequence that already has one, proposing a different block.
    Equivocation,

    /// A second copy of the pre-prepare already accepted for this sequence.
    DuplicatePrePrepare,
}

impl Display for DropReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            DropReason::AuthenticationFailure => "AuthenticationFailure",
            DropReason::NotAMember => "NotAMember",
            DropReason::StaleMessage => "StaleMessage",
            DropReason::FutureView => "FutureView",
            DropReason::OutsideWindow => "OutsideWindow",
            DropReason::UnknownOrWrongSender => "UnknownOrWrongSender",
            DropReason::MalformedEnvelope => "MalformedEnvelope",
            DropReason::DuplicateVote => "DuplicateVote",
            DropReason::Equivocation => "Equivocation",
            DropReason::DuplicatePrePrepare => "DuplicatePrePrepare",
        };
        f.write_str(name)
    }
}

/// A commit-certified block that could not be appended. The sequence stays uncommitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IntegrityFailure {
    /// The block's contents do not hash to the hash that the quorum voted for.
    HashMismatch {
        expected: CryptoHash,
        computed: CryptoHash,
    },

    /// The block does not link to the hash of the entry before it.
    BrokenChain {
        expected: CryptoHash,
        found: CryptoHash,
    },

    /// The entry before the block is missing from the ledger.
    MissingPredecessor { predecessor: SequenceNumber },

    /// The ledger already holds a different entry at the block's sequence.
    LedgerConflict {
        existing: CryptoHash,
        attempted: CryptoHash,
    },
}

impl Display for IntegrityFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityFailure::HashMismatch { expected, computed } => {
                write!(f, "HashMismatch, {}, {}", expected, computed)
            }
            IntegrityFailure::BrokenChain { expected, found } => {
                write!(f, "BrokenChain, {}, {}", expected, found)
            }
            IntegrityFailure::MissingPredecessor { predecessor } => {
                write!(f, "MissingPredecessor, {}", predecessor)
            }
            IntegrityFailure::LedgerConflict { existing, attempted } => {
                write!(f, "LedgerConflict, {}, {}", existing, attempted)
            }
        }
    }
}

/// A read-only snapshot of a replica's consensus state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicaStatus {
    pub node: NodeId,
    pub view: ViewNumber,
    pub leader: NodeId,
    pub peers: Vec<NodeId>,
    pub last_committed: SequenceNumber,
}
