/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via replica's
//! [config](crate::replica::Configuration).
//!
//! pbft_rs logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a [ReceivePrePrepare](crate::events::ReceivePrePrepareEvent) is printed:
//!
//! ```text
//! ReceivePrePrepare, 1701329264, node0, 0, 12, fNGCJyk
//! ```
//!
//! In the snippet:
//! - The third value is the origin of the pre-prepare.
//! - The fourth and fifth values are the view and the sequence number of the pre-prepare.
//! - The sixth value is the first seven characters of the Base64 encoding of the hash of the proposed
//!   block.
//!
//! Dropped messages are logged at the `debug` level, rejected payloads at the `warn` level, integrity
//! failures at the `error` level, and every other event at the `info` level.

use std::time::SystemTime;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};

use crate::events::*;

// Names of each event in PascalCase for printing:
pub const COMMIT_BLOCK: &str = "CommitBlock";

pub const PROPOSE: &str = "Propose";
pub const VOTE: &str = "Vote";
pub const FORWARD_REQUEST: &str = "ForwardRequest";

pub const RECEIVE_PRE_PREPARE: &str = "ReceivePrePrepare";
pub const RECEIVE_VOTE: &str = "ReceiveVote";
pub const RECEIVE_REQUEST: &str = "ReceiveRequest";

pub const COLLECT_QUORUM: &str = "CollectQuorum";
pub const ADVANCE_VIEW: &str = "AdvanceView";
pub const CHECKPOINT: &str = "Checkpoint";

pub const DROP_MESSAGE: &str = "DropMessage";
pub const REJECT_PAYLOAD: &str = "RejectPayload";
pub const INTEGRITY_FAILURE: &str = "IntegrityFailure";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for CommitBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |commit_block_event: &CommitBlockEvent| {
            log::info!(
                "{}, {}, {}, {}",
                COMMIT_BLOCK,
                secs_since_unix_epoch(commit_block_event.timestamp),
                commit_block_event.entry.sequence,
                first_seven_base64_chars(&commit_block_event.entry.hash.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for ProposeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |propose_event: &ProposeEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                PROPOSE,
                secs_since_unix_epoch(propose_event.timestamp),
                propose_event.view,
                propose_event.block.sequence,
                first_seven_base64_chars(&propose_event.block.hash.bytes()),
                first_seven_base64_chars(&propose_event.block.previous_hash.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for VoteEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |vote_event: &VoteEvent| {
            log::info!(
                "{}, {}, {:?}, {}, {}, {}",
                VOTE,
                secs_since_unix_epoch(vote_event.timestamp),
                vote_event.phase,
                vote_event.view,
                vote_event.sequence,
                first_seven_base64_chars(&vote_event.block_hash.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for ForwardRequestEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |forward_request_event: &ForwardRequestEvent| {
            log::info!(
                "{}, {}, {}, {}",
                FORWARD_REQUEST,
                secs_since_unix_epoch(forward_request_event.timestamp),
                forward_request_event.leader,
                forward_request_event.payload.len()
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReceivePrePrepareEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |receive_pre_prepare_event: &ReceivePrePrepareEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                RECEIVE_PRE_PREPARE,
                secs_since_unix_epoch(receive_pre_prepare_event.timestamp),
                receive_pre_prepare_event.origin,
                receive_pre_prepare_event.envelope.view,
                receive_pre_prepare_event.envelope.sequence,
                first_seven_base64_chars(&receive_pre_prepare_event.envelope.block_hash.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReceiveVoteEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |receive_vote_event: &ReceiveVoteEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}, {}",
                RECEIVE_VOTE,
                secs_since_unix_epoch(receive_vote_event.timestamp),
                receive_vote_event.origin,
                receive_vote_event.envelope.envelope_type,
                receive_vote_event.envelope.view,
                receive_vote_event.envelope.sequence,
                first_seven_base64_chars(&receive_vote_event.envelope.block_hash.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReceiveRequestEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |receive_request_event: &ReceiveRequestEvent| {
            log::info!(
                "{}, {}, {}, {}",
                RECEIVE_REQUEST,
                secs_since_unix_epoch(receive_request_event.timestamp),
                receive_request_event.origin,
                receive_request_event.payload.len()
            )
        };
        Box::new(logger)
    }
}

impl Logger for CollectQuorumEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |collect_quorum_event: &CollectQuorumEvent| {
            log::info!(
                "{}, {}, {:?}, {}, {}, {}",
                COLLECT_QUORUM,
                secs_since_unix_epoch(collect_quorum_event.timestamp),
                collect_quorum_event.phase,
                collect_quorum_event.view,
                collect_quorum_event.sequence,
                first_seven_base64_chars(&collect_quorum_event.block_hash.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for AdvanceViewEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |advance_view_event: &AdvanceViewEvent| {
            log::info!(
                "{}, {}, {}, {}",
                ADVANCE_VIEW,
                secs_since_unix_epoch(advance_view_event.timestamp),
                advance_view_event.view,
                advance_view_event.leader
            )
        };
        Box::new(logger)
    }
}

impl Logger for CheckpointEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |checkpoint_event: &CheckpointEvent| {
            log::info!(
                "{}, {}, {}, {}",
                CHECKPOINT,
                secs_since_unix_epoch(checkpoint_event.timestamp),
                checkpoint_event.sequence,
                checkpoint_event.pruned_slots
            )
        };
        Box::new(logger)
    }
}

impl Logger for DropMessageEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |drop_message_event: &DropMessageEvent| {
            log::debug!(
                "{}, {}, {}, {}, {}, {}, {}",
                DROP_MESSAGE,
                secs_since_unix_epoch(drop_message_event.timestamp),
                drop_message_event.origin,
                drop_message_event.envelope_type,
                drop_message_event.view,
                drop_message_event.sequence,
                drop_message_event.reason
            )
        };
        Box::new(logger)
    }
}

impl Logger for RejectPayloadEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |reject_payload_event: &RejectPayloadEvent| {
            log::warn!(
                "{}, {}, {}, {}, {}, {}",
                REJECT_PAYLOAD,
                secs_since_unix_epoch(reject_payload_event.timestamp),
                reject_payload_event.view,
                reject_payload_event.sequence,
                reject_payload_event.payload.len(),
                reject_payload_event.reason
            )
        };
        Box::new(logger)
    }
}

impl Logger for IntegrityFailureEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |integrity_failure_event: &IntegrityFailureEvent| {
            log::error!(
                "{}, {}, {}, {}",
                INTEGRITY_FAILURE,
                secs_since_unix_epoch(integrity_failure_event.timestamp),
                integrity_failure_event.sequence,
                integrity_failure_event.failure
            )
        };
        Box::new(logger)
    }
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7 characters.
fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}
