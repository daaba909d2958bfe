/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The event bus thread, which receives [events](crate::events) published by the algorithm thread and
//! fires the handlers registered for them.

use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::events::*;
use crate::logging::Logger;

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

pub(crate) struct EventHandlers {
    pub(crate) commit_block_handlers: Vec<HandlerPtr<CommitBlockEvent>>,
    pub(crate) propose_handlers: Vec<HandlerPtr<ProposeEvent>>,
    pub(crate) vote_handlers: Vec<HandlerPtr<VoteEvent>>,
    pub(crate) forward_request_handlers: Vec<HandlerPtr<ForwardRequestEvent>>,
    pub(crate) receive_pre_prepare_handlers: Vec<HandlerPtr<ReceivePrePrepareEvent>>,
    pub(crate) receive_vote_handlers: Vec<HandlerPtr<ReceiveVoteEvent>>,
    pub(crate) receive_request_handlers: Vec<HandlerPtr<ReceiveRequestEvent>>,
    pub(crate) collect_quorum_handlers: Vec<HandlerPtr<CollectQuorumEvent>>,
    pub(crate) advance_view_handlers: Vec<HandlerPtr<AdvanceViewEvent>>,
    pub(crate) checkpoint_handlers: Vec<HandlerPtr<CheckpointEvent>>,
    pub(crate) drop_message_handlers: Vec<HandlerPtr<DropMessageEvent>>,
    pub(crate) reject_payload_handlers: Vec<HandlerPtr<RejectPayloadEvent>>,
    pub(crate) integrity_failure_handlers: Vec<HandlerPtr<IntegrityFailureEvent>>,
}

impl EventHandlers {
    /// Collect the user-defined handlers, adding the default [logger](crate::logging) of every event type
    /// in front of them if `log_events` is set.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        log_events: bool,
        commit_block_handler: Option<HandlerPtr<CommitBlockEvent>>,
        propose_handler: Option<HandlerPtr<ProposeEvent>>,
        vote_handler: Option<HandlerPtr<VoteEvent>>,
        forward_request_handler: Option<HandlerPtr<ForwardRequestEvent>>,
        receive_pre_prepare_handler: Option<HandlerPtr<ReceivePrePrepareEvent>>,
        receive_vote_handler: Option<HandlerPtr<ReceiveVoteEvent>>,
        receive_request_handler: Option<HandlerPtr<ReceiveRequestEvent>>,
        collect_quorum_handler: Option<HandlerPtr<CollectQuorumEvent>>,
        advance_view_handler: Option<HandlerPtr<AdvanceViewEvent>>,
        checkpoint_handler: Option<HandlerPtr<CheckpointEvent>>,
        drop_message_handler: Option<HandlerPtr<DropMessageEvent>>,
        reject_payload_handler: Option<HandlerPtr<RejectPayloadEvent>>,
        integrity_failure_handler: Option<HandlerPtr<IntegrityFailureEvent>>,
    ) -> EventHandlers {
        EventHandlers {
            commit_block_handlers: handlers(log_events, commit_block_handler),
            propose_handlers: handlers(log_events, propose_handler),
            vote_handlers: handlers(log_events, vote_handler),
            forward_request_handlers: handlers(log_events, forward_request_handler),
            receive_pre_prepare_handlers: handlers(log_events, receive_pre_prepare_handler),
            receive_vote_handlers: handlers(log_events, receive_vote_handler),
            receive_request_handlers: handlers(log_events, receive_request_handler),
            collect_quorum_handlers: handlers(log_events, collect_quorum_handler),
            advance_view_handlers: handlers(log_events, advance_view_handler),
            checkpoint_handlers: handlers(log_events, checkpoint_handler),
            drop_message_handlers: handlers(log_events, drop_message_handler),
            reject_payload_handlers: handlers(log_events, reject_payload_handler),
            integrity_failure_handlers: handlers(log_events, integrity_failure_handler),
        }
    }

    /// Whether no handler at all is registered, in which case no event needs to be published.
    pub(crate) fn is_empty(&self) -> bool {
        self.commit_block_handlers.is_empty()
            && self.propose_handlers.is_empty()
            && self.vote_handlers.is_empty()
            && self.forward_request_handlers.is_empty()
            && self.receive_pre_prepare_handlers.is_empty()
            && self.receive_vote_handlers.is_empty()
            && self.receive_request_handlers.is_empty()
            && self.collect_quorum_handlers.is_empty()
            && self.advance_view_handlers.is_empty()
            && self.checkpoint_handlers.is_empty()
            && self.drop_message_handlers.is_empty()
            && self.reject_payload_handlers.is_empty()
            && self.integrity_failure_handlers.is_empty()
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::CommitBlock(commit_block_event) =>
                self.commit_block_handlers.iter().for_each(|handler| handler(&commit_block_event)),

            Event::Propose(propose_event) =>
                self.propose_handlers.iter().for_each(|handler| handler(&propose_event)),

            Event::Vote(vote_event) =>
                self.vote_handlers.iter().for_each(|handler| handler(&vote_event)),

            Event::ForwardRequest(forward_request_event) =>
                self.forward_request_handlers.iter().for_each(|handler| handler(&forward_request_event)),

            Event::ReceivePrePrepare(receive_pre_prepare_event) =>
                self.receive_pre_prepare_handlers.iter().for_each(|handler| handler(&receive_pre_prepare_event)),

            Event::ReceiveVote(receive_vote_event) =>
                self.receive_vote_handlers.iter().for_each(|handler| handler(&receive_vote_event)),

            Event::ReceiveRequest(receive_request_event) =>
                self.receive_request_handlers.iter().for_each(|handler| handler(&receive_request_event)),

            Event::CollectQuorum(collect_quorum_event) =>
                self.collect_quorum_handlers.iter().for_each(|handler| handler(&collect_quorum_event)),

            Event::AdvanceView(advance_view_event) =>
                self.advance_view_handlers.iter().for_each(|handler| handler(&advance_view_event)),

            Event::Checkpoint(checkpoint_event) =>
                self.checkpoint_handlers.iter().for_each(|handler| handler(&checkpoint_event)),

            Event::DropMessage(drop_message_event) =>
                self.drop_message_handlers.iter().for_each(|handler| handler(&drop_message_event)),

            Event::RejectPayload(reject_payload_event) =>
                self.reject_payload_handlers.iter().for_each(|handler| handler(&reject_payload_event)),

            Event::IntegrityFailure(integrity_failure_event) =>
                self.integrity_failure_handlers.iter().for_each(|handler| handler(&integrity_failure_event)),
        }
    }
}

fn handlers<T: Logger>(log_events: bool, user_handler: Option<HandlerPtr<T>>) -> Vec<HandlerPtr<T>> {
    let mut handlers = Vec::new();
    if log_events {
        handlers.push(T::get_logger());
    }
    handlers.extend(user_handler);
    handlers
}

/// Start the event bus thread. The thread stops when it receives a shutdown signal, or when every event
/// publisher has been dropped.
pub(crate) fn start_event_bus(
    event_handlers: EventHandlers,
    event_subscriber: Receiver<Event>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => return,
            Err(TryRecvError::Empty) => (),
        }

        match event_subscriber.recv_timeout(Duration::from_millis(10)) {
            Ok(event) => event_handlers.fire_handlers(event),
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => return,
        }
    })
}
