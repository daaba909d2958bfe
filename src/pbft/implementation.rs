/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Event-driven implementation of the PBFT protocol, as described in the [module docs](super).
//!
//! Main type: [`ConsensusEngine`].

use std::{
    fmt::{self, Display, Formatter},
    sync::mpsc::Sender,
    time::SystemTime,
};

use crate::{
    authenticator::Authenticator,
    events::{
        AdvanceViewEvent, CheckpointEvent, CollectQuorumEvent, CommitBlockEvent, DropMessageEvent, Event,
        ForwardRequestEvent, IntegrityFailureEvent, ProposeEvent, ReceivePrePrepareEvent,
        ReceiveRequestEvent, ReceiveVoteEvent, RejectPayloadEvent, VoteEvent,
    },
    ledger::{Ledger, LedgerError},
    networking::{
        messages::{ClientRequest, Message},
        network::Network,
        sending::SenderHandle,
    },
    types::{
        block::Block,
        data_types::{CryptoHash, NodeId, Payload, SequenceNumber, ViewNumber},
        node_set::NodeSet,
        signed_messages::SignedMessage,
    },
};

use super::{
    envelope_buffer::{EnvelopeBuffer, Insertion},
    message_log::MessageLog,
    messages::{Envelope, EnvelopeType},
    roles::select_leader,
    types::{DropReason, IntegrityFailure, Phase, ReplicaStatus, SlotPhase},
};

/// Configuration parameters for the [`ConsensusEngine`] struct.
#[derive(Clone, Debug)]
pub struct EngineConfiguration {
    /// The static membership of the cluster, including this replica.
    pub node_set: NodeSet,

    /// Number of sequence numbers above the low-water mark that the replica accepts messages for.
    pub window_size: u64,

    /// Number of committed sequence numbers between two stable checkpoints. Must not exceed
    /// `window_size`.
    pub checkpoint_interval: u64,
}

/// How [`ConsensusEngine::submit`] dealt with a client payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    /// This replica leads the current view and pre-prepared the payload at the given sequence.
    Proposed(SequenceNumber),

    /// This replica does not lead the current view, and forwarded the payload to the leader.
    Forwarded(NodeId),
}

/// A single participant in the PBFT protocol.
///
/// # Usage
///
/// The `ConsensusEngine` is meant to be used in an "event-oriented" fashion: its methods are event
/// handlers that are called when specific things happen to the replica, and that run to completion
/// before returning. They are:
/// 1. [`on_receive_msg`](Self::on_receive_msg): called when a message is received from the network.
/// 2. [`submit`](Self::submit) and [`propose`](Self::propose): called when a client hands this replica a
///    payload.
/// 3. [`advance_view`](Self::advance_view): called when the operator moves the replica to the next view.
///
/// Every envelope the engine sends is broadcast through the [`Network`] it was created with. Every
/// significant action is published as an [`Event`].
///
/// # Early envelopes
///
/// Authenticated envelopes from members that belong to a later view than the replica's, or to a sequence
/// above its high-water mark, are buffered instead of dropped. The buffer holds up to
/// `(2N + 1) * window_size` envelopes, enough for one full window of pre-prepares and votes. Buffered
/// envelopes are processed as soon as the replica enters their view or its window moves past their
/// sequence. Only envelopes that do not fit in the buffer are dropped as
/// [`FutureView`](DropReason::FutureView) or [`OutsideWindow`](DropReason::OutsideWindow).
///
/// # Errors
///
/// Protocol violations by peers never surface as errors: the offending envelope is dropped and a
/// [`DropMessageEvent`] is published. The only error an event handler can return is
/// [`EngineError::Ledger`], when the ledger's storage fails.
pub struct ConsensusEngine<L: Ledger, A: Authenticator, N: Network> {
    view: ViewNumber,
    last_committed: SequenceNumber,
    highest_proposed: SequenceNumber,
    checkpoint_interval: u64,
    message_log: MessageLog,
    envelope_buffer: EnvelopeBuffer,
    ledger: L,
    authenticator: A,
    sender_handle: SenderHandle<N>,
    event_publisher: Option<Sender<Event>>,
}

impl<L: Ledger, A: Authenticator, N: Network> ConsensusEngine<L, A, N> {
    /// Create an engine for the node that `authenticator` signs as, starting in view 0 and resuming from
    /// the last entry of `ledger`.
    pub fn new(
        config: EngineConfiguration,
        ledger: L,
        authenticator: A,
        network: N,
        event_publisher: Option<Sender<Event>>,
    ) -> Result<Self, EngineError> {
        let me = authenticator.node_id();
        if !config.node_set.contains(me) {
            return Err(EngineError::NotAMember { node: me.clone() });
        }
        if config.window_size == 0 {
            return Err(EngineError::InvalidConfiguration {
                reason: "window_size must be positive",
            });
        }
        if config.checkpoint_interval == 0 || config.checkpoint_interval > config.window_size {
            return Err(EngineError::InvalidConfiguration {
                reason: "checkpoint_interval must be positive and at most window_size",
            });
        }

        let last_committed = ledger.get_last_sequence()?;
        let buffer_capacity = (2 * config.node_set.len() + 1) * config.window_size as usize;
        let message_log = MessageLog::new(
            config.node_set,
            ViewNumber::init(),
            last_committed,
            config.window_size,
        );

        Ok(Self {
            view: ViewNumber::init(),
            last_committed,
            highest_proposed: SequenceNumber::init(),
            checkpoint_interval: config.checkpoint_interval,
            message_log,
            envelope_buffer: EnvelopeBuffer::new(buffer_capacity),
            ledger,
            authenticator,
            sender_handle: SenderHandle::new(network),
            event_publisher,
        })
    }

    pub fn node_id(&self) -> &NodeId {
        self.authenticator.node_id()
    }

    pub fn view(&self) -> ViewNumber {
        self.view
    }

    pub fn leader(&self) -> NodeId {
        select_leader(self.view, self.message_log.node_set())
    }

    pub fn is_leader(&self) -> bool {
        &self.leader() == self.node_id()
    }

    pub fn last_committed(&self) -> SequenceNumber {
        self.last_committed
    }

    pub fn message_log(&self) -> &MessageLog {
        &self.message_log
    }

    /// Number of envelopes waiting for this replica to enter their view or move its window past their
    /// sequence.
    pub fn buffered_envelopes(&self) -> usize {
        self.envelope_buffer.len()
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn status(&self) -> ReplicaStatus {
        ReplicaStatus {
            node: self.node_id().clone(),
            view: self.view,
            leader: self.leader(),
            peers: self.message_log.node_set().peers_of(self.node_id()),
            last_committed: self.last_committed,
        }
    }

    /// Process a message received from `origin`.
    pub fn on_receive_msg(&mut self, origin: NodeId, msg: Message) -> Result<(), EngineError> {
        match msg {
            Message::Envelope(envelope) => self.on_receive_envelope(envelope),
            Message::ClientRequest(request) => self.on_receive_request(origin, request),
        }
    }

    /// Process an envelope, whatever peer relayed it. The envelope is attributed to its `sender_id`, and
    /// only after its signature verifies.
    pub fn on_receive_envelope(&mut self, envelope: Envelope) -> Result<(), EngineError> {
        // 1. Ignore our own envelopes echoed back by the network.
        if &envelope.sender_id == self.node_id() {
            return Ok(());
        }

        match envelope.envelope_type {
            EnvelopeType::PrePrepare => Event::ReceivePrePrepare(ReceivePrePrepareEvent {
                timestamp: SystemTime::now(),
                origin: envelope.sender_id.clone(),
                envelope: envelope.clone(),
            })
            .publish(&self.event_publisher),
            EnvelopeType::Prepare | EnvelopeType::Commit => Event::ReceiveVote(ReceiveVoteEvent {
                timestamp: SystemTime::now(),
                origin: envelope.sender_id.clone(),
                envelope: envelope.clone(),
            })
            .publish(&self.event_publisher),
        }

        // 2. Process the envelope, then any buffered envelopes that it made admissible.
        self.process_envelope(envelope)?;
        self.process_buffered_envelopes()?;
        Ok(())
    }

    fn process_envelope(&mut self, envelope: Envelope) -> Result<(), LedgerError> {
        // 1. Check the envelope against everything that does not depend on the slot, buffering it if it
        // came too early.
        match self.admit(&envelope) {
            Ok(()) => (),
            Err(reason @ (DropReason::FutureView | DropReason::OutsideWindow)) => {
                self.buffer(envelope, reason);
                return Ok(());
            }
            Err(reason) => {
                self.reject(&envelope, reason);
                return Ok(());
            }
        }

        // 2. Dispatch.
        match envelope.envelope_type {
            EnvelopeType::PrePrepare => self.on_receive_pre_prepare(envelope),
            EnvelopeType::Prepare => self.on_receive_vote(envelope, Phase::Prepare),
            EnvelopeType::Commit => self.on_receive_vote(envelope, Phase::Commit),
        }
    }

    fn buffer(&mut self, envelope: Envelope, reason: DropReason) {
        match self.envelope_buffer.insert(envelope.clone()) {
            Insertion::Buffered => log::debug!(
                "Buffered {} for view {}, sequence {} from {}",
                envelope.envelope_type,
                envelope.view,
                envelope.sequence,
                envelope.sender_id
            ),
            Insertion::Evicted(evicted) => {
                let evicted_reason = if evicted.view > self.view {
                    DropReason::FutureView
                } else {
                    DropReason::OutsideWindow
                };
                self.reject(&evicted, evicted_reason);
            }
            Insertion::Repeated(repeated_reason) => self.reject(&envelope, repeated_reason),
            Insertion::Full => self.reject(&envelope, reason),
        }
    }

    /// Process buffered envelopes that the current view and window admit, until none are left. Processing
    /// them can commit blocks and move the window, which can make more of them admissible.
    fn process_buffered_envelopes(&mut self) -> Result<(), LedgerError> {
        loop {
            let ready = self
                .envelope_buffer
                .take_ready(self.view, self.message_log.high_water_mark());
            if ready.is_empty() {
                return Ok(());
            }
            for envelope in ready {
                self.process_envelope(envelope)?;
            }
        }
    }

    /// Process a client payload forwarded by `origin`. Only the leader acts on it. A replica that is not
    /// the leader drops it instead of forwarding it again.
    pub fn on_receive_request(&mut self, origin: NodeId, request: ClientRequest) -> Result<(), EngineError> {
        Event::ReceiveRequest(ReceiveRequestEvent {
            timestamp: SystemTime::now(),
            origin,
            payload: request.payload.clone(),
        })
        .publish(&self.event_publisher);

        match self.propose(request.payload) {
            Ok(_) => Ok(()),
            Err(ProposeError::Ledger(err)) => Err(EngineError::Ledger(err)),
            Err(err) => {
                log::warn!("Dropping forwarded request: {}", err);
                Ok(())
            }
        }
    }

    /// Order `payload`: propose it if this replica leads the current view, or forward it to the leader
    /// otherwise.
    pub fn submit(&mut self, payload: Payload) -> Result<Submission, ProposeError> {
        if !self.is_leader() {
            let leader = self.leader();
            self.sender_handle.send(leader.clone(), ClientRequest { payload: payload.clone() });
            Event::ForwardRequest(ForwardRequestEvent {
                timestamp: SystemTime::now(),
                leader: leader.clone(),
                payload,
            })
            .publish(&self.event_publisher);
            return Ok(Submission::Forwarded(leader));
        }

        self.propose(payload).map(Submission::Proposed)
    }

    /// Pre-prepare `payload` at the next free sequence number and return that sequence number.
    ///
    /// The next sequence follows both the last committed sequence and the last sequence this replica
    /// pre-prepared in the current view, so a leader can have several sequences in flight at once. The
    /// new block links to the hash of its predecessor, which is either in the ledger or is the block this
    /// replica pre-prepared last.
    pub fn propose(&mut self, payload: Payload) -> Result<SequenceNumber, ProposeError> {
        // 1. Check that we lead this view and that the window has room.
        let leader = self.leader();
        if &leader != self.node_id() {
            return Err(ProposeError::NotLeader { leader });
        }
        let sequence = self.last_committed.max(self.highest_proposed) + 1;
        let high_water_mark = self.message_log.high_water_mark();
        if sequence > high_water_mark {
            return Err(ProposeError::WindowFull { high_water_mark });
        }

        // 2. Build the block on top of its predecessor.
        let previous_hash = match self.previous_hash(sequence)? {
            Some(previous_hash) => previous_hash,
            None => {
                return Err(ProposeError::Ledger(LedgerError::Storage(format!(
                    "no entry at sequence {}",
                    sequence - 1
                ))))
            }
        };
        let block = Block::new(sequence, previous_hash, payload);

        // 3. Accept our own pre-prepare, then broadcast it.
        let me = self.node_id().clone();
        if let Err(reason) = self
            .message_log
            .record_pre_prepare(sequence, &me, self.view, block.clone())
        {
            Event::RejectPayload(RejectPayloadEvent {
                timestamp: SystemTime::now(),
                view: self.view,
                sequence,
                payload: block.payload,
                reason,
            })
            .publish(&self.event_publisher);
            return Err(ProposeError::Rejected(reason));
        }
        self.highest_proposed = sequence;

        self.sender_handle
            .broadcast(Envelope::pre_prepare(&self.authenticator, self.view, block.clone()));
        Event::Propose(ProposeEvent {
            timestamp: SystemTime::now(),
            view: self.view,
            block: block.clone(),
        })
        .publish(&self.event_publisher);

        // 4. Vote for our own block like every other replica does.
        self.vote(Phase::Prepare, sequence, block.hash);
        self.check_prepared(sequence)?;
        self.process_buffered_envelopes()?;

        Ok(sequence)
    }

    /// Move to the next view, then process the envelopes buffered for it.
    ///
    /// Slots pre-prepared in earlier views keep their pre-prepare, so a sequence that was left in flight
    /// by the previous leader cannot be re-proposed by the new one. Recovering those sequences requires a
    /// view change protocol, which this engine does not implement.
    pub fn advance_view(&mut self) -> Result<(), EngineError> {
        self.view += 1;
        self.message_log.enter_view(self.view);
        self.highest_proposed = SequenceNumber::init();

        Event::AdvanceView(AdvanceViewEvent {
            timestamp: SystemTime::now(),
            view: self.view,
            leader: self.leader(),
        })
        .publish(&self.event_publisher);

        self.process_buffered_envelopes()?;
        Ok(())
    }

    /// Check the parts of `envelope` that do not depend on the state of its slot.
    fn admit(&self, envelope: &Envelope) -> Result<(), DropReason> {
        if !envelope.is_correct(&self.authenticator) {
            return Err(DropReason::AuthenticationFailure);
        }
        if !self.message_log.node_set().contains(&envelope.sender_id) {
            return Err(DropReason::NotAMember);
        }
        if envelope.view < self.view {
            return Err(DropReason::StaleMessage);
        }
        if envelope.view > self.view {
            return Err(DropReason::FutureView);
        }
        self.message_log.check_window(envelope.sequence)?;
        match (envelope.envelope_type, &envelope.block) {
            (EnvelopeType::PrePrepare, None) => Err(DropReason::MalformedEnvelope),
            (EnvelopeType::Prepare | EnvelopeType::Commit, Some(_)) => Err(DropReason::MalformedEnvelope),
            _ => Ok(()),
        }
    }

    fn on_receive_pre_prepare(&mut self, envelope: Envelope) -> Result<(), LedgerError> {
        // 1. Never trust the block hash as given.
        let block = match &envelope.block {
            Some(block)
                if block.sequence == envelope.sequence
                    && block.hash == envelope.block_hash
                    && block.is_correct() =>
            {
                block.clone()
            }
            _ => {
                self.reject(&envelope, DropReason::MalformedEnvelope);
                return Ok(());
            }
        };

        // 2. Accept it if it comes from the leader and is the first pre-prepare for its sequence.
        if let Err(reason) = self.message_log.record_pre_prepare(
            envelope.sequence,
            &envelope.sender_id,
            envelope.view,
            block,
        ) {
            self.reject(&envelope, reason);
            return Ok(());
        }

        // 3. Vote PREPARE for it.
        self.vote(Phase::Prepare, envelope.sequence, envelope.block_hash);
        self.check_prepared(envelope.sequence)
    }

    fn on_receive_vote(&mut self, envelope: Envelope, phase: Phase) -> Result<(), LedgerError> {
        let is_new_vote = match phase {
            Phase::Prepare => {
                self.message_log
                    .record_prepare(envelope.sequence, &envelope.sender_id, envelope.block_hash)
            }
            Phase::Commit => {
                self.message_log
                    .record_commit(envelope.sequence, &envelope.sender_id, envelope.block_hash)
            }
        };
        if !is_new_vote {
            self.reject(&envelope, DropReason::DuplicateVote);
            return Ok(());
        }

        match phase {
            Phase::Prepare => self.check_prepared(envelope.sequence),
            Phase::Commit => self.try_execute(),
        }
    }

    /// Record our own vote and broadcast it.
    fn vote(&mut self, phase: Phase, sequence: SequenceNumber, block_hash: CryptoHash) {
        let me = self.node_id().clone();
        match phase {
            Phase::Prepare => self.message_log.record_prepare(sequence, &me, block_hash),
            Phase::Commit => self.message_log.record_commit(sequence, &me, block_hash),
        };

        self.sender_handle
            .broadcast(Envelope::vote(&self.authenticator, phase, self.view, sequence, block_hash));
        Event::Vote(VoteEvent {
            timestamp: SystemTime::now(),
            phase,
            view: self.view,
            sequence,
            block_hash,
        })
        .publish(&self.event_publisher);
    }

    /// Move `sequence` to `Prepared` if it is `PrePrepared` and a quorum of PREPARE votes agrees with its
    /// pre-prepare, voting COMMIT when it does.
    fn check_prepared(&mut self, sequence: SequenceNumber) -> Result<(), LedgerError> {
        let block_hash = match self.message_log.slot(sequence) {
            Some(slot) if slot.phase() == SlotPhase::PrePrepared => slot.block_hash(),
            _ => None,
        };
        let block_hash = match block_hash {
            Some(block_hash) => block_hash,
            None => return Ok(()),
        };

        if self.message_log.count_votes(sequence, Phase::Prepare, &block_hash) < self.message_log.quorum() {
            return Ok(());
        }

        if self.message_log.mark_prepared(sequence) {
            Event::CollectQuorum(CollectQuorumEvent {
                timestamp: SystemTime::now(),
                phase: Phase::Prepare,
                view: self.view,
                sequence,
                block_hash,
            })
            .publish(&self.event_publisher);

            self.vote(Phase::Commit, sequence, block_hash);
        }

        self.try_execute()
    }

    /// Commit sequences in order, starting right after the last committed one, for as long as the next
    /// sequence is `Prepared` and has a quorum of COMMIT votes for its pre-prepared block.
    fn try_execute(&mut self) -> Result<(), LedgerError> {
        loop {
            let sequence = self.last_committed + 1;
            let block = match self.message_log.slot(sequence) {
                Some(slot)
                    if slot.phase() == SlotPhase::Prepared && !slot.is_resolved() && !slot.is_faulted() =>
                {
                    match slot.pre_prepare() {
                        Some(pre_prepare) => pre_prepare.block.clone(),
                        None => return Ok(()),
                    }
                }
                _ => return Ok(()),
            };

            if self.message_log.count_votes(sequence, Phase::Commit, &block.hash) < self.message_log.quorum() {
                return Ok(());
            }

            Event::CollectQuorum(CollectQuorumEvent {
                timestamp: SystemTime::now(),
                phase: Phase::Commit,
                view: self.view,
                sequence,
                block_hash: block.hash,
            })
            .publish(&self.event_publisher);

            if !self.execute(block)? {
                return Ok(());
            }
        }
    }

    /// Append `block` to the ledger after checking it once more. Returns whether the block is now in the
    /// ledger.
    fn execute(&mut self, block: Block) -> Result<bool, LedgerError> {
        let sequence = block.sequence;

        // 1. Check the block's integrity against the chain.
        let computed = Block::hash(sequence, &block.previous_hash, &block.payload, block.timestamp);
        if computed != block.hash {
            return Ok(self.integrity_failure(
                sequence,
                IntegrityFailure::HashMismatch {
                    expected: block.hash,
                    computed,
                },
            ));
        }
        let expected_previous_hash = match self.previous_hash(sequence)? {
            Some(previous_hash) => previous_hash,
            None => {
                return Ok(self.integrity_failure(
                    sequence,
                    IntegrityFailure::MissingPredecessor {
                        predecessor: sequence - 1,
                    },
                ))
            }
        };
        if block.previous_hash != expected_previous_hash {
            return Ok(self.integrity_failure(
                sequence,
                IntegrityFailure::BrokenChain {
                    expected: expected_previous_hash,
                    found: block.previous_hash,
                },
            ));
        }

        // 2. Append, unless the ledger already holds this very entry.
        let entry = match self.ledger.get_by_sequence(sequence)? {
            Some(existing) if existing.hash == block.hash => existing,
            Some(existing) => {
                return Ok(self.integrity_failure(
                    sequence,
                    IntegrityFailure::LedgerConflict {
                        existing: existing.hash,
                        attempted: block.hash,
                    },
                ))
            }
            None => match self.ledger.append(
                sequence,
                block.previous_hash,
                block.payload.clone(),
                block.timestamp,
            ) {
                Ok(entry) => entry,
                Err(LedgerError::Conflict {
                    existing, attempted, ..
                }) => {
                    return Ok(self.integrity_failure(
                        sequence,
                        IntegrityFailure::LedgerConflict { existing, attempted },
                    ))
                }
                Err(err) => return Err(err),
            },
        };

        // 3. Resolve the slot.
        self.message_log.mark_committed(sequence);
        self.last_committed = sequence;
        Event::CommitBlock(CommitBlockEvent {
            timestamp: SystemTime::now(),
            entry,
        })
        .publish(&self.event_publisher);

        self.checkpoint_if_due();
        Ok(true)
    }

    /// Take a stable checkpoint every `checkpoint_interval` committed sequences.
    fn checkpoint_if_due(&mut self) {
        if self.last_committed.int() % self.checkpoint_interval != 0 {
            return;
        }
        let pruned_slots = self.message_log.garbage_collect(self.last_committed);
        Event::Checkpoint(CheckpointEvent {
            timestamp: SystemTime::now(),
            sequence: self.last_committed,
            pruned_slots,
        })
        .publish(&self.event_publisher);
    }

    /// Hash that the block at `sequence` must link to, if known.
    fn previous_hash(&self, sequence: SequenceNumber) -> Result<Option<CryptoHash>, LedgerError> {
        let predecessor = sequence - 1;
        if predecessor == SequenceNumber::init() {
            return Ok(Some(CryptoHash::genesis()));
        }
        if predecessor <= self.last_committed {
            return Ok(self.ledger.get_by_sequence(predecessor)?.map(|entry| entry.hash));
        }
        Ok(self.message_log.slot(predecessor).and_then(|slot| slot.block_hash()))
    }

    /// Leave `sequence` uncommitted and report why. Always returns `false`.
    fn integrity_failure(&mut self, sequence: SequenceNumber, failure: IntegrityFailure) -> bool {
        self.message_log.mark_faulted(sequence);
        Event::IntegrityFailure(IntegrityFailureEvent {
            timestamp: SystemTime::now(),
            sequence,
            failure,
        })
        .publish(&self.event_publisher);
        false
    }

    fn reject(&self, envelope: &Envelope, reason: DropReason) {
        Event::DropMessage(DropMessageEvent {
            timestamp: SystemTime::now(),
            origin: envelope.sender_id.clone(),
            envelope_type: envelope.envelope_type,
            view: envelope.view,
            sequence: envelope.sequence,
            reason,
        })
        .publish(&self.event_publisher);
    }
}

/// The different ways a call to a method of the `ConsensusEngine` struct can fail.
#[derive(Debug)]
pub enum EngineError {
    /// The ledger's storage failed.
    Ledger(LedgerError),

    /// The engine's node is not in the configured node set.
    NotAMember { node: NodeId },

    InvalidConfiguration { reason: &'static str },
}

impl From<LedgerError> for EngineError {
    fn from(value: LedgerError) -> Self {
        EngineError::Ledger(value)
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Ledger(err) => Display::fmt(err, f),
            EngineError::NotAMember { node } => write!(f, "{} is not a member of the node set", node),
            EngineError::InvalidConfiguration { reason } => write!(f, "invalid configuration: {}", reason),
        }
    }
}

impl std::error::Error for EngineError {}

/// The different ways a call to [`ConsensusEngine::propose`] can fail.
#[derive(Debug)]
pub enum ProposeError {
    /// This replica does not lead the current view.
    NotLeader { leader: NodeId },

    /// The next sequence number is above the high-water mark. Retry after the next checkpoint.
    WindowFull { high_water_mark: SequenceNumber },

    /// The next sequence already holds a pre-prepare from an earlier view. A
    /// [`RejectPayloadEvent`] is published with the payload.
    Rejected(DropReason),

    Ledger(LedgerError),
}

impl From<LedgerError> for ProposeError {
    fn from(value: LedgerError) -> Self {
        ProposeError::Ledger(value)
    }
}

impl Display for ProposeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ProposeError::NotLeader { leader } => write!(f, "not the leader, {} is", leader),
            ProposeError::WindowFull { high_water_mark } => {
                write!(f, "window is full up to sequence {}", high_water_mark)
            }
            ProposeError::Rejected(reason) => write!(f, "own pre-prepare rejected: {}", reason),
            ProposeError::Ledger(err) => Display::fmt(err, f),
        }
    }
}

impl std::error::Error for ProposeError {}
