use log::LevelFilter;
use pbft_rs::{
    ledger::Ledger,
    pbft::{
        messages::{Envelope, EnvelopeType},
        types::{DropReason, IntegrityFailure, Phase, SlotPhase},
    },
    types::{
        block::Block,
        data_types::{CryptoHash, NodeId, Payload, SequenceNumber, ViewNumber},
    },
};

mod common;

use crate::common::{cluster::Cluster, logging::setup_logger};

fn block(sequence: u64, previous_hash: CryptoHash, payload: &str) -> Block {
    Block::new(SequenceNumber::new(sequence), previous_hash, Payload::from(payload))
}

#[test]
fn pre_prepare_from_a_follower_is_dropped_test() {
    setup_logger(LevelFilter::Trace);

    let mut cluster = Cluster::new(4, &[], 16, 4);
    let forged = Envelope::pre_prepare(
        cluster.authenticator(1),
        ViewNumber::init(),
        block(1, CryptoHash::genesis(), "forged"),
    );
    cluster.inject(1, None, forged);
    cluster.deliver_all();

    for i in [0, 2, 3] {
        let node = cluster.node(i);
        assert_eq!(node.drop_reasons(), vec![DropReason::UnknownOrWrongSender]);
        assert!(node.engine.message_log().slot(SequenceNumber::new(1)).is_none());
    }
    assert_eq!(cluster.pending(), 0);
}

#[test]
fn unauthenticated_envelopes_are_dropped_test() {
    setup_logger(LevelFilter::Trace);

    let mut cluster = Cluster::new(4, &[], 16, 4);
    let sequence = SequenceNumber::new(1);
    let block_hash = CryptoHash::new([1u8; 32]);

    // 1. node1 claims to be node2.
    let mut impersonation = Envelope::vote(cluster.authenticator(1), Phase::Prepare, ViewNumber::init(), sequence, block_hash);
    impersonation.sender_id = NodeId::new("node2");
    cluster.inject(1, Some(0), impersonation);

    // 2. A signed field is altered in transit.
    let mut tampered = Envelope::vote(cluster.authenticator(1), Phase::Commit, ViewNumber::init(), sequence, block_hash);
    tampered.block_hash = CryptoHash::new([2u8; 32]);
    cluster.inject(1, Some(0), tampered);

    // 3. A correctly signed envelope from outside the cluster.
    let foreign = Envelope::vote(cluster.outsider(), Phase::Prepare, ViewNumber::init(), sequence, block_hash);
    cluster.inject_from(NodeId::new("outsider"), Some(0), foreign);

    cluster.deliver_all();
    assert_eq!(
        cluster.node(0).drop_reasons(),
        vec![
            DropReason::AuthenticationFailure,
            DropReason::AuthenticationFailure,
            DropReason::NotAMember
        ]
    );
    assert!(cluster.node(0).engine.message_log().slot(sequence).is_none());
}

#[test]
fn early_envelopes_are_buffered_and_stale_ones_dropped_test() {
    setup_logger(LevelFilter::Trace);

    let mut cluster = Cluster::new(4, &[], 4, 2);
    let block_hash = CryptoHash::new([1u8; 32]);
    let vote = |cluster: &Cluster, view: u64, sequence: u64| {
        Envelope::vote(
            cluster.authenticator(1),
            Phase::Prepare,
            ViewNumber::new(view),
            SequenceNumber::new(sequence),
            block_hash,
        )
    };

    // 1. Envelopes for a later view or above the window wait. Those below the window are stale.
    let above_window = vote(&cluster, 0, 5);
    let below_window = vote(&cluster, 0, 0);
    let future_view = vote(&cluster, 1, 1);
    cluster.inject(1, Some(0), above_window);
    cluster.inject(1, Some(0), below_window);
    cluster.inject(1, Some(0), future_view);
    cluster.deliver_all();
    assert_eq!(cluster.node(0).drop_reasons(), vec![DropReason::StaleMessage]);
    assert_eq!(cluster.node(0).engine.buffered_envelopes(), 2);
    assert!(cluster.node(0).engine.message_log().is_empty());

    // 2. Entering view 1 admits the view 1 vote, and makes the view 0 one stale.
    cluster.node(0).engine.advance_view().unwrap();
    assert_eq!(cluster.node(0).engine.buffered_envelopes(), 0);
    let slot = cluster.node(0).engine.message_log().slot(SequenceNumber::new(1)).unwrap();
    assert!(slot.votes(Phase::Prepare).contains_key(&NodeId::new("node1")));

    let old_view = vote(&cluster, 0, 1);
    cluster.inject(1, Some(0), old_view);
    cluster.deliver_all();
    assert_eq!(cluster.node(0).drop_reasons(), vec![DropReason::StaleMessage; 3]);
}

#[test]
fn envelope_buffer_is_bounded_test() {
    setup_logger(LevelFilter::Trace);

    // A cluster of 4 with a window of 4 buffers up to (2 * 4 + 1) * 4 = 36 envelopes.
    let mut cluster = Cluster::new(4, &[], 4, 2);
    let auth1 = cluster.authenticator(1).clone();
    let block_hash = CryptoHash::new([1u8; 32]);
    let vote = |phase: Phase, view: u64, sequence: u64| {
        Envelope::vote(&auth1, phase, ViewNumber::new(view), SequenceNumber::new(sequence), block_hash)
    };

    // 1. Fill the buffer, then overflow it from above.
    for sequence in 5..41 {
        cluster.inject(1, Some(0), vote(Phase::Prepare, 0, sequence));
    }
    cluster.inject(1, Some(0), vote(Phase::Prepare, 0, 41));
    cluster.inject(1, Some(0), vote(Phase::Prepare, 1, 1));
    cluster.deliver_all();
    assert_eq!(cluster.node(0).engine.buffered_envelopes(), 36);
    assert_eq!(
        cluster.node(0).drop_reasons(),
        vec![DropReason::OutsideWindow, DropReason::FutureView]
    );

    // 2. A repeated envelope is refused, and a lower one pushes out the highest.
    cluster.inject(1, Some(0), vote(Phase::Prepare, 0, 5));
    cluster.inject(1, Some(0), vote(Phase::Commit, 0, 5));
    cluster.deliver_all();
    assert_eq!(cluster.node(0).engine.buffered_envelopes(), 36);
    let drop_reasons = cluster.node(0).drop_reasons();
    assert_eq!(drop_reasons.len(), 4);
    assert!(drop_reasons.ends_with(&[DropReason::DuplicateVote, DropReason::OutsideWindow]));
}

#[test]
fn malformed_envelopes_are_dropped_test() {
    setup_logger(LevelFilter::Trace);

    // node0 leads view 0 and sends whatever it likes.
    let mut cluster = Cluster::new(4, &[0], 16, 4);
    let view = ViewNumber::init();
    let sequence = SequenceNumber::new(1);
    let valid = block(1, CryptoHash::genesis(), "valid");

    let leader = cluster.authenticator(0).clone();
    let vote_with_block = Envelope::new(&leader, EnvelopeType::Prepare, view, sequence, valid.hash, Some(valid.clone()));
    let pre_prepare_without_block = Envelope::new(&leader, EnvelopeType::PrePrepare, view, sequence, valid.hash, None);
    let wrong_hash = Envelope::new(
        &leader,
        EnvelopeType::PrePrepare,
        view,
        sequence,
        CryptoHash::new([9u8; 32]),
        Some(valid.clone()),
    );
    let other_sequence = block(2, CryptoHash::genesis(), "valid");
    let wrong_sequence = Envelope::new(
        &leader,
        EnvelopeType::PrePrepare,
        view,
        sequence,
        other_sequence.hash,
        Some(other_sequence),
    );
    let mut altered = valid.clone();
    altered.payload = Payload::from("altered");
    let altered_block = Envelope::pre_prepare(&leader, view, altered);

    for envelope in [vote_with_block, pre_prepare_without_block, wrong_hash, wrong_sequence, altered_block] {
        cluster.inject(0, Some(1), envelope);
    }
    cluster.deliver_all();
    assert_eq!(cluster.node(1).drop_reasons(), vec![DropReason::MalformedEnvelope; 5]);
    assert!(cluster.node(1).engine.message_log().slot(sequence).is_none());

    // The well-formed pre-prepare is still accepted afterwards.
    cluster.inject(0, Some(1), Envelope::pre_prepare(&leader, view, valid.clone()));
    cluster.deliver_all();
    let slot = cluster.node(1).engine.message_log().slot(sequence).unwrap();
    assert_eq!(slot.phase(), SlotPhase::PrePrepared);
    assert_eq!(slot.block_hash(), Some(valid.hash));
}

#[test]
fn votes_count_once_per_sender_test() {
    setup_logger(LevelFilter::Trace);

    // Only node0 and node1 run, so node2 and node3 may be forged at will.
    let mut cluster = Cluster::new(4, &[2, 3], 16, 4);
    let view = ViewNumber::init();
    let sequence = SequenceNumber::new(1);

    cluster.node(0).engine.submit(Payload::from("payload")).unwrap();
    cluster.deliver_all();
    let block_hash = cluster
        .node(0)
        .engine
        .message_log()
        .slot(sequence)
        .and_then(|slot| slot.block_hash())
        .unwrap();
    assert_eq!(cluster.node(0).engine.message_log().count_votes(sequence, Phase::Prepare, &block_hash), 2);

    // 1. Repeated votes are dropped.
    cluster.replay_history();
    assert!(cluster.node(0).drop_reasons().contains(&DropReason::DuplicateVote));
    assert_eq!(cluster.node(0).engine.message_log().count_votes(sequence, Phase::Prepare, &block_hash), 2);

    // 2. A vote for another block does not count towards this one, and a sender cannot take it back.
    let auth2 = cluster.authenticator(2).clone();
    cluster.inject(2, Some(0), Envelope::vote(&auth2, Phase::Prepare, view, sequence, CryptoHash::new([5u8; 32])));
    cluster.inject(2, Some(0), Envelope::vote(&auth2, Phase::Prepare, view, sequence, block_hash));
    cluster.deliver_all();
    let node0 = cluster.node(0);
    assert_eq!(node0.engine.message_log().count_votes(sequence, Phase::Prepare, &block_hash), 2);
    assert_eq!(node0.engine.message_log().slot(sequence).unwrap().votes(Phase::Prepare).len(), 3);
    assert_eq!(node0.engine.message_log().slot(sequence).unwrap().phase(), SlotPhase::PrePrepared);
    assert_eq!(node0.drop_reasons().last(), Some(&DropReason::DuplicateVote));

    // 3. A third distinct sender completes the quorum.
    let auth3 = cluster.authenticator(3).clone();
    cluster.inject(3, Some(0), Envelope::vote(&auth3, Phase::Prepare, view, sequence, block_hash));
    cluster.deliver_all();
    assert_eq!(cluster.node(0).engine.message_log().slot(sequence).unwrap().phase(), SlotPhase::Prepared);
    assert_eq!(cluster.node(0).engine.last_committed(), SequenceNumber::init());
}

#[test]
fn equivocating_leader_cannot_fork_the_ledger_test() {
    setup_logger(LevelFilter::Trace);

    let mut cluster = Cluster::new(4, &[0], 16, 4);
    let leader = cluster.authenticator(0).clone();
    let view = ViewNumber::init();
    let block_a = block(1, CryptoHash::genesis(), "a");
    let block_b = block(1, CryptoHash::genesis(), "b");

    // 1. The leader pre-prepares block A for node1, and block B for node2 and node3.
    cluster.inject(0, Some(1), Envelope::pre_prepare(&leader, view, block_a.clone()));
    cluster.inject(0, Some(2), Envelope::pre_prepare(&leader, view, block_b.clone()));
    cluster.inject(0, Some(3), Envelope::pre_prepare(&leader, view, block_b.clone()));
    cluster.deliver_all();
    for node in cluster.nodes() {
        assert_eq!(node.ledger.len(), 0);
    }

    // 2. node1 sticks to the first pre-prepare it accepted.
    cluster.inject(0, Some(1), Envelope::pre_prepare(&leader, view, block_b.clone()));
    cluster.deliver_all();
    assert!(cluster.node(1).drop_reasons().contains(&DropReason::Equivocation));

    // 3. The leader's votes push block B over the quorum at node2 and node3 only.
    let sequence = SequenceNumber::new(1);
    cluster.inject(0, None, Envelope::vote(&leader, Phase::Prepare, view, sequence, block_b.hash));
    cluster.inject(0, None, Envelope::vote(&leader, Phase::Commit, view, sequence, block_b.hash));
    cluster.deliver_all();

    assert_eq!(cluster.node(2).ledger.payloads(), vec![Payload::from("b")]);
    assert_eq!(cluster.node(3).ledger.payloads(), vec![Payload::from("b")]);
    assert_eq!(cluster.node(1).ledger.len(), 0);
    let slot = cluster.node(1).engine.message_log().slot(sequence).unwrap();
    assert_eq!(slot.block_hash(), Some(block_a.hash));
    assert_eq!(slot.phase(), SlotPhase::PrePrepared);
}

#[test]
fn block_with_a_broken_link_is_not_appended_test() {
    setup_logger(LevelFilter::Trace);

    // The 3 correct replicas form a quorum on their own.
    let mut cluster = Cluster::new(4, &[0], 16, 4);
    let unknown_predecessor = CryptoHash::new([7u8; 32]);
    let pre_prepare = Envelope::pre_prepare(
        cluster.authenticator(0),
        ViewNumber::init(),
        block(1, unknown_predecessor, "orphan"),
    );
    cluster.inject(0, None, pre_prepare);
    cluster.deliver_all();
    cluster.replay_history();

    let expected = vec![IntegrityFailure::BrokenChain {
        expected: CryptoHash::genesis(),
        found: unknown_predecessor,
    }];
    for node in cluster.nodes() {
        assert_eq!(node.integrity_failures(), expected);
        assert_eq!(node.ledger.len(), 0);
        assert_eq!(node.engine.last_committed(), SequenceNumber::init());
        assert!(node.engine.message_log().slot(SequenceNumber::new(1)).unwrap().is_faulted());
    }
}

#[test]
fn ledger_conflict_leaves_the_sequence_uncommitted_test() {
    setup_logger(LevelFilter::Trace);

    let mut cluster = Cluster::new(4, &[], 16, 4);

    // 1. node2's ledger already holds something else at sequence 1.
    let mut ledger = cluster.node(2).ledger.clone();
    let rogue = ledger
        .append(SequenceNumber::new(1), CryptoHash::genesis(), Payload::from("rogue"), 1)
        .unwrap();

    // 2. The cluster orders 2 payloads.
    cluster.node(0).engine.submit(Payload::from("first")).unwrap();
    cluster.node(0).engine.submit(Payload::from("second")).unwrap();
    cluster.deliver_all();

    let committed = cluster.node(0).ledger.entries();
    assert_eq!(committed.len(), 2);
    assert_eq!(cluster.node(1).ledger.entries(), committed);
    assert_eq!(cluster.node(3).ledger.entries(), committed);

    // 3. node2 reports the conflict, keeps its own entry, and cannot commit past it.
    let node2 = cluster.node(2);
    assert_eq!(
        node2.integrity_failures(),
        vec![IntegrityFailure::LedgerConflict {
            existing: rogue.hash,
            attempted: committed[0].hash,
        }]
    );
    assert_eq!(node2.ledger.entries(), vec![rogue]);
    assert_eq!(node2.engine.last_committed(), SequenceNumber::init());
}
