//! A deterministic, single-threaded cluster of [`ConsensusEngine`]s whose messages are delivered only when
//! the test says so.
//!
//! Every message that an engine sends lands in a shared outbox. Tests then decide how the outbox is
//! drained: in order, shuffled, with duplicates, or replayed from the history of delivered messages.
//! Members listed as silent are in the node set but run no engine: messages addressed to them are lost.
//! A member can also be cut off for a while: its copies of messages are held back until the test
//! releases them.

use std::{
    collections::{BTreeMap, HashSet, VecDeque},
    sync::{
        mpsc::{self, Receiver},
        Arc, Mutex,
    },
};

use ed25519_dalek::SigningKey;
use pbft_rs::{
    authenticator::Ed25519Authenticator,
    events::Event,
    networking::{messages::Message, network::Network},
    pbft::{
        implementation::{ConsensusEngine, EngineConfiguration},
        types::{DropReason, IntegrityFailure},
    },
    types::{data_types::NodeId, node_set::NodeSet},
};
use rand::{rngs::StdRng, seq::SliceRandom, Rng};
use rand_core::OsRng;

use super::mem_ledger::MemLedger;

pub(crate) type Engine = ConsensusEngine<MemLedger, Ed25519Authenticator, OutboxNetwork>;

/// A message in flight. `recipient` is `None` for broadcasts.
#[derive(Clone)]
pub(crate) struct Packet {
    pub(crate) origin: NodeId,
    pub(crate) recipient: Option<NodeId>,
    pub(crate) message: Message,
}

/// A [`Network`] that appends everything it sends to an outbox shared by the whole cluster.
#[derive(Clone)]
pub(crate) struct OutboxNetwork {
    me: NodeId,
    outbox: Arc<Mutex<VecDeque<Packet>>>,
}

impl Network for OutboxNetwork {
    fn init_node_set(&mut self, _: NodeSet) {}

    fn broadcast(&mut self, message: Message) {
        self.outbox.lock().unwrap().push_back(Packet {
            origin: self.me.clone(),
            recipient: None,
            message,
        });
    }

    fn send(&mut self, peer: NodeId, message: Message) {
        self.outbox.lock().unwrap().push_back(Packet {
            origin: self.me.clone(),
            recipient: Some(peer),
            message,
        });
    }

    fn recv(&mut self) -> Option<(NodeId, Message)> {
        None
    }
}

pub(crate) struct Node {
    pub(crate) engine: Engine,
    pub(crate) ledger: MemLedger,
    event_subscriber: Receiver<Event>,
    events: Vec<Event>,
}

impl Node {
    /// All events that the engine published so far.
    pub(crate) fn events(&mut self) -> &[Event] {
        while let Ok(event) = self.event_subscriber.try_recv() {
            self.events.push(event);
        }
        &self.events
    }

    pub(crate) fn drop_reasons(&mut self) -> Vec<DropReason> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                Event::DropMessage(drop_message) => Some(drop_message.reason),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn integrity_failures(&mut self) -> Vec<IntegrityFailure> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                Event::IntegrityFailure(integrity_failure) => Some(integrity_failure.failure.clone()),
                _ => None,
            })
            .collect()
    }
}

pub(crate) struct Cluster {
    nodes: BTreeMap<NodeId, Node>,
    authenticators: BTreeMap<NodeId, Ed25519Authenticator>,
    outsider: Ed25519Authenticator,
    outbox: Arc<Mutex<VecDeque<Packet>>>,
    history: Vec<Packet>,
    cut_off: Option<NodeId>,
    held_back: Vec<Packet>,
}

impl Cluster {
    /// Start a cluster of `size` members named `node0`, `node1`, and so on, where the members at the
    /// positions in `silent` run no engine.
    ///
    /// Every authenticator also knows the key of an `outsider`, which is not a member.
    pub(crate) fn new(size: usize, silent: &[usize], window_size: u64, checkpoint_interval: u64) -> Cluster {
        let mut csprg = OsRng {};
        let members: Vec<NodeId> = (0..size).map(node).collect();
        let outsider_id = NodeId::new("outsider");
        let signing_keys: Vec<(NodeId, SigningKey)> = members
            .iter()
            .cloned()
            .chain(Some(outsider_id.clone()))
            .map(|id| (id, SigningKey::generate(&mut csprg)))
            .collect();
        let directory: Vec<_> = signing_keys
            .iter()
            .map(|(id, signing_key)| (id.clone(), signing_key.verifying_key()))
            .collect();
        let mut authenticators: BTreeMap<NodeId, Ed25519Authenticator> = signing_keys
            .into_iter()
            .map(|(id, signing_key)| {
                let authenticator = Ed25519Authenticator::new(id.clone(), signing_key, directory.clone());
                (id, authenticator)
            })
            .collect();
        let outsider = authenticators.remove(&outsider_id).unwrap();

        let node_set = NodeSet::new(members.clone());
        let silent: HashSet<NodeId> = silent.iter().copied().map(node).collect();
        let outbox = Arc::new(Mutex::new(VecDeque::new()));

        let nodes = members
            .into_iter()
            .filter(|id| !silent.contains(id))
            .map(|id| {
                let ledger = MemLedger::new();
                let (event_publisher, event_subscriber) = mpsc::channel();
                let engine = ConsensusEngine::new(
                    EngineConfiguration {
                        node_set: node_set.clone(),
                        window_size,
                        checkpoint_interval,
                    },
                    ledger.clone(),
                    authenticators[&id].clone(),
                    OutboxNetwork {
                        me: id.clone(),
                        outbox: outbox.clone(),
                    },
                    Some(event_publisher),
                )
                .unwrap();
                let node = Node {
                    engine,
                    ledger,
                    event_subscriber,
                    events: Vec::new(),
                };
                (id, node)
            })
            .collect();

        Cluster {
            nodes,
            authenticators,
            outsider,
            outbox,
            history: Vec::new(),
            cut_off: None,
            held_back: Vec::new(),
        }
    }

    pub(crate) fn node(&mut self, i: usize) -> &mut Node {
        self.nodes.get_mut(&node(i)).unwrap()
    }

    pub(crate) fn nodes(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    pub(crate) fn ledgers(&self) -> Vec<MemLedger> {
        self.nodes.values().map(|node| node.ledger.clone()).collect()
    }

    /// The authenticator of member `i`, silent or not. Used to forge messages from Byzantine members.
    pub(crate) fn authenticator(&self, i: usize) -> &Ed25519Authenticator {
        &self.authenticators[&node(i)]
    }

    pub(crate) fn outsider(&self) -> &Ed25519Authenticator {
        &self.outsider
    }

    /// Queue `message` as if `origin` had sent it to `recipient`, or broadcast it if `recipient` is `None`.
    pub(crate) fn inject(&mut self, origin: usize, recipient: Option<usize>, message: impl Into<Message>) {
        self.inject_from(node(origin), recipient, message)
    }

    pub(crate) fn inject_from(&mut self, origin: NodeId, recipient: Option<usize>, message: impl Into<Message>) {
        self.outbox.lock().unwrap().push_back(Packet {
            origin,
            recipient: recipient.map(node),
            message: message.into(),
        });
    }

    pub(crate) fn pending(&self) -> usize {
        self.outbox.lock().unwrap().len()
    }

    /// Discard every message in flight.
    pub(crate) fn drop_pending(&mut self) {
        self.outbox.lock().unwrap().clear();
    }

    /// Hold back every message delivered to member `i` from now on, until [`reconnect`](Self::reconnect).
    pub(crate) fn cut_off(&mut self, i: usize) {
        self.cut_off = Some(node(i));
    }

    /// Deliver messages to the member that was cut off again. The messages held back so far stay held
    /// back until [`release_held_back`](Self::release_held_back).
    pub(crate) fn reconnect(&mut self) {
        self.cut_off = None;
    }

    /// Queue the messages that were held back, in the order they were held back.
    pub(crate) fn release_held_back(&mut self) {
        let mut outbox = self.outbox.lock().unwrap();
        outbox.extend(self.held_back.drain(..));
    }

    /// Deliver messages in the order they were sent, until no message is in flight.
    pub(crate) fn deliver_all(&mut self) {
        loop {
            let packet = self.outbox.lock().unwrap().pop_front();
            match packet {
                Some(packet) => self.deliver(packet),
                None => return,
            }
        }
    }

    /// Deliver messages in a random order, delivering each one a second time with probability
    /// `duplicate_probability`, until no message is in flight.
    pub(crate) fn deliver_shuffled(&mut self, rng: &mut StdRng, duplicate_probability: f64) {
        loop {
            let mut packets: Vec<Packet> = self.outbox.lock().unwrap().drain(..).collect();
            if packets.is_empty() {
                return;
            }
            packets.shuffle(rng);
            for packet in packets {
                if rng.gen_bool(duplicate_probability) {
                    self.deliver(packet.clone());
                }
                self.deliver(packet);
            }
        }
    }

    /// Deliver every message that was ever delivered once more, in the order it was first delivered.
    pub(crate) fn replay_history(&mut self) {
        let history = self.history.clone();
        for packet in history {
            self.deliver(packet);
        }
        self.deliver_all();
    }

    fn deliver(&mut self, packet: Packet) {
        let recipients: Vec<NodeId> = match &packet.recipient {
            Some(recipient) => vec![recipient.clone()],
            None => self
                .nodes
                .keys()
                .filter(|id| **id != packet.origin)
                .cloned()
                .collect(),
        };
        for recipient in recipients {
            if self.cut_off.as_ref() == Some(&recipient) {
                self.held_back.push(Packet {
                    origin: packet.origin.clone(),
                    recipient: Some(recipient),
                    message: packet.message.clone(),
                });
                continue;
            }
            if let Some(node) = self.nodes.get_mut(&recipient) {
                node.engine
                    .on_receive_msg(packet.origin.clone(), packet.message.clone())
                    .unwrap();
            }
        }
        self.history.push(packet);
    }
}

pub(crate) fn node(i: usize) -> NodeId {
    NodeId::new(format!("node{}", i))
}
