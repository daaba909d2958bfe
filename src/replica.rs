/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Methods to build and run a replica.
//!
//! pbft_rs orders client payloads into a ledger that is replicated across multiple processes. In our
//! terminology, these processes are called 'replicas', and the set of all replicas is called the 'node
//! set'. Each replica is uniquely identified by a [`NodeId`].
//!
//! They key components of this module are:
//! - The builder-pattern interface to construct a [specification of the replica](ReplicaSpec) with:
//!   1. `ReplicaSpec::builder` to construct a `ReplicaSpecBuilder`,
//!   2. The setters of the `ReplicaSpecBuilder`, and
//!   3. The `ReplicaSpecBuilder::build` method to construct a [ReplicaSpec],
//! - The function to [start](ReplicaSpec::start) a [Replica] given its specification,
//! - [The type](Replica) which keeps the replica alive, and through which clients submit payloads.
//!
//! ## Starting a replica
//!
//! Here is an example that demonstrates how to build and start running a replica using the builder pattern:
//!
//! ```ignore
//! let replica =
//!     ReplicaSpec::builder()
//!     .ledger(ledger)
//!     .authenticator(authenticator)
//!     .network(network)
//!     .configuration(configuration)
//!     .on_commit_block(commit_handler)
//!     .build()
//!     .start()?;
//! ```
//!
//! ### Required setters
//!
//! The required setters are for providing the trait implementations required to run a replica:
//! - `.ledger(...)`
//! - `.authenticator(...)`
//! - `.network(...)`
//! - `.configuration(...)`
//!
//! ### Optional setters
//!
//! The optional setters are for registering user-defined event handlers for events from [crate::events]:
//! - `.on_commit_block(...)`
//! - `.on_propose(...)`
//! - `.on_vote(...)`
//! - `.on_forward_request(...)`
//! - `.on_receive_pre_prepare(...)`
//! - `.on_receive_vote(...)`
//! - `.on_receive_request(...)`
//! - `.on_collect_quorum(...)`
//! - `.on_advance_view(...)`
//! - `.on_checkpoint(...)`
//! - `.on_drop_message(...)`
//! - `.on_reject_payload(...)`
//! - `.on_integrity_failure(...)`
//!
//! The replica's [configuration](Configuration) can also be defined using the builder pattern, for example:
//!
//! ```ignore
//! let configuration =
//!     Configuration::builder()
//!     .me(NodeId::new("node0"))
//!     .members(vec![NodeId::new("node0"), NodeId::new("node1"), NodeId::new("node2"), NodeId::new("node3")])
//!     .window_size(64)
//!     .checkpoint_interval(16)
//!     .log_events(true)
//!     .build()
//! ```

use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use typed_builder::TypedBuilder;

use crate::algorithm::{Algorithm, Command};
use crate::authenticator::Authenticator;
use crate::event_bus::*;
use crate::events::*;
use crate::ledger::Ledger;
use crate::networking::network::Network;
use crate::pbft::implementation::{ConsensusEngine, EngineConfiguration, EngineError};
use crate::pbft::types::ReplicaStatus;
use crate::types::data_types::{NodeId, Payload};
use crate::types::node_set::NodeSet;

/// Stores the user-defined parameters required to start the replica, that is:
/// 1. The replica's own [`NodeId`]. It must be the id its [`Authenticator`] signs as.
/// 2. The ids of every member of the cluster, including the replica itself. Every replica must be configured
///    with the same members, in any order.
/// 3. The window size: the number of sequence numbers above the last stable checkpoint that the replica keeps
///    bookkeeping for.
/// 4. The checkpoint interval: the number of commits between two stable checkpoints. At most the window size.
/// 5. The "Log Events" flag, if set to "true" then logs should be printed.
///
/// ## Log Events
///
/// pbft_rs logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
/// printed onto a terminal or to a file, set up a [logging
/// implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
#[derive(Clone, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Required:
    - `.me(...)`
    - `.members(...)`
    - `.window_size(...)`
    - `.checkpoint_interval(...)`
    - `.log_events(...)`
"))]
pub struct Configuration {
    #[builder(setter(doc = "Set the replica's own id. Required."))]
    pub me: NodeId,
    #[builder(setter(doc = "Set the ids of every member of the cluster. Required."))]
    pub members: Vec<NodeId>,
    #[builder(setter(doc = "Set the number of sequence numbers above the last stable checkpoint that the replica accepts messages for. Required."))]
    pub window_size: u64,
    #[builder(setter(doc = "Set the number of commits between two stable checkpoints. Required."))]
    pub checkpoint_interval: u64,
    #[builder(setter(doc = "Enable logging? Required."))]
    pub log_events: bool,
}

/// Stores all necessary parameters and trait implementations required to run the [Replica].
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [ReplicaSpec]. On the builder call the following methods to construct a valid [ReplicaSpec].

    Required:
    - `.ledger(...)`
    - `.authenticator(...)`
    - `.network(...)`
    - `.configuration(...)`

    Optional:
    - `.on_commit_block(...)`
    - `.on_propose(...)`
    - `.on_vote(...)`
    - `.on_forward_request(...)`
    - `.on_receive_pre_prepare(...)`
    - `.on_receive_vote(...)`
    - `.on_receive_request(...)`
    - `.on_collect_quorum(...)`
    - `.on_advance_view(...)`
    - `.on_checkpoint(...)`
    - `.on_drop_message(...)`
    - `.on_reject_payload(...)`
    - `.on_integrity_failure(...)`
"))]
pub struct ReplicaSpec<L: Ledger, A: Authenticator, N: Network + 'static> {
    // Required parameters
    #[builder(setter(doc = "Set the ledger that committed blocks are appended to. The argument must implement the [Ledger](crate::ledger::Ledger) trait. Required."))]
    ledger: L,
    #[builder(setter(doc = "Set the capability used to sign and verify envelopes. The argument must implement the [Authenticator](crate::authenticator::Authenticator) trait. Required."))]
    authenticator: A,
    #[builder(setter(doc = "Set the implementation of peer-to-peer networking. The argument must implement the [Network](crate::networking::network::Network) trait. Required."))]
    network: N,
    #[builder(setter(doc = "Set the [configuration](Configuration), which contains the necessary parameters to run a replica. Required."))]
    configuration: Configuration,
    // Optional parameters
    #[builder(default, setter(transform = |handler: impl Fn(&CommitBlockEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<CommitBlockEvent>),
    doc = "Register a handler closure to be invoked after a block is appended to the ledger. Optional."))]
    on_commit_block: Option<HandlerPtr<CommitBlockEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ProposeEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ProposeEvent>),
    doc = "Register a handler closure to be invoked after the replica broadcasts a pre-prepare. Optional."))]
    on_propose: Option<HandlerPtr<ProposeEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&VoteEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<VoteEvent>),
    doc = "Register a handler closure to be invoked after the replica broadcasts a PREPARE or COMMIT vote. Optional."))]
    on_vote: Option<HandlerPtr<VoteEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ForwardRequestEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ForwardRequestEvent>),
    doc = "Register a handler closure to be invoked after the replica forwards a client payload to the leader. Optional."))]
    on_forward_request: Option<HandlerPtr<ForwardRequestEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceivePrePrepareEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceivePrePrepareEvent>),
    doc = "Register a handler closure to be invoked after the replica receives a pre-prepare. Optional."))]
    on_receive_pre_prepare: Option<HandlerPtr<ReceivePrePrepareEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceiveVoteEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceiveVoteEvent>),
    doc = "Register a handler closure to be invoked after the replica receives a PREPARE or COMMIT vote. Optional."))]
    on_receive_vote: Option<HandlerPtr<ReceiveVoteEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceiveRequestEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceiveRequestEvent>),
    doc = "Register a handler closure to be invoked after the replica receives a forwarded client payload. Optional."))]
    on_receive_request: Option<HandlerPtr<ReceiveRequestEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&CollectQuorumEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<CollectQuorumEvent>),
    doc = "Register a handler closure to be invoked after the replica collects a quorum of PREPARE or COMMIT votes. Optional."))]
    on_collect_quorum: Option<HandlerPtr<CollectQuorumEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&AdvanceViewEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<AdvanceViewEvent>),
    doc = "Register a handler closure to be invoked after the replica moves to the next view. Optional."))]
    on_advance_view: Option<HandlerPtr<AdvanceViewEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&CheckpointEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<CheckpointEvent>),
    doc = "Register a handler closure to be invoked after the replica takes a stable checkpoint. Optional."))]
    on_checkpoint: Option<HandlerPtr<CheckpointEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&DropMessageEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<DropMessageEvent>),
    doc = "Register a handler closure to be invoked after the replica drops an envelope. Optional."))]
    on_drop_message: Option<HandlerPtr<DropMessageEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&RejectPayloadEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<RejectPayloadEvent>),
    doc = "Register a handler closure to be invoked after the leader gives up on ordering a client payload. Optional."))]
    on_reject_payload: Option<HandlerPtr<RejectPayloadEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&IntegrityFailureEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<IntegrityFailureEvent>),
    doc = "Register a handler closure to be invoked after a commit-certified block fails an integrity check. Optional."))]
    on_integrity_failure: Option<HandlerPtr<IntegrityFailureEvent>>,
}

impl<L: Ledger, A: Authenticator, N: Network + 'static> ReplicaSpec<L, A, N> {
    /// Starts all threads and channels associated with running a replica, and returns the handles to them in a
    /// [Replica] struct.
    pub fn start(mut self) -> Result<Replica<L>, EngineError> {
        if self.authenticator.node_id() != &self.configuration.me {
            return Err(EngineError::InvalidConfiguration {
                reason: "me must be the id that the authenticator signs as",
            });
        }

        let node_set = NodeSet::new(self.configuration.members);
        self.network.init_node_set(node_set.clone());

        let event_handlers = EventHandlers::new(
            self.configuration.log_events,
            self.on_commit_block,
            self.on_propose,
            self.on_vote,
            self.on_forward_request,
            self.on_receive_pre_prepare,
            self.on_receive_vote,
            self.on_receive_request,
            self.on_collect_quorum,
            self.on_advance_view,
            self.on_checkpoint,
            self.on_drop_message,
            self.on_reject_payload,
            self.on_integrity_failure,
        );

        let (event_publisher, event_subscriber) = if !event_handlers.is_empty() {
            Some(mpsc::channel()).unzip()
        } else {
            (None, None)
        };

        let engine = ConsensusEngine::new(
            EngineConfiguration {
                node_set,
                window_size: self.configuration.window_size,
                checkpoint_interval: self.configuration.checkpoint_interval,
            },
            self.ledger.clone(),
            self.authenticator,
            self.network.clone(),
            event_publisher,
        )?;
        let status = Arc::new(Mutex::new(engine.status()));

        let (commands, command_receiver) = mpsc::channel();
        let (algorithm_shutdown, algorithm_shutdown_receiver) = mpsc::channel();
        let algorithm = Algorithm::new(
            engine,
            self.network,
            command_receiver,
            status.clone(),
            algorithm_shutdown_receiver,
        )
        .start();

        let (event_bus, event_bus_shutdown) = match event_subscriber {
            Some(event_subscriber) => {
                let (event_bus_shutdown, event_bus_shutdown_receiver) = mpsc::channel();
                let event_bus = start_event_bus(event_handlers, event_subscriber, event_bus_shutdown_receiver);
                (Some(event_bus), Some(event_bus_shutdown))
            }
            None => (None, None),
        };

        Ok(Replica {
            ledger: self.ledger,
            status,
            commands,
            algorithm: Some(algorithm),
            algorithm_shutdown,
            event_bus,
            event_bus_shutdown,
        })
    }
}

/// A handle to the background threads of a pbft_rs replica. When this value is dropped, all background threads are
/// gracefully shut down.
pub struct Replica<L: Ledger> {
    ledger: L,
    status: Arc<Mutex<ReplicaStatus>>,
    commands: Sender<Command>,
    algorithm: Option<JoinHandle<()>>,
    algorithm_shutdown: Sender<()>,
    event_bus: Option<JoinHandle<()>>,
    event_bus_shutdown: Option<Sender<()>>,
}

impl<L: Ledger> Replica<L> {
    /// Hand a client payload to the replica. The leader of the current view proposes it. Any other replica
    /// forwards it to the leader.
    pub fn submit(&self, payload: Payload) {
        let _ = self.commands.send(Command::Submit(payload));
    }

    /// Move the replica to the next view.
    pub fn advance_view(&self) {
        let _ = self.commands.send(Command::AdvanceView);
    }

    /// Get the status of the replica as of the last iteration of its algorithm thread.
    pub fn status(&self) -> ReplicaStatus {
        match self.status.lock() {
            Ok(status) => status.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Returns the replica's ledger, which can be used to read committed entries.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }
}

impl<L: Ledger> Drop for Replica<L> {
    fn drop(&mut self) {
        // The algorithm thread publishes to the event bus, so it is shut down first.
        let _ = self.algorithm_shutdown.send(());
        if let Some(algorithm) = self.algorithm.take() {
            let _ = algorithm.join();
        }

        self.event_bus_shutdown.iter().for_each(|shutdown| {
            let _ = shutdown.send(());
        });
        if let Some(event_bus) = self.event_bus.take() {
            let _ = event_bus.join();
        }
    }
}
