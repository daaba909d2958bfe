/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A Rust Programming Language library for Byzantine Fault Tolerant (BFT) replication of an ordered,
//! hash-chained ledger using the three-phase PBFT protocol.
//!
//! A cluster of `N` replicas agrees on the block stored at every sequence number of the ledger, and keeps
//! agreeing as long as at most `f = floor((N - 1) / 3)` replicas are faulty. Faulty replicas may crash, stay
//! silent, or send arbitrary, well-signed messages.
//!
//! ## Getting started
//!
//! To run a replica, users provide implementations of three traits and start a [`ReplicaSpec`](replica::ReplicaSpec):
//! 1. [`Ledger`](ledger::Ledger): where committed blocks are appended.
//! 2. [`Authenticator`](authenticator::Authenticator): how envelopes are signed and verified.
//!    [`Ed25519Authenticator`](authenticator::Ed25519Authenticator) is provided.
//! 3. [`Network`](networking::network::Network): how messages reach the other replicas.
//!
//! Client payloads are then handed to the running [`Replica`](replica::Replica) with
//! [`submit`](replica::Replica::submit).
//!
//! ## Crate organization
//!
//! - The protocol itself lives in [`pbft`]. Its [`ConsensusEngine`](pbft::implementation::ConsensusEngine)
//!   is synchronous and can also be driven directly, without threads.
//! - What the engine does is reported as [`events`], which are optionally [logged](logging).
//! - Data types shared by all modules live in [`types`].

pub(crate) mod algorithm;

pub mod authenticator;

pub(crate) mod event_bus;

pub mod events;

pub mod ledger;

pub mod logging;

pub mod networking;

pub mod pbft;

pub mod replica;

pub mod types;
