/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types and traits that are used across multiple components of pbft_rs.
//!
//! Other types and traits, specific to the consensus protocol, can be found in [`crate::pbft::types`].

pub mod block;

pub mod crypto_primitives;

pub mod data_types;

pub mod node_set;

pub mod signed_messages;
