/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that determine what role a replica should play in any given view.

use crate::types::{
    data_types::{NodeId, ViewNumber},
    node_set::NodeSet,
};

/// Deterministically select the member of `node_set` that leads `view`: the member at position
/// `view mod N` of the sorted member list.
///
/// # Panics
///
/// `node_set` must not be empty. Replicas refuse to start with an empty node set.
pub fn select_leader(view: ViewNumber, node_set: &NodeSet) -> NodeId {
    let n = node_set.len().max(1) as u64;
    let position = (view.int() % n) as usize;
    match node_set.get(position) {
        Some(leader) => leader.clone(),
        None => panic!("The node set cannot be empty!"),
    }
}

/// Determine whether `replica` leads `view`.
pub fn is_leader(replica: &NodeId, view: ViewNumber, node_set: &NodeSet) -> bool {
    &select_leader(view, node_set) == replica
}
