/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the [NodeSet] type and its associated methods.

use std::slice;

use super::data_types::NodeId;

/// The static membership of a cluster.
///
/// The node set maintains its members in ascending lexicographic order of their [NodeId]s and without
/// duplicates, regardless of the order they were supplied in. Every replica configured with the same
/// members therefore agrees on [`members`](Self::members) and on the leader schedule derived from it.
///
/// # Quorum arithmetic
///
/// With `N` members the set tolerates `f = floor((N - 1) / 3)` faulty members, and a quorum is
/// `2f + 1` distinct members.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeSet {
    // Sorted and deduplicated.
    members: Vec<NodeId>,
}

impl NodeSet {
    pub fn new(members: impl IntoIterator<Item = NodeId>) -> NodeSet {
        let mut members: Vec<NodeId> = members.into_iter().collect();
        members.sort();
        members.dedup();
        NodeSet { members }
    }

    pub fn members(&self) -> slice::Iter<NodeId> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, node: &NodeId) -> bool {
        self.members.binary_search(node).is_ok()
    }

    /// Get the member at `position` in the sorted member list.
    pub fn get(&self, position: usize) -> Option<&NodeId> {
        self.members.get(position)
    }

    /// Get every member other than `me`.
    pub fn peers_of(&self, me: &NodeId) -> Vec<NodeId> {
        self.members.iter().filter(|member| *member != me).cloned().collect()
    }

    /// Maximum number of faulty members tolerated: `floor((N - 1) / 3)`.
    pub fn max_faulty(&self) -> usize {
        self.members.len().saturating_sub(1) / 3
    }

    /// Number of distinct matching votes that make a quorum: `2f + 1`.
    pub fn quorum(&self) -> usize {
        2 * self.max_faulty() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_set_of_size(n: usize) -> NodeSet {
        NodeSet::new((0..n).map(|i| NodeId::new(format!("node{}", i))))
    }

    #[test]
    fn quorum_arithmetic() {
        let expected = [(1, 0, 1), (2, 0, 1), (3, 0, 1), (4, 1, 3), (5, 1, 3), (6, 1, 3), (7, 2, 5), (10, 3, 7)];
        for (n, f, quorum) in expected {
            let node_set = node_set_of_size(n);
            assert_eq!(node_set.max_faulty(), f, "f for N = {}", n);
            assert_eq!(node_set.quorum(), quorum, "quorum for N = {}", n);
        }
    }

    #[test]
    fn members_are_sorted_and_deduplicated() {
        let node_set = NodeSet::new(vec!["c".into(), "a".into(), "b".into(), "a".into()]);
        assert_eq!(node_set.len(), 3);
        assert_eq!(
            node_set.members().cloned().collect::<Vec<_>>(),
            vec![NodeId::from("a"), NodeId::from("b"), NodeId::from("c")]
        );
        assert!(node_set.contains(&"b".into()));
        assert!(!node_set.contains(&"d".into()));
        assert_eq!(node_set.peers_of(&"b".into()), vec![NodeId::from("a"), NodeId::from("c")]);
    }
}
