/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use crate::types::{data_types::NodeId, node_set::NodeSet};

use super::messages::Message;

pub trait Network: Clone + Send {
    /// Inform the network provider of the node set on wake-up.
    fn init_node_set(&mut self, node_set: NodeSet);

    /// Send a message to all peers without blocking.
    ///
    /// Whether the broadcaster also receives its own message is up to the provider. Replicas ignore
    /// envelopes that they sent themselves.
    fn broadcast(&mut self, message: Message);

    /// Send a message to the specified peer without blocking.
    fn send(&mut self, peer: NodeId, message: Message);

    /// Receive a message from any peer. Returns immediately with a None if no message is available now.
    fn recv(&mut self) -> Option<(NodeId, Message)>;
}
