use std::{
    collections::HashMap,
    sync::{
        mpsc::{self, Receiver, Sender, TryRecvError},
        Arc, Mutex,
    },
};

use pbft_rs::{
    networking::{messages::Message, network::Network},
    types::{data_types::NodeId, node_set::NodeSet},
};

/// A mock network stub which passes messages from and to threads using channels.
#[derive(Clone)]
pub(crate) struct NetworkStub {
    my_node_id: NodeId,
    all_peers: HashMap<NodeId, Sender<(NodeId, Message)>>,
    inbox: Arc<Mutex<Receiver<(NodeId, Message)>>>,
}

impl Network for NetworkStub {
    fn init_node_set(&mut self, _: NodeSet) {}

    fn send(&mut self, peer: NodeId, message: Message) {
        if let Some(peer) = self.all_peers.get(&peer) {
            let _ = peer.send((self.my_node_id.clone(), message));
        }
    }

    fn broadcast(&mut self, message: Message) {
        for peer in self.all_peers.values() {
            let _ = peer.send((self.my_node_id.clone(), message.clone()));
        }
    }

    fn recv(&mut self) -> Option<(NodeId, Message)> {
        match self.inbox.lock().unwrap().try_recv() {
            Ok(o_m) => Some(o_m),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => panic!(),
        }
    }
}

pub(crate) fn mock_network(peers: impl Iterator<Item = NodeId>) -> Vec<NetworkStub> {
    let mut all_peers = HashMap::new();
    let peer_and_inboxes: Vec<(NodeId, Receiver<(NodeId, Message)>)> = peers
        .map(|peer| {
            let (sender, receiver) = mpsc::channel();
            all_peers.insert(peer.clone(), sender);

            (peer, receiver)
        })
        .collect();

    peer_and_inboxes
        .into_iter()
        .map(|(my_node_id, inbox)| NetworkStub {
            my_node_id,
            all_peers: all_peers.clone(),
            inbox: Arc::new(Mutex::new(inbox)),
        })
        .collect()
}
