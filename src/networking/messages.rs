/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Exhaustive enumeration of every message variant that replicas send each other.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{pbft::messages::Envelope, types::data_types::Payload};

/// All message variants used in pbft_rs.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum Message {
    /// See: [`Envelope`].
    Envelope(Envelope),

    /// See: [`ClientRequest`].
    ClientRequest(ClientRequest),
}

impl From<Envelope> for Message {
    fn from(value: Envelope) -> Self {
        Message::Envelope(value)
    }
}

impl From<ClientRequest> for Message {
    fn from(value: ClientRequest) -> Self {
        Message::ClientRequest(value)
    }
}

/// A client payload forwarded by a replica that is not the leader to the replica it believes is.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct ClientRequest {
    pub payload: Payload,
}
