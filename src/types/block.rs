/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the 'block' type and its associated methods.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use super::{
    crypto_primitives::{CryptoHasher, Digest},
    data_types::{millis_since_unix_epoch, CryptoHash, Payload, SequenceNumber},
};

/// A candidate ledger entry, proposed by the leader of a view for a single sequence number.
///
/// `hash` is a SHA-256 digest over the Borsh encoding of the other four fields. Replicas never trust
/// it as given: it is recomputed by [`is_correct`](Self::is_correct) on every receipt, and again
/// before the block is appended to the ledger.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub sequence: SequenceNumber,
    pub previous_hash: CryptoHash,
    pub payload: Payload,
    pub timestamp: u64,
    pub hash: CryptoHash,
}

impl Block {
    /// Create a block stamped with the current time.
    pub fn new(sequence: SequenceNumber, previous_hash: CryptoHash, payload: Payload) -> Block {
        Block::with_timestamp(sequence, previous_hash, payload, millis_since_unix_epoch())
    }

    pub fn with_timestamp(
        sequence: SequenceNumber,
        previous_hash: CryptoHash,
        payload: Payload,
        timestamp: u64,
    ) -> Block {
        Block {
            sequence,
            hash: Block::hash(sequence, &previous_hash, &payload, timestamp),
            previous_hash,
            payload,
            timestamp,
        }
    }

    pub fn hash(
        sequence: SequenceNumber,
        previous_hash: &CryptoHash,
        payload: &Payload,
        timestamp: u64,
    ) -> CryptoHash {
        let mut hasher = CryptoHasher::new();
        hasher.update(&sequence.try_to_vec().unwrap());
        hasher.update(&previous_hash.try_to_vec().unwrap());
        hasher.update(&payload.try_to_vec().unwrap());
        hasher.update(&timestamp.try_to_vec().unwrap());
        CryptoHash::new(hasher.finalize().into())
    }

    /// Checks if `hash` matches the hash recomputed from the block's contents.
    pub fn is_correct(&self) -> bool {
        self.hash == Block::hash(self.sequence, &self.previous_hash, &self.payload, self.timestamp)
    }
}
