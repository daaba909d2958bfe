/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Trait for the pluggable, ordered, hash-chained ledger that committed blocks are appended to.
//!
//! The consensus engine is the only writer of a replica's ledger. It appends sequence `s` only after
//! sequence `s - 1` has been appended, and only with a `previous_hash` equal to the hash of entry `s - 1`
//! (or [`CryptoHash::genesis`] for `s == 1`). Implementations therefore only have to store entries in
//! order and refuse to overwrite them.
//!
//! Storage failures are the implementation's responsibility. They are reported as
//! [`LedgerError::Storage`] and surface from the engine as
//! [`EngineError::Ledger`](crate::pbft::implementation::EngineError::Ledger).

use std::fmt::{self, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::types::{
    block::Block,
    data_types::{CryptoHash, Payload, SequenceNumber},
};

pub trait Ledger: Clone + Send + 'static {
    /// Append a new entry at `sequence` and return it.
    ///
    /// Appending an entry identical to the one already stored at `sequence` is a no-op that returns the
    /// stored entry. Appending a different entry fails with [`LedgerError::Conflict`].
    fn append(
        &mut self,
        sequence: SequenceNumber,
        previous_hash: CryptoHash,
        payload: Payload,
        timestamp: u64,
    ) -> Result<LedgerEntry, LedgerError>;

    fn get_by_sequence(&self, sequence: SequenceNumber) -> Result<Option<LedgerEntry>, LedgerError>;

    /// Get the sequence number of the last entry, or [`SequenceNumber::init`] if the ledger is empty.
    fn get_last_sequence(&self) -> Result<SequenceNumber, LedgerError>;

    /// Walk every entry from sequence 1 to the last, checking that each stored hash matches the hash
    /// recomputed from the entry's contents, and that each entry links to the hash of its predecessor.
    fn is_chain_valid(&self) -> Result<bool, LedgerError> {
        let last = self.get_last_sequence()?;
        let mut expected_previous_hash = CryptoHash::genesis();
        for int in 1..=last.int() {
            let sequence = SequenceNumber::new(int);
            let entry = match self.get_by_sequence(sequence)? {
                Some(entry) => entry,
                None => return Ok(false),
            };
            if entry.sequence != sequence
                || entry.previous_hash != expected_previous_hash
                || !entry.is_correct()
            {
                return Ok(false);
            }
            expected_previous_hash = entry.hash;
        }
        Ok(true)
    }
}

/// An immutable record of a committed block.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub sequence: SequenceNumber,
    pub previous_hash: CryptoHash,
    pub hash: CryptoHash,
    pub payload: Payload,
    pub timestamp: u64,
}

impl LedgerEntry {
    /// Create an entry, computing its hash the same way [`Block::hash`] does.
    pub fn new(
        sequence: SequenceNumber,
        previous_hash: CryptoHash,
        payload: Payload,
        timestamp: u64,
    ) -> LedgerEntry {
        LedgerEntry {
            sequence,
            hash: Block::hash(sequence, &previous_hash, &payload, timestamp),
            previous_hash,
            payload,
            timestamp,
        }
    }

    pub fn is_correct(&self) -> bool {
        self.hash == Block::hash(self.sequence, &self.previous_hash, &self.payload, self.timestamp)
    }
}

/// The ways a call to a [`Ledger`] method can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A different entry is already stored at `sequence`.
    Conflict {
        sequence: SequenceNumber,
        existing: CryptoHash,
        attempted: CryptoHash,
    },

    /// The storage backing the ledger failed. Replicas cannot make progress past this error.
    Storage(String),
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Conflict {
                sequence,
                existing,
                attempted,
            } => write!(
                f,
                "ledger already holds {} at sequence {}, refusing to append {}",
                existing, sequence, attempted
            ),
            LedgerError::Storage(reason) => write!(f, "ledger storage failure: {}", reason),
        }
    }
}

impl std::error::Error for LedgerError {}
