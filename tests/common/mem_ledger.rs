//! A simple, volatile, in-memory implementation of [`Ledger`].

use std::sync::{Arc, Mutex};

use pbft_rs::{
    ledger::{Ledger, LedgerEntry, LedgerError},
    types::data_types::{CryptoHash, Payload, SequenceNumber},
};

/// An in-memory implementation of [`Ledger`]. Clones share the same entries.
#[derive(Clone)]
pub(crate) struct MemLedger(Arc<Mutex<Vec<LedgerEntry>>>);

impl MemLedger {
    /// Create a new, empty `MemLedger`.
    pub(crate) fn new() -> MemLedger {
        MemLedger(Arc::new(Mutex::new(Vec::new())))
    }

    pub(crate) fn entries(&self) -> Vec<LedgerEntry> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub(crate) fn payloads(&self) -> Vec<Payload> {
        self.entries().into_iter().map(|entry| entry.payload).collect()
    }

    /// Overwrite the stored entry at `sequence` in place, bypassing [`Ledger::append`].
    pub(crate) fn tamper(&self, sequence: u64, tamper: impl FnOnce(&mut LedgerEntry)) {
        let mut entries = self.0.lock().unwrap();
        tamper(&mut entries[sequence as usize - 1]);
    }
}

impl Ledger for MemLedger {
    fn append(
        &mut self,
        sequence: SequenceNumber,
        previous_hash: CryptoHash,
        payload: Payload,
        timestamp: u64,
    ) -> Result<LedgerEntry, LedgerError> {
        let mut entries = self.0.lock().unwrap();
        let entry = LedgerEntry::new(sequence, previous_hash, payload, timestamp);
        let index = sequence.int() as usize;

        if index == 0 || index > entries.len() + 1 {
            return Err(LedgerError::Storage(format!(
                "cannot append sequence {} after sequence {}",
                sequence,
                entries.len()
            )));
        }
        if index == entries.len() + 1 {
            entries.push(entry.clone());
            return Ok(entry);
        }

        let existing = &entries[index - 1];
        if existing == &entry {
            Ok(existing.clone())
        } else {
            Err(LedgerError::Conflict {
                sequence,
                existing: existing.hash,
                attempted: entry.hash,
            })
        }
    }

    fn get_by_sequence(&self, sequence: SequenceNumber) -> Result<Option<LedgerEntry>, LedgerError> {
        let entries = self.0.lock().unwrap();
        match sequence.int() as usize {
            0 => Ok(None),
            index => Ok(entries.get(index - 1).cloned()),
        }
    }

    fn get_last_sequence(&self) -> Result<SequenceNumber, LedgerError> {
        Ok(SequenceNumber::new(self.0.lock().unwrap().len() as u64))
    }
}
