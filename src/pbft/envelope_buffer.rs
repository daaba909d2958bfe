/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Buffer for authenticated envelopes that arrive before the replica can admit them.
//!
//! Replicas enter views and take checkpoints at slightly different times. A replica that is one view
//! behind, or one checkpoint behind, receives envelopes for a view it has not entered yet or for sequences
//! above its high-water mark. Since broadcasts are never re-sent, dropping these envelopes would leave
//! the replica unable to ever commit those sequences. Instead, the [`ConsensusEngine`] keeps them in an
//! `EnvelopeBuffer` and processes them again once it advances its view or its window.
//!
//! ## Buffer management
//!
//! The buffer holds at most one envelope per sender, type, view, and sequence, and at most `capacity`
//! envelopes in total. When it is full, envelopes with the highest view and sequence are removed first to
//! make space for lower ones, so that the envelopes the replica will need soonest are kept.
//!
//! [`ConsensusEngine`]: super::implementation::ConsensusEngine

use std::collections::BTreeMap;

use crate::types::data_types::{SequenceNumber, ViewNumber};

use super::{
    messages::{Envelope, EnvelopeType},
    types::DropReason,
};

/// What happened to an envelope handed to [`EnvelopeBuffer::insert`].
#[derive(Debug)]
pub(crate) enum Insertion {
    /// The envelope was buffered.
    Buffered,

    /// The envelope was buffered, and the returned envelope was removed to make space for it.
    Evicted(Envelope),

    /// The sender already has an envelope of the same type buffered for the same view and sequence.
    Repeated(DropReason),

    /// The buffer is full of envelopes that the replica will need before this one.
    Full,
}

pub(crate) struct EnvelopeBuffer {
    capacity: usize,
    buffer: BTreeMap<(ViewNumber, SequenceNumber), Vec<Envelope>>,
    len: usize,
}

impl EnvelopeBuffer {
    pub(crate) fn new(capacity: usize) -> EnvelopeBuffer {
        EnvelopeBuffer {
            capacity,
            buffer: BTreeMap::new(),
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Try buffering `envelope`.
    pub(crate) fn insert(&mut self, envelope: Envelope) -> Insertion {
        let key = (envelope.view, envelope.sequence);

        // 1. Keep one envelope per sender and type.
        if let Some(repeated) = self.buffer.get(&key).and_then(|envelopes| {
            envelopes.iter().find(|buffered| {
                buffered.sender_id == envelope.sender_id && buffered.envelope_type == envelope.envelope_type
            })
        }) {
            let reason = match envelope.envelope_type {
                EnvelopeType::PrePrepare if repeated.block_hash == envelope.block_hash => {
                    DropReason::DuplicatePrePrepare
                }
                EnvelopeType::PrePrepare => DropReason::Equivocation,
                EnvelopeType::Prepare | EnvelopeType::Commit => DropReason::DuplicateVote,
            };
            return Insertion::Repeated(reason);
        }

        // 2. Make space by removing the envelope with the highest key, unless that is the new envelope.
        let mut evicted = None;
        if self.len >= self.capacity {
            let highest = self.buffer.keys().next_back().copied();
            match highest {
                Some(highest) if key < highest => evicted = self.pop_highest(),
                _ => return Insertion::Full,
            }
        }

        self.buffer.entry(key).or_default().push(envelope);
        self.len += 1;
        match evicted {
            Some(evicted) => Insertion::Evicted(evicted),
            None => Insertion::Buffered,
        }
    }

    /// Remove and return every envelope that the replica can now process: those for `view` with sequences
    /// up to `high_water_mark`, and those for older views, which have become stale. The envelopes are
    /// returned in view and sequence order.
    pub(crate) fn take_ready(&mut self, view: ViewNumber, high_water_mark: SequenceNumber) -> Vec<Envelope> {
        let ready_keys: Vec<(ViewNumber, SequenceNumber)> = self
            .buffer
            .keys()
            .filter(|(buffered_view, sequence)| {
                *buffered_view < view || (*buffered_view == view && *sequence <= high_water_mark)
            })
            .copied()
            .collect();

        let mut ready = Vec::new();
        for key in ready_keys {
            if let Some(envelopes) = self.buffer.remove(&key) {
                self.len -= envelopes.len();
                ready.extend(envelopes);
            }
        }
        ready
    }

    fn pop_highest(&mut self) -> Option<Envelope> {
        let mut highest = self.buffer.last_entry()?;
        let evicted = highest.get_mut().pop();
        if highest.get().is_empty() {
            highest.remove();
        }
        if evicted.is_some() {
            self.len -= 1;
        }
        evicted
    }
}
