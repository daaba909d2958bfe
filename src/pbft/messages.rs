/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the signed envelopes that replicas exchange as part of the
//! [PBFT](crate::pbft::implementation::ConsensusEngine) protocol.
//!
//! ## Wire format
//!
//! Envelopes travel as JSON objects:
//!
//! ```text
//! { "type": "PRE-PREPARE" | "PREPARE" | "COMMIT",
//!   "view": integer, "sequence": integer,
//!   "blockHash": string, "block": {...} (PRE-PREPARE only),
//!   "senderId": string, "signature": string, "sendTimestamp": integer }
//! ```
//!
//! Hashes, signatures and payloads are standard Base64 strings. The signature covers the Borsh
//! encoding of every other field.

use std::fmt::{self, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::authenticator::Authenticator;
use crate::types::{
    block::Block,
    data_types::{millis_since_unix_epoch, CryptoHash, NodeId, SequenceNumber, SignatureBytes, ViewNumber},
    signed_messages::SignedMessage,
};

use super::types::Phase;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum EnvelopeType {
    #[serde(rename = "PRE-PREPARE")]
    PrePrepare,
    #[serde(rename = "PREPARE")]
    Prepare,
    #[serde(rename = "COMMIT")]
    Commit,
}

impl From<Phase> for EnvelopeType {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Prepare => EnvelopeType::Prepare,
            Phase::Commit => EnvelopeType::Commit,
        }
    }
}

impl Display for EnvelopeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeType::PrePrepare => f.write_str("PRE-PREPARE"),
            EnvelopeType::Prepare => f.write_str("PREPARE"),
            EnvelopeType::Commit => f.write_str("COMMIT"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub envelope_type: EnvelopeType,
    pub view: ViewNumber,
    pub sequence: SequenceNumber,
    pub block_hash: CryptoHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<Block>,
    pub sender_id: NodeId,
    pub signature: SignatureBytes,
    pub send_timestamp: u64,
}

impl Envelope {
    /// Create an envelope sent and signed by `authenticator`'s node, stamped with the current time.
    pub fn new<A: Authenticator>(
        authenticator: &A,
        envelope_type: EnvelopeType,
        view: ViewNumber,
        sequence: SequenceNumber,
        block_hash: CryptoHash,
        block: Option<Block>,
    ) -> Envelope {
        let sender_id = authenticator.node_id().clone();
        let send_timestamp = millis_since_unix_epoch();
        let message_bytes = Envelope::signing_bytes(
            envelope_type,
            view,
            sequence,
            block_hash,
            &block,
            &sender_id,
            send_timestamp,
        );
        let signature = authenticator.sign(&message_bytes);

        Envelope {
            envelope_type,
            view,
            sequence,
            block_hash,
            block,
            sender_id,
            signature,
            send_timestamp,
        }
    }

    pub fn pre_prepare<A: Authenticator>(authenticator: &A, view: ViewNumber, block: Block) -> Envelope {
        Envelope::new(
            authenticator,
            EnvelopeType::PrePrepare,
            view,
            block.sequence,
            block.hash,
            Some(block),
        )
    }

    pub fn vote<A: Authenticator>(
        authenticator: &A,
        phase: Phase,
        view: ViewNumber,
        sequence: SequenceNumber,
        block_hash: CryptoHash,
    ) -> Envelope {
        Envelope::new(authenticator, phase.into(), view, sequence, block_hash, None)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse an envelope from its JSON wire format. The signature is not checked.
    pub fn from_json(json: &str) -> Result<Envelope, EnvelopeDecodeError> {
        let envelope: Envelope = serde_json::from_str(json)?;
        match (envelope.envelope_type, &envelope.block) {
            (EnvelopeType::PrePrepare, None) => Err(EnvelopeDecodeError::MissingBlock),
            (EnvelopeType::Prepare | EnvelopeType::Commit, Some(_)) => {
                Err(EnvelopeDecodeError::UnexpectedBlock)
            }
            _ => Ok(envelope),
        }
    }

    fn signing_bytes(
        envelope_type: EnvelopeType,
        view: ViewNumber,
        sequence: SequenceNumber,
        block_hash: CryptoHash,
        block: &Option<Block>,
        sender_id: &NodeId,
        send_timestamp: u64,
    ) -> Vec<u8> {
        (
            envelope_type,
            view,
            sequence,
            block_hash,
            block.clone(),
            sender_id.clone(),
            send_timestamp,
        )
            .try_to_vec()
            .unwrap()
    }
}

impl SignedMessage for Envelope {
    fn message_bytes(&self) -> Vec<u8> {
        Envelope::signing_bytes(
            self.envelope_type,
            self.view,
            self.sequence,
            self.block_hash,
            &self.block,
            &self.sender_id,
            self.send_timestamp,
        )
    }

    fn signature_bytes(&self) -> SignatureBytes {
        self.signature
    }

    fn signer(&self) -> &NodeId {
        &self.sender_id
    }
}

/// The ways [`Envelope::from_json`] can fail.
#[derive(Debug)]
pub enum EnvelopeDecodeError {
    /// The input is not valid JSON, or does not have the shape of an envelope.
    Json(serde_json::Error),

    /// A PRE-PREPARE envelope without a block.
    MissingBlock,

    /// A PREPARE or COMMIT envelope carrying a block.
    UnexpectedBlock,
}

impl From<serde_json::Error> for EnvelopeDecodeError {
    fn from(value: serde_json::Error) -> Self {
        EnvelopeDecodeError::Json(value)
    }
}

impl Display for EnvelopeDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeDecodeError::Json(err) => write!(f, "invalid envelope JSON: {}", err),
            EnvelopeDecodeError::MissingBlock => f.write_str("PRE-PREPARE envelope without a block"),
            EnvelopeDecodeError::UnexpectedBlock => f.write_str("vote envelope carrying a block"),
        }
    }
}

impl std::error::Error for EnvelopeDecodeError {}
