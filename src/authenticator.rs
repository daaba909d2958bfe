/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Pluggable sign/verify capability used to authenticate envelopes.
//!
//! The consensus engine never trusts the `sender_id` of an envelope unless its signature passes
//! [`Authenticator::verify`]. How identities are bound to keys (a static directory, certificates, or a
//! shared-secret MAC) is up to the implementation. This crate ships [`Ed25519Authenticator`], which binds
//! each [`NodeId`] to an Ed25519 verifying key.

use std::collections::HashMap;

use crate::types::{
    crypto_primitives::{Keypair, Signature, SigningKey, Verifier, VerifyingKey},
    data_types::{NodeId, SignatureBytes},
};

pub trait Authenticator: Send + 'static {
    /// The identity that [`sign`](Self::sign) produces signatures for.
    fn node_id(&self) -> &NodeId;

    /// Sign `message` as [`node_id`](Self::node_id).
    fn sign(&self, message: &[u8]) -> SignatureBytes;

    /// Check that `signature` was produced over `message` by `claimed_sender`.
    ///
    /// Returns `false`, never panics, on a bad signature or an unknown sender.
    fn verify(&self, message: &[u8], signature: &SignatureBytes, claimed_sender: &NodeId) -> bool;
}

/// An [`Authenticator`] backed by an Ed25519 signing key and a static directory of the verifying keys
/// of every member.
#[derive(Clone)]
pub struct Ed25519Authenticator {
    me: NodeId,
    keypair: Keypair,
    directory: HashMap<NodeId, VerifyingKey>,
}

impl Ed25519Authenticator {
    /// Create an authenticator that signs as `me` with `signing_key`, and verifies envelopes against
    /// `directory`. `me`'s own verifying key is added to the directory.
    pub fn new(
        me: NodeId,
        signing_key: SigningKey,
        directory: impl IntoIterator<Item = (NodeId, VerifyingKey)>,
    ) -> Ed25519Authenticator {
        let keypair = Keypair::new(signing_key);
        let mut directory: HashMap<NodeId, VerifyingKey> = directory.into_iter().collect();
        directory.insert(me.clone(), keypair.public());
        Ed25519Authenticator { me, keypair, directory }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.keypair.public()
    }
}

impl Authenticator for Ed25519Authenticator {
    fn node_id(&self) -> &NodeId {
        &self.me
    }

    fn sign(&self, message: &[u8]) -> SignatureBytes {
        self.keypair.sign(message)
    }

    fn verify(&self, message: &[u8], signature: &SignatureBytes, claimed_sender: &NodeId) -> bool {
        match self.directory.get(claimed_sender) {
            Some(verifying_key) => {
                let signature = Signature::from_bytes(&signature.bytes());
                verifying_key.verify(message, &signature).is_ok()
            }
            None => false,
        }
    }
}
