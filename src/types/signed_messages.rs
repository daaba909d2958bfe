/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Signed messages.

use crate::authenticator::Authenticator;

use super::data_types::{NodeId, SignatureBytes};

/// Data types that contain: 1. A message, 2. The identity of the node claiming to have sent it, and
/// 3. A digital signature over said message whose correctness can be checked by an [`Authenticator`].
pub trait SignedMessage: Clone {
    /// Get the bytes that are passed as input into the signing function to form the signature
    /// of the `SignedMessage`.
    fn message_bytes(&self) -> Vec<u8>;

    /// Get the signature of the `SignedMessage`.
    fn signature_bytes(&self) -> SignatureBytes;

    /// Get the node that claims to have signed the `SignedMessage`.
    fn signer(&self) -> &NodeId;

    /// Verify that `signature_bytes` is a signature created by `signer` over `message_bytes`.
    fn is_correct<A: Authenticator>(&self, authenticator: &A) -> bool {
        authenticator.verify(&self.message_bytes(), &self.signature_bytes(), self.signer())
    }
}
