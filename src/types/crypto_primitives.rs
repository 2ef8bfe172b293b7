/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Cryptographic primitives.
//!
//! The definitions and re-exports in this module provide two categories of cryptographic primitives:
//! 1. **Cryptographic Hashes**: provided by the [`sha2`] crate. Transaction, block, UTXO and owner
//!    ids are all SHA-256 digests.
//! 2. **Digital Signatures**: provided by the [`ed25519_dalek`] crate. Credentials carry ed25519
//!    public keys together with their signatures.

use borsh::{BorshDeserialize, BorshSerialize};
use std::fmt::{self, Debug, Formatter};

use super::ids::ShortId;

// re-exports below.
pub use sha2::Digest;
pub use sha2::Sha256 as CryptoHasher;

pub use ed25519_dalek::{Signature, SignatureError, Signer, SigningKey, Verifier, VerifyingKey};

/// The SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = CryptoHasher::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Ed25519 digital signature.
#[derive(Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SignatureBytes([u8; 64]);

impl SignatureBytes {
    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> [u8; 64] {
        self.0
    }
}

impl Debug for SignatureBytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureBytes({})", hex::encode(&self.0[..8]))
    }
}

/// A facade around [`SigningKey`] that signs messages and reports the public key and address
/// associated with the signing key.
#[derive(Clone)]
pub struct Keypair(pub SigningKey);

impl Keypair {
    /// Create a `Keypair` that wraps over `signing_key`.
    pub fn new(signing_key: SigningKey) -> Keypair {
        Keypair(signing_key)
    }

    /// Sign an arbitrary `message` with the `Keypair`.
    pub fn sign(&self, message: &[u8]) -> SignatureBytes {
        SignatureBytes::new(self.0.sign(message).to_bytes())
    }

    /// Get the `VerifyingKey` of this `Keypair`.
    pub fn public(&self) -> VerifyingKey {
        self.0.verifying_key()
    }

    /// The address that outputs use to name this key as an owner.
    pub fn address(&self) -> ShortId {
        ShortId::from_public_key(&self.public().to_bytes())
    }
}
