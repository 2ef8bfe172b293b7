/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Credential verification.
//!
//! The executor checks every signature through the [`Fx`] trait, so the signature scheme can be
//! swapped without touching the spend rules. [`Ed25519Fx`] is the scheme this crate ships with.
//!
//! A credential authorises `owners` when:
//! 1. `owners.locktime` has passed (transfers only),
//! 2. the signature indices are strictly increasing and there are exactly `owners.threshold` of them,
//! 3. the `i`-th signature was made by the key whose address is `owners.addrs[sig_indices[i]]`, and
//! 4. every signature verifies over the unsigned transaction bytes.

use std::fmt::{self, Display, Formatter};

use crate::types::{
    crypto_primitives::{Signature, Verifier, VerifyingKey},
    ids::{ShortId, Timestamp},
    outputs::OutputOwners,
    txs::Credential,
};

pub trait Fx: Send + Sync {
    /// Check that `credential` authorises spending an output owned by `owners` at time `now`.
    fn verify_transfer(
        &self,
        unsigned_bytes: &[u8],
        now: Timestamp,
        sig_indices: &[u32],
        credential: &Credential,
        owners: &OutputOwners,
    ) -> Result<(), FxError> {
        if now < owners.locktime {
            return Err(FxError::LockedByTime {
                locktime: owners.locktime,
                now,
            });
        }
        self.verify_permission(unsigned_bytes, sig_indices, credential, owners)
    }

    /// Check that `credential` carries the signatures of a threshold of `owners`, ignoring the
    /// locktime. Used for subnet authorisation.
    fn verify_permission(
        &self,
        unsigned_bytes: &[u8],
        sig_indices: &[u32],
        credential: &Credential,
        owners: &OutputOwners,
    ) -> Result<(), FxError>;

    /// The addresses of every key that validly signed `unsigned_bytes` in `credential`.
    fn recover_signers(&self, unsigned_bytes: &[u8], credential: &Credential) -> Result<Vec<ShortId>, FxError>;
}

/// Threshold ed25519 signatures.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519Fx;

impl Ed25519Fx {
    fn verify_signature(
        unsigned_bytes: &[u8],
        public_key: &[u8; 32],
        signature: &crate::types::crypto_primitives::SignatureBytes,
    ) -> Result<(), FxError> {
        let verifying_key = VerifyingKey::from_bytes(public_key).map_err(|_| FxError::InvalidPublicKey)?;
        verifying_key
            .verify(unsigned_bytes, &Signature::from_bytes(&signature.bytes()))
            .map_err(|_| FxError::InvalidSignature)
    }
}

impl Fx for Ed25519Fx {
    fn verify_permission(
        &self,
        unsigned_bytes: &[u8],
        sig_indices: &[u32],
        credential: &Credential,
        owners: &OutputOwners,
    ) -> Result<(), FxError> {
        if !sig_indices.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(FxError::SignatureIndicesNotSorted);
        }
        if sig_indices.len() != owners.threshold as usize {
            return Err(FxError::WrongNumberOfSignatures {
                expected: owners.threshold as usize,
                actual: sig_indices.len(),
            });
        }
        if credential.signatures.len() != sig_indices.len() {
            return Err(FxError::WrongNumberOfSignatures {
                expected: sig_indices.len(),
                actual: credential.signatures.len(),
            });
        }

        for (index, signature) in sig_indices.iter().zip(&credential.signatures) {
            let expected = owners
                .addrs
                .get(*index as usize)
                .ok_or(FxError::IndexOutOfBounds { index: *index })?;
            if ShortId::from_public_key(&signature.public_key) != *expected {
                return Err(FxError::SignerMismatch { index: *index });
            }
            Self::verify_signature(unsigned_bytes, &signature.public_key, &signature.signature)?;
        }
        Ok(())
    }

    fn recover_signers(&self, unsigned_bytes: &[u8], credential: &Credential) -> Result<Vec<ShortId>, FxError> {
        credential
            .signatures
            .iter()
            .map(|signature| {
                Self::verify_signature(unsigned_bytes, &signature.public_key, &signature.signature)?;
                Ok(ShortId::from_public_key(&signature.public_key))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FxError {
    LockedByTime { locktime: Timestamp, now: Timestamp },
    SignatureIndicesNotSorted,
    WrongNumberOfSignatures { expected: usize, actual: usize },
    IndexOutOfBounds { index: u32 },
    SignerMismatch { index: u32 },
    InvalidPublicKey,
    InvalidSignature,
}

impl Display for FxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FxError::LockedByTime { locktime, now } => {
                write!(f, "output is locked until {}, now is {}", locktime, now)
            }
            FxError::SignatureIndicesNotSorted => write!(f, "signature indices are not strictly increasing"),
            FxError::WrongNumberOfSignatures { expected, actual } => {
                write!(f, "expected {} signatures, got {}", expected, actual)
            }
            FxError::IndexOutOfBounds { index } => write!(f, "signature index {} names no owner", index),
            FxError::SignerMismatch { index } => write!(f, "signature {} is not by the named owner", index),
            FxError::InvalidPublicKey => write!(f, "invalid public key"),
            FxError::InvalidSignature => write!(f, "invalid signature"),
        }
    }
}

impl std::error::Error for FxError {}
