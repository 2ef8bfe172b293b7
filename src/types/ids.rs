/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Fixed-size identifiers used throughout the platform chain.
//!
//! [`Id`] names transactions, blocks, assets, subnets and chains. [`ShortId`] names addresses and
//! nodes. Both display as checksummed base58: the bytes followed by the last four bytes of their
//! SHA-256 digest, base58-encoded.

use borsh::{BorshDeserialize, BorshSerialize};
use std::{
    fmt::{self, Debug, Display, Formatter},
    str::FromStr,
};

use super::crypto_primitives::{sha256, CryptoHasher, Digest};

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

/// An amount of some asset, in its smallest denomination.
pub type Amount = u64;

/// Identifies a validator node.
pub type NodeId = ShortId;

const CHECKSUM_LEN: usize = 4;

/// 32-byte identifier.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct Id([u8; 32]);

impl Id {
    pub const EMPTY: Id = Id([0; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// The SHA-256 digest of `data`.
    pub fn hash(data: &[u8]) -> Id {
        Id(sha256(data))
    }

    /// The SHA-256 digest of this id followed by the big-endian bytes of `index`. Used to derive
    /// the ids of a transaction's outputs.
    pub fn prefixed(&self, index: u32) -> Id {
        let mut hasher = CryptoHasher::new();
        hasher.update(self.0);
        hasher.update(index.to_be_bytes());
        Id(hasher.finalize().into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(string: &str) -> Result<Id, IdParseError> {
        let bytes = hex::decode(string).map_err(IdParseError::Hex)?;
        Ok(Id(to_array(&bytes)?))
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", cb58_encode(&self.0))
    }
}

impl Debug for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self)
    }
}

impl FromStr for Id {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Id(to_array(&cb58_decode(s)?)?))
    }
}

/// 20-byte identifier: an address (the first 20 bytes of the SHA-256 digest of a public key) or a
/// node id.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct ShortId([u8; 20]);

impl ShortId {
    pub const EMPTY: ShortId = ShortId([0; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> [u8; 20] {
        self.0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// The address controlled by the holder of `public_key`.
    pub fn from_public_key(public_key: &[u8; 32]) -> ShortId {
        let digest = sha256(public_key);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        ShortId(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Display for ShortId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", cb58_encode(&self.0))
    }
}

impl Debug for ShortId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ShortId({})", self)
    }
}

impl FromStr for ShortId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ShortId(to_array(&cb58_decode(s)?)?))
    }
}

#[derive(Debug)]
pub enum IdParseError {
    Hex(hex::FromHexError),
    Base58(bs58::decode::Error),
    Checksum,
    Length { expected: usize, actual: usize },
}

impl Display for IdParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            IdParseError::Hex(err) => write!(f, "invalid hex id: {}", err),
            IdParseError::Base58(err) => write!(f, "invalid base58 id: {}", err),
            IdParseError::Checksum => write!(f, "id checksum mismatch"),
            IdParseError::Length { expected, actual } => {
                write!(f, "expected {} id bytes, found {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for IdParseError {}

fn cb58_encode(bytes: &[u8]) -> String {
    let digest = sha256(bytes);
    let mut checked = Vec::with_capacity(bytes.len() + CHECKSUM_LEN);
    checked.extend_from_slice(bytes);
    checked.extend_from_slice(&digest[digest.len() - CHECKSUM_LEN..]);
    bs58::encode(checked).into_string()
}

fn cb58_decode(string: &str) -> Result<Vec<u8>, IdParseError> {
    let checked = bs58::decode(string)
        .into_vec()
        .map_err(IdParseError::Base58)?;
    if checked.len() < CHECKSUM_LEN {
        return Err(IdParseError::Checksum);
    }
    let (bytes, checksum) = checked.split_at(checked.len() - CHECKSUM_LEN);
    let digest = sha256(bytes);
    if checksum != &digest[digest.len() - CHECKSUM_LEN..] {
        return Err(IdParseError::Checksum);
    }
    Ok(bytes.to_vec())
}

fn to_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N], IdParseError> {
    bytes.try_into().map_err(|_| IdParseError::Length {
        expected: N,
        actual: bytes.len(),
    })
}
