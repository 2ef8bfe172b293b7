/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Versioned, size-limited encoding of every value the chain hashes, signs, stores or sends.
//!
//! An encoded value is a 2-byte big-endian codec version followed by the value's borsh encoding.
//! Decoding rejects unknown versions, inputs longer than the manager's limit and trailing bytes,
//! so every value has exactly one encoding.

use borsh::{BorshDeserialize, BorshSerialize};
use std::fmt::{self, Display, Formatter};

use crate::types::ids::Id;

pub const CODEC_VERSION: u16 = 0;

/// Limit of the standard codec manager.
pub const MAX_MESSAGE_SIZE: usize = 256 * 1024;

/// Limit of the genesis codec manager.
pub const MAX_GENESIS_SIZE: usize = 64 * 1024 * 1024;

/// Limit applied to blocks.
pub const MAX_BLOCK_SIZE: usize = 2 * 1024 * 1024;

const VERSION_LEN: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Codec {
    max_size: usize,
}

impl Codec {
    /// The manager used for transactions, UTXOs and stored values.
    pub const fn standard() -> Codec {
        Codec {
            max_size: MAX_MESSAGE_SIZE,
        }
    }

    /// The manager used for genesis data.
    pub const fn genesis() -> Codec {
        Codec {
            max_size: MAX_GENESIS_SIZE,
        }
    }

    pub const fn block() -> Codec {
        Codec {
            max_size: MAX_BLOCK_SIZE,
        }
    }

    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn encode<T: BorshSerialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        let mut bytes = CODEC_VERSION.to_be_bytes().to_vec();
        value.serialize(&mut bytes).map_err(CodecError::Malformed)?;
        if bytes.len() > self.max_size {
            return Err(CodecError::OversizeMessage {
                size: bytes.len(),
                max: self.max_size,
            });
        }
        Ok(bytes)
    }

    /// Decode a value from the front of `bytes`, returning it together with the number of bytes
    /// read. Bytes after the value are left alone.
    pub fn decode_prefix<T: BorshDeserialize>(&self, bytes: &[u8]) -> Result<(T, usize), CodecError> {
        if bytes.len() > self.max_size {
            return Err(CodecError::OversizeMessage {
                size: bytes.len(),
                max: self.max_size,
            });
        }
        if bytes.len() < VERSION_LEN {
            return Err(CodecError::Malformed(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "missing codec version",
            )));
        }
        let version = u16::from_be_bytes([bytes[0], bytes[1]]);
        if version != CODEC_VERSION {
            return Err(CodecError::UnknownVersion(version));
        }
        let mut rest = &bytes[VERSION_LEN..];
        let value = T::deserialize(&mut rest).map_err(CodecError::Malformed)?;
        Ok((value, bytes.len() - rest.len()))
    }

    /// Decode a value that must occupy all of `bytes`.
    pub fn decode<T: BorshDeserialize>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        let (value, read) = self.decode_prefix(bytes)?;
        if read != bytes.len() {
            return Err(CodecError::TrailingBytes {
                trailing: bytes.len() - read,
            });
        }
        Ok(value)
    }

    /// `sha256(encode(value))`.
    pub fn hash<T: BorshSerialize>(&self, value: &T) -> Result<Id, CodecError> {
        Ok(Id::hash(&self.encode(value)?))
    }
}

#[derive(Debug)]
pub enum CodecError {
    OversizeMessage { size: usize, max: usize },
    UnknownVersion(u16),
    TrailingBytes { trailing: usize },
    Malformed(std::io::Error),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::OversizeMessage { size, max } => {
                write!(f, "message of {} bytes exceeds the {} byte limit", size, max)
            }
            CodecError::UnknownVersion(version) => write!(f, "unknown codec version {}", version),
            CodecError::TrailingBytes { trailing } => {
                write!(f, "{} unexpected bytes after the encoded value", trailing)
            }
            CodecError::Malformed(err) => write!(f, "malformed encoding: {}", err),
        }
    }
}

impl std::error::Error for CodecError {}
