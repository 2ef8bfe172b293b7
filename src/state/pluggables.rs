/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Traits for pluggable chain state persistence.
//!
//! The library user supplies a key-value store implementing [`KVStore`]. The provided methods of
//! [`KVGet`] read back the [state variables](super::variables) that
//! [`StateWriteBatch`](super::write_batch::StateWriteBatch) writes.

use borsh::BorshDeserialize;
use std::fmt::{self, Display, Formatter};

use super::{
    chain_state::TxStatus,
    variables::{self, concat},
};
use crate::{
    codec::{Codec, CodecError},
    types::{
        block::Block,
        ids::{Amount, Id, Timestamp},
        txs::Tx,
    },
};

pub trait KVStore: KVGet + Clone + Send + 'static {
    type WriteBatch: WriteBatch;

    fn write(&mut self, wb: Self::WriteBatch);
    fn clear(&mut self);
}

pub trait KVGet {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Every key-value pair whose key starts with `prefix`, in ascending key order.
    fn prefix_iter(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;

    /* ↓↓↓ Metadata ↓↓↓ */

    fn timestamp(&self) -> Result<Option<Timestamp>, KVGetError> {
        self.metadata(&variables::TIMESTAMP, Key::Timestamp)
    }

    fn current_supply(&self) -> Result<Amount, KVGetError> {
        self.metadata(&variables::CURRENT_SUPPLY, Key::CurrentSupply)?
            .ok_or(KVGetError::ValueExpectedButNotFound {
                key: Key::CurrentSupply,
            })
    }

    fn base_fee(&self) -> Result<Amount, KVGetError> {
        self.metadata(&variables::BASE_FEE, Key::BaseFee)?
            .ok_or(KVGetError::ValueExpectedButNotFound { key: Key::BaseFee })
    }

    fn last_accepted(&self) -> Result<Id, KVGetError> {
        self.metadata(&variables::LAST_ACCEPTED, Key::LastAccepted)?
            .ok_or(KVGetError::ValueExpectedButNotFound {
                key: Key::LastAccepted,
            })
    }

    fn last_accepted_height(&self) -> Result<u64, KVGetError> {
        self.metadata(&variables::LAST_ACCEPTED_HEIGHT, Key::LastAcceptedHeight)?
            .ok_or(KVGetError::ValueExpectedButNotFound {
                key: Key::LastAcceptedHeight,
            })
    }

    fn metadata<T: BorshDeserialize>(&self, field: &[u8], key: Key) -> Result<Option<T>, KVGetError> {
        if let Some(bytes) = self.get(&concat(&variables::METADATA, field)) {
            Ok(Some(T::deserialize(&mut &*bytes).map_err(|err| {
                KVGetError::DeserializeValueError { key, source: err }
            })?))
        } else {
            Ok(None)
        }
    }

    /* ↓↓↓ Mappings ↓↓↓ */

    /// Every entry of the mapping stored under `prefix`, decoded, in ascending key order.
    fn entries<K: BorshDeserialize, V: BorshDeserialize>(
        &self,
        prefix: &[u8; 1],
    ) -> Result<Vec<(K, V)>, KVGetError> {
        self.prefix_iter(prefix)
            .into_iter()
            .map(|(key_bytes, value_bytes)| {
                let entry_key = || Key::Entry {
                    prefix: prefix[0],
                    key: key_bytes[1..].to_vec(),
                };
                let key = K::try_from_slice(&key_bytes[1..]).map_err(|err| {
                    KVGetError::DeserializeValueError {
                        key: entry_key(),
                        source: err,
                    }
                })?;
                let value = V::try_from_slice(&value_bytes).map_err(|err| {
                    KVGetError::DeserializeValueError {
                        key: entry_key(),
                        source: err,
                    }
                })?;
                Ok((key, value))
            })
            .collect()
    }

    /* ↓↓↓ Transactions ↓↓↓ */

    fn tx(&self, tx_id: &Id) -> Result<Option<(Tx, TxStatus)>, KVGetError> {
        let Some(bytes) = self.get(&concat(&variables::TXS, tx_id.as_slice())) else {
            return Ok(None);
        };
        let (status_byte, tx_bytes) = split_status(&bytes, Key::Tx { tx: *tx_id })?;
        let tx = Codec::standard()
            .decode(tx_bytes)
            .map_err(|err| KVGetError::DecodeValueError {
                key: Key::Tx { tx: *tx_id },
                source: err,
            })?;
        let status = TxStatus::from_byte(status_byte).ok_or(KVGetError::InvalidStatusByte {
            key: Key::Tx { tx: *tx_id },
            byte: status_byte,
        })?;
        Ok(Some((tx, status)))
    }

    /// The status of every stored transaction, read from the trailing status byte without decoding
    /// the transaction.
    fn tx_statuses(&self) -> Result<Vec<(Id, TxStatus)>, KVGetError> {
        self.prefix_iter(&variables::TXS)
            .into_iter()
            .map(|(key_bytes, value_bytes)| {
                let key = Key::Entry {
                    prefix: variables::TXS[0],
                    key: key_bytes[1..].to_vec(),
                };
                let tx_id = Id::try_from_slice(&key_bytes[1..]).map_err(|err| {
                    KVGetError::DeserializeValueError {
                        key: Key::Entry {
                            prefix: variables::TXS[0],
                            key: key_bytes[1..].to_vec(),
                        },
                        source: err,
                    }
                })?;
                let (status_byte, _) = split_status(&value_bytes, key)?;
                let status = TxStatus::from_byte(status_byte).ok_or(KVGetError::InvalidStatusByte {
                    key: Key::Tx { tx: tx_id },
                    byte: status_byte,
                })?;
                Ok((tx_id, status))
            })
            .collect()
    }

    /* ↓↓↓ Blocks ↓↓↓ */

    fn block(&self, block: &Id) -> Result<Option<Block>, KVGetError> {
        if let Some(bytes) = self.get(&concat(&variables::BLOCKS, block.as_slice())) {
            Ok(Some(Codec::block().decode(&bytes).map_err(|err| {
                KVGetError::DecodeValueError {
                    key: Key::Block { block: *block },
                    source: err,
                }
            })?))
        } else {
            Ok(None)
        }
    }
}

fn split_status(bytes: &[u8], key: Key) -> Result<(u8, &[u8]), KVGetError> {
    match bytes.split_last() {
        Some((status, tx_bytes)) => Ok((*status, tx_bytes)),
        None => Err(KVGetError::ValueExpectedButNotFound { key }),
    }
}

/// Error when trying to read a value corresponding to a given key from the [key value store][KVStore].
/// The error may arise in the following circumstances:
/// 1. The value corresponding to a given key cannot be deserialized into its expected type,
/// 2. The value corresponding to a given key cannot be found,
/// 3. A stored transaction carries an unknown status byte.
#[derive(Debug)]
pub enum KVGetError {
    DeserializeValueError { key: Key, source: std::io::Error },
    DecodeValueError { key: Key, source: CodecError },
    ValueExpectedButNotFound { key: Key },
    InvalidStatusByte { key: Key, byte: u8 },
}

impl Display for KVGetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            KVGetError::DeserializeValueError { key, source } => {
                write!(f, "failed to deserialize {}: {}", key, source)
            }
            KVGetError::DecodeValueError { key, source } => {
                write!(f, "failed to decode {}: {}", key, source)
            }
            KVGetError::ValueExpectedButNotFound { key } => write!(f, "{} not found", key),
            KVGetError::InvalidStatusByte { key, byte } => {
                write!(f, "{} has invalid status byte {}", key, byte)
            }
        }
    }
}

#[derive(Debug)]
pub enum Key {
    Timestamp,
    CurrentSupply,
    BaseFee,
    LastAccepted,
    LastAcceptedHeight,
    Tx { tx: Id },
    Block { block: Id },
    Entry { prefix: u8, key: Vec<u8> },
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Key::Timestamp => write!(f, "Timestamp"),
            Key::CurrentSupply => write!(f, "Current Supply"),
            Key::BaseFee => write!(f, "Base Fee"),
            Key::LastAccepted => write!(f, "Last Accepted Block"),
            Key::LastAcceptedHeight => write!(f, "Last Accepted Height"),
            Key::Tx { tx } => write!(f, "Tx {}", tx),
            Key::Block { block } => write!(f, "Block {}", block),
            Key::Entry { prefix, key } => {
                write!(f, "Entry {} under prefix '{}'", hex::encode(key), *prefix as char)
            }
        }
    }
}

pub trait WriteBatch {
    fn new() -> Self;
    fn set(&mut self, key: &[u8], value: &[u8]);
    fn delete(&mut self, key: &[u8]);
}
