/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Typed setters over the user's [`WriteBatch`] that form the keys of each
//! [state variable](super::variables).

use borsh::BorshSerialize;
use std::fmt::{self, Display, Formatter};

use super::{
    chain_state::TxStatus,
    pluggables::{Key, WriteBatch},
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

/// Error when trying to serialize a value into the [write batch][WriteBatch].
#[derive(Debug)]
pub enum KVSetError {
    SerializeValueError { key: Key, source: std::io::Error },
    EncodeValueError { key: Key, source: CodecError },
}

impl Display for KVSetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            KVSetError::SerializeValueError { key, source } => {
                write!(f, "failed to serialize {}: {}", key, source)
            }
            KVSetError::EncodeValueError { key, source } => {
                write!(f, "failed to encode {}: {}", key, source)
            }
        }
    }
}

pub struct StateWriteBatch<W: WriteBatch>(pub(crate) W);

impl<W: WriteBatch> StateWriteBatch<W> {
    pub(crate) fn new() -> StateWriteBatch<W> {
        StateWriteBatch(W::new())
    }

    pub(crate) fn into_inner(self) -> W {
        self.0
    }

    /* ↓↓↓ Mappings ↓↓↓ */

    pub fn set_entry<K: BorshSerialize, V: BorshSerialize>(
        &mut self,
        prefix: &[u8; 1],
        key: &K,
        value: &V,
    ) -> Result<(), KVSetError> {
        let key_bytes = serialize(key, prefix, &[])?;
        let value_bytes = serialize(value, prefix, &key_bytes)?;
        self.0.set(&concat(prefix, &key_bytes), &value_bytes);
        Ok(())
    }

    pub fn delete_entry<K: BorshSerialize>(&mut self, prefix: &[u8; 1], key: &K) -> Result<(), KVSetError> {
        let key_bytes = serialize(key, prefix, &[])?;
        self.0.delete(&concat(prefix, &key_bytes));
        Ok(())
    }

    /* ↓↓↓ Transactions ↓↓↓ */

    pub fn set_tx(&mut self, tx_id: &Id, tx: &Tx, status: TxStatus) -> Result<(), KVSetError> {
        let mut value = Codec::standard()
            .encode(tx)
            .map_err(|err| KVSetError::EncodeValueError {
                key: Key::Tx { tx: *tx_id },
                source: err,
            })?;
        value.push(status.to_byte());
        self.0.set(&concat(&variables::TXS, tx_id.as_slice()), &value);
        Ok(())
    }

    /* ↓↓↓ Blocks ↓↓↓ */

    pub fn set_block(&mut self, block_id: &Id, block: &Block) -> Result<(), KVSetError> {
        let value = Codec::block()
            .encode(block)
            .map_err(|err| KVSetError::EncodeValueError {
                key: Key::Block { block: *block_id },
                source: err,
            })?;
        self.0.set(&concat(&variables::BLOCKS, block_id.as_slice()), &value);
        Ok(())
    }

    /* ↓↓↓ Metadata ↓↓↓ */

    pub fn set_timestamp(&mut self, timestamp: Timestamp) -> Result<(), KVSetError> {
        self.set_metadata(&variables::TIMESTAMP, &timestamp, Key::Timestamp)
    }

    pub fn set_current_supply(&mut self, supply: Amount) -> Result<(), KVSetError> {
        self.set_metadata(&variables::CURRENT_SUPPLY, &supply, Key::CurrentSupply)
    }

    pub fn set_base_fee(&mut self, fee: Amount) -> Result<(), KVSetError> {
        self.set_metadata(&variables::BASE_FEE, &fee, Key::BaseFee)
    }

    pub fn set_last_accepted(&mut self, block: &Id, height: u64) -> Result<(), KVSetError> {
        self.set_metadata(&variables::LAST_ACCEPTED, block, Key::LastAccepted)?;
        self.set_metadata(&variables::LAST_ACCEPTED_HEIGHT, &height, Key::LastAcceptedHeight)
    }

    fn set_metadata<T: BorshSerialize>(&mut self, field: &[u8], value: &T, key: Key) -> Result<(), KVSetError> {
        let bytes = value
            .try_to_vec()
            .map_err(|err| KVSetError::SerializeValueError { key, source: err })?;
        self.0.set(&concat(&variables::METADATA, field), &bytes);
        Ok(())
    }
}

fn serialize<T: BorshSerialize>(value: &T, prefix: &[u8; 1], key: &[u8]) -> Result<Vec<u8>, KVSetError> {
    value
        .try_to_vec()
        .map_err(|err| KVSetError::SerializeValueError {
            key: Key::Entry {
                prefix: prefix[0],
                key: key.to_vec(),
            },
            source: err,
        })
}
