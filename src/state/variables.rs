/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Byte-prefixes that specify where each chain state variable is stored in the user-provided
//! key-value store.
//!
//! # List of State Variables
//!
//! ## Ledger
//!
//! |Variable|Prefix|Type|Description|
//! |---|---|---|---|
//! |UTXOs|`U`|UTXO input id -> [`Utxo`](crate::types::outputs::Utxo)|Every unspent output.|
//! |Lock states|`L`|UTXO input id -> [`LockIds`](crate::types::outputs::LockIds)|The locks holding each locked UTXO. Unlocked UTXOs have no entry.|
//!
//! ## Registries
//!
//! |Variable|Prefix|Type|Description|
//! |---|---|---|---|
//! |Current stakers|`S`|[`StakerKey`](super::registry::StakerKey) -> [`Staker`](super::registry::Staker)|Validators currently validating.|
//! |Pending stakers|`Q`|`StakerKey` -> `Staker`|Validators waiting for their start time.|
//! |Current locks|`D`|lock tx id -> [`Lock`](super::registry::Lock)|Locks and deposits currently running.|
//! |Pending locks|`d`|lock tx id -> `Lock`|Locks and deposits waiting for their start time.|
//! |Proposals|`P`|proposal tx id -> [`Proposal`](super::registry::Proposal)|Open governance proposals.|
//!
//! ## Catalogs
//!
//! |Variable|Prefix|Type|Description|
//! |---|---|---|---|
//! |Transactions|`T`|tx id -> encoded [`Tx`](crate::types::txs::Tx) followed by a status byte|Every accepted transaction.|
//! |Subnets|`N`|subnet id -> [`OutputOwners`](crate::types::outputs::OutputOwners)|The owner of every subnet.|
//! |Chains|`C`|chain id -> [`ChainRecord`](super::chain_state::ChainRecord)|Every chain created on a subnet.|
//! |Deposit offers|`O`|offer id -> [`DepositOffer`](crate::types::txs::DepositOffer)|Offers deposits may be made under.|
//! |Blocks|`B`|block id -> [`Block`](crate::types::block::Block)|Every accepted block.|
//!
//! ## Metadata
//!
//! Single values stored under `M` followed by one of the constants below.
//!
//! # Persistence of state variables
//!
//! Each mapping entry is stored at the concatenation of its one-byte prefix and the borsh encoding
//! of its key; the value is the borsh encoding of the entry. Since every key type encodes to a fixed
//! length, iterating a prefix visits entries in key order.

pub const UTXOS: [u8; 1] = [b'U'];
pub const LOCK_STATES: [u8; 1] = [b'L'];
pub const CURRENT_STAKERS: [u8; 1] = [b'S'];
pub const PENDING_STAKERS: [u8; 1] = [b'Q'];
pub const CURRENT_LOCKS: [u8; 1] = [b'D'];
pub const PENDING_LOCKS: [u8; 1] = [b'd'];
pub const PROPOSALS: [u8; 1] = [b'P'];
pub const TXS: [u8; 1] = [b'T'];
pub const SUBNETS: [u8; 1] = [b'N'];
pub const CHAINS: [u8; 1] = [b'C'];
pub const DEPOSIT_OFFERS: [u8; 1] = [b'O'];
pub const BLOCKS: [u8; 1] = [b'B'];
pub const METADATA: [u8; 1] = [b'M'];

// Fields of Metadata
pub const TIMESTAMP: [u8; 1] = [0];
pub const CURRENT_SUPPLY: [u8; 1] = [1];
pub const BASE_FEE: [u8; 1] = [2];
pub const LAST_ACCEPTED: [u8; 1] = [3];
pub const LAST_ACCEPTED_HEIGHT: [u8; 1] = [4];

/// Concatenate two byteslices into one vector.
pub fn concat(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut res = Vec::with_capacity(a.len() + b.len());
    res.extend_from_slice(a);
    res.extend_from_slice(b);
    res
}
