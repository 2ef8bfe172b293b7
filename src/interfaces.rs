/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Collaborators the state machine consumes but does not implement.
//!
//! The library user supplies cross-chain [`SharedMemory`], a [`Mempool`], a [`Clock`] and an
//! [`UptimeTracker`] when constructing a [`BlockProcessor`](crate::block_processor::BlockProcessor).

use borsh::{BorshDeserialize, BorshSerialize};
use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
    time::SystemTime,
};

use crate::types::{
    ids::{Id, NodeId, ShortId, Timestamp},
    txs::Tx,
};

/// A value written into a peer chain's side of shared memory.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AtomicPut {
    pub key: Id,
    pub value: Vec<u8>,
    /// Addresses the peer chain may look the value up by.
    pub traits: Vec<ShortId>,
}

/// The writes one accepted block makes to the memory it shares with one peer chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AtomicRequests {
    pub put_requests: Vec<AtomicPut>,
    pub remove_requests: Vec<Id>,
}

impl AtomicRequests {
    /// Append the requests of `later` after these.
    pub fn extend(&mut self, later: AtomicRequests) {
        self.put_requests.extend(later.put_requests);
        self.remove_requests.extend(later.remove_requests);
    }
}

/// Memory shared with other chains, through which Import and Export transactions move UTXOs.
pub trait SharedMemory: Send {
    /// The values stored under `keys` by `peer_chain`, in the order of `keys`.
    fn get(&self, peer_chain: &Id, keys: &[Id]) -> Result<Vec<Vec<u8>>, SharedMemoryError>;

    /// Apply every request, for every peer chain, atomically.
    fn apply(&mut self, requests: &BTreeMap<Id, AtomicRequests>) -> Result<(), SharedMemoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharedMemoryError {
    NotFound { peer_chain: Id, key: Id },
    Unavailable { reason: String },
}

impl Display for SharedMemoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SharedMemoryError::NotFound { peer_chain, key } => {
                write!(f, "{} not found in memory shared with {}", key, peer_chain)
            }
            SharedMemoryError::Unavailable { reason } => write!(f, "shared memory unavailable: {}", reason),
        }
    }
}

impl std::error::Error for SharedMemoryError {}

/// The pool of transactions waiting to be included in a block.
pub trait Mempool: Send {
    fn add(&mut self, tx: Tx);
    fn remove(&mut self, txs: &[Tx]);
    fn has(&self, tx_id: &Id) -> bool;
    /// Transactions in the order they should be tried, whose encodings fit in `byte_budget`.
    fn peek_txs(&self, byte_budget: usize) -> Vec<Tx>;
    fn mark_dropped(&mut self, tx_id: Id, reason: String);
}

pub trait Clock: Send {
    /// Seconds since the Unix epoch.
    fn now(&self) -> Timestamp;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|duration| duration.as_secs())
            .unwrap_or(0)
    }
}

pub trait UptimeTracker: Send {
    /// Fraction of the time since `since` that `node_id` was observed online, in parts per million.
    fn uptime(&self, node_id: &NodeId, since: Timestamp) -> u32;
}
