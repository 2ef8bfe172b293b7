/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! In-memory implementations of the collaborators a block processor consumes. Each is a cheap
//! handle over shared state, so a test keeps a clone to inspect and steer what the processor sees.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use platformvm_rs::{
    codec::Codec,
    interfaces::{AtomicRequests, Clock, Mempool, SharedMemory, SharedMemoryError, UptimeTracker},
    types::{
        ids::{Id, NodeId, Timestamp},
        txs::Tx,
    },
};

/// Values keyed by (peer chain, key). A value put by this chain for `peer` is stored under `peer`,
/// and values imported from `peer` are read from under `peer` too.
#[derive(Clone, Default)]
pub(crate) struct MemSharedMemory {
    values: Arc<Mutex<BTreeMap<(Id, Id), Vec<u8>>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemSharedMemory {
    pub(crate) fn put(&self, peer_chain: Id, key: Id, value: Vec<u8>) {
        self.values.lock().unwrap().insert((peer_chain, key), value);
    }

    pub(crate) fn contains(&self, peer_chain: &Id, key: &Id) -> bool {
        self.values.lock().unwrap().contains_key(&(*peer_chain, *key))
    }

    /// While set, every `apply` fails without writing anything.
    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl SharedMemory for MemSharedMemory {
    fn get(&self, peer_chain: &Id, keys: &[Id]) -> Result<Vec<Vec<u8>>, SharedMemoryError> {
        let map = self.values.lock().unwrap();
        keys.iter()
            .map(|key| {
                map.get(&(*peer_chain, *key))
                    .cloned()
                    .ok_or(SharedMemoryError::NotFound {
                        peer_chain: *peer_chain,
                        key: *key,
                    })
            })
            .collect()
    }

    fn apply(&mut self, requests: &BTreeMap<Id, AtomicRequests>) -> Result<(), SharedMemoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SharedMemoryError::Unavailable {
                reason: String::from("switched off"),
            });
        }
        let mut map = self.values.lock().unwrap();
        for (peer_chain, requests) in requests {
            for key in &requests.remove_requests {
                map.remove(&(*peer_chain, *key));
            }
            for put in &requests.put_requests {
                map.insert((*peer_chain, put.key), put.value.clone());
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct MempoolState {
    txs: Vec<Tx>,
    dropped: Vec<(Id, String)>,
}

/// A first-in first-out mempool.
#[derive(Clone, Default)]
pub(crate) struct MemMempool(Arc<Mutex<MempoolState>>);

impl MemMempool {
    pub(crate) fn len(&self) -> usize {
        self.0.lock().unwrap().txs.len()
    }

    pub(crate) fn dropped(&self) -> Vec<(Id, String)> {
        self.0.lock().unwrap().dropped.clone()
    }

    pub(crate) fn contains(&self, tx: &Tx) -> bool {
        self.0.lock().unwrap().txs.contains(tx)
    }
}

impl Mempool for MemMempool {
    fn add(&mut self, tx: Tx) {
        let mut state = self.0.lock().unwrap();
        if !state.txs.contains(&tx) {
            state.txs.push(tx);
        }
    }

    fn remove(&mut self, txs: &[Tx]) {
        self.0.lock().unwrap().txs.retain(|tx| !txs.contains(tx));
    }

    fn has(&self, tx_id: &Id) -> bool {
        self.0
            .lock()
            .unwrap()
            .txs
            .iter()
            .any(|tx| tx.id().map_or(false, |id| id == *tx_id))
    }

    fn peek_txs(&self, byte_budget: usize) -> Vec<Tx> {
        let mut remaining = byte_budget;
        let mut peeked = Vec::new();
        for tx in &self.0.lock().unwrap().txs {
            let size = Codec::standard().encode(tx).map_or(usize::MAX, |bytes| bytes.len());
            if size > remaining {
                break;
            }
            remaining -= size;
            peeked.push(tx.clone());
        }
        peeked
    }

    fn mark_dropped(&mut self, tx_id: Id, reason: String) {
        let mut state = self.0.lock().unwrap();
        state.txs.retain(|tx| tx.id().map_or(true, |id| id != tx_id));
        state.dropped.push((tx_id, reason));
    }
}

/// A clock that only moves when told to.
#[derive(Clone)]
pub(crate) struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub(crate) fn new(now: Timestamp) -> Self {
        Self(Arc::new(AtomicU64::new(now)))
    }

    pub(crate) fn set(&self, now: Timestamp) {
        self.0.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.0.load(Ordering::SeqCst)
    }
}

/// Uptimes in parts per million. Nodes without an entry were always online.
#[derive(Clone, Default)]
pub(crate) struct FixedUptimes(Arc<Mutex<BTreeMap<NodeId, u32>>>);

impl FixedUptimes {
    pub(crate) fn set(&self, node_id: NodeId, uptime: u32) {
        self.0.lock().unwrap().insert(node_id, uptime);
    }
}

impl UptimeTracker for FixedUptimes {
    fn uptime(&self, node_id: &NodeId, _since: Timestamp) -> u32 {
        self.0.lock().unwrap().get(node_id).copied().unwrap_or(1_000_000)
    }
}
