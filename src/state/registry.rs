/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Ordered registries of stakers, locks and proposals.
//!
//! A [`Registry`] keeps its entries ordered by `(time, tx id)`, where the time is either the
//! entry's start (for pending registries) or its end (for current registries and proposals). The
//! entry with the earliest time is the *next* entry: the one the chain will act on first.
//!
//! Registries are persistent values: [`add`](Registry::add) and the other modifying operations
//! return a new registry and leave the receiver untouched.
//!
//! | Registry | Entry | Key | Ordered by |
//! |---|---|---|---|
//! | current stakers | [`Staker`] | [`StakerKey`] | end |
//! | pending stakers | [`Staker`] | [`StakerKey`] | start |
//! | current locks | [`Lock`] | lock tx id | end |
//! | pending locks | [`Lock`] | lock tx id | start |
//! | proposals | [`Proposal`] | proposal tx id | end |

use borsh::{BorshDeserialize, BorshSerialize};
use im::OrdMap;
use std::{
    collections::BTreeMap,
    fmt::{self, Debug, Display, Formatter},
};

use crate::types::{
    ids::{Amount, Id, NodeId, ShortId, Timestamp},
    outputs::OutputOwners,
    txs::{AddDepositTx, AddLockTx, AddSubnetValidatorTx, AddValidatorTx, ProposalSubmitTx},
    update_sets::UpdateSet,
};

/// The id of the primary network. Validators of the primary network are keyed under it.
pub const PRIMARY_NETWORK_ID: Id = Id::EMPTY;

/// Vote options.
pub const VOTE_YES: u32 = 0;
pub const VOTE_NO: u32 = 1;

pub trait RegistryEntry: Clone {
    type Key: Ord + Clone + Debug;

    fn key(&self) -> Self::Key;
    fn tx_id(&self) -> Id;
    fn start_time(&self) -> Timestamp;
    fn end_time(&self) -> Timestamp;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortBy {
    Start,
    End,
}

#[derive(Clone, Debug)]
pub struct Registry<E: RegistryEntry> {
    sort_by: SortBy,
    order: OrdMap<(Timestamp, Id), E>,
    index: OrdMap<E::Key, (Timestamp, Id)>,
    delta: UpdateSet<E::Key, E>,
}

impl<E: RegistryEntry> Registry<E> {
    pub fn new(sort_by: SortBy) -> Self {
        Self {
            sort_by,
            order: OrdMap::new(),
            index: OrdMap::new(),
            delta: UpdateSet::new(),
        }
    }

    fn sort_key(&self, entry: &E) -> (Timestamp, Id) {
        let time = match self.sort_by {
            SortBy::Start => entry.start_time(),
            SortBy::End => entry.end_time(),
        };
        (time, entry.tx_id())
    }

    /// A registry that also holds `entry`. Fails if an entry with the same key is present.
    pub fn add(&self, entry: E) -> Result<Self, RegistryError<E::Key>> {
        let key = entry.key();
        if self.index.contains_key(&key) {
            return Err(RegistryError::Duplicate { key });
        }
        let mut registry = self.clone();
        registry.insert(key, entry);
        Ok(registry)
    }

    /// A registry in which `entry` replaces the entry with the same key. Fails if there is none.
    pub fn replace(&self, entry: E) -> Result<Self, RegistryError<E::Key>> {
        let key = entry.key();
        let Some(sort_key) = self.index.get(&key).copied() else {
            return Err(RegistryError::NotFound { key });
        };
        let mut registry = self.clone();
        registry.order.remove(&sort_key);
        registry.insert(key, entry);
        Ok(registry)
    }

    fn insert(&mut self, key: E::Key, entry: E) {
        let sort_key = self.sort_key(&entry);
        self.order.insert(sort_key, entry.clone());
        self.index.insert(key.clone(), sort_key);
        self.delta.insert(key, entry);
    }

    /// The registry without the entry keyed `key`, and that entry.
    pub fn remove(&self, key: &E::Key) -> Option<(Self, E)> {
        let sort_key = self.index.get(key).copied()?;
        let mut registry = self.clone();
        let entry = registry.order.remove(&sort_key)?;
        registry.index.remove(key);
        registry.delta.delete(key.clone());
        Some((registry, entry))
    }

    /// The entry with the earliest time, ties broken by tx id.
    pub fn get_next(&self) -> Option<&E> {
        self.order.values().next()
    }

    /// The registry without its next entry, and that entry.
    pub fn delete_next(&self) -> Option<(Self, E)> {
        let key = self.get_next()?.key();
        self.remove(&key)
    }

    pub fn get(&self, key: &E::Key) -> Option<&E> {
        let sort_key = self.index.get(key)?;
        self.order.get(sort_key)
    }

    pub fn contains(&self, key: &E::Key) -> bool {
        self.index.contains_key(key)
    }

    /// Every entry, next first.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.order.values()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn delta(&self) -> &UpdateSet<E::Key, E> {
        &self.delta
    }

    pub(crate) fn clear_delta(&mut self) {
        self.delta = UpdateSet::new();
    }

    pub(crate) fn rebase_delta(&mut self, earlier: &Registry<E>) {
        let later = std::mem::take(&mut self.delta);
        let mut merged = earlier.delta.clone();
        merged.extend(later);
        self.delta = merged;
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RegistryError<K> {
    Duplicate { key: K },
    NotFound { key: K },
}

impl<K: Debug> Display for RegistryError<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Duplicate { key } => write!(f, "registry already holds {:?}", key),
            RegistryError::NotFound { key } => write!(f, "registry holds no {:?}", key),
        }
    }
}

impl<K: Debug> std::error::Error for RegistryError<K> {}

/* ↓↓↓ Stakers ↓↓↓ */

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct StakerKey {
    pub subnet_id: Id,
    pub node_id: NodeId,
}

impl StakerKey {
    pub fn primary(node_id: NodeId) -> Self {
        Self {
            subnet_id: PRIMARY_NETWORK_ID,
            node_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum StakerTx {
    Primary(AddValidatorTx),
    Subnet(AddSubnetValidatorTx),
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Staker {
    pub tx_id: Id,
    pub tx: StakerTx,
    /// Reserved when the staker becomes current; zero while pending.
    pub potential_reward: Amount,
}

impl Staker {
    pub fn node_id(&self) -> NodeId {
        match &self.tx {
            StakerTx::Primary(tx) => tx.validator.node_id,
            StakerTx::Subnet(tx) => tx.validator.validator.node_id,
        }
    }

    pub fn subnet_id(&self) -> Id {
        match &self.tx {
            StakerTx::Primary(_) => PRIMARY_NETWORK_ID,
            StakerTx::Subnet(tx) => tx.validator.subnet_id,
        }
    }

    pub fn weight(&self) -> Amount {
        match &self.tx {
            StakerTx::Primary(tx) => tx.validator.weight,
            StakerTx::Subnet(tx) => tx.validator.validator.weight,
        }
    }

    pub fn start(&self) -> Timestamp {
        match &self.tx {
            StakerTx::Primary(tx) => tx.validator.start,
            StakerTx::Subnet(tx) => tx.validator.validator.start,
        }
    }

    pub fn end(&self) -> Timestamp {
        match &self.tx {
            StakerTx::Primary(tx) => tx.validator.end,
            StakerTx::Subnet(tx) => tx.validator.validator.end,
        }
    }

    pub fn rewards_owner(&self) -> Option<&OutputOwners> {
        match &self.tx {
            StakerTx::Primary(tx) => Some(&tx.rewards_owner),
            StakerTx::Subnet(_) => None,
        }
    }

    /// Addresses that may act on behalf of this validator: the owners of its bond and of its
    /// rewards.
    pub fn controlling_addresses(&self) -> Vec<ShortId> {
        let StakerTx::Primary(tx) = &self.tx else {
            return Vec::new();
        };
        let mut addrs: Vec<ShortId> = tx
            .bond
            .iter()
            .flat_map(|out| out.output.owners().addrs.iter().copied())
            .chain(tx.rewards_owner.addrs.iter().copied())
            .collect();
        addrs.sort();
        addrs.dedup();
        addrs
    }
}

impl RegistryEntry for Staker {
    type Key = StakerKey;

    fn key(&self) -> StakerKey {
        StakerKey {
            subnet_id: self.subnet_id(),
            node_id: self.node_id(),
        }
    }

    fn tx_id(&self) -> Id {
        self.tx_id
    }

    fn start_time(&self) -> Timestamp {
        self.start()
    }

    fn end_time(&self) -> Timestamp {
        self.end()
    }
}

/* ↓↓↓ Locks ↓↓↓ */

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum LockTx {
    Lock(AddLockTx),
    Deposit(AddDepositTx),
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Lock {
    pub tx_id: Id,
    pub tx: LockTx,
    pub potential_reward: Amount,
}

impl Lock {
    pub fn start(&self) -> Timestamp {
        match &self.tx {
            LockTx::Lock(tx) => tx.start,
            LockTx::Deposit(tx) => tx.start,
        }
    }

    pub fn end(&self) -> Timestamp {
        match &self.tx {
            LockTx::Lock(tx) => tx.end,
            LockTx::Deposit(tx) => tx.end,
        }
    }

    pub fn amount(&self) -> Amount {
        match &self.tx {
            LockTx::Lock(tx) => tx.amount,
            LockTx::Deposit(tx) => tx.amount,
        }
    }

    pub fn rewards_owner(&self) -> &OutputOwners {
        match &self.tx {
            LockTx::Lock(tx) => &tx.rewards_owner,
            LockTx::Deposit(tx) => &tx.rewards_owner,
        }
    }
}

impl RegistryEntry for Lock {
    type Key = Id;

    fn key(&self) -> Id {
        self.tx_id
    }

    fn tx_id(&self) -> Id {
        self.tx_id
    }

    fn start_time(&self) -> Timestamp {
        self.start()
    }

    fn end_time(&self) -> Timestamp {
        self.end()
    }
}

/* ↓↓↓ Proposals ↓↓↓ */

/// A proposal leaves the registry when it is concluded, so only open proposals have a state.
/// How it ended is reported by [`ConcludeProposalEvent`](crate::events::ConcludeProposalEvent).
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum ProposalState {
    Active,
    /// Yes votes reached the threshold. No more votes are taken.
    Accepted,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Proposal {
    pub tx_id: Id,
    pub tx: ProposalSubmitTx,
    pub votes: BTreeMap<NodeId, u32>,
    pub state: ProposalState,
}

impl Proposal {
    pub fn new(tx_id: Id, tx: ProposalSubmitTx) -> Self {
        Self {
            tx_id,
            tx,
            votes: BTreeMap::new(),
            state: ProposalState::Active,
        }
    }

    pub fn yes_votes(&self) -> u32 {
        self.votes.values().filter(|option| **option == VOTE_YES).count() as u32
    }

    pub fn threshold_reached(&self) -> bool {
        self.yes_votes() >= self.tx.proposal.threshold
    }
}

impl RegistryEntry for Proposal {
    type Key = Id;

    fn key(&self) -> Id {
        self.tx_id
    }

    fn tx_id(&self) -> Id {
        self.tx_id
    }

    fn start_time(&self) -> Timestamp {
        self.tx.proposal.start
    }

    fn end_time(&self) -> Timestamp {
        self.tx.proposal.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Entry {
        key: u8,
        tx_id: Id,
        start: Timestamp,
        end: Timestamp,
    }

    impl RegistryEntry for Entry {
        type Key = u8;

        fn key(&self) -> u8 {
            self.key
        }

        fn tx_id(&self) -> Id {
            self.tx_id
        }

        fn start_time(&self) -> Timestamp {
            self.start
        }

        fn end_time(&self) -> Timestamp {
            self.end
        }
    }

    fn entry(key: u8, start: Timestamp, end: Timestamp) -> Entry {
        Entry {
            key,
            tx_id: Id::new([key; 32]),
            start,
            end,
        }
    }

    #[test]
    fn next_is_earliest_end_with_ties_broken_by_tx_id() {
        let registry = Registry::new(SortBy::End)
            .add(entry(3, 0, 20))
            .unwrap()
            .add(entry(2, 5, 10))
            .unwrap()
            .add(entry(1, 9, 10))
            .unwrap();
        assert_eq!(registry.get_next().unwrap().key, 1);

        let (registry, removed) = registry.delete_next().unwrap();
        assert_eq!(removed.key, 1);
        assert_eq!(registry.get_next().unwrap().key, 2);
    }

    #[test]
    fn pending_registry_orders_by_start() {
        let registry = Registry::new(SortBy::Start)
            .add(entry(1, 30, 40))
            .unwrap()
            .add(entry(2, 10, 100))
            .unwrap();
        assert_eq!(registry.get_next().unwrap().key, 2);
    }

    #[test]
    fn add_leaves_receiver_untouched_and_rejects_duplicates() {
        let empty = Registry::new(SortBy::End);
        let one = empty.add(entry(1, 0, 10)).unwrap();
        assert!(empty.is_empty());
        assert_eq!(one.len(), 1);
        assert_eq!(
            one.add(entry(1, 5, 15)).unwrap_err(),
            RegistryError::Duplicate { key: 1 }
        );
    }

    #[test]
    fn replace_reorders_entry() {
        let registry = Registry::new(SortBy::End)
            .add(entry(1, 0, 10))
            .unwrap()
            .add(entry(2, 0, 20))
            .unwrap();
        let registry = registry.replace(entry(1, 0, 30)).unwrap();
        assert_eq!(registry.get_next().unwrap().key, 2);
        assert_eq!(registry.get(&1).unwrap().end, 30);
        assert_eq!(registry.len(), 2);
        assert!(registry.replace(entry(9, 0, 1)).is_err());
    }

    #[test]
    fn delta_records_adds_and_removals() {
        let registry = Registry::new(SortBy::End).add(entry(1, 0, 10)).unwrap();
        let mut fork = registry.clone();
        fork.clear_delta();
        let (mut fork, _) = fork.remove(&1).unwrap();
        assert!(fork.delta().contains_delete(&1));

        fork.rebase_delta(&registry);
        assert!(fork.delta().contains_delete(&1));
        assert!(fork.delta().get_insert(&1).is_none());
        assert!(fork.remove(&1).is_none());
    }

    #[test]
    fn proposal_threshold_counts_only_yes_votes() {
        let mut proposal = Proposal::new(
            Id::hash(b"proposal"),
            ProposalSubmitTx {
                base: Default::default(),
                proposal: crate::types::txs::ProposalConfig {
                    start: 0,
                    end: 10,
                    threshold: 2,
                },
                proposed_tx: Box::new(crate::types::txs::UnsignedTx::BaseFee(
                    crate::types::txs::BaseFeeTx { fee: 1 },
                )),
                bond: Vec::new(),
            },
        );
        proposal.votes.insert(ShortId::new([1; 20]), VOTE_YES);
        proposal.votes.insert(ShortId::new([2; 20]), VOTE_NO);
        assert!(!proposal.threshold_reached());
        proposal.votes.insert(ShortId::new([3; 20]), VOTE_YES);
        assert!(proposal.threshold_reached());
    }
}
