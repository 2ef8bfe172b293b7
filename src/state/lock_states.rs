/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The lock-state store: which transactions hold locks on which UTXOs.
//!
//! Only locked UTXOs have an entry; a UTXO without one is unlocked. The store is indexed by bond
//! and by deposit transaction so the UTXOs a lock holds can be released together.

use im::{OrdMap, OrdSet};
use std::collections::BTreeMap;

use super::table::Table;
use crate::types::{ids::Id, outputs::LockIds, update_sets::UpdateSet};

#[derive(Clone, Debug, Default)]
pub struct LockStateStore {
    states: Table<Id, LockIds>,
    by_bond: OrdMap<Id, OrdSet<Id>>,
    by_deposit: OrdMap<Id, OrdSet<Id>>,
}

impl LockStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The locks on `utxo_id`, [`LockIds::UNLOCKED`] if it has none.
    pub fn get(&self, utxo_id: &Id) -> LockIds {
        self.states.get(utxo_id).copied().unwrap_or_default()
    }

    /// A copy of this store with `changes` applied. A change to [`LockIds::UNLOCKED`] removes the
    /// UTXO's entry. The receiver is left untouched.
    pub fn update_lock_state(&self, changes: &BTreeMap<Id, LockIds>) -> LockStateStore {
        let mut updated = self.clone();
        for (utxo_id, lock_ids) in changes {
            updated.set(*utxo_id, *lock_ids);
        }
        updated
    }

    fn set(&mut self, utxo_id: Id, lock_ids: LockIds) {
        if let Some(previous) = self.states.remove(&utxo_id) {
            if let Some(bond) = previous.bond_tx_id {
                remove_index(&mut self.by_bond, &bond, &utxo_id);
            }
            if let Some(deposit) = previous.deposit_tx_id {
                remove_index(&mut self.by_deposit, &deposit, &utxo_id);
            }
        }
        if lock_ids.is_unlocked() {
            return;
        }
        if let Some(bond) = lock_ids.bond_tx_id {
            insert_index(&mut self.by_bond, bond, utxo_id);
        }
        if let Some(deposit) = lock_ids.deposit_tx_id {
            insert_index(&mut self.by_deposit, deposit, utxo_id);
        }
        self.states.insert(utxo_id, lock_ids);
    }

    /// Ids of the UTXOs bonded by `bond_tx_id`, ascending.
    pub fn bonded_utxos(&self, bond_tx_id: &Id) -> Vec<Id> {
        self.by_bond
            .get(bond_tx_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Ids of the UTXOs deposited by `deposit_tx_id`, ascending.
    pub fn deposited_utxos(&self, deposit_tx_id: &Id) -> Vec<Id> {
        self.by_deposit
            .get(deposit_tx_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Every locked UTXO with its locks, in ascending UTXO id order.
    pub fn iter(&self) -> impl Iterator<Item = (&Id, &LockIds)> {
        self.states.keys().zip(self.states.values())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn delta(&self) -> &UpdateSet<Id, LockIds> {
        self.states.delta()
    }

    pub(crate) fn clear_delta(&mut self) {
        self.states.clear_delta()
    }

    pub(crate) fn rebase_delta(&mut self, earlier: &LockStateStore) {
        self.states.rebase_delta(earlier.delta())
    }
}

fn insert_index(index: &mut OrdMap<Id, OrdSet<Id>>, key: Id, id: Id) {
    let mut ids = index.get(&key).cloned().unwrap_or_default();
    ids.insert(id);
    index.insert(key, ids);
}

fn remove_index(index: &mut OrdMap<Id, OrdSet<Id>>, key: &Id, id: &Id) {
    if let Some(ids) = index.get(key) {
        let mut ids = ids.clone();
        ids.remove(id);
        if ids.is_empty() {
            index.remove(key);
        } else {
            index.insert(*key, ids);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_is_copy_on_write() {
        let store = LockStateStore::new();
        let utxo = Id::hash(b"utxo");
        let bond = Id::hash(b"bond");
        let changes = BTreeMap::from([(utxo, LockIds::new(None, Some(bond)))]);

        let updated = store.update_lock_state(&changes);
        assert!(store.get(&utxo).is_unlocked());
        assert_eq!(updated.get(&utxo).bond_tx_id, Some(bond));
        assert_eq!(updated.bonded_utxos(&bond), vec![utxo]);
    }

    #[test]
    fn unlocking_removes_entry_and_indexes() {
        let utxo = Id::hash(b"utxo");
        let bond = Id::hash(b"bond");
        let deposit = Id::hash(b"deposit");
        let store = LockStateStore::new()
            .update_lock_state(&BTreeMap::from([(utxo, LockIds::new(Some(deposit), Some(bond)))]));
        assert_eq!(store.deposited_utxos(&deposit), vec![utxo]);

        let unbonded = store.update_lock_state(&BTreeMap::from([(utxo, LockIds::new(Some(deposit), None))]));
        assert!(unbonded.bonded_utxos(&bond).is_empty());
        assert_eq!(unbonded.deposited_utxos(&deposit), vec![utxo]);

        let unlocked = unbonded.update_lock_state(&BTreeMap::from([(utxo, LockIds::UNLOCKED)]));
        assert!(unlocked.is_empty());
        assert!(unlocked.deposited_utxos(&deposit).is_empty());
        assert!(unlocked.delta().contains_delete(&utxo));
    }
}
