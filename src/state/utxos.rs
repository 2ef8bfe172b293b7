/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The UTXO ledger.
//!
//! UTXOs are keyed by their input id. Two secondary indexes, by owner address and by (asset,
//! owner address), answer wallet queries; both are derived from the primary map and rebuilt when
//! the ledger is loaded.

use im::{OrdMap, OrdSet};
use std::{
    fmt::{self, Display, Formatter},
    ops::Bound,
};

use super::table::Table;
use crate::types::{
    ids::{Id, ShortId},
    outputs::Utxo,
    update_sets::UpdateSet,
};

#[derive(Clone, Debug, Default)]
pub struct UtxoSet {
    utxos: Table<Id, Utxo>,
    by_address: OrdMap<ShortId, OrdSet<Id>>,
    by_asset_address: OrdMap<(Id, ShortId), OrdSet<Id>>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &Id) -> Option<&Utxo> {
        self.utxos.get(id)
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.utxos.contains_key(id)
    }

    /// Add `utxo`. Adding a UTXO equal to one already present is a no-op; adding a different UTXO
    /// under a present id fails.
    pub fn add(&mut self, utxo: Utxo) -> Result<(), UtxoError> {
        let id = utxo.input_id();
        if let Some(existing) = self.utxos.get(&id) {
            if *existing == utxo {
                return Ok(());
            }
            return Err(UtxoError::Duplicate { id });
        }
        for addr in &utxo.output.owners().addrs {
            insert_index(&mut self.by_address, *addr, id);
            insert_index(&mut self.by_asset_address, (utxo.asset_id, *addr), id);
        }
        self.utxos.insert(id, utxo);
        Ok(())
    }

    pub fn delete(&mut self, id: &Id) -> Result<Utxo, UtxoError> {
        let utxo = self
            .utxos
            .remove(id)
            .ok_or(UtxoError::NotFound { id: *id })?;
        for addr in &utxo.output.owners().addrs {
            remove_index(&mut self.by_address, addr, id);
            remove_index(&mut self.by_asset_address, &(utxo.asset_id, *addr), id);
        }
        Ok(utxo)
    }

    /// Up to `limit` ids of UTXOs `addr` owns, in ascending order, starting strictly after
    /// `after` when given.
    pub fn ids_by_address(&self, addr: &ShortId, after: Option<&Id>, limit: usize) -> Vec<Id> {
        page(self.by_address.get(addr), after, limit)
    }

    /// As [`ids_by_address`](Self::ids_by_address), restricted to UTXOs of `asset_id`.
    pub fn ids_by_asset_address(
        &self,
        asset_id: &Id,
        addr: &ShortId,
        after: Option<&Id>,
        limit: usize,
    ) -> Vec<Id> {
        page(self.by_asset_address.get(&(*asset_id, *addr)), after, limit)
    }

    /// Every UTXO, in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Utxo> {
        self.utxos.values()
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    /// Sum of the amounts of every UTXO of `asset_id`.
    pub fn total(&self, asset_id: &Id) -> u128 {
        self.iter()
            .filter(|utxo| utxo.asset_id == *asset_id)
            .map(|utxo| utxo.output.amount() as u128)
            .sum()
    }

    pub fn delta(&self) -> &UpdateSet<Id, Utxo> {
        self.utxos.delta()
    }

    pub(crate) fn clear_delta(&mut self) {
        self.utxos.clear_delta()
    }

    pub(crate) fn rebase_delta(&mut self, earlier: &UtxoSet) {
        self.utxos.rebase_delta(earlier.delta())
    }
}

fn insert_index<K: Ord + Clone>(index: &mut OrdMap<K, OrdSet<Id>>, key: K, id: Id) {
    let mut ids = index.get(&key).cloned().unwrap_or_default();
    ids.insert(id);
    index.insert(key, ids);
}

fn remove_index<K: Ord + Clone>(index: &mut OrdMap<K, OrdSet<Id>>, key: &K, id: &Id) {
    if let Some(ids) = index.get(key) {
        let mut ids = ids.clone();
        ids.remove(id);
        if ids.is_empty() {
            index.remove(key);
        } else {
            index.insert(key.clone(), ids);
        }
    }
}

fn page(ids: Option<&OrdSet<Id>>, after: Option<&Id>, limit: usize) -> Vec<Id> {
    let Some(ids) = ids else {
        return Vec::new();
    };
    let lower = match after {
        Some(after) => Bound::Excluded(*after),
        None => Bound::Unbounded,
    };
    ids.range((lower, Bound::Unbounded))
        .take(limit)
        .copied()
        .collect()
}

#[derive(Debug, PartialEq, Eq)]
pub enum UtxoError {
    Duplicate { id: Id },
    NotFound { id: Id },
}

impl Display for UtxoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            UtxoError::Duplicate { id } => write!(f, "a different UTXO {} already exists", id),
            UtxoError::NotFound { id } => write!(f, "UTXO {} not found", id),
        }
    }
}

impl std::error::Error for UtxoError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::outputs::{Output, OutputOwners, TransferOutput, UtxoId};

    fn utxo(tx: &[u8], index: u32, amount: u64, owner: u8) -> Utxo {
        Utxo {
            utxo_id: UtxoId::new(Id::hash(tx), index),
            asset_id: Id::hash(b"asset"),
            output: Output::Transfer(TransferOutput::new(
                amount,
                OutputOwners::single(ShortId::new([owner; 20])),
            )),
        }
    }

    #[test]
    fn add_is_idempotent_for_equal_utxos() {
        let mut set = UtxoSet::new();
        set.add(utxo(b"a", 0, 5, 1)).unwrap();
        set.add(utxo(b"a", 0, 5, 1)).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.add(utxo(b"a", 0, 6, 1)),
            Err(UtxoError::Duplicate {
                id: UtxoId::new(Id::hash(b"a"), 0).input_id()
            })
        );
    }

    #[test]
    fn delete_of_missing_utxo_fails() {
        let mut set = UtxoSet::new();
        let missing = Id::hash(b"missing");
        assert_eq!(set.delete(&missing), Err(UtxoError::NotFound { id: missing }));
    }

    #[test]
    fn address_index_pages_in_id_order() {
        let mut set = UtxoSet::new();
        for index in 0..5 {
            set.add(utxo(b"a", index, 1, 1)).unwrap();
        }
        set.add(utxo(b"b", 0, 1, 2)).unwrap();

        let owner = ShortId::new([1; 20]);
        let all = set.ids_by_address(&owner, None, 10);
        assert_eq!(all.len(), 5);
        assert!(all.windows(2).all(|pair| pair[0] < pair[1]));

        let first = set.ids_by_address(&owner, None, 2);
        let rest = set.ids_by_address(&owner, Some(&first[1]), 10);
        assert_eq!(first.len() + rest.len(), 5);
        assert_eq!(rest[0], all[2]);

        let asset = Id::hash(b"asset");
        assert_eq!(set.ids_by_asset_address(&asset, &owner, None, 10), all);
        assert!(set.ids_by_asset_address(&Id::EMPTY, &owner, None, 10).is_empty());
    }

    #[test]
    fn delete_updates_indexes() {
        let mut set = UtxoSet::new();
        let added = utxo(b"a", 0, 1, 1);
        set.add(added.clone()).unwrap();
        set.delete(&added.input_id()).unwrap();
        assert!(set.ids_by_address(&ShortId::new([1; 20]), None, 10).is_empty());
        assert!(set.delta().contains_delete(&added.input_id()));
    }
}
