/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that record the changes a diff makes to the chain state.

use std::collections::{btree_map, btree_set, BTreeMap, BTreeSet};

/// Generic set of key-value updates that are flushed to persistent storage when the diff that
/// collected them is committed.
///
/// Keys iterate in ascending order, so flushing an `UpdateSet` produces the same write batch on
/// every replica.
///
/// # Uniqueness of Key between `inserts` and `deletes`
///
/// A key is never in both `inserts` and `deletes`: the later of [`insert`](Self::insert) and
/// [`delete`](Self::delete) wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateSet<K: Ord, V> {
    /// Insertion updates.
    inserts: BTreeMap<K, V>,

    /// Deletion updates.
    deletes: BTreeSet<K>,
}

impl<K: Ord, V> Default for UpdateSet<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> UpdateSet<K, V> {
    /// Create a new `UpdateSet` with empty `inserts` and `deletes`.
    pub fn new() -> Self {
        Self {
            inserts: BTreeMap::new(),
            deletes: BTreeSet::new(),
        }
    }

    /// Schedule the insertion of a `key`-`value` pair.
    ///
    /// This cancels the deletion of `key`, if it has been scheduled using [`delete`](Self::delete).
    pub fn insert(&mut self, key: K, value: V) {
        self.deletes.remove(&key);
        self.inserts.insert(key, value);
    }

    /// Schedule the deletion of `key`.
    ///
    /// This cancels the insertion of `key`, if it has been scheduled using [`insert`](Self::insert).
    pub fn delete(&mut self, key: K) {
        self.inserts.remove(&key);
        self.deletes.insert(key);
    }

    /// Get whether the `UpdateSet` is scheduled to insert a value to `key`, and if so, returns a
    /// reference to that value.
    pub fn get_insert(&self, key: &K) -> Option<&V> {
        self.inserts.get(key)
    }

    /// Check whether the `UpdateSet` is scheduled to delete `key`.
    pub fn contains_delete(&self, key: &K) -> bool {
        self.deletes.contains(key)
    }

    /// Get an iterator over all of the key-value pairs that this `UpdateSet` will insert.
    pub fn inserts(&self) -> btree_map::Iter<K, V> {
        self.inserts.iter()
    }

    /// Get an iterator over all of the keys that this `UpdateSet` will delete.
    pub fn deletes(&self) -> btree_set::Iter<K> {
        self.deletes.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.deletes.is_empty()
    }

    /// Apply the updates in `later` on top of the updates in `self`, as if every call made on
    /// `later` had been made on `self` afterwards.
    pub fn extend(&mut self, later: UpdateSet<K, V>) {
        for key in later.deletes {
            self.delete(key);
        }
        for (key, value) in later.inserts {
            self.insert(key, value);
        }
    }
}
