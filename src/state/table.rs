/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A copy-on-write keyed table that records the changes made to it since it was forked.

use im::OrdMap;

use crate::types::update_sets::UpdateSet;

/// Cloning a `Table` is cheap: the clone shares structure with the original until either is
/// modified.
#[derive(Clone, Debug)]
pub struct Table<K: Ord + Clone, V: Clone> {
    entries: OrdMap<K, V>,
    delta: UpdateSet<K, V>,
}

impl<K: Ord + Clone, V: Clone> Default for Table<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V: Clone> Table<K, V> {
    pub fn new() -> Self {
        Self {
            entries: OrdMap::new(),
            delta: UpdateSet::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.delta.insert(key.clone(), value.clone());
        self.entries.insert(key, value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.delta.delete(key.clone());
        }
        removed
    }

    /// Values in ascending key order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Changes made since the table was last forked.
    pub fn delta(&self) -> &UpdateSet<K, V> {
        &self.delta
    }

    pub(crate) fn clear_delta(&mut self) {
        self.delta = UpdateSet::new();
    }

    /// Make this table's delta also cover the changes in `earlier`, which were made before the
    /// changes in this table.
    pub(crate) fn rebase_delta(&mut self, earlier: &UpdateSet<K, V>) {
        let later = std::mem::take(&mut self.delta);
        let mut merged = earlier.clone();
        merged.extend(later);
        self.delta = merged;
    }
}
