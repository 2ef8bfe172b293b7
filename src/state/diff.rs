/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Versioned copy-on-write layers over a [`Chain`].
//!
//! A [`Diff`] starts as a copy of its parent's [`StateData`] and records every change made to it.
//! It remembers the version of the parent it was created from, and may only be applied onto a chain
//! still at that version: applying bumps the target's version, so a sibling created from the same
//! parent can no longer be applied after it. A diff can be applied at most once.

use super::chain_state::{Chain, StateData, StateError};

#[derive(Clone, Debug)]
pub struct Diff {
    parent_version: u64,
    version: u64,
    data: StateData,
    applied: bool,
}

impl Diff {
    pub fn new(parent: &dyn Chain) -> Diff {
        Diff {
            parent_version: parent.version(),
            version: parent.version() + 1,
            data: parent.data().fork(),
            applied: false,
        }
    }

    pub fn parent_version(&self) -> u64 {
        self.parent_version
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    pub(crate) fn data_mut(&mut self) -> &mut StateData {
        &mut self.data
    }

    /// Write this diff onto `target`, the diff it was created from.
    pub fn apply(&mut self, target: &mut Diff) -> Result<(), StateError> {
        self.check_applicable(target.version)?;
        target.data.absorb(self.data.clone());
        target.version = self.version;
        self.applied = true;
        Ok(())
    }

    pub(crate) fn check_applicable(&self, target_version: u64) -> Result<(), StateError> {
        if self.applied {
            return Err(StateError::DiffAlreadyApplied);
        }
        if self.parent_version != target_version {
            return Err(StateError::StaleParent {
                expected: self.parent_version,
                found: target_version,
            });
        }
        Ok(())
    }

    pub(crate) fn mark_applied(&mut self) {
        self.applied = true;
    }
}

impl Chain for Diff {
    fn data(&self) -> &StateData {
        &self.data
    }

    fn version(&self) -> u64 {
        self.version
    }
}
