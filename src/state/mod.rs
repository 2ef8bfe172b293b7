/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The chain state: UTXOs, locks, registries, and the layers built over them.
//!
//! Committed state lives in [`ChainState`](chain_state::ChainState), persisted through the
//! user-supplied [`KVStore`](pluggables::KVStore). Uncommitted state lives in
//! [`Diff`](diff::Diff)s stacked on top of it.

pub mod chain_state;

pub mod diff;

pub mod lock_states;

pub mod pluggables;

pub mod registry;

pub mod table;

pub mod utxos;

pub mod variables;

pub mod write_batch;
