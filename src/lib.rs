/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A Rust implementation of the platform chain of a delegated-proof-of-stake blockchain.
//!
//! The platform chain keeps the validator set, a UTXO ledger whose outputs can be bonded to
//! validators or deposited for a reward, and a registry of governance proposals. Its state only
//! changes through transactions, verified and executed by the [`executor`], and grouped into blocks
//! by the [`block_processor`].
//!
//! ## Getting started
//!
//! 1. Write the genesis state into an empty key-value store with
//!    [`ChainState::initialize`](state::chain_state::ChainState::initialize), or reopen one with
//!    [`ChainState::load`](state::chain_state::ChainState::load).
//! 2. Build a [`BlockProcessorSpec`](block_processor::BlockProcessorSpec) from the chain state, a
//!    [`Config`](config::Config), and the [collaborators](interfaces) the state machine consumes.
//! 3. Hand every block the consensus driver delivers to
//!    [`verify_and_stage`](block_processor::BlockProcessor::verify_and_stage), then to
//!    [`accept_block`](block_processor::BlockProcessor::accept_block) or
//!    [`reject_block`](block_processor::BlockProcessor::reject_block) once consensus decides.
//!
//! ## Determinism
//!
//! Every replica executing the same blocks on the same genesis with the same [`Config`](config::Config)
//! reaches byte-identical state. Only the *preference* between the two successors of a proposal
//! transaction reads the wall clock and observed uptimes.

pub mod block_processor;

pub mod codec;

pub mod config;

pub mod events;

pub mod executor;

pub mod fx;

pub mod interfaces;

pub(crate) mod logging;

pub(crate) mod math;

pub mod reward;

pub mod state;

pub mod types;
