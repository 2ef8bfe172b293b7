/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types shared by every component of the platform chain: identifiers, outputs and UTXOs,
//! transactions, blocks, and the [`UpdateSet`](update_sets::UpdateSet) deltas that state changes
//! are recorded in.

pub mod block;

pub mod crypto_primitives;

pub mod ids;

pub mod outputs;

pub mod txs;

pub mod update_sets;
