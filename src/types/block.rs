/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Blocks of the platform chain.
//!
//! A standard block carries decision transactions. A proposal block carries exactly one proposal
//! transaction, and is followed by a commit or an abort block choosing which of the proposal's two
//! successor states becomes the chain state.

use borsh::{BorshDeserialize, BorshSerialize};

use super::{
    ids::{Id, Timestamp},
    txs::Tx,
};
use crate::codec::{Codec, CodecError};

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct StandardBlock {
    pub parent: Id,
    pub height: u64,
    /// Equal to the chain time of the parent's state.
    pub timestamp: Timestamp,
    pub txs: Vec<Tx>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ProposalBlock {
    pub parent: Id,
    pub height: u64,
    pub tx: Tx,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct OptionBlock {
    pub parent: Id,
    pub height: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum Block {
    Standard(StandardBlock),
    Proposal(ProposalBlock),
    Commit(OptionBlock),
    Abort(OptionBlock),
}

impl Block {
    pub fn standard(parent: Id, height: u64, timestamp: Timestamp, txs: Vec<Tx>) -> Block {
        Block::Standard(StandardBlock {
            parent,
            height,
            timestamp,
            txs,
        })
    }

    pub fn proposal(parent: Id, height: u64, tx: Tx) -> Block {
        Block::Proposal(ProposalBlock { parent, height, tx })
    }

    pub fn commit(parent: Id, height: u64) -> Block {
        Block::Commit(OptionBlock { parent, height })
    }

    pub fn abort(parent: Id, height: u64) -> Block {
        Block::Abort(OptionBlock { parent, height })
    }

    /// `sha256(encoded block)`.
    pub fn id(&self) -> Result<Id, CodecError> {
        Codec::block().hash(self)
    }

    pub fn parent(&self) -> Id {
        match self {
            Block::Standard(block) => block.parent,
            Block::Proposal(block) => block.parent,
            Block::Commit(block) | Block::Abort(block) => block.parent,
        }
    }

    pub fn height(&self) -> u64 {
        match self {
            Block::Standard(block) => block.height,
            Block::Proposal(block) => block.height,
            Block::Commit(block) | Block::Abort(block) => block.height,
        }
    }

    pub fn txs(&self) -> Vec<&Tx> {
        match self {
            Block::Standard(block) => block.txs.iter().collect(),
            Block::Proposal(block) => vec![&block.tx],
            Block::Commit(_) | Block::Abort(_) => Vec::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Block::Standard(_) => "Standard",
            Block::Proposal(_) => "Proposal",
            Block::Commit(_) => "Commit",
            Block::Abort(_) => "Abort",
        }
    }
}
