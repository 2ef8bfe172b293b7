/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events the block processor emits.
//!
//! An event for a given action indicates that the action has been completed. Events about the
//! contents of a block (time advancing, stakers being promoted or rewarded, proposals concluding)
//! are emitted when that block is accepted, never when it is only staged.

use std::sync::mpsc::Sender;
use std::time::SystemTime;

use crate::types::ids::{Amount, Id, Timestamp};

pub enum Event {
    // Events about blocks.
    StageBlock(StageBlockEvent),
    AcceptBlock(AcceptBlockEvent),
    RejectBlock(RejectBlockEvent),
    // Events about the accepted state.
    AdvanceTime(AdvanceTimeEvent),
    PromoteStaker(PromoteStakerEvent),
    RewardStaker(RewardStakerEvent),
    ConcludeProposal(ConcludeProposalEvent),
    // Events about the mempool.
    DropTx(DropTxEvent),
}

impl Event {
    pub(crate) fn publish(event_publisher: &Option<Sender<Event>>, event: Event) {
        if let Some(event_publisher) = event_publisher {
            // A receiver that hung up stops receiving events; processing carries on.
            let _ = event_publisher.send(event);
        }
    }
}

pub struct StageBlockEvent {
    pub timestamp: SystemTime,
    pub block: Id,
    pub height: u64,
    pub kind: &'static str,
}

pub struct AcceptBlockEvent {
    pub timestamp: SystemTime,
    pub block: Id,
    pub height: u64,
}

pub struct RejectBlockEvent {
    pub timestamp: SystemTime,
    pub block: Id,
}

pub struct AdvanceTimeEvent {
    pub timestamp: SystemTime,
    pub chain_time: Timestamp,
}

/// A pending staker or lock became current.
pub struct PromoteStakerEvent {
    pub timestamp: SystemTime,
    pub staker_tx: Id,
    pub potential_reward: Amount,
}

/// A current staker or lock was removed at its end, with its reward paid if `committed`.
pub struct RewardStakerEvent {
    pub timestamp: SystemTime,
    pub staker_tx: Id,
    pub reward: Amount,
    pub committed: bool,
}

pub struct ConcludeProposalEvent {
    pub timestamp: SystemTime,
    pub proposal: Id,
    pub outcome: ProposalOutcome,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProposalOutcome {
    /// The threshold was reached and the proposed transaction executed.
    Concluded,
    /// The proposal ended without reaching its threshold.
    Rejected,
}

pub struct DropTxEvent {
    pub timestamp: SystemTime,
    pub tx: Id,
    pub reason: String,
}
