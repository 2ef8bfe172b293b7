/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via
//! [`Config::log_events`](crate::config::Config).
//!
//! platformvm_rs logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a [RewardStaker](crate::events::RewardStakerEvent) is printed:
//!
//! ```text
//! RewardStaker, 1701329264, fNGCJyk, 5310, true
//! ```
//!
//! In the snippet:
//! - The third value is the first seven characters of the Base64 encoding of the id of the
//!   transaction that added the staker.
//! - The fourth value is the reward reserved for the staker.
//! - The fifth value is whether the reward was paid.

use crate::events::*;
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use log;
use std::time::SystemTime;

// Names of each event in PascalCase for printing:
pub const STAGE_BLOCK: &str = "StageBlock";
pub const ACCEPT_BLOCK: &str = "AcceptBlock";
pub const REJECT_BLOCK: &str = "RejectBlock";

pub const ADVANCE_TIME: &str = "AdvanceTime";
pub const PROMOTE_STAKER: &str = "PromoteStaker";
pub const REWARD_STAKER: &str = "RewardStaker";
pub const CONCLUDE_PROPOSAL: &str = "ConcludeProposal";

pub const DROP_TX: &str = "DropTx";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

/// Print `event` with the default logging handler of its type.
pub(crate) fn log_event(event: &Event) {
    match event {
        Event::StageBlock(event) => StageBlockEvent::get_logger()(event),
        Event::AcceptBlock(event) => AcceptBlockEvent::get_logger()(event),
        Event::RejectBlock(event) => RejectBlockEvent::get_logger()(event),
        Event::AdvanceTime(event) => AdvanceTimeEvent::get_logger()(event),
        Event::PromoteStaker(event) => PromoteStakerEvent::get_logger()(event),
        Event::RewardStaker(event) => RewardStakerEvent::get_logger()(event),
        Event::ConcludeProposal(event) => ConcludeProposalEvent::get_logger()(event),
        Event::DropTx(event) => DropTxEvent::get_logger()(event),
    }
}

impl Logger for StageBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |stage_block_event: &StageBlockEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                STAGE_BLOCK,
                secs_since_unix_epoch(stage_block_event.timestamp),
                first_seven_base64_chars(stage_block_event.block.as_slice()),
                stage_block_event.height,
                stage_block_event.kind
            )
        };
        Box::new(logger)
    }
}

impl Logger for AcceptBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |accept_block_event: &AcceptBlockEvent| {
            log::info!(
                "{}, {}, {}, {}",
                ACCEPT_BLOCK,
                secs_since_unix_epoch(accept_block_event.timestamp),
                first_seven_base64_chars(accept_block_event.block.as_slice()),
                accept_block_event.height
            )
        };
        Box::new(logger)
    }
}

impl Logger for RejectBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |reject_block_event: &RejectBlockEvent| {
            log::info!(
                "{}, {}, {}",
                REJECT_BLOCK,
                secs_since_unix_epoch(reject_block_event.timestamp),
                first_seven_base64_chars(reject_block_event.block.as_slice())
            )
        };
        Box::new(logger)
    }
}

impl Logger for AdvanceTimeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |advance_time_event: &AdvanceTimeEvent| {
            log::info!(
                "{}, {}, {}",
                ADVANCE_TIME,
                secs_since_unix_epoch(advance_time_event.timestamp),
                advance_time_event.chain_time
            )
        };
        Box::new(logger)
    }
}

impl Logger for PromoteStakerEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |promote_staker_event: &PromoteStakerEvent| {
            log::info!(
                "{}, {}, {}, {}",
                PROMOTE_STAKER,
                secs_since_unix_epoch(promote_staker_event.timestamp),
                first_seven_base64_chars(promote_staker_event.staker_tx.as_slice()),
                promote_staker_event.potential_reward
            )
        };
        Box::new(logger)
    }
}

impl Logger for RewardStakerEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |reward_staker_event: &RewardStakerEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                REWARD_STAKER,
                secs_since_unix_epoch(reward_staker_event.timestamp),
                first_seven_base64_chars(reward_staker_event.staker_tx.as_slice()),
                reward_staker_event.reward,
                reward_staker_event.committed
            )
        };
        Box::new(logger)
    }
}

impl Logger for ConcludeProposalEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |conclude_proposal_event: &ConcludeProposalEvent| {
            log::info!(
                "{}, {}, {}, {:?}",
                CONCLUDE_PROPOSAL,
                secs_since_unix_epoch(conclude_proposal_event.timestamp),
                first_seven_base64_chars(conclude_proposal_event.proposal.as_slice()),
                conclude_proposal_event.outcome
            )
        };
        Box::new(logger)
    }
}

impl Logger for DropTxEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |drop_tx_event: &DropTxEvent| {
            log::info!(
                "{}, {}, {}, {}",
                DROP_TX,
                secs_since_unix_epoch(drop_tx_event.timestamp),
                first_seven_base64_chars(drop_tx_event.tx.as_slice()),
                drop_tx_event.reason
            )
        };
        Box::new(logger)
    }
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7 characters.
pub(crate) fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

// Events stamped before the Unix Epoch print as 0.
fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_ids_are_seven_chars() {
        assert_eq!(first_seven_base64_chars(&[0; 32]), "AAAAAAA");
        assert_eq!(first_seven_base64_chars(&[0xff]), "/w");
    }

    #[test]
    fn pre_epoch_times_print_as_zero() {
        let before = SystemTime::UNIX_EPOCH - std::time::Duration::from_secs(5);
        assert_eq!(secs_since_unix_epoch(before), 0);
        assert_eq!(secs_since_unix_epoch(SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(9)), 9);
    }
}
