/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Immutable parameters of the platform chain.
//!
//! Every replica of a network must run with the same [`Config`]: fees, staking bounds and reward
//! parameters all feed into transaction verification.

use typed_builder::TypedBuilder;

use crate::types::ids::{Amount, Id, Timestamp};

pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
pub const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY;

/// Denominator of every parts-per-million quantity (rates, shares, uptimes).
pub const PERCENT_DENOMINATOR: u64 = 1_000_000;

/// Latest time any staker, lock or proposal may end at, and latest time the chain may advance to.
pub const MAX_CHAIN_TIME: Timestamp = i64::MAX as u64;

/// Parameters of the stake reward curve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardConfig {
    /// Yearly rate, in parts per million, paid for the shortest stake.
    pub min_consumption_rate: u64,
    /// Yearly rate, in parts per million, paid for a stake of a full minting period.
    pub max_consumption_rate: u64,
    /// Duration, in seconds, of the longest rewarded stake.
    pub minting_period: u64,
    /// Total supply the native asset never exceeds.
    pub supply_cap: Amount,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            min_consumption_rate: 100_000,
            max_consumption_rate: 120_000,
            minting_period: SECONDS_PER_YEAR,
            supply_cap: 720_000_000_000_000_000,
        }
    }
}

/// Parameters of the lock reward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockRewardConfig {
    /// Reward, in parts per million of the locked amount, for a lock of `max_duration`.
    pub rate_numerator: u64,
    pub max_duration: u64,
}

impl Default for LockRewardConfig {
    fn default() -> Self {
        Self {
            rate_numerator: 100_000,
            max_duration: SECONDS_PER_YEAR,
        }
    }
}

#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Config]. Every field is optional and defaults to a value suited
    to a local network.
"))]
pub struct Config {
    #[builder(default = 12345, setter(doc = "Set the id of the network transactions must name."))]
    pub network_id: u32,
    #[builder(default = Id::EMPTY, setter(doc = "Set the id of the platform chain itself."))]
    pub chain_id: Id,
    #[builder(default = Id::hash(b"native asset"), setter(doc = "Set the asset that pays fees and is staked."))]
    pub native_asset_id: Id,
    #[builder(default = 1_000, setter(doc = "Set the base fee the chain starts with."))]
    pub tx_fee: Amount,
    #[builder(default = 1_000_000)]
    pub create_subnet_fee: Amount,
    #[builder(default = 1_000_000)]
    pub create_blockchain_fee: Amount,
    #[builder(default = 1_000_000)]
    pub min_validator_stake: Amount,
    #[builder(default = 3_000_000_000_000_000)]
    pub max_validator_stake: Amount,
    #[builder(default = SECONDS_PER_DAY)]
    pub min_stake_duration: u64,
    #[builder(default = SECONDS_PER_YEAR)]
    pub max_stake_duration: u64,
    #[builder(default = 14 * SECONDS_PER_DAY, setter(doc = "Set how far past the chain time a staker may start."))]
    pub max_future_start_time: u64,
    #[builder(default = 10, setter(doc = "Set how far past the wall clock the chain time may advance."))]
    pub max_future_drift: u64,
    #[builder(default = 800_000, setter(doc = "Set the uptime, in parts per million, a validator needs to be rewarded."))]
    pub uptime_requirement: u32,
    #[builder(default)]
    pub stake_reward: RewardConfig,
    #[builder(default)]
    pub lock_reward: LockRewardConfig,
    #[builder(default = 1)]
    pub min_lock_amount: Amount,
    #[builder(default = SECONDS_PER_DAY)]
    pub min_lock_duration: u64,
    #[builder(default = SECONDS_PER_YEAR)]
    pub max_lock_duration: u64,
    #[builder(default = 1_000_000)]
    pub proposal_bond_amount: Amount,
    #[builder(default = SECONDS_PER_DAY)]
    pub min_proposal_duration: u64,
    #[builder(default = 30 * SECONDS_PER_DAY)]
    pub max_proposal_duration: u64,
    #[builder(default = 128)]
    pub max_chain_name_len: usize,
    #[builder(default = 128 * 1024, setter(doc = "Set the largest chain genesis a CreateChain may carry. Must leave room under the codec limit."))]
    pub max_genesis_len: usize,
    #[builder(default = 256)]
    pub max_memo_len: usize,
    #[builder(default = false, setter(doc = "Print every published event through the log facade."))]
    pub log_events: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config::builder().build()
    }
}
