/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Reward calculators.
//!
//! All arithmetic is carried out in 512-bit integers and divided once, so results are exact
//! floors regardless of operand size.
//!
//! The stake reward for `amount` staked for `duration` seconds, with `remaining = supply_cap -
//! current_supply` still to be minted, is
//!
//! ```text
//! remaining * amount * duration * (min_rate * minting_period + (max_rate - min_rate) * duration)
//! ---------------------------------------------------------------------------------------------
//!              current_supply * minting_period^2 * 1_000_000
//! ```
//!
//! clamped to `remaining`, with `duration` clamped to the minting period.

use primitive_types::U512;

use crate::config::{LockRewardConfig, RewardConfig, PERCENT_DENOMINATOR, SECONDS_PER_YEAR};
use crate::types::{ids::Amount, txs::DepositOffer};

pub fn stake_reward(config: &RewardConfig, amount: Amount, duration: u64, current_supply: Amount) -> Amount {
    if current_supply == 0 || config.minting_period == 0 {
        return 0;
    }
    let remaining = config.supply_cap.saturating_sub(current_supply);
    let duration = duration.min(config.minting_period);
    let rate_range = config
        .max_consumption_rate
        .saturating_sub(config.min_consumption_rate);

    let scaled_rate = U512::from(config.min_consumption_rate) * U512::from(config.minting_period)
        + U512::from(rate_range) * U512::from(duration);
    let numerator = U512::from(remaining) * U512::from(amount) * U512::from(duration) * scaled_rate;
    let denominator = U512::from(current_supply)
        * U512::from(config.minting_period)
        * U512::from(config.minting_period)
        * U512::from(PERCENT_DENOMINATOR);

    clamp(numerator / denominator, remaining)
}

/// The part of `reward` that can still be minted once `current_supply` has been issued.
pub fn capped(config: &RewardConfig, reward: Amount, current_supply: Amount) -> Amount {
    reward.min(config.supply_cap.saturating_sub(current_supply))
}

/// `amount * duration * rate_numerator / (max_duration * 1_000_000)`.
pub fn lock_reward(config: &LockRewardConfig, amount: Amount, duration: u64) -> Amount {
    interest(amount, duration, config.rate_numerator, config.max_duration)
}

/// Interest on `amount` deposited for `duration` seconds at the offer's yearly rate.
pub fn deposit_reward(offer: &DepositOffer, amount: Amount, duration: u64) -> Amount {
    interest(amount, duration, offer.interest_rate_nominator, SECONDS_PER_YEAR)
}

fn interest(amount: Amount, duration: u64, rate: u64, period: u64) -> Amount {
    if period == 0 {
        return 0;
    }
    let numerator = U512::from(amount) * U512::from(duration) * U512::from(rate);
    let denominator = U512::from(period) * U512::from(PERCENT_DENOMINATOR);
    clamp(numerator / denominator, Amount::MAX)
}

fn clamp(value: U512, max: Amount) -> Amount {
    if value > U512::from(max) {
        max
    } else {
        value.low_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RewardConfig {
        RewardConfig {
            min_consumption_rate: 100_000,
            max_consumption_rate: 120_000,
            minting_period: SECONDS_PER_YEAR,
            supply_cap: 720_000_000,
        }
    }

    #[test]
    fn zero_supply_or_zero_duration_pays_nothing() {
        assert_eq!(stake_reward(&config(), 1_000, SECONDS_PER_YEAR, 0), 0);
        assert_eq!(stake_reward(&config(), 1_000, 0, 360_000_000), 0);
    }

    #[test]
    fn full_period_pays_max_rate_on_remaining_share() {
        // remaining = 360M, amount/supply = 1/360_000, rate at a full period = 12%.
        let reward = stake_reward(&config(), 1_000, SECONDS_PER_YEAR, 360_000_000);
        assert_eq!(reward, 120);
    }

    #[test]
    fn duration_beyond_minting_period_is_clamped() {
        let capped = stake_reward(&config(), 1_000, SECONDS_PER_YEAR, 360_000_000);
        let longer = stake_reward(&config(), 1_000, 2 * SECONDS_PER_YEAR, 360_000_000);
        assert_eq!(capped, longer);
    }

    #[test]
    fn reward_never_exceeds_remaining_supply() {
        let config = RewardConfig {
            max_consumption_rate: 100_000_000,
            ..config()
        };
        let reward = stake_reward(&config, 719_000_000, SECONDS_PER_YEAR, 719_999_000);
        assert_eq!(reward, 1_000);
    }

    #[test]
    fn supply_at_cap_pays_nothing() {
        assert_eq!(stake_reward(&config(), 1_000, SECONDS_PER_YEAR, 720_000_000), 0);
        assert_eq!(stake_reward(&config(), 1_000, SECONDS_PER_YEAR, 800_000_000), 0);
    }

    #[test]
    fn capped_reward_fits_under_supply_cap() {
        assert_eq!(capped(&config(), 500, 719_999_000), 500);
        assert_eq!(capped(&config(), 5_000, 719_999_000), 1_000);
        assert_eq!(capped(&config(), 5_000, 720_000_000), 0);
        assert_eq!(capped(&config(), 5_000, 800_000_000), 0);
    }

    #[test]
    fn lock_reward_is_linear_in_amount_and_duration() {
        let config = LockRewardConfig {
            rate_numerator: 100_000,
            max_duration: 1_000,
        };
        assert_eq!(lock_reward(&config, 1_000_000, 1_000), 100_000);
        assert_eq!(lock_reward(&config, 1_000_000, 500), 50_000);
        assert_eq!(lock_reward(&config, 2_000_000, 500), 100_000);
        assert_eq!(lock_reward(&LockRewardConfig { rate_numerator: 1, max_duration: 0 }, 5, 5), 0);
    }

    #[test]
    fn lock_reward_saturates() {
        let config = LockRewardConfig {
            rate_numerator: u64::MAX,
            max_duration: 1,
        };
        assert_eq!(lock_reward(&config, u64::MAX, u64::MAX), u64::MAX);
    }
}
