/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Structural checks that depend only on the transaction and the [`Config`], never on the state.

use super::TxError;
use crate::{
    codec::Codec,
    config::{Config, MAX_CHAIN_TIME, PERCENT_DENOMINATOR},
    math,
    types::{
        ids::{Amount, Timestamp},
        outputs::{is_sorted_and_unique, LockState, TransferableInput, TransferableOutput},
        txs::{BaseTx, DepositOffer, SubnetAuth, Tx, UnsignedTx, Validator},
    },
};

pub(crate) fn verify(config: &Config, tx: &Tx) -> Result<(), TxError> {
    Codec::standard().encode(tx)?;

    let unsigned = &tx.unsigned;
    if unsigned.is_governance() {
        return Err(TxError::NotGovernanceTx);
    }
    if let Some(base) = unsigned.base() {
        verify_base(config, base, allowed_base_states(unsigned))?;
        if unsigned.is_system()
            && (!tx.credentials.is_empty() || !base.ins.is_empty() || !base.outs.is_empty() || !base.memo.is_empty())
        {
            return Err(TxError::TxBodyMismatch);
        }
    }

    match unsigned {
        UnsignedTx::AddValidator(tx) => {
            verify_validator(config, &tx.validator)?;
            if tx.delegation_shares as u64 > PERCENT_DENOMINATOR {
                return Err(TxError::TooManyShares {
                    shares: tx.delegation_shares,
                });
            }
            if !(config.min_validator_stake..=config.max_validator_stake).contains(&tx.validator.weight) {
                return Err(TxError::WeightOutOfRange {
                    weight: tx.validator.weight,
                });
            }
            verify_locked_outputs(config, "bond", &tx.bond, LockState::is_bonded, tx.validator.weight)?;
            if !tx.rewards_owner.is_well_formed() {
                return Err(TxError::InvalidOwners);
            }
        }
        UnsignedTx::AddSubnetValidator(tx) => {
            verify_validator(config, &tx.validator.validator)?;
            if tx.validator.validator.weight == 0 {
                return Err(TxError::WeightOutOfRange { weight: 0 });
            }
            verify_subnet_auth(&tx.subnet_auth)?;
        }
        UnsignedTx::AddLock(tx) => {
            verify_lock_period(config, tx.start, tx.end)?;
            if tx.amount < config.min_lock_amount {
                return Err(TxError::LockAmountTooLow {
                    min: config.min_lock_amount,
                    actual: tx.amount,
                });
            }
            verify_locked_outputs(config, "locked outputs", &tx.locked_outs, LockState::is_deposited, tx.amount)?;
            if !tx.rewards_owner.is_well_formed() {
                return Err(TxError::InvalidOwners);
            }
        }
        UnsignedTx::AddDeposit(tx) => {
            verify_time_range(tx.start, tx.end)?;
            verify_locked_outputs(
                config,
                "deposited outputs",
                &tx.deposited_outs,
                LockState::is_deposited,
                tx.amount,
            )?;
            if !tx.rewards_owner.is_well_formed() {
                return Err(TxError::InvalidOwners);
            }
        }
        UnsignedTx::Import(tx) => {
            if tx.imported_inputs.is_empty() {
                return Err(TxError::NilInput {
                    field: "imported inputs",
                });
            }
            if tx.source_chain == config.chain_id {
                return Err(TxError::InvalidChainId {
                    expected: config.chain_id,
                    actual: tx.source_chain,
                });
            }
            verify_inputs(&tx.imported_inputs, &[LockState::Unlocked])?;
        }
        UnsignedTx::Export(tx) => {
            if tx.exported_outs.is_empty() {
                return Err(TxError::NilInput {
                    field: "exported outputs",
                });
            }
            if tx.destination_chain == config.chain_id {
                return Err(TxError::InvalidChainId {
                    expected: config.chain_id,
                    actual: tx.destination_chain,
                });
            }
            verify_outputs(&tx.exported_outs, "exported outputs", &[LockState::Unlocked])?;
        }
        UnsignedTx::CreateChain(tx) => {
            if tx.chain_name.len() > config.max_chain_name_len {
                return Err(TxError::NameTooLong {
                    len: tx.chain_name.len(),
                    max: config.max_chain_name_len,
                });
            }
            if let Some(character) = tx
                .chain_name
                .chars()
                .find(|character| !(character.is_ascii_alphanumeric() || *character == ' '))
            {
                return Err(TxError::IllegalNameCharacter { character });
            }
            if tx.genesis.len() > config.max_genesis_len {
                return Err(TxError::GenesisTooLong {
                    len: tx.genesis.len(),
                    max: config.max_genesis_len,
                });
            }
            verify_subnet_auth(&tx.subnet_auth)?;
        }
        UnsignedTx::CreateSubnet(tx) => {
            if !tx.owner.is_well_formed() {
                return Err(TxError::InvalidOwners);
            }
        }
        UnsignedTx::RewardValidator(tx) => {
            verify_inputs(&tx.ins, &LockState::ALL)?;
        }
        UnsignedTx::RewardLock(tx) => {
            verify_inputs(&tx.ins, &LockState::ALL)?;
        }
        UnsignedTx::ProposalSubmit(tx) => {
            verify_governance(config, &tx.proposed_tx)?;
            verify_time_range(tx.proposal.start, tx.proposal.end)?;
            let duration = tx.proposal.end - tx.proposal.start;
            if !(config.min_proposal_duration..=config.max_proposal_duration).contains(&duration) {
                return Err(TxError::DurationOutOfRange { duration });
            }
            if tx.proposal.threshold == 0 {
                return Err(TxError::InvalidProposalThreshold { threshold: 0 });
            }
            verify_locked_outputs(
                config,
                "bond",
                &tx.bond,
                LockState::is_bonded,
                config.proposal_bond_amount,
            )?;
        }
        UnsignedTx::ProposalVote(tx) => {
            if tx.option_index > 1 {
                return Err(TxError::InvalidVoteOption {
                    option: tx.option_index,
                });
            }
        }
        UnsignedTx::AdvanceTime(_) | UnsignedTx::ProposalConclude(_) => (),
        UnsignedTx::BaseFee(_) | UnsignedTx::AddDepositOffer(_) => return Err(TxError::NotGovernanceTx),
    }
    Ok(())
}

/// Lock states the base outputs of `unsigned` may carry: change of value that a locking
/// transaction moves between locked states may stay in its original lock.
fn allowed_base_states(unsigned: &UnsignedTx) -> &'static [LockState] {
    match unsigned {
        UnsignedTx::AddValidator(_) | UnsignedTx::ProposalSubmit(_) => &[LockState::Unlocked, LockState::Deposited],
        UnsignedTx::AddLock(_) | UnsignedTx::AddDeposit(_) => &[LockState::Unlocked, LockState::Bonded],
        _ => &[LockState::Unlocked],
    }
}

fn verify_base(config: &Config, base: &BaseTx, output_states: &[LockState]) -> Result<(), TxError> {
    if base.network_id != config.network_id {
        return Err(TxError::InvalidNetworkId {
            expected: config.network_id,
            actual: base.network_id,
        });
    }
    if base.blockchain_id != config.chain_id {
        return Err(TxError::InvalidChainId {
            expected: config.chain_id,
            actual: base.blockchain_id,
        });
    }
    if base.memo.len() > config.max_memo_len {
        return Err(TxError::MemoTooLong {
            len: base.memo.len(),
            max: config.max_memo_len,
        });
    }
    verify_inputs(&base.ins, &LockState::ALL)?;
    verify_outputs(&base.outs, "outputs", output_states)
}

fn verify_inputs(inputs: &[TransferableInput], states: &[LockState]) -> Result<(), TxError> {
    if !inputs.windows(2).all(|pair| pair[0].utxo_id < pair[1].utxo_id) {
        return Err(TxError::InputsNotSortedUnique);
    }
    for input in inputs {
        if !input.input.sig_indices().windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(TxError::SignatureIndicesNotSorted);
        }
        let state = input.input.lock_state();
        if !states.contains(&state) {
            return Err(TxError::InvalidLockState { field: "inputs", state });
        }
    }
    Ok(())
}

fn verify_outputs(outputs: &[TransferableOutput], field: &'static str, states: &[LockState]) -> Result<(), TxError> {
    if !is_sorted_and_unique(outputs) {
        return Err(TxError::OutputsNotSorted);
    }
    for output in outputs {
        if !output.output.owners().is_well_formed() {
            return Err(TxError::InvalidOwners);
        }
        let state = output.output.lock_state();
        if !states.contains(&state) {
            return Err(TxError::InvalidLockState { field, state });
        }
    }
    Ok(())
}

/// Check outputs holding locked native value: sorted, every output in a state `is_locked` accepts,
/// and their amounts summing to `declared`.
fn verify_locked_outputs(
    config: &Config,
    field: &'static str,
    outputs: &[TransferableOutput],
    is_locked: fn(&LockState) -> bool,
    declared: Amount,
) -> Result<(), TxError> {
    if outputs.is_empty() {
        return Err(TxError::NilInput { field });
    }
    if !is_sorted_and_unique(outputs) {
        return Err(TxError::OutputsNotSorted);
    }
    for output in outputs {
        if output.asset_id != config.native_asset_id {
            return Err(TxError::AssetIdMismatch {
                expected: config.native_asset_id,
                actual: output.asset_id,
            });
        }
        let state = output.output.lock_state();
        if !is_locked(&state) {
            return Err(TxError::InvalidLockState { field, state });
        }
        if !output.output.owners().is_well_formed() {
            return Err(TxError::InvalidOwners);
        }
    }
    let actual = math::sum(outputs.iter().map(|output| output.output.amount()))?;
    if actual != declared {
        return Err(TxError::AmountMismatch { declared, actual });
    }
    Ok(())
}

fn verify_time_range(start: Timestamp, end: Timestamp) -> Result<(), TxError> {
    if end <= start {
        return Err(TxError::InvalidTimeRange { start, end });
    }
    if end > MAX_CHAIN_TIME {
        return Err(TxError::EndOfTime { end });
    }
    Ok(())
}

fn verify_validator(config: &Config, validator: &Validator) -> Result<(), TxError> {
    verify_time_range(validator.start, validator.end)?;
    let duration = validator.duration();
    if !(config.min_stake_duration..=config.max_stake_duration).contains(&duration) {
        return Err(TxError::DurationOutOfRange { duration });
    }
    Ok(())
}

fn verify_lock_period(config: &Config, start: Timestamp, end: Timestamp) -> Result<(), TxError> {
    verify_time_range(start, end)?;
    let duration = end - start;
    if !(config.min_lock_duration..=config.max_lock_duration).contains(&duration) {
        return Err(TxError::DurationOutOfRange { duration });
    }
    Ok(())
}

fn verify_subnet_auth(auth: &SubnetAuth) -> Result<(), TxError> {
    if !auth.sig_indices.windows(2).all(|pair| pair[0] < pair[1]) {
        return Err(TxError::SignatureIndicesNotSorted);
    }
    Ok(())
}

fn verify_governance(config: &Config, proposed: &UnsignedTx) -> Result<(), TxError> {
    match proposed {
        UnsignedTx::BaseFee(tx) => {
            if tx.fee == 0 {
                return Err(TxError::AmountMismatch {
                    declared: 0,
                    actual: config.tx_fee,
                });
            }
            Ok(())
        }
        UnsignedTx::AddDepositOffer(tx) => verify_deposit_offer(config, &tx.offer),
        _ => Err(TxError::NotGovernanceTx),
    }
}

fn verify_deposit_offer(config: &Config, offer: &DepositOffer) -> Result<(), TxError> {
    verify_time_range(offer.start, offer.end)?;
    if offer.min_duration == 0 || offer.min_duration > offer.max_duration {
        return Err(TxError::DurationOutOfRange {
            duration: offer.min_duration,
        });
    }
    if offer.memo.len() > config.max_memo_len {
        return Err(TxError::MemoTooLong {
            len: offer.memo.len(),
            max: config.max_memo_len,
        });
    }
    Ok(())
}
