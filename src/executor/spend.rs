/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The semantic spend check.
//!
//! Every transaction that moves value is checked by [`Spend::check`]: its inputs are resolved to
//! UTXOs, their credentials verified, and the native asset tallied per owner and per lock state.
//! A [`LockMode`] names the lock transitions the transaction may make:
//!
//! | Mode | From unlocked | Between locked states |
//! |---|---|---|
//! | `Bond` | Unlocked → Bonded | Deposited → DepositedBonded |
//! | `Deposit` | Unlocked → Deposited | Bonded → DepositedBonded |
//! | `Unbond` | Bonded → Unlocked | DepositedBonded → Deposited |
//! | `Undeposit` | Deposited → Unlocked | DepositedBonded → Bonded |
//!
//! For each owner, value moved between locked states is conserved exactly, value newly locked is
//! paid for from that owner's own unlocked inputs, and value released is returned to that owner
//! unlocked. Across owners, unlocked value consumed (plus value released) must cover unlocked value
//! produced, value newly locked, and the burn. Assets other than the native asset are never locked
//! and never burned.
//!
//! Produced locked outputs are assigned [`LockIds`]: a new lock takes the locking transaction's
//! id, and ids already held by consumed value are drawn from per-(owner, lock ids) buckets in input
//! order. A single output must fit inside one bucket.

use std::collections::BTreeMap;

use super::TxError;
use crate::{
    config::Config,
    fx::Fx,
    math,
    state::chain_state::StateData,
    types::{
        ids::{Amount, Id, Timestamp},
        outputs::{
            Input, LockIds, LockState, Output, OutputOwners, TransferInput, TransferOutput, TransferableInput,
            TransferableOutput, Utxo,
        },
        txs::Credential,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockMode {
    Bond,
    Deposit,
    Unbond,
    Undeposit,
}

impl LockMode {
    /// `[(from, to); 2]`: the transition out of or into `Unlocked` first, the transition between
    /// locked states second.
    fn transitions(self) -> [(LockState, LockState); 2] {
        use LockState::*;
        match self {
            LockMode::Bond => [(Unlocked, Bonded), (Deposited, DepositedBonded)],
            LockMode::Deposit => [(Unlocked, Deposited), (Bonded, DepositedBonded)],
            LockMode::Unbond => [(Bonded, Unlocked), (DepositedBonded, Deposited)],
            LockMode::Undeposit => [(Deposited, Unlocked), (DepositedBonded, Bonded)],
        }
    }

    fn is_locking(self) -> bool {
        matches!(self, LockMode::Bond | LockMode::Deposit)
    }

    /// `ids` with the kind of lock this mode is about held by `lock_tx_id`.
    pub(crate) fn add_lock(self, ids: LockIds, lock_tx_id: Id) -> LockIds {
        match self {
            LockMode::Bond | LockMode::Unbond => LockIds::new(ids.deposit_tx_id, Some(lock_tx_id)),
            LockMode::Deposit | LockMode::Undeposit => LockIds::new(Some(lock_tx_id), ids.bond_tx_id),
        }
    }

    /// `ids` without the kind of lock this mode is about.
    pub(crate) fn remove_lock(self, ids: LockIds) -> LockIds {
        match self {
            LockMode::Bond | LockMode::Unbond => LockIds::new(ids.deposit_tx_id, None),
            LockMode::Deposit | LockMode::Undeposit => LockIds::new(None, ids.bond_tx_id),
        }
    }

    fn held_by(self, ids: &LockIds) -> Option<Id> {
        match self {
            LockMode::Bond | LockMode::Unbond => ids.bond_tx_id,
            LockMode::Deposit | LockMode::Undeposit => ids.deposit_tx_id,
        }
    }
}

/// An input together with the UTXO it spends and that UTXO's locks.
#[derive(Clone, Debug)]
pub(crate) struct ResolvedInput<'a> {
    pub input: &'a TransferableInput,
    pub utxo: Utxo,
    pub lock_ids: LockIds,
}

/// Resolve `inputs` against the UTXOs of `data`.
pub(crate) fn resolve<'a>(data: &StateData, inputs: &'a [TransferableInput]) -> Result<Vec<ResolvedInput<'a>>, TxError> {
    inputs
        .iter()
        .map(|input| {
            let utxo_id = input.input_id();
            let utxo = data
                .utxo(&utxo_id)
                .cloned()
                .ok_or(TxError::UnknownUtxo { utxo: utxo_id })?;
            Ok(ResolvedInput {
                input,
                utxo,
                lock_ids: data.lock_ids(&utxo_id),
            })
        })
        .collect()
}

pub(crate) struct Spend<'a> {
    pub config: &'a Config,
    pub fx: &'a dyn Fx,
    pub now: Timestamp,
    pub unsigned_bytes: &'a [u8],
}

#[derive(Default)]
struct Tally {
    consumed: [u128; 4],
    produced: [u128; 4],
}

impl Tally {
    fn consumed(&self, state: LockState) -> u128 {
        self.consumed[state.index()]
    }

    fn produced(&self, state: LockState) -> u128 {
        self.produced[state.index()]
    }
}

struct Bucket {
    owner: Id,
    lock_ids: LockIds,
    remaining: u128,
}

impl Spend<'_> {
    /// Check that `inputs` may be spent into `outputs` under `mode`, burning at least `burn` of the
    /// native asset. Credentials are checked when given, one per input in order. Returns the lock
    /// ids each output is to be held under.
    pub(crate) fn check(
        &self,
        inputs: &[ResolvedInput],
        outputs: &[TransferableOutput],
        credentials: Option<&[Credential]>,
        mode: Option<LockMode>,
        lock_tx_id: Id,
        burn: Amount,
    ) -> Result<Vec<LockIds>, TxError> {
        let native = self.config.native_asset_id;
        let mut tallies: BTreeMap<Id, Tally> = BTreeMap::new();
        let mut buckets: Vec<Bucket> = Vec::new();
        let mut other_assets: BTreeMap<Id, (u128, u128)> = BTreeMap::new();

        if let Some(credentials) = credentials {
            if credentials.len() < inputs.len() {
                return Err(TxError::WrongNumberOfCredentials {
                    expected: inputs.len(),
                    actual: credentials.len(),
                });
            }
        }

        for (index, resolved) in inputs.iter().enumerate() {
            let utxo_id = resolved.input.input_id();
            if resolved.input.asset_id != resolved.utxo.asset_id {
                return Err(TxError::AssetIdMismatch {
                    expected: resolved.utxo.asset_id,
                    actual: resolved.input.asset_id,
                });
            }
            let amount = resolved.input.input.amount();
            if amount != resolved.utxo.output.amount() {
                return Err(TxError::AmountMismatch {
                    declared: amount,
                    actual: resolved.utxo.output.amount(),
                });
            }
            let state = resolved.lock_ids.state();
            if resolved.input.input.lock_state() != state {
                return Err(TxError::LockStateMismatch {
                    utxo: utxo_id,
                    expected: state,
                    actual: resolved.input.input.lock_state(),
                });
            }
            if let Some(credentials) = credentials {
                self.fx.verify_transfer(
                    self.unsigned_bytes,
                    self.now,
                    resolved.input.input.sig_indices(),
                    &credentials[index],
                    resolved.utxo.output.owners(),
                )?;
            }

            if resolved.input.asset_id != native {
                if state.is_locked() {
                    return Err(TxError::InvalidLockState { field: "input", state });
                }
                other_assets.entry(resolved.input.asset_id).or_default().0 += amount as u128;
                continue;
            }
            let owner = resolved.utxo.output.owners().owner_id();
            tallies.entry(owner).or_default().consumed[state.index()] += amount as u128;
            if state.is_locked() {
                match buckets
                    .iter_mut()
                    .find(|bucket| bucket.owner == owner && bucket.lock_ids == resolved.lock_ids)
                {
                    Some(bucket) => bucket.remaining += amount as u128,
                    None => buckets.push(Bucket {
                        owner,
                        lock_ids: resolved.lock_ids,
                        remaining: amount as u128,
                    }),
                }
            }
        }

        let mut output_lock_ids = Vec::with_capacity(outputs.len());
        for output in outputs {
            let state = output.output.lock_state();
            let amount = output.output.amount() as u128;
            if output.asset_id != native {
                if state.is_locked() {
                    return Err(TxError::InvalidLockState { field: "output", state });
                }
                other_assets.entry(output.asset_id).or_default().1 += amount;
                output_lock_ids.push(LockIds::UNLOCKED);
                continue;
            }
            let owner = output.output.owners().owner_id();
            tallies.entry(owner).or_default().produced[state.index()] += amount;
            let lock_ids = if state.is_locked() {
                assign_lock_ids(mode, state, owner, amount, &mut buckets, lock_tx_id)?
            } else {
                LockIds::UNLOCKED
            };
            output_lock_ids.push(lock_ids);
        }

        let mut available: u128 = 0;
        let mut spent: u128 = burn as u128;
        for (owner, tally) in &tallies {
            let (released, newly_locked) = check_owner(mode, *owner, tally)?;
            available += tally.consumed(LockState::Unlocked) + released;
            spent += tally.produced(LockState::Unlocked) + newly_locked;
        }
        if available < spent {
            return Err(TxError::InsufficientFunds { asset_id: native });
        }

        for (asset_id, (consumed, produced)) in other_assets {
            if consumed > produced {
                return Err(TxError::NonNativeBurn { asset_id });
            }
            if produced > consumed {
                return Err(TxError::InsufficientFunds { asset_id });
            }
        }

        Ok(output_lock_ids)
    }
}

/// Check one owner's tallies against `mode`. Returns the value the owner releases from its lock and
/// the value the owner newly locks.
fn check_owner(mode: Option<LockMode>, owner: Id, tally: &Tally) -> Result<(u128, u128), TxError> {
    use LockState::*;
    let Some(mode) = mode else {
        for state in [Deposited, Bonded, DepositedBonded] {
            if tally.consumed(state) != 0 || tally.produced(state) != 0 {
                return Err(TxError::InvalidLockTransition {
                    owner,
                    from: state,
                    to: state,
                });
            }
        }
        return Ok((0, 0));
    };

    let [(first_from, first_to), (second_from, second_to)] = mode.transitions();
    if mode.is_locking() {
        // first_from is Unlocked. Value already in the new lock's states may not be spent.
        for state in [first_to, second_to] {
            if tally.consumed(state) != 0 {
                return Err(TxError::InvalidLockTransition {
                    owner,
                    from: state,
                    to: state,
                });
            }
        }
        if tally.consumed(second_from) != tally.produced(second_from) + tally.produced(second_to) {
            return Err(TxError::InvalidLockTransition {
                owner,
                from: second_from,
                to: second_to,
            });
        }
        let newly_locked = tally.produced(first_to);
        if newly_locked > 0 && tally.consumed(first_from) < tally.produced(first_from) + newly_locked {
            return Err(TxError::InvalidLockTransition {
                owner,
                from: first_from,
                to: first_to,
            });
        }
        Ok((0, newly_locked))
    } else {
        // first_to is Unlocked. Value may only leave the lock being released.
        for state in [first_from, second_from] {
            if tally.produced(state) != 0 {
                return Err(TxError::InvalidLockTransition {
                    owner,
                    from: state,
                    to: state,
                });
            }
        }
        if tally.consumed(second_to) != 0 {
            return Err(TxError::InvalidLockTransition {
                owner,
                from: second_to,
                to: second_to,
            });
        }
        if tally.produced(second_to) != tally.consumed(second_from) {
            return Err(TxError::InvalidLockTransition {
                owner,
                from: second_from,
                to: second_to,
            });
        }
        let released = tally.consumed(first_from);
        if tally.produced(first_to) < released {
            return Err(TxError::InvalidLockTransition {
                owner,
                from: first_from,
                to: first_to,
            });
        }
        Ok((released, 0))
    }
}

fn assign_lock_ids(
    mode: Option<LockMode>,
    to: LockState,
    owner: Id,
    amount: u128,
    buckets: &mut [Bucket],
    lock_tx_id: Id,
) -> Result<LockIds, TxError> {
    let Some(mode) = mode else {
        return Err(TxError::InvalidLockTransition {
            owner,
            from: LockState::Unlocked,
            to,
        });
    };
    let [(_, first_to), (second_from, second_to)] = mode.transitions();
    if mode.is_locking() {
        if to == first_to {
            Ok(mode.add_lock(LockIds::UNLOCKED, lock_tx_id))
        } else if to == second_to {
            draw(buckets, owner, second_from, to, amount).map(|ids| mode.add_lock(ids, lock_tx_id))
        } else if to == second_from {
            draw(buckets, owner, second_from, to, amount)
        } else {
            Err(TxError::InvalidLockTransition {
                owner,
                from: LockState::Unlocked,
                to,
            })
        }
    } else if to == second_to {
        draw(buckets, owner, second_from, to, amount).map(|ids| mode.remove_lock(ids))
    } else {
        Err(TxError::InvalidLockTransition {
            owner,
            from: second_from,
            to,
        })
    }
}

/// Take `amount` from the first bucket of `owner` in state `from` that holds enough.
fn draw(buckets: &mut [Bucket], owner: Id, from: LockState, to: LockState, amount: u128) -> Result<LockIds, TxError> {
    let bucket = buckets
        .iter_mut()
        .find(|bucket| bucket.owner == owner && bucket.lock_ids.state() == from && bucket.remaining >= amount)
        .ok_or(TxError::InvalidLockTransition { owner, from, to })?;
    bucket.remaining -= amount;
    Ok(bucket.lock_ids)
}

/// The outputs a locking transaction produces when its proposal is aborted: every output taken out
/// of the lock the transaction would have created, and outputs that then coincide merged.
pub(crate) fn revert_locks(
    mode: LockMode,
    lock_tx_id: Id,
    outputs: &[TransferableOutput],
    lock_ids: &[LockIds],
) -> Result<(Vec<TransferableOutput>, Vec<LockIds>), TxError> {
    let mut merged: BTreeMap<(Id, OutputOwners, LockIds), Amount> = BTreeMap::new();
    for (output, ids) in outputs.iter().zip(lock_ids) {
        let reverted = if mode.held_by(ids) == Some(lock_tx_id) {
            mode.remove_lock(*ids)
        } else {
            *ids
        };
        let amount = merged
            .entry((output.asset_id, output.output.owners().clone(), reverted))
            .or_insert(0);
        *amount = math::add(*amount, output.output.amount())?;
    }
    Ok(merged
        .into_iter()
        .map(|((asset_id, owners, ids), amount)| {
            let output = TransferableOutput::new(
                asset_id,
                Output::with_state(ids.state(), TransferOutput::new(amount, owners)),
            );
            (output, ids)
        })
        .unzip())
}

/// The inputs and outputs that release every UTXO `lock_tx_id` holds in the lock `mode` is about.
/// Inputs are ordered by UTXO id; the `i`-th output returns the value of the `i`-th input with the
/// lock removed.
pub(crate) fn unlock(
    data: &StateData,
    lock_tx_id: &Id,
    mode: LockMode,
) -> Result<(Vec<TransferableInput>, Vec<TransferableOutput>), TxError> {
    let utxo_ids = match mode {
        LockMode::Bond | LockMode::Unbond => data.lock_states().bonded_utxos(lock_tx_id),
        LockMode::Deposit | LockMode::Undeposit => data.lock_states().deposited_utxos(lock_tx_id),
    };
    let mut utxos = utxo_ids
        .iter()
        .map(|id| data.utxo(id).ok_or(TxError::UnknownUtxo { utxo: *id }))
        .collect::<Result<Vec<&Utxo>, TxError>>()?;
    utxos.sort_by_key(|utxo| utxo.utxo_id);

    let mut ins = Vec::with_capacity(utxos.len());
    let mut outs = Vec::with_capacity(utxos.len());
    for utxo in utxos {
        let ids = data.lock_ids(&utxo.input_id());
        ins.push(TransferableInput {
            utxo_id: utxo.utxo_id,
            asset_id: utxo.asset_id,
            input: Input::with_state(
                ids.state(),
                TransferInput {
                    amount: utxo.output.amount(),
                    sig_indices: Vec::new(),
                },
            ),
        });
        outs.push(TransferableOutput::new(
            utxo.asset_id,
            Output::with_state(mode.remove_lock(ids).state(), utxo.output.inner().clone()),
        ));
    }
    Ok((ins, outs))
}
