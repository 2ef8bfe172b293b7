/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Outputs, inputs and UTXOs.
//!
//! An [`Output`] is either a plain [`TransferOutput`] or a [`LockedOutput`] that wraps a transfer
//! output together with the [`LockState`] it is in. Locked outputs cannot nest: the inner value of a
//! `LockedOutput` is always a `TransferOutput`. Inputs mirror outputs: a [`LockedInput`] spends a
//! UTXO in the named lock state.
//!
//! The lock state an output carries says *what kind* of lock holds it. *Which* transaction holds the
//! lock is kept in the lock-state store as [`LockIds`], keyed by the UTXO's input id.

use borsh::{BorshDeserialize, BorshSerialize};

use super::{
    crypto_primitives::{CryptoHasher, Digest},
    ids::{Amount, Id, ShortId, Timestamp},
};

/// The owners of an output: `threshold` of the `addrs` must sign to spend it, and not before
/// `locktime`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct OutputOwners {
    pub locktime: Timestamp,
    pub threshold: u32,
    pub addrs: Vec<ShortId>,
}

impl OutputOwners {
    pub fn new(locktime: Timestamp, threshold: u32, addrs: Vec<ShortId>) -> Self {
        Self {
            locktime,
            threshold,
            addrs,
        }
    }

    /// Owners made up of a single address with no locktime.
    pub fn single(addr: ShortId) -> Self {
        Self::new(0, 1, vec![addr])
    }

    /// Whether the owners are well formed: the threshold does not exceed the number of addresses,
    /// the addresses are sorted and unique, and a zero threshold comes with no addresses.
    pub fn is_well_formed(&self) -> bool {
        self.threshold as usize <= self.addrs.len()
            && self.addrs.windows(2).all(|pair| pair[0] < pair[1])
            && (self.threshold != 0 || self.addrs.is_empty())
    }

    /// Digest identifying this set of owners. Two outputs with equal owners have equal owner ids.
    pub fn owner_id(&self) -> Id {
        let mut hasher = CryptoHasher::new();
        hasher.update(self.locktime.to_be_bytes());
        hasher.update(self.threshold.to_be_bytes());
        hasher.update((self.addrs.len() as u32).to_be_bytes());
        for addr in &self.addrs {
            hasher.update(addr.as_slice());
        }
        Id::new(hasher.finalize().into())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct TransferOutput {
    pub amount: Amount,
    pub owners: OutputOwners,
}

impl TransferOutput {
    pub fn new(amount: Amount, owners: OutputOwners) -> Self {
        Self { amount, owners }
    }
}

/// The kind of lock a UTXO is held by. Encodes as a single byte in `0..=3`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub enum LockState {
    Unlocked,
    Deposited,
    Bonded,
    DepositedBonded,
}

impl LockState {
    pub const ALL: [LockState; 4] = [
        LockState::Unlocked,
        LockState::Deposited,
        LockState::Bonded,
        LockState::DepositedBonded,
    ];

    pub fn is_deposited(&self) -> bool {
        matches!(self, LockState::Deposited | LockState::DepositedBonded)
    }

    pub fn is_bonded(&self) -> bool {
        matches!(self, LockState::Bonded | LockState::DepositedBonded)
    }

    pub fn is_locked(&self) -> bool {
        *self != LockState::Unlocked
    }

    pub fn from_flags(deposited: bool, bonded: bool) -> Self {
        match (deposited, bonded) {
            (false, false) => LockState::Unlocked,
            (true, false) => LockState::Deposited,
            (false, true) => LockState::Bonded,
            (true, true) => LockState::DepositedBonded,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            LockState::Unlocked => 0,
            LockState::Deposited => 1,
            LockState::Bonded => 2,
            LockState::DepositedBonded => 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct LockedOutput {
    pub state: LockState,
    pub inner: TransferOutput,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub enum Output {
    Transfer(TransferOutput),
    Locked(LockedOutput),
}

impl Output {
    /// An output holding `inner` in `state`: a plain transfer output when `state` is
    /// [`LockState::Unlocked`], a locked output otherwise.
    pub fn with_state(state: LockState, inner: TransferOutput) -> Output {
        match state {
            LockState::Unlocked => Output::Transfer(inner),
            state => Output::Locked(LockedOutput { state, inner }),
        }
    }

    pub fn inner(&self) -> &TransferOutput {
        match self {
            Output::Transfer(inner) => inner,
            Output::Locked(locked) => &locked.inner,
        }
    }

    pub fn amount(&self) -> Amount {
        self.inner().amount
    }

    pub fn owners(&self) -> &OutputOwners {
        &self.inner().owners
    }

    pub fn lock_state(&self) -> LockState {
        match self {
            Output::Transfer(_) => LockState::Unlocked,
            Output::Locked(locked) => locked.state,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct TransferInput {
    pub amount: Amount,
    /// Indices into the owners' addresses of the keys that signed. Strictly increasing.
    pub sig_indices: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct LockedInput {
    pub state: LockState,
    pub inner: TransferInput,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub enum Input {
    Transfer(TransferInput),
    Locked(LockedInput),
}

impl Input {
    pub fn with_state(state: LockState, inner: TransferInput) -> Input {
        match state {
            LockState::Unlocked => Input::Transfer(inner),
            state => Input::Locked(LockedInput { state, inner }),
        }
    }

    pub fn inner(&self) -> &TransferInput {
        match self {
            Input::Transfer(inner) => inner,
            Input::Locked(locked) => &locked.inner,
        }
    }

    pub fn amount(&self) -> Amount {
        self.inner().amount
    }

    pub fn sig_indices(&self) -> &[u32] {
        &self.inner().sig_indices
    }

    pub fn lock_state(&self) -> LockState {
        match self {
            Input::Transfer(_) => LockState::Unlocked,
            Input::Locked(locked) => locked.state,
        }
    }
}

/// Names an output of an accepted transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct UtxoId {
    pub tx_id: Id,
    pub output_index: u32,
}

impl UtxoId {
    pub fn new(tx_id: Id, output_index: u32) -> Self {
        Self {
            tx_id,
            output_index,
        }
    }

    /// The key this UTXO is stored under: `sha256(tx_id ‖ output_index)`.
    pub fn input_id(&self) -> Id {
        self.tx_id.prefixed(self.output_index)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct TransferableInput {
    pub utxo_id: UtxoId,
    pub asset_id: Id,
    pub input: Input,
}

impl TransferableInput {
    pub fn input_id(&self) -> Id {
        self.utxo_id.input_id()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct TransferableOutput {
    pub asset_id: Id,
    pub output: Output,
}

impl TransferableOutput {
    pub fn new(asset_id: Id, output: Output) -> Self {
        Self { asset_id, output }
    }
}

/// Sort outputs into the canonical order transactions must carry them in.
pub fn sort_outputs(outputs: &mut [TransferableOutput]) {
    outputs.sort();
}

/// Whether `outputs` are in canonical order with no duplicates.
pub fn is_sorted_and_unique(outputs: &[TransferableOutput]) -> bool {
    outputs.windows(2).all(|pair| pair[0] < pair[1])
}

/// An unspent output.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Utxo {
    pub utxo_id: UtxoId,
    pub asset_id: Id,
    pub output: Output,
}

impl Utxo {
    pub fn input_id(&self) -> Id {
        self.utxo_id.input_id()
    }
}

/// The transactions holding locks on a UTXO. A `None` field means the UTXO is not held by a lock
/// of that kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct LockIds {
    pub deposit_tx_id: Option<Id>,
    pub bond_tx_id: Option<Id>,
}

impl LockIds {
    pub const UNLOCKED: LockIds = LockIds {
        deposit_tx_id: None,
        bond_tx_id: None,
    };

    pub fn new(deposit_tx_id: Option<Id>, bond_tx_id: Option<Id>) -> Self {
        Self {
            deposit_tx_id,
            bond_tx_id,
        }
    }

    pub fn state(&self) -> LockState {
        LockState::from_flags(self.deposit_tx_id.is_some(), self.bond_tx_id.is_some())
    }

    pub fn is_unlocked(&self) -> bool {
        self.deposit_tx_id.is_none() && self.bond_tx_id.is_none()
    }
}
