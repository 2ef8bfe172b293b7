/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The chain state and its committed, persisted form.
//!
//! [`StateData`] holds every part of the chain state. Each part records the changes made to it
//! since it was last forked, so a [`Diff`](super::diff::Diff) can be flushed to storage by writing
//! only those changes. [`ChainState`] is the committed state: it owns the user's key-value store and
//! is the root every diff is ultimately applied to.

use borsh::{BorshDeserialize, BorshSerialize};
use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
};

use super::{
    diff::Diff,
    lock_states::LockStateStore,
    pluggables::{KVGetError, KVStore, WriteBatch},
    registry::{Lock, Proposal, Registry, RegistryEntry, SortBy, Staker, StakerTx},
    table::Table,
    utxos::{UtxoError, UtxoSet},
    variables,
    write_batch::{KVSetError, StateWriteBatch},
};
use crate::{
    codec::{Codec, CodecError},
    config::Config,
    reward,
    types::{
        block::Block,
        ids::{Amount, Id, Timestamp},
        outputs::{LockIds, LockState, OutputOwners, Utxo, UtxoId},
        txs::{AddValidatorTx, DepositOffer, Tx, UnsignedTx},
    },
};

/// Read access shared by the committed state and every diff layered on it.
pub trait Chain {
    fn data(&self) -> &StateData;

    /// Changes every time a diff is applied onto this chain. A diff may only be applied onto the
    /// chain whose version it was created from.
    fn version(&self) -> u64;
}

/// The outcome recorded for an accepted transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum TxStatus {
    Committed,
    Aborted,
}

impl TxStatus {
    pub fn to_byte(self) -> u8 {
        match self {
            TxStatus::Committed => 1,
            TxStatus::Aborted => 2,
        }
    }

    pub fn from_byte(byte: u8) -> Option<TxStatus> {
        match byte {
            1 => Some(TxStatus::Committed),
            2 => Some(TxStatus::Aborted),
            _ => None,
        }
    }
}

/// A chain created on a subnet.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ChainRecord {
    pub subnet_id: Id,
    pub name: String,
    pub vm_id: Id,
    pub fx_ids: Vec<Id>,
}

#[derive(Clone, Debug)]
pub struct StateData {
    timestamp: Timestamp,
    current_supply: Amount,
    base_fee: Amount,
    utxos: UtxoSet,
    lock_states: LockStateStore,
    current_stakers: Registry<Staker>,
    pending_stakers: Registry<Staker>,
    current_locks: Registry<Lock>,
    pending_locks: Registry<Lock>,
    proposals: Registry<Proposal>,
    subnets: Table<Id, OutputOwners>,
    chains: Table<Id, ChainRecord>,
    deposit_offers: Table<Id, DepositOffer>,
    tx_statuses: Table<Id, TxStatus>,
    added_txs: BTreeMap<Id, Tx>,
}

impl StateData {
    pub(crate) fn new(timestamp: Timestamp, current_supply: Amount, base_fee: Amount) -> Self {
        Self {
            timestamp,
            current_supply,
            base_fee,
            utxos: UtxoSet::new(),
            lock_states: LockStateStore::new(),
            current_stakers: Registry::new(SortBy::End),
            pending_stakers: Registry::new(SortBy::Start),
            current_locks: Registry::new(SortBy::End),
            pending_locks: Registry::new(SortBy::Start),
            proposals: Registry::new(SortBy::End),
            subnets: Table::new(),
            chains: Table::new(),
            deposit_offers: Table::new(),
            tx_statuses: Table::new(),
            added_txs: BTreeMap::new(),
        }
    }

    /* ↓↓↓ Getters ↓↓↓ */

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn current_supply(&self) -> Amount {
        self.current_supply
    }

    pub fn base_fee(&self) -> Amount {
        self.base_fee
    }

    pub fn utxos(&self) -> &UtxoSet {
        &self.utxos
    }

    pub fn utxo(&self, id: &Id) -> Option<&Utxo> {
        self.utxos.get(id)
    }

    pub fn lock_states(&self) -> &LockStateStore {
        &self.lock_states
    }

    pub fn lock_ids(&self, utxo_id: &Id) -> LockIds {
        self.lock_states.get(utxo_id)
    }

    pub fn current_stakers(&self) -> &Registry<Staker> {
        &self.current_stakers
    }

    pub fn pending_stakers(&self) -> &Registry<Staker> {
        &self.pending_stakers
    }

    pub fn current_locks(&self) -> &Registry<Lock> {
        &self.current_locks
    }

    pub fn pending_locks(&self) -> &Registry<Lock> {
        &self.pending_locks
    }

    pub fn proposals(&self) -> &Registry<Proposal> {
        &self.proposals
    }

    pub fn subnet_owner(&self, subnet_id: &Id) -> Option<&OutputOwners> {
        self.subnets.get(subnet_id)
    }

    pub fn chain(&self, chain_id: &Id) -> Option<&ChainRecord> {
        self.chains.get(chain_id)
    }

    pub fn deposit_offer(&self, offer_id: &Id) -> Option<&DepositOffer> {
        self.deposit_offers.get(offer_id)
    }

    pub fn deposit_offers(&self) -> impl Iterator<Item = (&Id, &DepositOffer)> {
        self.deposit_offers.keys().zip(self.deposit_offers.values())
    }

    pub fn tx_status(&self, tx_id: &Id) -> Option<TxStatus> {
        self.tx_statuses.get(tx_id).copied()
    }

    /// Number of validators of the primary network currently validating.
    pub fn primary_validator_count(&self) -> usize {
        self.current_stakers
            .iter()
            .filter(|staker| matches!(staker.tx, StakerTx::Primary(_)))
            .count()
    }

    /// The earliest time at which a staker, lock or proposal changes status: the next pending
    /// staker or lock start, or the next current staker, lock or proposal end.
    pub fn next_event_time(&self) -> Option<Timestamp> {
        [
            self.pending_stakers.get_next().map(RegistryEntry::start_time),
            self.current_stakers.get_next().map(RegistryEntry::end_time),
            self.pending_locks.get_next().map(RegistryEntry::start_time),
            self.current_locks.get_next().map(RegistryEntry::end_time),
            self.proposals.get_next().map(RegistryEntry::end_time),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /* ↓↓↓ Setters ↓↓↓ */

    pub(crate) fn set_timestamp(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    pub(crate) fn set_current_supply(&mut self, supply: Amount) {
        self.current_supply = supply;
    }

    pub(crate) fn set_base_fee(&mut self, fee: Amount) {
        self.base_fee = fee;
    }

    pub(crate) fn add_utxo(&mut self, utxo: Utxo) -> Result<(), UtxoError> {
        self.utxos.add(utxo)
    }

    pub(crate) fn delete_utxo(&mut self, id: &Id) -> Result<Utxo, UtxoError> {
        self.utxos.delete(id)
    }

    pub(crate) fn update_lock_states(&mut self, changes: &BTreeMap<Id, LockIds>) {
        if !changes.is_empty() {
            self.lock_states = self.lock_states.update_lock_state(changes);
        }
    }

    pub(crate) fn set_current_stakers(&mut self, registry: Registry<Staker>) {
        self.current_stakers = registry;
    }

    pub(crate) fn set_pending_stakers(&mut self, registry: Registry<Staker>) {
        self.pending_stakers = registry;
    }

    pub(crate) fn set_current_locks(&mut self, registry: Registry<Lock>) {
        self.current_locks = registry;
    }

    pub(crate) fn set_pending_locks(&mut self, registry: Registry<Lock>) {
        self.pending_locks = registry;
    }

    pub(crate) fn set_proposals(&mut self, registry: Registry<Proposal>) {
        self.proposals = registry;
    }

    pub(crate) fn add_subnet(&mut self, subnet_id: Id, owner: OutputOwners) {
        self.subnets.insert(subnet_id, owner);
    }

    pub(crate) fn add_chain(&mut self, chain_id: Id, record: ChainRecord) {
        self.chains.insert(chain_id, record);
    }

    pub(crate) fn add_deposit_offer(&mut self, offer_id: Id, offer: DepositOffer) {
        self.deposit_offers.insert(offer_id, offer);
    }

    pub(crate) fn add_tx(&mut self, tx_id: Id, tx: Tx, status: TxStatus) {
        self.tx_statuses.insert(tx_id, status);
        self.added_txs.insert(tx_id, tx);
    }

    /* ↓↓↓ Layering ↓↓↓ */

    /// A copy of this state that records only the changes made to it from now on.
    pub(crate) fn fork(&self) -> StateData {
        let mut child = self.clone();
        child.clear_deltas();
        child
    }

    pub(crate) fn clear_deltas(&mut self) {
        self.utxos.clear_delta();
        self.lock_states.clear_delta();
        self.current_stakers.clear_delta();
        self.pending_stakers.clear_delta();
        self.current_locks.clear_delta();
        self.pending_locks.clear_delta();
        self.proposals.clear_delta();
        self.subnets.clear_delta();
        self.chains.clear_delta();
        self.deposit_offers.clear_delta();
        self.tx_statuses.clear_delta();
        self.added_txs.clear();
    }

    /// Replace this state with `child`, a fork of it, keeping the changes recorded by both.
    pub(crate) fn absorb(&mut self, mut child: StateData) {
        child.utxos.rebase_delta(&self.utxos);
        child.lock_states.rebase_delta(&self.lock_states);
        child.current_stakers.rebase_delta(&self.current_stakers);
        child.pending_stakers.rebase_delta(&self.pending_stakers);
        child.current_locks.rebase_delta(&self.current_locks);
        child.pending_locks.rebase_delta(&self.pending_locks);
        child.proposals.rebase_delta(&self.proposals);
        child.subnets.rebase_delta(self.subnets.delta());
        child.chains.rebase_delta(self.chains.delta());
        child.deposit_offers.rebase_delta(self.deposit_offers.delta());
        child.tx_statuses.rebase_delta(self.tx_statuses.delta());
        let mut added_txs = std::mem::take(&mut self.added_txs);
        added_txs.append(&mut child.added_txs);
        child.added_txs = added_txs;
        *self = child;
    }

    /// Write every recorded change, and the metadata, into `wb`.
    pub(crate) fn write_deltas<W: super::pluggables::WriteBatch>(
        &self,
        wb: &mut StateWriteBatch<W>,
    ) -> Result<(), KVSetError> {
        for (id, utxo) in self.utxos.delta().inserts() {
            wb.set_entry(&variables::UTXOS, id, utxo)?;
        }
        for id in self.utxos.delta().deletes() {
            wb.delete_entry(&variables::UTXOS, id)?;
        }
        for (id, lock_ids) in self.lock_states.delta().inserts() {
            wb.set_entry(&variables::LOCK_STATES, id, lock_ids)?;
        }
        for id in self.lock_states.delta().deletes() {
            wb.delete_entry(&variables::LOCK_STATES, id)?;
        }
        write_registry(wb, &variables::CURRENT_STAKERS, &self.current_stakers)?;
        write_registry(wb, &variables::PENDING_STAKERS, &self.pending_stakers)?;
        write_registry(wb, &variables::CURRENT_LOCKS, &self.current_locks)?;
        write_registry(wb, &variables::PENDING_LOCKS, &self.pending_locks)?;
        write_registry(wb, &variables::PROPOSALS, &self.proposals)?;
        write_table(wb, &variables::SUBNETS, &self.subnets)?;
        write_table(wb, &variables::CHAINS, &self.chains)?;
        write_table(wb, &variables::DEPOSIT_OFFERS, &self.deposit_offers)?;
        for (tx_id, tx) in &self.added_txs {
            if let Some(status) = self.tx_status(tx_id) {
                wb.set_tx(tx_id, tx, status)?;
            }
        }
        wb.set_timestamp(self.timestamp)?;
        wb.set_current_supply(self.current_supply)?;
        wb.set_base_fee(self.base_fee)
    }
}

fn write_registry<W, E>(wb: &mut StateWriteBatch<W>, prefix: &[u8; 1], registry: &Registry<E>) -> Result<(), KVSetError>
where
    W: super::pluggables::WriteBatch,
    E: RegistryEntry + BorshSerialize,
    E::Key: BorshSerialize,
{
    for (key, entry) in registry.delta().inserts() {
        wb.set_entry(prefix, key, entry)?;
    }
    for key in registry.delta().deletes() {
        wb.delete_entry(prefix, key)?;
    }
    Ok(())
}

fn write_table<W, K, V>(wb: &mut StateWriteBatch<W>, prefix: &[u8; 1], table: &Table<K, V>) -> Result<(), KVSetError>
where
    W: super::pluggables::WriteBatch,
    K: Ord + Clone + BorshSerialize,
    V: Clone + BorshSerialize,
{
    for (key, value) in table.delta().inserts() {
        wb.set_entry(prefix, key, value)?;
    }
    for key in table.delta().deletes() {
        wb.delete_entry(prefix, key)?;
    }
    Ok(())
}

/// Initial allocation of the chain.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Genesis {
    pub timestamp: Timestamp,
    /// Unlocked outputs, created as outputs of a transaction whose id is the genesis id.
    pub allocations: Vec<(Id, crate::types::outputs::TransferOutput)>,
    /// Validators that are current from the genesis timestamp. Their bond outputs are created
    /// bonded by the validator transaction.
    pub validators: Vec<AddValidatorTx>,
    pub deposit_offers: Vec<DepositOffer>,
    pub message: Vec<u8>,
}

impl Genesis {
    pub fn id(&self) -> Result<Id, CodecError> {
        Codec::genesis().hash(self)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        Codec::genesis().encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Genesis, CodecError> {
        Codec::genesis().decode(bytes)
    }

    /// The state the chain starts in.
    pub fn state(&self, config: &Config) -> Result<StateData, StateError> {
        let genesis_id = self.id()?;
        let mut data = StateData::new(self.timestamp, 0, config.tx_fee);
        let mut supply: Amount = 0;

        for (index, (asset_id, output)) in self.allocations.iter().enumerate() {
            data.add_utxo(Utxo {
                utxo_id: UtxoId::new(genesis_id, index as u32),
                asset_id: *asset_id,
                output: crate::types::outputs::Output::Transfer(output.clone()),
            })?;
            if *asset_id == config.native_asset_id {
                supply = supply.checked_add(output.amount).ok_or(StateError::Overflow)?;
            }
        }

        let mut lock_changes = BTreeMap::new();
        let mut stakers = Vec::new();
        for validator_tx in &self.validators {
            if !(validator_tx.validator.start <= self.timestamp && self.timestamp < validator_tx.validator.end) {
                return Err(StateError::InvalidGenesis {
                    reason: "genesis validator is not current at the genesis timestamp",
                });
            }
            let tx = Tx::system(UnsignedTx::AddValidator(validator_tx.clone()));
            let tx_id = tx.id()?;
            let outputs = validator_tx.base.outs.iter().chain(validator_tx.bond.iter());
            for (index, out) in outputs.enumerate() {
                let utxo_id = UtxoId::new(tx_id, index as u32);
                let state = out.output.lock_state();
                if index >= validator_tx.base.outs.len() {
                    if state != LockState::Bonded {
                        return Err(StateError::InvalidGenesis {
                            reason: "genesis validator bond output is not bonded",
                        });
                    }
                    lock_changes.insert(utxo_id.input_id(), LockIds::new(None, Some(tx_id)));
                } else if state.is_locked() {
                    return Err(StateError::InvalidGenesis {
                        reason: "genesis validator change output is locked",
                    });
                }
                data.add_utxo(Utxo {
                    utxo_id,
                    asset_id: out.asset_id,
                    output: out.output.clone(),
                })?;
                if out.asset_id == config.native_asset_id {
                    supply = supply.checked_add(out.output.amount()).ok_or(StateError::Overflow)?;
                }
            }
            stakers.push((tx_id, tx, validator_tx));
        }
        data.update_lock_states(&lock_changes);

        for (tx_id, tx, validator_tx) in stakers {
            let potential_reward = reward::stake_reward(
                &config.stake_reward,
                validator_tx.validator.weight,
                validator_tx.validator.duration(),
                supply,
            );
            let staker = Staker {
                tx_id,
                tx: StakerTx::Primary(validator_tx.clone()),
                potential_reward,
            };
            let registry = data
                .current_stakers
                .add(staker)
                .map_err(|_| StateError::InvalidGenesis {
                    reason: "genesis validators repeat a node id",
                })?;
            data.set_current_stakers(registry);
            supply = supply.checked_add(potential_reward).ok_or(StateError::Overflow)?;
            data.add_tx(tx_id, tx, TxStatus::Committed);
        }

        for offer in &self.deposit_offers {
            data.add_deposit_offer(offer.id()?, offer.clone());
        }
        data.set_current_supply(supply);
        Ok(data)
    }
}

/// The writes of one accepted block, built by [`ChainState::prepare_accept`].
pub(crate) struct PreparedAccept<W: WriteBatch> {
    wb: StateWriteBatch<W>,
    block_id: Id,
    height: u64,
}

/// The committed chain state, persisted in the user's key-value store.
pub struct ChainState<K: KVStore> {
    kv: K,
    data: StateData,
    version: u64,
    last_accepted: Id,
    last_accepted_height: u64,
}

impl<K: KVStore> ChainState<K> {
    /// Write the genesis state into an empty `kv` and open it.
    pub fn initialize(mut kv: K, config: &Config, genesis: &Genesis) -> Result<Self, StateError> {
        if kv.timestamp()?.is_some() {
            return Err(StateError::AlreadyInitialized);
        }
        let genesis_id = genesis.id()?;
        let data = genesis.state(config)?;

        let mut wb = StateWriteBatch::new();
        data.write_deltas(&mut wb)?;
        wb.set_last_accepted(&genesis_id, 0)?;
        kv.write(wb.into_inner());

        let mut data = data;
        data.clear_deltas();
        log::info!(
            "Initialized chain state at genesis {} with {} UTXOs and {} validators",
            genesis_id,
            data.utxos().len(),
            data.current_stakers().len()
        );
        Ok(Self {
            kv,
            data,
            version: 0,
            last_accepted: genesis_id,
            last_accepted_height: 0,
        })
    }

    /// Open a `kv` written by [`initialize`](Self::initialize), rebuilding every in-memory index.
    pub fn load(kv: K) -> Result<Self, StateError> {
        let timestamp = kv.timestamp()?.ok_or(StateError::NotInitialized)?;
        let mut data = StateData::new(timestamp, kv.current_supply()?, kv.base_fee()?);

        for (_, utxo) in kv.entries::<Id, Utxo>(&variables::UTXOS)? {
            data.add_utxo(utxo)?;
        }
        let lock_changes: BTreeMap<Id, LockIds> = kv
            .entries::<Id, LockIds>(&variables::LOCK_STATES)?
            .into_iter()
            .collect();
        data.update_lock_states(&lock_changes);

        data.current_stakers = load_registry(&kv, &variables::CURRENT_STAKERS, SortBy::End)?;
        data.pending_stakers = load_registry(&kv, &variables::PENDING_STAKERS, SortBy::Start)?;
        data.current_locks = load_registry(&kv, &variables::CURRENT_LOCKS, SortBy::End)?;
        data.pending_locks = load_registry(&kv, &variables::PENDING_LOCKS, SortBy::Start)?;
        data.proposals = load_registry(&kv, &variables::PROPOSALS, SortBy::End)?;

        for (subnet_id, owner) in kv.entries::<Id, OutputOwners>(&variables::SUBNETS)? {
            data.add_subnet(subnet_id, owner);
        }
        for (chain_id, record) in kv.entries::<Id, ChainRecord>(&variables::CHAINS)? {
            data.add_chain(chain_id, record);
        }
        for (offer_id, offer) in kv.entries::<Id, DepositOffer>(&variables::DEPOSIT_OFFERS)? {
            data.add_deposit_offer(offer_id, offer);
        }
        for (tx_id, status) in kv.tx_statuses()? {
            data.tx_statuses.insert(tx_id, status);
        }
        data.clear_deltas();

        let last_accepted = kv.last_accepted()?;
        let last_accepted_height = kv.last_accepted_height()?;
        log::info!(
            "Loaded chain state at block {} (height {}), chain time {}",
            last_accepted,
            last_accepted_height,
            timestamp
        );
        Ok(Self {
            kv,
            data,
            version: 0,
            last_accepted,
            last_accepted_height,
        })
    }

    pub fn last_accepted(&self) -> Id {
        self.last_accepted
    }

    pub fn last_accepted_height(&self) -> u64 {
        self.last_accepted_height
    }

    /// Build everything accepting `block` writes to the key-value store, on top of `diff` if the
    /// block changes state. Leaves `self` untouched, so a failure here or before
    /// [`finish_accept`](Self::finish_accept) loses nothing.
    pub(crate) fn prepare_accept(
        &self,
        diff: Option<&Diff>,
        block_id: &Id,
        block: &Block,
    ) -> Result<PreparedAccept<K::WriteBatch>, StateError> {
        let mut wb = StateWriteBatch::new();
        if let Some(diff) = diff {
            diff.check_applicable(self.version)?;
            diff.data().write_deltas(&mut wb)?;
        }
        wb.set_block(block_id, block)?;
        wb.set_last_accepted(block_id, block.height())?;
        Ok(PreparedAccept {
            wb,
            block_id: *block_id,
            height: block.height(),
        })
    }

    /// Write `prepared` as one batch and make `diff` the committed state. `diff` must be the one
    /// `prepared` was built from.
    pub(crate) fn finish_accept(&mut self, prepared: PreparedAccept<K::WriteBatch>, diff: Option<&mut Diff>) {
        if let Some(diff) = diff {
            let mut data = diff.data().clone();
            data.clear_deltas();
            self.data = data;
            self.version = diff.version();
            diff.mark_applied();
        }
        self.last_accepted = prepared.block_id;
        self.last_accepted_height = prepared.height;
        self.kv.write(prepared.wb.into_inner());
    }

    pub fn tx(&self, tx_id: &Id) -> Result<Option<(Tx, TxStatus)>, StateError> {
        Ok(self.kv.tx(tx_id)?)
    }

    pub fn block(&self, block_id: &Id) -> Result<Option<Block>, StateError> {
        Ok(self.kv.block(block_id)?)
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }
}

impl<K: KVStore> Chain for ChainState<K> {
    fn data(&self) -> &StateData {
        &self.data
    }

    fn version(&self) -> u64 {
        self.version
    }
}

fn load_registry<K, E>(kv: &K, prefix: &[u8; 1], sort_by: SortBy) -> Result<Registry<E>, StateError>
where
    K: KVStore,
    E: RegistryEntry + BorshDeserialize,
    E::Key: BorshDeserialize,
{
    let mut registry = Registry::new(sort_by);
    for (_, entry) in kv.entries::<E::Key, E>(prefix)? {
        registry = registry
            .add(entry)
            .map_err(|_| StateError::DuplicateEntry { prefix: prefix[0] })?;
    }
    Ok(registry)
}

/// Errors that may be encountered when reading, writing or layering the chain state.
#[derive(Debug)]
pub enum StateError {
    /// Error when trying to get a value from the underlying [key value store][KVStore].
    KVGetError(KVGetError),

    /// Error when trying to set a value into the underlying key value store.
    KVSetError(KVSetError),

    Codec(CodecError),

    Utxo(UtxoError),

    /// The key-value store holds no chain state.
    NotInitialized,

    AlreadyInitialized,

    InvalidGenesis { reason: &'static str },

    /// A stored registry holds two entries with one key.
    DuplicateEntry { prefix: u8 },

    /// The diff has already been applied once.
    DiffAlreadyApplied,

    /// The diff was not created from the current version of the chain it is applied onto.
    StaleParent { expected: u64, found: u64 },

    Overflow,
}

impl Display for StateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StateError::KVGetError(err) => write!(f, "{}", err),
            StateError::KVSetError(err) => write!(f, "{}", err),
            StateError::Codec(err) => write!(f, "{}", err),
            StateError::Utxo(err) => write!(f, "{}", err),
            StateError::NotInitialized => write!(f, "chain state is not initialized"),
            StateError::AlreadyInitialized => write!(f, "chain state is already initialized"),
            StateError::InvalidGenesis { reason } => write!(f, "invalid genesis: {}", reason),
            StateError::DuplicateEntry { prefix } => {
                write!(f, "duplicate entry under prefix '{}'", *prefix as char)
            }
            StateError::DiffAlreadyApplied => write!(f, "diff has already been applied"),
            StateError::StaleParent { expected, found } => write!(
                f,
                "diff was built on version {} but the chain is at version {}",
                expected, found
            ),
            StateError::Overflow => write!(f, "supply overflow"),
        }
    }
}

impl std::error::Error for StateError {}

impl From<KVGetError> for StateError {
    fn from(value: KVGetError) -> Self {
        StateError::KVGetError(value)
    }
}

impl From<KVSetError> for StateError {
    fn from(value: KVSetError) -> Self {
        StateError::KVSetError(value)
    }
}

impl From<CodecError> for StateError {
    fn from(value: CodecError) -> Self {
        StateError::Codec(value)
    }
}

impl From<UtxoError> for StateError {
    fn from(value: UtxoError) -> Self {
        StateError::Utxo(value)
    }
}
