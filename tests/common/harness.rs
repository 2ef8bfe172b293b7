/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A single platform chain replica over in-memory collaborators, plus helpers that build signed
//! transactions and drive blocks through staging and acceptance.

use std::sync::mpsc::{self, Receiver};

use platformvm_rs::{
    block_processor::{BlockError, BlockProcessor, BlockProcessorSpec},
    config::{Config, SECONDS_PER_DAY, SECONDS_PER_YEAR},
    events::Event,
    state::chain_state::{Chain, ChainState, Genesis, StateData},
    types::{
        block::Block,
        crypto_primitives::{Keypair, SigningKey},
        ids::{Amount, Id, NodeId, ShortId, Timestamp},
        outputs::{
            sort_outputs, Input, LockState, Output, OutputOwners, TransferInput, TransferOutput, TransferableInput,
            TransferableOutput, Utxo,
        },
        txs::{AddValidatorTx, AdvanceTimeTx, BaseTx, DepositOffer, Tx, UnsignedTx, Validator},
    },
};
use rand_core::OsRng;

use super::{
    mem_db::MemDB,
    mocks::{FixedUptimes, ManualClock, MemMempool, MemSharedMemory},
};

pub(crate) const GENESIS_TIME: Timestamp = 1_700_000_000;

/// Unlocked balance each user and each genesis validator starts with.
pub(crate) const INITIAL_BALANCE: Amount = 10_000_000;

/// Weight each genesis validator has bonded.
pub(crate) const GENESIS_VALIDATOR_WEIGHT: Amount = 2_000_000;

/// Genesis validators validate from genesis until this long after it.
pub(crate) const GENESIS_VALIDATOR_PERIOD: u64 = 30 * SECONDS_PER_DAY;

pub(crate) const USER_COUNT: usize = 2;
pub(crate) const VALIDATOR_COUNT: usize = 3;

pub(crate) fn random_keypair() -> Keypair {
    Keypair::new(SigningKey::generate(&mut OsRng))
}

pub(crate) fn genesis_node_id(index: usize) -> NodeId {
    ShortId::new([index as u8 + 1; 20])
}

pub(crate) fn test_config() -> Config {
    Config::builder()
        .network_id(5)
        .chain_id(Id::hash(b"platform chain"))
        .log_events(true)
        .build()
}

/// The deposit offer every test genesis carries: 10% a year for deposits of one day to one year.
pub(crate) fn test_deposit_offer() -> DepositOffer {
    DepositOffer {
        interest_rate_nominator: 100_000,
        start: GENESIS_TIME,
        end: GENESIS_TIME + SECONDS_PER_YEAR,
        min_amount: 1,
        min_duration: SECONDS_PER_DAY,
        max_duration: SECONDS_PER_YEAR,
        memo: b"test offer".to_vec(),
    }
}

pub(crate) fn test_genesis(config: &Config, users: &[Keypair], validators: &[Keypair]) -> Genesis {
    let allocations = users
        .iter()
        .chain(validators)
        .map(|keypair| {
            (
                config.native_asset_id,
                TransferOutput::new(INITIAL_BALANCE, OutputOwners::single(keypair.address())),
            )
        })
        .collect();

    let validators = validators
        .iter()
        .enumerate()
        .map(|(index, keypair)| AddValidatorTx {
            base: BaseTx::empty(config.network_id, config.chain_id),
            validator: Validator {
                node_id: genesis_node_id(index),
                start: GENESIS_TIME,
                end: GENESIS_TIME + GENESIS_VALIDATOR_PERIOD,
                weight: GENESIS_VALIDATOR_WEIGHT,
            },
            bond: vec![TransferableOutput::new(
                config.native_asset_id,
                Output::with_state(
                    LockState::Bonded,
                    TransferOutput::new(GENESIS_VALIDATOR_WEIGHT, OutputOwners::single(keypair.address())),
                ),
            )],
            rewards_owner: OutputOwners::single(keypair.address()),
            delegation_shares: 0,
        })
        .collect();

    Genesis {
        timestamp: GENESIS_TIME,
        allocations,
        validators,
        deposit_offers: vec![test_deposit_offer()],
        message: b"platformvm_rs test network".to_vec(),
    }
}

/// One replica and handles onto everything it consumes.
pub(crate) struct TestChain {
    pub(crate) processor: BlockProcessor<MemDB>,
    pub(crate) db: MemDB,
    pub(crate) config: Config,
    pub(crate) genesis: Genesis,
    pub(crate) users: Vec<Keypair>,
    pub(crate) validators: Vec<Keypair>,
    pub(crate) shared_memory: MemSharedMemory,
    pub(crate) mempool: MemMempool,
    pub(crate) clock: ManualClock,
    pub(crate) uptimes: FixedUptimes,
    pub(crate) events: Receiver<Event>,
}

impl TestChain {
    pub(crate) fn new() -> TestChain {
        Self::with_config(test_config())
    }

    pub(crate) fn with_config(config: Config) -> TestChain {
        let users: Vec<Keypair> = (0..USER_COUNT).map(|_| random_keypair()).collect();
        let validators: Vec<Keypair> = (0..VALIDATOR_COUNT).map(|_| random_keypair()).collect();
        let genesis = test_genesis(&config, &users, &validators);

        let db = MemDB::new();
        let chain_state = ChainState::initialize(db.clone(), &config, &genesis).unwrap();
        Self::start(chain_state, db, config, genesis, users, validators)
    }

    /// Drop the processor and reopen the store it wrote to.
    pub(crate) fn restart(self) -> TestChain {
        let TestChain {
            processor,
            db,
            config,
            genesis,
            users,
            validators,
            ..
        } = self;
        drop(processor);
        let chain_state = ChainState::load(db.clone()).unwrap();
        Self::start(chain_state, db, config, genesis, users, validators)
    }

    fn start(
        chain_state: ChainState<MemDB>,
        db: MemDB,
        config: Config,
        genesis: Genesis,
        users: Vec<Keypair>,
        validators: Vec<Keypair>,
    ) -> TestChain {
        let shared_memory = MemSharedMemory::default();
        let mempool = MemMempool::default();
        let clock = ManualClock::new(chain_state.data().timestamp());
        let uptimes = FixedUptimes::default();
        let (sender, events) = mpsc::channel();

        let processor = BlockProcessorSpec::builder()
            .chain_state(chain_state)
            .config(config.clone())
            .uptimes(uptimes.clone())
            .shared_memory(shared_memory.clone())
            .mempool(mempool.clone())
            .clock(clock.clone())
            .event_publisher(sender)
            .build()
            .start();

        TestChain {
            processor,
            db,
            config,
            genesis,
            users,
            validators,
            shared_memory,
            mempool,
            clock,
            uptimes,
            events,
        }
    }

    /* ↓↓↓ Reading state ↓↓↓ */

    pub(crate) fn state(&self) -> &StateData {
        self.processor.view(&self.processor.last_accepted()).unwrap()
    }

    pub(crate) fn chain_time(&self) -> Timestamp {
        self.state().timestamp()
    }

    pub(crate) fn native(&self) -> Id {
        self.config.native_asset_id
    }

    /// UTXOs of the native asset owned by `addr` alone in `state`, in `state`'s lock state `lock`.
    pub(crate) fn utxos_of(state: &StateData, addr: ShortId, lock: LockState) -> Vec<Utxo> {
        let mut utxos: Vec<Utxo> = state
            .utxos()
            .iter()
            .filter(|utxo| utxo.output.owners().addrs == vec![addr])
            .filter(|utxo| state.lock_ids(&utxo.input_id()).state() == lock)
            .cloned()
            .collect();
        utxos.sort_by_key(|utxo| utxo.utxo_id);
        utxos
    }

    pub(crate) fn balance_of(state: &StateData, addr: ShortId, lock: LockState) -> Amount {
        Self::utxos_of(state, addr, lock)
            .iter()
            .map(|utxo| utxo.output.amount())
            .sum()
    }

    /// Drain every event published so far.
    pub(crate) fn drain_events(&self) -> Vec<Event> {
        self.events.try_iter().collect()
    }

    /* ↓↓↓ Building transactions ↓↓↓ */

    /// Inputs spending every unlocked UTXO `keypair` owns in the last accepted state, and their
    /// total value.
    pub(crate) fn spend_all(&self, keypair: &Keypair) -> (Vec<TransferableInput>, Amount) {
        let utxos = Self::utxos_of(self.state(), keypair.address(), LockState::Unlocked);
        let total = utxos.iter().map(|utxo| utxo.output.amount()).sum();
        (utxos.iter().map(unlocked_input).collect(), total)
    }

    pub(crate) fn base_tx(&self, ins: Vec<TransferableInput>, mut outs: Vec<TransferableOutput>) -> BaseTx {
        sort_outputs(&mut outs);
        BaseTx {
            network_id: self.config.network_id,
            blockchain_id: self.config.chain_id,
            ins,
            outs,
            memo: Vec::new(),
        }
    }

    pub(crate) fn empty_base(&self) -> BaseTx {
        BaseTx::empty(self.config.network_id, self.config.chain_id)
    }

    pub(crate) fn output(&self, state: LockState, amount: Amount, owner: &Keypair) -> TransferableOutput {
        TransferableOutput::new(
            self.native(),
            Output::with_state(state, TransferOutput::new(amount, OutputOwners::single(owner.address()))),
        )
    }

    /// A base spending everything `keypair` holds unlocked, returning what is left after `spent`
    /// and the base fee as one unlocked change output.
    pub(crate) fn paying_base(&self, keypair: &Keypair, spent: Amount) -> BaseTx {
        let (ins, total) = self.spend_all(keypair);
        let change = total - spent - self.state().base_fee();
        self.base_tx(ins, vec![self.output(LockState::Unlocked, change, keypair)])
    }

    /// Sign `unsigned` with `keypair` once for each input of its base, plus `extra` trailing
    /// credentials.
    pub(crate) fn sign(&self, unsigned: UnsignedTx, keypair: &Keypair, extra: usize) -> Tx {
        let inputs = unsigned.base().map_or(0, |base| base.ins.len());
        let signers: Vec<Vec<&Keypair>> = (0..inputs + extra).map(|_| vec![keypair]).collect();
        Tx::sign(unsigned, &signers).unwrap()
    }

    pub(crate) fn advance_time_tx(&self, time: Timestamp) -> Tx {
        Tx::system(UnsignedTx::AdvanceTime(AdvanceTimeTx {
            base: self.empty_base(),
            time,
        }))
    }

    /* ↓↓↓ Driving blocks ↓↓↓ */

    fn next_height(&self) -> u64 {
        self.processor.last_accepted_height() + 1
    }

    pub(crate) fn standard_block(&self, txs: Vec<Tx>) -> Block {
        Block::standard(self.processor.last_accepted(), self.next_height(), self.chain_time(), txs)
    }

    /// Stage and accept a standard block holding `txs` on top of the last accepted block.
    pub(crate) fn accept_standard(&mut self, txs: Vec<Tx>) -> Result<Id, BlockError> {
        let block = self.standard_block(txs);
        let block_id = self.processor.verify_and_stage(block)?;
        self.processor.accept_block(&block_id)?;
        Ok(block_id)
    }

    /// Stage a proposal block holding `tx` on top of the last accepted block, and both of its
    /// options. Returns the ids of the proposal, commit and abort blocks.
    pub(crate) fn stage_proposal(&mut self, tx: Tx) -> Result<(Id, Id, Id), BlockError> {
        let height = self.next_height();
        let proposal = Block::proposal(self.processor.last_accepted(), height, tx);
        let proposal_id = self.processor.verify_and_stage(proposal)?;
        let commit_id = self.processor.verify_and_stage(Block::commit(proposal_id, height + 1))?;
        let abort_id = self.processor.verify_and_stage(Block::abort(proposal_id, height + 1))?;
        Ok((proposal_id, commit_id, abort_id))
    }

    /// Stage `tx` in a proposal block and accept it together with its commit option.
    pub(crate) fn commit(&mut self, tx: Tx) -> Result<Id, BlockError> {
        self.decide(tx, true)
    }

    /// Stage `tx` in a proposal block and accept it together with its abort option.
    pub(crate) fn abort(&mut self, tx: Tx) -> Result<Id, BlockError> {
        self.decide(tx, false)
    }

    fn decide(&mut self, tx: Tx, commit: bool) -> Result<Id, BlockError> {
        let (proposal_id, commit_id, abort_id) = self.stage_proposal(tx)?;
        self.processor.accept_block(&proposal_id)?;
        let chosen = if commit { commit_id } else { abort_id };
        self.processor.accept_block(&chosen)?;
        Ok(chosen)
    }

    /// Move the wall clock and the chain time to `time`.
    pub(crate) fn advance_time(&mut self, time: Timestamp) -> Result<Id, BlockError> {
        self.clock.set(time);
        let tx = self.advance_time_tx(time);
        self.commit(tx)
    }
}

pub(crate) fn unlocked_input(utxo: &Utxo) -> TransferableInput {
    TransferableInput {
        utxo_id: utxo.utxo_id,
        asset_id: utxo.asset_id,
        input: Input::with_state(
            LockState::Unlocked,
            TransferInput {
                amount: utxo.output.amount(),
                sig_indices: vec![0],
            },
        ),
    }
}

/// The inputs and outputs a reward transaction must carry to release every UTXO `lock_tx_id`
/// holds in the `bonded` (or else deposited) lock.
pub(crate) fn release(
    state: &StateData,
    lock_tx_id: &Id,
    bonded: bool,
) -> (Vec<TransferableInput>, Vec<TransferableOutput>) {
    let ids = if bonded {
        state.lock_states().bonded_utxos(lock_tx_id)
    } else {
        state.lock_states().deposited_utxos(lock_tx_id)
    };
    let mut utxos: Vec<&Utxo> = ids.iter().map(|id| state.utxo(id).unwrap()).collect();
    utxos.sort_by_key(|utxo| utxo.utxo_id);

    utxos
        .into_iter()
        .map(|utxo| {
            let lock_state = state.lock_ids(&utxo.input_id()).state();
            let remaining = if bonded {
                LockState::from_flags(lock_state.is_deposited(), false)
            } else {
                LockState::from_flags(false, lock_state.is_bonded())
            };
            let input = TransferableInput {
                utxo_id: utxo.utxo_id,
                asset_id: utxo.asset_id,
                input: Input::with_state(
                    lock_state,
                    TransferInput {
                        amount: utxo.output.amount(),
                        sig_indices: Vec::new(),
                    },
                ),
            };
            let output = TransferableOutput::new(
                utxo.asset_id,
                Output::with_state(remaining, utxo.output.inner().clone()),
            );
            (input, output)
        })
        .unzip()
}
