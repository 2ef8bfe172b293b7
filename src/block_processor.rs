/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The block processor: verifies blocks handed over by the consensus driver, stages their
//! successor states, and makes them the chain state when they are accepted.
//!
//! ## Staged blocks
//!
//! Every verified block that is neither accepted nor rejected is *staged*, together with the state
//! the chain will be in once it is accepted. Staged blocks form a tree rooted at the last accepted
//! block: a block may be staged on top of the last accepted block or on top of any staged block.
//!
//! |Block kind|Staged state|Children|
//! |---|---|---|
//! |Standard|The parent's state with every decision transaction applied in order.|Any block.|
//! |Proposal|None of its own. Keeps the commit and abort successors of its transaction.|Commit or abort blocks only.|
//! |Commit|The parent's state with the proposal's commit successor applied.|Any block.|
//! |Abort|The parent's state with the proposal's abort successor applied.|Any block.|
//!
//! A standard block may not spend a UTXO that another transaction in the same block, or in any
//! staged ancestor, already spends.
//!
//! ## Accepting and rejecting
//!
//! Only a child of the last accepted block can be accepted. Accepting a block writes its staged
//! state to the persistent store in one batch, performs its shared-memory requests, removes its
//! transactions from the mempool, and rejects its staged siblings. Rejecting a block also rejects
//! every staged descendant, and returns their transactions to the mempool.
//!
//! ## Events
//!
//! Block lifecycle events ([`StageBlock`](crate::events::StageBlockEvent),
//! [`AcceptBlock`](crate::events::AcceptBlockEvent), [`RejectBlock`](crate::events::RejectBlockEvent))
//! are emitted as they happen. Events about the effects of a block's transactions are computed when
//! the block is staged and emitted when it is accepted.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Display, Formatter},
    sync::{mpsc::Sender, Arc, Mutex},
    time::SystemTime,
};

use typed_builder::TypedBuilder;

use crate::{
    codec::CodecError,
    config::Config,
    events::*,
    executor::{execute, Backend, ExecOutcome, TxError},
    fx::{Ed25519Fx, Fx},
    interfaces::{AtomicRequests, Clock, Mempool, SharedMemory, SharedMemoryError, SystemClock, UptimeTracker},
    logging::log_event,
    state::{
        chain_state::{Chain, ChainState, StateData, StateError},
        diff::Diff,
        pluggables::KVStore,
        registry::RegistryEntry,
    },
    types::{
        block::{Block, OptionBlock, ProposalBlock, StandardBlock},
        ids::{Id, Timestamp},
        txs::{Tx, UnsignedTx},
    },
};

/// A [`BlockProcessor`] behind the single lock that serialises every call into the state machine.
pub type SharedBlockProcessor<K> = Arc<Mutex<BlockProcessor<K>>>;

#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [BlockProcessorSpec]. On the builder call the following methods to
    construct a valid [BlockProcessorSpec].

    Required:
    - `.chain_state(...)`
    - `.config(...)`
    - `.uptimes(...)`
    - `.shared_memory(...)`
    - `.mempool(...)`

    Optional:
    - `.fx(...)`
    - `.clock(...)`
    - `.event_publisher(...)`
"))]
pub struct BlockProcessorSpec<K: KVStore> {
    #[builder(setter(doc = "Set the committed chain state, from `ChainState::initialize` or `ChainState::load`. Required."))]
    chain_state: ChainState<K>,
    #[builder(setter(doc = "Set the [configuration](Config) of the chain. Required."))]
    config: Config,
    #[builder(setter(
        transform = |uptimes: impl UptimeTracker + 'static| Box::new(uptimes) as Box<dyn UptimeTracker>,
        doc = "Set the source of validator uptimes consulted when rewarding validators. Required."
    ))]
    uptimes: Box<dyn UptimeTracker>,
    #[builder(setter(
        transform = |shared_memory: impl SharedMemory + 'static| Box::new(shared_memory) as Box<dyn SharedMemory>,
        doc = "Set the memory shared with peer chains. Required."
    ))]
    shared_memory: Box<dyn SharedMemory>,
    #[builder(setter(
        transform = |mempool: impl Mempool + 'static| Box::new(mempool) as Box<dyn Mempool>,
        doc = "Set the mempool transactions are built from and returned to. Required."
    ))]
    mempool: Box<dyn Mempool>,
    // Optional parameters
    #[builder(
        default = Box::new(Ed25519Fx) as Box<dyn Fx>,
        setter(
            transform = |fx: impl Fx + 'static| Box::new(fx) as Box<dyn Fx>,
            doc = "Set the credential verifier. Defaults to threshold ed25519. Optional."
        )
    )]
    fx: Box<dyn Fx>,
    #[builder(
        default = Box::new(SystemClock) as Box<dyn Clock>,
        setter(
            transform = |clock: impl Clock + 'static| Box::new(clock) as Box<dyn Clock>,
            doc = "Set the wall clock. Defaults to the system clock. Optional."
        )
    )]
    clock: Box<dyn Clock>,
    #[builder(
        default,
        setter(
            strip_option,
            doc = "Set a channel every event is sent on. Optional."
        )
    )]
    event_publisher: Option<Sender<Event>>,
}

impl<K: KVStore> BlockProcessorSpec<K> {
    pub fn start(self) -> BlockProcessor<K> {
        log::info!(
            "Starting block processor at block {} (height {})",
            self.chain_state.last_accepted(),
            self.chain_state.last_accepted_height()
        );
        BlockProcessor {
            chain_state: self.chain_state,
            config: self.config,
            fx: self.fx,
            clock: self.clock,
            uptimes: self.uptimes,
            shared_memory: self.shared_memory,
            mempool: self.mempool,
            event_publisher: self.event_publisher,
            staged: BTreeMap::new(),
        }
    }
}

pub struct BlockProcessor<K: KVStore> {
    chain_state: ChainState<K>,
    config: Config,
    fx: Box<dyn Fx>,
    clock: Box<dyn Clock>,
    uptimes: Box<dyn UptimeTracker>,
    shared_memory: Box<dyn SharedMemory>,
    mempool: Box<dyn Mempool>,
    event_publisher: Option<Sender<Event>>,
    staged: BTreeMap<Id, StagedBlock>,
}

struct StagedBlock {
    block: Block,
    /// The chain state once this block is accepted. `None` for proposal blocks.
    state: Option<Diff>,
    options: Option<ProposalOptions>,
    atomic_requests: BTreeMap<Id, AtomicRequests>,
    /// Input ids of every UTXO the block spends.
    consumed: BTreeSet<Id>,
    /// Emitted when the block is accepted.
    events: Vec<Event>,
}

/// The two successors of a proposal block's transaction.
#[derive(Clone)]
struct ProposalOptions {
    tx: Tx,
    /// A layer over the proposal block's parent; the successors are built on top of it.
    base: Diff,
    on_commit: Diff,
    on_abort: Diff,
    prefers_commit: bool,
}

/* ↓↓↓ Verifying and staging ↓↓↓ */

impl<K: KVStore> BlockProcessor<K> {
    /// Verify `block` on top of its parent and stage it.
    pub fn verify_and_stage(&mut self, block: Block) -> Result<Id, BlockError> {
        let block_id = block.id()?;
        if self.staged.contains_key(&block_id) || self.chain_state.last_accepted() == block_id {
            return Err(BlockError::AlreadyKnown { block: block_id });
        }
        let staged = match self.execute_block(block) {
            Ok(staged) => staged,
            Err(err) => {
                log::debug!("Block {} failed verification: {}", block_id, err);
                return Err(err);
            }
        };

        self.emit(Event::StageBlock(StageBlockEvent {
            timestamp: SystemTime::now(),
            block: block_id,
            height: staged.block.height(),
            kind: staged.block.kind(),
        }));
        self.staged.insert(block_id, staged);
        Ok(block_id)
    }

    /// Verify `block` on top of its parent without staging it.
    pub fn verify_block(&self, block: &Block) -> Result<(), BlockError> {
        self.execute_block(block.clone()).map(|_| ())
    }

    /// Verify `tx` and execute it on top of the state at `parent`, without staging anything.
    pub fn verify_tx(&self, parent: &Id, tx: &Tx) -> Result<ExecOutcome, BlockError> {
        let state = self.state_at(parent)?;
        Ok(execute(&self.backend(), state, tx)?)
    }

    fn execute_block(&self, block: Block) -> Result<StagedBlock, BlockError> {
        let parent = block.parent();
        let expected_height = self.height_of(&parent)? + 1;
        if block.height() != expected_height {
            return Err(BlockError::WrongHeight {
                expected: expected_height,
                actual: block.height(),
            });
        }

        let parent_is_proposal = match self.staged.get(&parent) {
            Some(staged) => staged.options.is_some(),
            None => matches!(self.chain_state.block(&parent)?, Some(Block::Proposal(_))),
        };
        match (&block, parent_is_proposal) {
            (Block::Commit(_) | Block::Abort(_), false) => return Err(BlockError::OptionWithoutProposal { parent }),
            (Block::Standard(_) | Block::Proposal(_), true) => {
                return Err(BlockError::ProposalChildNotOption { parent })
            }
            _ => (),
        }

        match block {
            Block::Standard(standard) => self.execute_standard(standard),
            Block::Proposal(proposal) => self.execute_proposal(proposal),
            Block::Commit(option) => self.execute_option(option, true),
            Block::Abort(option) => self.execute_option(option, false),
        }
    }

    fn execute_standard(&self, block: StandardBlock) -> Result<StagedBlock, BlockError> {
        if block.txs.is_empty() {
            return Err(BlockError::EmptyBlock);
        }
        let parent = self.state_at(&block.parent)?;
        let chain_time = parent.data().timestamp();
        if block.timestamp != chain_time {
            return Err(BlockError::WrongTimestamp {
                expected: chain_time,
                actual: block.timestamp,
            });
        }

        let backend = self.backend();
        let mut base = Diff::new(parent);
        let mut spent = self.spent_by_ancestors(&block.parent);
        let mut consumed = BTreeSet::new();
        let mut atomic_requests: BTreeMap<Id, AtomicRequests> = BTreeMap::new();
        for tx in &block.txs {
            if !tx.unsigned.is_decision() {
                return Err(TxError::WrongTxKind {
                    kind: tx.unsigned.name(),
                }
                .into());
            }
            for utxo in tx.unsigned.consumed_ids() {
                if !spent.insert(utxo) {
                    return Err(TxError::ConflictingBatchTxs { utxo }.into());
                }
                consumed.insert(utxo);
            }

            match execute(&backend, &base, tx)? {
                ExecOutcome::Decision {
                    mut state,
                    atomic_requests: requests,
                } => {
                    state.apply(&mut base)?;
                    for (peer_chain, requests) in requests {
                        atomic_requests.entry(peer_chain).or_default().extend(requests);
                    }
                }
                ExecOutcome::Proposal { .. } => {
                    return Err(TxError::WrongTxKind {
                        kind: tx.unsigned.name(),
                    }
                    .into())
                }
            }
        }

        Ok(StagedBlock {
            block: Block::Standard(block),
            state: Some(base),
            options: None,
            atomic_requests,
            consumed,
            events: Vec::new(),
        })
    }

    fn execute_proposal(&self, block: ProposalBlock) -> Result<StagedBlock, BlockError> {
        let parent = self.state_at(&block.parent)?;
        let options = self.proposal_options(parent, &block.tx)?;

        let mut spent = self.spent_by_ancestors(&block.parent);
        let mut consumed = BTreeSet::new();
        for utxo in block.tx.unsigned.consumed_ids() {
            if !spent.insert(utxo) {
                return Err(TxError::ConflictingBatchTxs { utxo }.into());
            }
            consumed.insert(utxo);
        }

        Ok(StagedBlock {
            block: Block::Proposal(block),
            state: None,
            options: Some(options),
            atomic_requests: BTreeMap::new(),
            consumed,
            events: Vec::new(),
        })
    }

    fn execute_option(&self, block: OptionBlock, commit: bool) -> Result<StagedBlock, BlockError> {
        let options = match self.staged.get(&block.parent).and_then(|staged| staged.options.clone()) {
            Some(options) => options,
            // The proposal block was accepted before this processor started.
            None => match self.chain_state.block(&block.parent)? {
                Some(Block::Proposal(proposal)) => self.proposal_options(&self.chain_state, &proposal.tx)?,
                _ => return Err(BlockError::OptionWithoutProposal { parent: block.parent }),
            },
        };

        let ProposalOptions {
            tx,
            mut base,
            on_commit,
            on_abort,
            ..
        } = options;
        let parent_data = base.data().clone();
        let mut chosen = if commit { on_commit } else { on_abort };
        chosen.apply(&mut base)?;
        let events = outcome_events(&parent_data, &tx, base.data(), commit);

        let block = if commit {
            Block::Commit(block)
        } else {
            Block::Abort(block)
        };
        Ok(StagedBlock {
            block,
            state: Some(base),
            options: None,
            atomic_requests: BTreeMap::new(),
            consumed: BTreeSet::new(),
            events,
        })
    }

    fn proposal_options(&self, parent: &dyn Chain, tx: &Tx) -> Result<ProposalOptions, BlockError> {
        if !tx.unsigned.is_proposal() {
            return Err(TxError::WrongTxKind {
                kind: tx.unsigned.name(),
            }
            .into());
        }
        let base = Diff::new(parent);
        match execute(&self.backend(), &base, tx)? {
            ExecOutcome::Proposal {
                on_commit,
                on_abort,
                prefers_commit,
            } => Ok(ProposalOptions {
                tx: tx.clone(),
                base,
                on_commit,
                on_abort,
                prefers_commit,
            }),
            ExecOutcome::Decision { .. } => Err(TxError::WrongTxKind {
                kind: tx.unsigned.name(),
            }
            .into()),
        }
    }
}

/* ↓↓↓ Accepting and rejecting ↓↓↓ */

impl<K: KVStore> BlockProcessor<K> {
    /// Make the staged block `block_id` the last accepted block, persisting its state.
    pub fn accept_block(&mut self, block_id: &Id) -> Result<(), BlockError> {
        let last_accepted = self.chain_state.last_accepted();
        let staged = self
            .staged
            .get_mut(block_id)
            .ok_or(BlockError::NotStaged { block: *block_id })?;
        if staged.block.parent() != last_accepted {
            return Err(BlockError::ParentNotAccepted {
                block: *block_id,
                parent: staged.block.parent(),
            });
        }

        // Nothing is committed until shared memory has taken the block's atomic requests.
        let prepared = self
            .chain_state
            .prepare_accept(staged.state.as_ref(), block_id, &staged.block)?;
        if !staged.atomic_requests.is_empty() {
            self.shared_memory.apply(&staged.atomic_requests)?;
        }
        self.chain_state.finish_accept(prepared, staged.state.as_mut());

        let txs: Vec<Tx> = staged.block.txs().into_iter().cloned().collect();
        self.mempool.remove(&txs);
        let events = std::mem::take(&mut staged.events);
        let height = staged.block.height();
        let is_proposal = staged.options.is_some();

        // A proposal block stays staged until one of its options is accepted.
        if !is_proposal {
            self.staged.remove(block_id);
        }
        if self
            .staged
            .get(&last_accepted)
            .is_some_and(|parent| parent.options.is_some())
        {
            self.staged.remove(&last_accepted);
        }

        let siblings: Vec<Id> = self
            .staged
            .iter()
            .filter(|(id, staged)| staged.block.parent() == last_accepted && *id != block_id)
            .map(|(id, _)| *id)
            .collect();
        for sibling in siblings {
            self.reject_block(&sibling)?;
        }

        log::debug!("Accepted block {} at height {}", block_id, height);
        self.emit(Event::AcceptBlock(AcceptBlockEvent {
            timestamp: SystemTime::now(),
            block: *block_id,
            height,
        }));
        for event in events {
            self.emit(event);
        }
        Ok(())
    }

    /// Discard the staged block `block_id` and every staged block built on it, returning their
    /// transactions to the mempool.
    pub fn reject_block(&mut self, block_id: &Id) -> Result<(), BlockError> {
        if !self.staged.contains_key(block_id) {
            return Err(BlockError::NotStaged { block: *block_id });
        }

        let mut rejected = BTreeSet::from([*block_id]);
        loop {
            let descendants: Vec<Id> = self
                .staged
                .iter()
                .filter(|(id, staged)| !rejected.contains(*id) && rejected.contains(&staged.block.parent()))
                .map(|(id, _)| *id)
                .collect();
            if descendants.is_empty() {
                break;
            }
            rejected.extend(descendants);
        }

        for id in rejected {
            if let Some(staged) = self.staged.remove(&id) {
                for tx in staged.block.txs() {
                    let accepted = tx
                        .id()
                        .is_ok_and(|tx_id| self.chain_state.data().tx_status(&tx_id).is_some());
                    if !accepted {
                        self.mempool.add(tx.clone());
                    }
                }
                self.emit(Event::RejectBlock(RejectBlockEvent {
                    timestamp: SystemTime::now(),
                    block: id,
                }));
            }
        }
        Ok(())
    }
}

/* ↓↓↓ Building blocks ↓↓↓ */

impl<K: KVStore> BlockProcessor<K> {
    /// Build a standard block on top of `parent` from mempool transactions whose encodings fit in
    /// `byte_budget`. Transactions that fail on top of the ones before them are marked dropped.
    ///
    /// Returns `None` if no transaction could be included.
    pub fn build_standard_block(&mut self, parent: &Id, byte_budget: usize) -> Result<Option<Block>, BlockError> {
        let height = self.height_of(parent)? + 1;
        let candidates = self.mempool.peek_txs(byte_budget);

        let mut included = Vec::new();
        let mut dropped = Vec::new();
        let timestamp;
        {
            let parent_state = self.state_at(parent)?;
            timestamp = parent_state.data().timestamp();
            let backend = self.backend();
            let mut base = Diff::new(parent_state);
            let mut spent = self.spent_by_ancestors(parent);

            for tx in candidates {
                if !tx.unsigned.is_decision() {
                    continue;
                }
                let tx_id = tx.id()?;
                let consumed = tx.unsigned.consumed_ids();
                let outcome = match consumed.iter().find(|utxo| spent.contains(*utxo)) {
                    Some(utxo) => Err(TxError::ConflictingBatchTxs { utxo: *utxo }),
                    None => execute(&backend, &base, &tx),
                };
                match outcome {
                    Ok(ExecOutcome::Decision { mut state, .. }) => {
                        state.apply(&mut base)?;
                        spent.extend(consumed);
                        included.push(tx);
                    }
                    Ok(ExecOutcome::Proposal { .. }) => continue,
                    Err(err) => dropped.push((tx_id, err.to_string())),
                }
            }
        }

        for (tx_id, reason) in dropped {
            log::debug!("Dropping tx {}: {}", tx_id, reason);
            self.mempool.mark_dropped(tx_id, reason.clone());
            self.emit(Event::DropTx(DropTxEvent {
                timestamp: SystemTime::now(),
                tx: tx_id,
                reason,
            }));
        }

        if included.is_empty() {
            return Ok(None);
        }
        Ok(Some(Block::standard(*parent, height, timestamp, included)))
    }
}

/* ↓↓↓ Getters ↓↓↓ */

impl<K: KVStore> BlockProcessor<K> {
    /// The state the chain will be in once `block_id` is accepted.
    pub fn view(&self, block_id: &Id) -> Result<&StateData, BlockError> {
        Ok(self.state_at(block_id)?.data())
    }

    /// Whether this node prefers the commit successor of the staged proposal block `block_id`.
    pub fn prefers_commit(&self, block_id: &Id) -> Option<bool> {
        self.staged
            .get(block_id)
            .and_then(|staged| staged.options.as_ref())
            .map(|options| options.prefers_commit)
    }

    pub fn last_accepted(&self) -> Id {
        self.chain_state.last_accepted()
    }

    pub fn last_accepted_height(&self) -> u64 {
        self.chain_state.last_accepted_height()
    }

    pub fn is_staged(&self, block_id: &Id) -> bool {
        self.staged.contains_key(block_id)
    }

    pub fn chain_state(&self) -> &ChainState<K> {
        &self.chain_state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn backend(&self) -> Backend<'_> {
        Backend {
            config: &self.config,
            fx: &*self.fx,
            clock: &*self.clock,
            uptimes: &*self.uptimes,
            shared_memory: &*self.shared_memory,
        }
    }

    /// The state blocks built on `block_id` execute on top of.
    fn state_at(&self, block_id: &Id) -> Result<&dyn Chain, BlockError> {
        match self.staged.get(block_id) {
            Some(staged) => match &staged.state {
                Some(state) => Ok(state as &dyn Chain),
                None => Err(BlockError::ProposalChildNotOption { parent: *block_id }),
            },
            None if *block_id == self.chain_state.last_accepted() => Ok(&self.chain_state as &dyn Chain),
            None => Err(BlockError::UnknownParent { parent: *block_id }),
        }
    }

    fn height_of(&self, block_id: &Id) -> Result<u64, BlockError> {
        match self.staged.get(block_id) {
            Some(staged) => Ok(staged.block.height()),
            None if *block_id == self.chain_state.last_accepted() => Ok(self.chain_state.last_accepted_height()),
            None => Err(BlockError::UnknownParent { parent: *block_id }),
        }
    }

    /// Input ids of every UTXO spent by the staged, unaccepted ancestors of `block_id`, inclusive.
    fn spent_by_ancestors(&self, block_id: &Id) -> BTreeSet<Id> {
        let last_accepted = self.chain_state.last_accepted();
        let mut spent = BTreeSet::new();
        let mut cursor = *block_id;
        while cursor != last_accepted {
            let Some(staged) = self.staged.get(&cursor) else {
                break;
            };
            spent.extend(staged.consumed.iter().copied());
            cursor = staged.block.parent();
        }
        spent
    }

    fn emit(&self, event: Event) {
        if self.config.log_events {
            log_event(&event);
        }
        Event::publish(&self.event_publisher, event);
    }
}

/// Events describing what accepting the `committed` (or aborted) successor of proposal `tx` does
/// to `parent`, producing `state`.
fn outcome_events(parent: &StateData, tx: &Tx, state: &StateData, committed: bool) -> Vec<Event> {
    let timestamp = SystemTime::now();
    match &tx.unsigned {
        UnsignedTx::AdvanceTime(advance) if committed => {
            let mut events = vec![Event::AdvanceTime(AdvanceTimeEvent {
                timestamp,
                chain_time: advance.time,
            })];
            for staker in parent.pending_stakers().iter().filter(|staker| staker.start() <= advance.time) {
                let potential_reward = state
                    .current_stakers()
                    .get(&staker.key())
                    .map_or(0, |current| current.potential_reward);
                events.push(Event::PromoteStaker(PromoteStakerEvent {
                    timestamp,
                    staker_tx: staker.tx_id,
                    potential_reward,
                }));
            }
            for lock in parent.pending_locks().iter().filter(|lock| lock.start() <= advance.time) {
                let potential_reward = state
                    .current_locks()
                    .get(&lock.tx_id)
                    .map_or(0, |current| current.potential_reward);
                events.push(Event::PromoteStaker(PromoteStakerEvent {
                    timestamp,
                    staker_tx: lock.tx_id,
                    potential_reward,
                }));
            }
            events
        }
        UnsignedTx::RewardValidator(reward) => parent
            .current_stakers()
            .get_next()
            .filter(|staker| staker.tx_id == reward.validator_tx_id)
            .map(|staker| {
                Event::RewardStaker(RewardStakerEvent {
                    timestamp,
                    staker_tx: staker.tx_id,
                    reward: staker.potential_reward,
                    committed,
                })
            })
            .into_iter()
            .collect(),
        UnsignedTx::RewardLock(reward) => parent
            .current_locks()
            .get(&reward.lock_tx_id)
            .map(|lock| {
                Event::RewardStaker(RewardStakerEvent {
                    timestamp,
                    staker_tx: lock.tx_id,
                    reward: lock.potential_reward,
                    committed,
                })
            })
            .into_iter()
            .collect(),
        UnsignedTx::ProposalConclude(conclude) if committed => parent
            .proposals()
            .get(&conclude.proposal_id)
            .map(|proposal| {
                Event::ConcludeProposal(ConcludeProposalEvent {
                    timestamp,
                    proposal: proposal.tx_id,
                    outcome: if proposal.threshold_reached() {
                        ProposalOutcome::Concluded
                    } else {
                        ProposalOutcome::Rejected
                    },
                })
            })
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

/// Errors that may be encountered while verifying, staging, accepting or rejecting blocks.
#[derive(Debug)]
pub enum BlockError {
    Tx(TxError),
    State(StateError),
    SharedMemory(SharedMemoryError),
    Codec(CodecError),
    UnknownParent { parent: Id },
    AlreadyKnown { block: Id },
    NotStaged { block: Id },
    ParentNotAccepted { block: Id, parent: Id },
    WrongHeight { expected: u64, actual: u64 },
    /// A standard block's timestamp differs from its parent's chain time.
    WrongTimestamp { expected: Timestamp, actual: Timestamp },
    EmptyBlock,
    /// A commit or abort block whose parent is not a proposal block.
    OptionWithoutProposal { parent: Id },
    /// A block other than a commit or abort block on top of a proposal block.
    ProposalChildNotOption { parent: Id },
}

impl Display for BlockError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BlockError::Tx(err) => write!(f, "{}", err),
            BlockError::State(err) => write!(f, "{}", err),
            BlockError::SharedMemory(err) => write!(f, "{}", err),
            BlockError::Codec(err) => write!(f, "{}", err),
            BlockError::UnknownParent { parent } => write!(f, "parent block {} is unknown", parent),
            BlockError::AlreadyKnown { block } => write!(f, "block {} is already staged or accepted", block),
            BlockError::NotStaged { block } => write!(f, "block {} is not staged", block),
            BlockError::ParentNotAccepted { block, parent } => {
                write!(f, "block {} cannot be accepted before its parent {}", block, parent)
            }
            BlockError::WrongHeight { expected, actual } => {
                write!(f, "expected block height {}, got {}", expected, actual)
            }
            BlockError::WrongTimestamp { expected, actual } => {
                write!(f, "expected block timestamp {}, got {}", expected, actual)
            }
            BlockError::EmptyBlock => write!(f, "standard block holds no transactions"),
            BlockError::OptionWithoutProposal { parent } => {
                write!(f, "parent {} of an option block is not a proposal block", parent)
            }
            BlockError::ProposalChildNotOption { parent } => {
                write!(f, "only commit and abort blocks may follow proposal block {}", parent)
            }
        }
    }
}

impl std::error::Error for BlockError {}

impl From<TxError> for BlockError {
    fn from(value: TxError) -> Self {
        BlockError::Tx(value)
    }
}

impl From<StateError> for BlockError {
    fn from(value: StateError) -> Self {
        BlockError::State(value)
    }
}

impl From<SharedMemoryError> for BlockError {
    fn from(value: SharedMemoryError) -> Self {
        BlockError::SharedMemory(value)
    }
}

impl From<CodecError> for BlockError {
    fn from(value: CodecError) -> Self {
        BlockError::Codec(value)
    }
}
