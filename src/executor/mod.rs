/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Transaction verification and execution.
//!
//! [`execute`] takes a transaction and the state it is to be executed on top of, and either fails
//! with a [`TxError`], leaving nothing behind, or returns an [`ExecOutcome`]:
//! - *Decision* transactions (`CreateSubnet`, `CreateChain`, `Import`, `Export`) yield a single
//!   [`Diff`] plus the requests they make of shared memory.
//! - *Proposal* transactions yield two sibling diffs, one for the case the proposal is committed and
//!   one for the case it is aborted, and say which of the two this node initially prefers.
//!
//! Execution proceeds in three passes:
//! 1. [`syntactic`] checks, which read only the transaction and the [`Config`].
//! 2. A duplicate check against the statuses of already executed transactions.
//! 3. Per-kind semantic checks and state construction, dispatched through
//!    [`TxVisitor`](crate::types::txs::TxVisitor). Decision kinds live in `standard`, proposal kinds
//!    in `proposal`. Both spend through the check in [`spend`].

pub mod error;
mod proposal;
pub(crate) mod spend;
mod standard;
mod syntactic;

pub use error::TxError;
pub use spend::LockMode;

use std::collections::BTreeMap;

use crate::{
    config::Config,
    fx::Fx,
    interfaces::{AtomicRequests, Clock, SharedMemory, UptimeTracker},
    state::{
        chain_state::{Chain, StateData, TxStatus},
        diff::Diff,
        registry::RegistryError,
    },
    types::{
        ids::{Amount, Id, Timestamp},
        outputs::{LockIds, TransferableInput, TransferableOutput, Utxo, UtxoId},
        txs::{
            AddDepositOfferTx, AddDepositTx, AddLockTx, AddSubnetValidatorTx, AddValidatorTx, AdvanceTimeTx, BaseFeeTx,
            CreateChainTx, CreateSubnetTx, Credential, ExportTx, ImportTx, ProposalConcludeTx, ProposalSubmitTx,
            ProposalVoteTx, RewardLockTx, RewardValidatorTx, Tx, TxVisitor,
        },
    },
};

use self::spend::{ResolvedInput, Spend};

/// The collaborators execution reads from. None of them is written to during execution.
pub struct Backend<'a> {
    pub config: &'a Config,
    pub fx: &'a dyn Fx,
    pub clock: &'a dyn Clock,
    pub uptimes: &'a dyn UptimeTracker,
    pub shared_memory: &'a dyn SharedMemory,
}

#[derive(Debug)]
pub enum ExecOutcome {
    Decision {
        state: Diff,
        /// Keyed by peer chain. Carried out only when the block holding the transaction is accepted.
        atomic_requests: BTreeMap<Id, AtomicRequests>,
    },
    Proposal {
        on_commit: Diff,
        on_abort: Diff,
        prefers_commit: bool,
    },
}

/// Verify `tx` and execute it on top of `parent`.
pub fn execute(backend: &Backend, parent: &dyn Chain, tx: &Tx) -> Result<ExecOutcome, TxError> {
    syntactic::verify(backend.config, tx)?;

    let tx_id = tx.id()?;
    if parent.data().tx_status(&tx_id).is_some() {
        return Err(TxError::DuplicateTx { tx_id });
    }

    let unsigned_bytes = tx.unsigned_bytes()?;
    tx.unsigned.visit(&mut TxExecutor {
        backend,
        parent,
        tx,
        tx_id,
        unsigned_bytes: &unsigned_bytes,
    })
}

/// Executes one transaction. The per-kind methods are implemented in `standard` and `proposal`.
pub(crate) struct TxExecutor<'a> {
    backend: &'a Backend<'a>,
    parent: &'a dyn Chain,
    tx: &'a Tx,
    tx_id: Id,
    unsigned_bytes: &'a [u8],
}

impl<'a> TxExecutor<'a> {
    fn config(&self) -> &'a Config {
        self.backend.config
    }

    fn data(&self) -> &'a StateData {
        self.parent.data()
    }

    /// The wall-clock time, as opposed to the chain timestamp.
    fn wall_clock(&self) -> Timestamp {
        self.backend.clock.now()
    }

    fn spend(&self) -> Spend<'a> {
        Spend {
            config: self.backend.config,
            fx: self.backend.fx,
            now: self.parent.data().timestamp(),
            unsigned_bytes: self.unsigned_bytes,
        }
    }

    /// Check that `inputs`, authorised one-to-one by `credentials`, may be spent into `outputs`.
    fn verify_spend(
        &self,
        inputs: &[ResolvedInput],
        outputs: &[TransferableOutput],
        credentials: &[Credential],
        mode: Option<LockMode>,
        burn: Amount,
    ) -> Result<Vec<LockIds>, TxError> {
        if credentials.len() != inputs.len() {
            return Err(TxError::WrongNumberOfCredentials {
                expected: inputs.len(),
                actual: credentials.len(),
            });
        }
        self.spend()
            .check(inputs, outputs, Some(credentials), mode, self.tx_id, burn)
    }

    /// Split the credentials into those authorising `input_count` inputs and one trailing
    /// credential for a further authority.
    fn split_credentials(&self, input_count: usize) -> Result<(&'a [Credential], &'a Credential), TxError> {
        let credentials: &'a [Credential] = &self.tx.credentials;
        match credentials.split_last() {
            Some((last, rest)) if rest.len() == input_count => Ok((rest, last)),
            _ => Err(TxError::WrongNumberOfCredentials {
                expected: input_count + 1,
                actual: credentials.len(),
            }),
        }
    }

    /// A diff on top of the parent that consumes `inputs` and produces `outputs`.
    fn transition(
        &self,
        inputs: &[TransferableInput],
        outputs: &[TransferableOutput],
        lock_ids: &[LockIds],
    ) -> Result<Diff, TxError> {
        let mut diff = Diff::new(self.parent);
        consume(diff.data_mut(), inputs)?;
        produce(diff.data_mut(), self.tx_id, 0, outputs, lock_ids)?;
        Ok(diff)
    }

    fn record(&self, diff: &mut Diff, status: TxStatus) {
        diff.data_mut().add_tx(self.tx_id, self.tx.clone(), status);
    }
}

impl TxVisitor for TxExecutor<'_> {
    type Output = Result<ExecOutcome, TxError>;

    fn add_validator(&mut self, tx: &AddValidatorTx) -> Self::Output {
        self.execute_add_validator(tx)
    }

    fn add_subnet_validator(&mut self, tx: &AddSubnetValidatorTx) -> Self::Output {
        self.execute_add_subnet_validator(tx)
    }

    fn add_lock(&mut self, tx: &AddLockTx) -> Self::Output {
        self.execute_add_lock(tx)
    }

    fn add_deposit(&mut self, tx: &AddDepositTx) -> Self::Output {
        self.execute_add_deposit(tx)
    }

    fn import(&mut self, tx: &ImportTx) -> Self::Output {
        self.execute_import(tx)
    }

    fn export(&mut self, tx: &ExportTx) -> Self::Output {
        self.execute_export(tx)
    }

    fn create_chain(&mut self, tx: &CreateChainTx) -> Self::Output {
        self.execute_create_chain(tx)
    }

    fn create_subnet(&mut self, tx: &CreateSubnetTx) -> Self::Output {
        self.execute_create_subnet(tx)
    }

    fn advance_time(&mut self, tx: &AdvanceTimeTx) -> Self::Output {
        self.execute_advance_time(tx)
    }

    fn reward_validator(&mut self, tx: &RewardValidatorTx) -> Self::Output {
        self.execute_reward_validator(tx)
    }

    fn reward_lock(&mut self, tx: &RewardLockTx) -> Self::Output {
        self.execute_reward_lock(tx)
    }

    fn proposal_submit(&mut self, tx: &ProposalSubmitTx) -> Self::Output {
        self.execute_proposal_submit(tx)
    }

    fn proposal_vote(&mut self, tx: &ProposalVoteTx) -> Self::Output {
        self.execute_proposal_vote(tx)
    }

    fn proposal_conclude(&mut self, tx: &ProposalConcludeTx) -> Self::Output {
        self.execute_proposal_conclude(tx)
    }

    // Governance payloads execute only through a concluded proposal.
    fn base_fee(&mut self, _: &BaseFeeTx) -> Self::Output {
        Err(TxError::NotGovernanceTx)
    }

    fn add_deposit_offer(&mut self, _: &AddDepositOfferTx) -> Self::Output {
        Err(TxError::NotGovernanceTx)
    }
}

/// Remove the UTXOs `inputs` spend, together with their lock-state entries.
pub(crate) fn consume(data: &mut StateData, inputs: &[TransferableInput]) -> Result<(), TxError> {
    let mut released = BTreeMap::new();
    for input in inputs {
        let utxo_id = input.input_id();
        if !data.lock_ids(&utxo_id).is_unlocked() {
            released.insert(utxo_id, LockIds::UNLOCKED);
        }
        data.delete_utxo(&utxo_id)?;
    }
    data.update_lock_states(&released);
    Ok(())
}

/// Add `outputs` as UTXOs of `tx_id`, numbered from `first_index`, held under `lock_ids`.
pub(crate) fn produce(
    data: &mut StateData,
    tx_id: Id,
    first_index: u32,
    outputs: &[TransferableOutput],
    lock_ids: &[LockIds],
) -> Result<(), TxError> {
    let mut locked = BTreeMap::new();
    for (index, (output, ids)) in (first_index..).zip(outputs.iter().zip(lock_ids)) {
        let utxo = Utxo {
            utxo_id: UtxoId::new(tx_id, index),
            asset_id: output.asset_id,
            output: output.output.clone(),
        };
        if !ids.is_unlocked() {
            locked.insert(utxo.input_id(), *ids);
        }
        data.add_utxo(utxo)?;
    }
    data.update_lock_states(&locked);
    Ok(())
}

/// A registry refused an entry the checks before it admitted.
fn registry_error<K>(prefix: [u8; 1]) -> impl FnOnce(RegistryError<K>) -> TxError {
    move |_| TxError::State(crate::state::chain_state::StateError::DuplicateEntry { prefix: prefix[0] })
}
