/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Proposal transactions: each yields a successor for commit and a sibling successor for abort.

use super::{
    produce, registry_error,
    spend::{resolve, revert_locks, unlock, LockMode},
    ExecOutcome, TxError, TxExecutor,
};
use crate::{
    config::Config,
    math, reward,
    state::{
        chain_state::{StateData, TxStatus},
        diff::Diff,
        registry::{Lock, LockTx, Proposal, ProposalState, RegistryEntry, Staker, StakerKey, StakerTx},
        variables,
    },
    types::{
        ids::{Amount, Id, Timestamp},
        outputs::{LockIds, Output, OutputOwners, TransferOutput, TransferableInput, TransferableOutput},
        txs::{
            AddDepositTx, AddLockTx, AddSubnetValidatorTx, AddValidatorTx, AdvanceTimeTx, BaseTx, ProposalConcludeTx,
            ProposalSubmitTx, ProposalVoteTx, RewardLockTx, RewardValidatorTx, UnsignedTx,
        },
    },
};

impl TxExecutor<'_> {
    /* ↓↓↓ Stakers and locks ↓↓↓ */

    pub(super) fn execute_add_validator(&self, tx: &AddValidatorTx) -> Result<ExecOutcome, TxError> {
        let start = tx.validator.start;
        self.check_start(start)?;
        let node_id = tx.validator.node_id;
        let key = StakerKey::primary(node_id);
        if self.data().current_stakers().contains(&key) {
            return Err(TxError::AlreadyValidating { node_id });
        }
        if self.data().pending_stakers().contains(&key) {
            return Err(TxError::AlreadyPendingValidator { node_id });
        }

        let (mut on_commit, on_abort) = self.lock(LockMode::Bond, &tx.base, &tx.bond)?;
        let staker = Staker {
            tx_id: self.tx_id,
            tx: StakerTx::Primary(tx.clone()),
            potential_reward: 0,
        };
        let pending = self
            .data()
            .pending_stakers()
            .add(staker)
            .map_err(registry_error(variables::PENDING_STAKERS))?;
        on_commit.data_mut().set_pending_stakers(pending);

        Ok(ExecOutcome::Proposal {
            on_commit,
            on_abort,
            prefers_commit: start > self.wall_clock(),
        })
    }

    pub(super) fn execute_add_subnet_validator(&self, tx: &AddSubnetValidatorTx) -> Result<ExecOutcome, TxError> {
        let validator = &tx.validator.validator;
        let subnet_id = tx.validator.subnet_id;
        self.check_start(validator.start)?;
        let owner = self
            .data()
            .subnet_owner(&subnet_id)
            .ok_or(TxError::SubnetDoesNotExist { subnet_id })?;

        let node_id = validator.node_id;
        let key = StakerKey { subnet_id, node_id };
        if self.data().current_stakers().contains(&key) {
            return Err(TxError::AlreadyValidating { node_id });
        }
        if self.data().pending_stakers().contains(&key) {
            return Err(TxError::AlreadyPendingValidator { node_id });
        }
        let primary = StakerKey::primary(node_id);
        let covered = self
            .data()
            .current_stakers()
            .get(&primary)
            .or_else(|| self.data().pending_stakers().get(&primary))
            .map_or(false, |staker| {
                staker.start() <= validator.start && validator.end <= staker.end()
            });
        if !covered {
            return Err(TxError::DSValidatorSubset { node_id });
        }

        let (credentials, subnet_auth) = self.split_credentials(tx.base.ins.len())?;
        self.backend
            .fx
            .verify_permission(self.unsigned_bytes, &tx.subnet_auth.sig_indices, subnet_auth, owner)?;
        let inputs = resolve(self.data(), &tx.base.ins)?;
        let lock_ids = self.verify_spend(&inputs, &tx.base.outs, credentials, None, self.data().base_fee())?;

        let mut on_commit = self.transition(&tx.base.ins, &tx.base.outs, &lock_ids)?;
        let mut on_abort = self.transition(&tx.base.ins, &tx.base.outs, &lock_ids)?;
        self.record(&mut on_commit, TxStatus::Committed);
        self.record(&mut on_abort, TxStatus::Aborted);
        let staker = Staker {
            tx_id: self.tx_id,
            tx: StakerTx::Subnet(tx.clone()),
            potential_reward: 0,
        };
        let pending = self
            .data()
            .pending_stakers()
            .add(staker)
            .map_err(registry_error(variables::PENDING_STAKERS))?;
        on_commit.data_mut().set_pending_stakers(pending);

        Ok(ExecOutcome::Proposal {
            on_commit,
            on_abort,
            prefers_commit: validator.start > self.wall_clock(),
        })
    }

    pub(super) fn execute_add_lock(&self, tx: &AddLockTx) -> Result<ExecOutcome, TxError> {
        self.check_start(tx.start)?;
        let (mut on_commit, on_abort) = self.lock(LockMode::Deposit, &tx.base, &tx.locked_outs)?;
        let lock = Lock {
            tx_id: self.tx_id,
            tx: LockTx::Lock(tx.clone()),
            potential_reward: reward::lock_reward(&self.config().lock_reward, tx.amount, tx.end - tx.start),
        };
        self.add_pending_lock(&mut on_commit, lock)?;

        Ok(ExecOutcome::Proposal {
            on_commit,
            on_abort,
            prefers_commit: tx.start > self.wall_clock(),
        })
    }

    pub(super) fn execute_add_deposit(&self, tx: &AddDepositTx) -> Result<ExecOutcome, TxError> {
        let offer_id = tx.deposit_offer_id;
        let offer = self
            .data()
            .deposit_offer(&offer_id)
            .ok_or(TxError::DepositOfferNotFound { offer_id })?;
        if !offer.is_active_at(self.data().timestamp()) {
            return Err(TxError::DepositOfferInactive { offer_id });
        }
        let duration = tx.end - tx.start;
        if tx.amount < offer.min_amount || !(offer.min_duration..=offer.max_duration).contains(&duration) {
            return Err(TxError::DepositOfferBounds { offer_id });
        }
        self.check_start(tx.start)?;

        let (mut on_commit, on_abort) = self.lock(LockMode::Deposit, &tx.base, &tx.deposited_outs)?;
        let lock = Lock {
            tx_id: self.tx_id,
            tx: LockTx::Deposit(tx.clone()),
            potential_reward: reward::deposit_reward(offer, tx.amount, duration),
        };
        self.add_pending_lock(&mut on_commit, lock)?;

        Ok(ExecOutcome::Proposal {
            on_commit,
            on_abort,
            prefers_commit: tx.start > self.wall_clock(),
        })
    }

    /* ↓↓↓ Chain time ↓↓↓ */

    pub(super) fn execute_advance_time(&self, tx: &AdvanceTimeTx) -> Result<ExecOutcome, TxError> {
        let current = self.data().timestamp();
        if tx.time <= current {
            return Err(TxError::NotAfterCurrentTimestamp { time: tx.time, current });
        }
        if let Some(next) = self.data().next_event_time() {
            if tx.time > next {
                return Err(TxError::LaterThanNextStaker { time: tx.time, next });
            }
        }
        let now = self.wall_clock();
        let max = now.saturating_add(self.config().max_future_drift);
        if tx.time > max {
            return Err(TxError::TooFarInTheFuture { time: tx.time, max });
        }

        let mut on_commit = Diff::new(self.parent);
        advance_time(on_commit.data_mut(), self.config(), tx.time)?;
        self.record(&mut on_commit, TxStatus::Committed);

        // An aborted time advance leaves no trace, so it can be proposed again.
        Ok(ExecOutcome::Proposal {
            on_commit,
            on_abort: Diff::new(self.parent),
            prefers_commit: tx.time <= now,
        })
    }

    /* ↓↓↓ Rewards ↓↓↓ */

    pub(super) fn execute_reward_validator(&self, tx: &RewardValidatorTx) -> Result<ExecOutcome, TxError> {
        let staker = match self.data().current_stakers().get_next() {
            Some(next) if next.tx_id == tx.validator_tx_id => next.clone(),
            next => {
                return Err(TxError::UnexpectedRewardTarget {
                    expected: next.map(|staker| staker.tx_id),
                    actual: tx.validator_tx_id,
                })
            }
        };
        let (mut on_commit, mut on_abort) = self.reward(
            LockMode::Unbond,
            staker.tx_id,
            staker.end(),
            &tx.ins,
            &tx.outs,
            staker.rewards_owner(),
            staker.potential_reward,
        )?;
        let (current, _) = self
            .data()
            .current_stakers()
            .remove(&staker.key())
            .ok_or(TxError::UnexpectedRewardTarget {
                expected: None,
                actual: staker.tx_id,
            })?;
        on_commit.data_mut().set_current_stakers(current.clone());
        on_abort.data_mut().set_current_stakers(current);

        let prefers_commit = match staker.tx {
            StakerTx::Primary(_) => {
                self.backend.uptimes.uptime(&staker.node_id(), staker.start()) >= self.config().uptime_requirement
            }
            StakerTx::Subnet(_) => true,
        };
        Ok(ExecOutcome::Proposal {
            on_commit,
            on_abort,
            prefers_commit,
        })
    }

    pub(super) fn execute_reward_lock(&self, tx: &RewardLockTx) -> Result<ExecOutcome, TxError> {
        let lock = match self.data().current_locks().get_next() {
            Some(next) if next.tx_id == tx.lock_tx_id => next.clone(),
            next => {
                return Err(TxError::UnexpectedRewardTarget {
                    expected: next.map(|lock| lock.tx_id),
                    actual: tx.lock_tx_id,
                })
            }
        };
        let (mut on_commit, mut on_abort) = self.reward(
            LockMode::Undeposit,
            lock.tx_id,
            lock.end(),
            &tx.ins,
            &tx.outs,
            Some(lock.rewards_owner()),
            lock.potential_reward,
        )?;
        let (current, _) = self
            .data()
            .current_locks()
            .remove(&lock.tx_id)
            .ok_or(TxError::UnexpectedRewardTarget {
                expected: None,
                actual: lock.tx_id,
            })?;
        on_commit.data_mut().set_current_locks(current.clone());
        on_abort.data_mut().set_current_locks(current);

        Ok(ExecOutcome::Proposal {
            on_commit,
            on_abort,
            prefers_commit: true,
        })
    }

    /* ↓↓↓ Proposals ↓↓↓ */

    pub(super) fn execute_proposal_submit(&self, tx: &ProposalSubmitTx) -> Result<ExecOutcome, TxError> {
        let threshold = tx.proposal.threshold;
        if threshold as usize > self.data().primary_validator_count() {
            return Err(TxError::InvalidProposalThreshold { threshold });
        }
        let kind = std::mem::discriminant(tx.proposed_tx.as_ref());
        if let Some(existing) = self
            .data()
            .proposals()
            .iter()
            .find(|proposal| std::mem::discriminant(proposal.tx.proposed_tx.as_ref()) == kind)
        {
            return Err(TxError::DuplicateProposal {
                existing: existing.tx_id,
            });
        }
        self.check_start(tx.proposal.start)?;

        let (mut on_commit, on_abort) = self.lock(LockMode::Bond, &tx.base, &tx.bond)?;
        let proposals = self
            .data()
            .proposals()
            .add(Proposal::new(self.tx_id, tx.clone()))
            .map_err(registry_error(variables::PROPOSALS))?;
        on_commit.data_mut().set_proposals(proposals);

        Ok(ExecOutcome::Proposal {
            on_commit,
            on_abort,
            prefers_commit: tx.proposal.start > self.wall_clock(),
        })
    }

    pub(super) fn execute_proposal_vote(&self, tx: &ProposalVoteTx) -> Result<ExecOutcome, TxError> {
        let proposal_id = tx.proposal_id;
        let proposal = self
            .data()
            .proposals()
            .get(&proposal_id)
            .ok_or(TxError::ProposalNotFound { proposal_id })?;
        let now = self.data().timestamp();
        if proposal.state != ProposalState::Active || now < proposal.start_time() || now >= proposal.end_time() {
            return Err(TxError::ProposalNotActive { proposal_id });
        }

        let node_id = tx.voter_node_id;
        let staker = self
            .data()
            .current_stakers()
            .get(&StakerKey::primary(node_id))
            .ok_or(TxError::NotValidator { node_id })?;
        let (credentials, voter_auth) = self.split_credentials(tx.base.ins.len())?;
        let signers = self.backend.fx.recover_signers(self.unsigned_bytes, voter_auth)?;
        let controlling = staker.controlling_addresses();
        if !signers.iter().any(|signer| controlling.contains(signer)) {
            return Err(TxError::NotValidator { node_id });
        }
        if proposal.votes.contains_key(&node_id) {
            return Err(TxError::ProposalAlreadyVoted { proposal_id, node_id });
        }

        let inputs = resolve(self.data(), &tx.base.ins)?;
        let lock_ids = self.verify_spend(&inputs, &tx.base.outs, credentials, None, self.data().base_fee())?;
        let mut on_commit = self.transition(&tx.base.ins, &tx.base.outs, &lock_ids)?;
        let mut on_abort = self.transition(&tx.base.ins, &tx.base.outs, &lock_ids)?;
        self.record(&mut on_commit, TxStatus::Committed);
        self.record(&mut on_abort, TxStatus::Aborted);

        let mut voted = proposal.clone();
        voted.votes.insert(node_id, tx.option_index);
        if voted.threshold_reached() {
            voted.state = ProposalState::Accepted;
        }
        let proposals = self
            .data()
            .proposals()
            .replace(voted)
            .map_err(registry_error(variables::PROPOSALS))?;
        on_commit.data_mut().set_proposals(proposals);

        Ok(ExecOutcome::Proposal {
            on_commit,
            on_abort,
            prefers_commit: true,
        })
    }

    /// Close a proposal that has ended or reached its threshold and return its bond. A proposal
    /// that reached its threshold has its governance transaction executed.
    pub(super) fn execute_proposal_conclude(&self, tx: &ProposalConcludeTx) -> Result<ExecOutcome, TxError> {
        let proposal_id = tx.proposal_id;
        let proposal = self
            .data()
            .proposals()
            .get(&proposal_id)
            .ok_or(TxError::ProposalNotFound { proposal_id })?;
        let accepted = proposal.threshold_reached();
        if self.data().timestamp() < proposal.end_time() && !accepted {
            return Err(TxError::ThresholdNotReached { proposal_id });
        }

        let (ins, outs) = unlock(self.data(), &proposal_id, LockMode::Unbond)?;
        let inputs = resolve(self.data(), &ins)?;
        let lock_ids = self
            .spend()
            .check(&inputs, &outs, None, Some(LockMode::Unbond), self.tx_id, 0)?;

        let mut on_commit = self.transition(&ins, &outs, &lock_ids)?;
        let (proposals, _) = self
            .data()
            .proposals()
            .remove(&proposal_id)
            .ok_or(TxError::ProposalNotFound { proposal_id })?;
        on_commit.data_mut().set_proposals(proposals);
        if accepted {
            let mut executed = Diff::new(&on_commit);
            execute_governance(executed.data_mut(), &proposal.tx.proposed_tx)?;
            executed.apply(&mut on_commit)?;
        }
        self.record(&mut on_commit, TxStatus::Committed);

        Ok(ExecOutcome::Proposal {
            on_commit,
            on_abort: Diff::new(self.parent),
            prefers_commit: true,
        })
    }

    /* ↓↓↓ Helpers ↓↓↓ */

    /// A staker, lock or proposal must start after the chain time, and not too far after it.
    fn check_start(&self, start: Timestamp) -> Result<(), TxError> {
        let current = self.data().timestamp();
        if start <= current {
            return Err(TxError::StartNotAfterCurrentTimestamp { start, current });
        }
        let max = current.saturating_add(self.config().max_future_start_time);
        if start > max {
            return Err(TxError::FutureStartTime { start, max });
        }
        Ok(())
    }

    /// Spend `base` into its outputs plus `locked_outs` under `mode`, paying the base fee. On
    /// commit the outputs are produced as given; on abort the lock this transaction would have
    /// created is reverted. Both successors record the transaction.
    fn lock(&self, mode: LockMode, base: &BaseTx, locked_outs: &[TransferableOutput]) -> Result<(Diff, Diff), TxError> {
        let outputs: Vec<TransferableOutput> = base.outs.iter().chain(locked_outs).cloned().collect();
        let inputs = resolve(self.data(), &base.ins)?;
        let lock_ids = self.verify_spend(
            &inputs,
            &outputs,
            &self.tx.credentials,
            Some(mode),
            self.data().base_fee(),
        )?;

        let mut on_commit = self.transition(&base.ins, &outputs, &lock_ids)?;
        let (reverted, reverted_ids) = revert_locks(mode, self.tx_id, &outputs, &lock_ids)?;
        let mut on_abort = self.transition(&base.ins, &reverted, &reverted_ids)?;
        self.record(&mut on_commit, TxStatus::Committed);
        self.record(&mut on_abort, TxStatus::Aborted);
        Ok((on_commit, on_abort))
    }

    fn add_pending_lock(&self, on_commit: &mut Diff, lock: Lock) -> Result<(), TxError> {
        let pending = self
            .data()
            .pending_locks()
            .add(lock)
            .map_err(registry_error(variables::PENDING_LOCKS))?;
        on_commit.data_mut().set_pending_locks(pending);
        Ok(())
    }

    /// Release the lock `lock_tx_id` holds once it has ended. `ins` and `outs` must be exactly the
    /// canonical unlock. On commit `potential_reward` is paid to `rewards_owner` as one more output;
    /// on abort its reservation is returned to the supply.
    #[allow(clippy::too_many_arguments)]
    fn reward(
        &self,
        mode: LockMode,
        lock_tx_id: Id,
        end: Timestamp,
        ins: &[TransferableInput],
        outs: &[TransferableOutput],
        rewards_owner: Option<&OutputOwners>,
        potential_reward: Amount,
    ) -> Result<(Diff, Diff), TxError> {
        let now = self.data().timestamp();
        if now < end {
            return Err(TxError::RewardBeforeEndTime { end, now });
        }
        let (canonical_ins, canonical_outs) = unlock(self.data(), &lock_tx_id, mode)?;
        if ins != canonical_ins.as_slice() || outs != canonical_outs.as_slice() {
            return Err(TxError::TxBodyMismatch);
        }
        let inputs = resolve(self.data(), ins)?;
        let lock_ids = self.spend().check(&inputs, outs, None, Some(mode), self.tx_id, 0)?;

        let mut on_commit = self.transition(ins, outs, &lock_ids)?;
        if let Some(owner) = rewards_owner.filter(|_| potential_reward > 0) {
            let reward = TransferableOutput::new(
                self.config().native_asset_id,
                Output::Transfer(TransferOutput::new(potential_reward, owner.clone())),
            );
            produce(
                on_commit.data_mut(),
                self.tx_id,
                outs.len() as u32,
                &[reward],
                &[LockIds::UNLOCKED],
            )?;
        }
        self.record(&mut on_commit, TxStatus::Committed);

        let mut on_abort = self.transition(ins, outs, &lock_ids)?;
        let supply = math::sub(self.data().current_supply(), potential_reward)?;
        on_abort.data_mut().set_current_supply(supply);
        self.record(&mut on_abort, TxStatus::Aborted);
        Ok((on_commit, on_abort))
    }
}

/// Move the chain time to `time`, promoting every pending staker and lock that starts by then.
/// A promoted primary validator's reward is computed against the supply at its promotion, a
/// promoted lock's reward is cut down to what the supply cap still allows, and every promoted
/// reward is reserved in the supply.
pub(crate) fn advance_time(data: &mut StateData, config: &Config, time: Timestamp) -> Result<(), TxError> {
    data.set_timestamp(time);
    let mut supply = data.current_supply();

    let mut pending = data.pending_stakers().clone();
    let mut current = data.current_stakers().clone();
    while pending.get_next().map_or(false, |staker| staker.start() <= time) {
        let Some((rest, mut staker)) = pending.delete_next() else {
            break;
        };
        pending = rest;
        if let StakerTx::Primary(_) = staker.tx {
            staker.potential_reward = reward::stake_reward(
                &config.stake_reward,
                staker.weight(),
                staker.end().saturating_sub(staker.start()),
                supply,
            );
            supply = math::add(supply, staker.potential_reward)?;
        }
        current = current
            .add(staker)
            .map_err(registry_error(variables::CURRENT_STAKERS))?;
    }
    data.set_pending_stakers(pending);
    data.set_current_stakers(current);

    let mut pending = data.pending_locks().clone();
    let mut current = data.current_locks().clone();
    while pending.get_next().map_or(false, |lock| lock.start() <= time) {
        let Some((rest, mut lock)) = pending.delete_next() else {
            break;
        };
        pending = rest;
        lock.potential_reward = reward::capped(&config.stake_reward, lock.potential_reward, supply);
        supply = math::add(supply, lock.potential_reward)?;
        current = current
            .add(lock)
            .map_err(registry_error(variables::CURRENT_LOCKS))?;
    }
    data.set_pending_locks(pending);
    data.set_current_locks(current);

    data.set_current_supply(supply);
    Ok(())
}

/// Carry out the governance transaction of an accepted proposal.
pub(crate) fn execute_governance(data: &mut StateData, proposed: &UnsignedTx) -> Result<(), TxError> {
    match proposed {
        UnsignedTx::BaseFee(tx) => data.set_base_fee(tx.fee),
        UnsignedTx::AddDepositOffer(tx) => data.add_deposit_offer(tx.offer.id()?, tx.offer.clone()),
        other => return Err(TxError::WrongTxKind { kind: other.name() }),
    }
    Ok(())
}
