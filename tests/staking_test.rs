/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use log::LevelFilter;
use platformvm_rs::{
    block_processor::BlockError,
    config::{SECONDS_PER_DAY, SECONDS_PER_YEAR},
    events::Event,
    executor::TxError,
    reward,
    state::registry::StakerKey,
    types::{
        ids::{Amount, Id, ShortId, Timestamp},
        outputs::{LockState, Output, OutputOwners, UtxoId},
        txs::{AddLockTx, AddValidatorTx, RewardValidatorTx, Tx, UnsignedTx, Validator},
    },
};

mod common;

use crate::common::{
    harness::{release, test_config, TestChain, GENESIS_TIME},
    logging::setup_logger,
};

const BOND: Amount = 5_000_000;
const NODE: ShortId = ShortId::new([42; 20]);

/// An AddValidator transaction in which `users[0]` bonds [`BOND`] for `NODE`, validating for two
/// days from `start`.
fn add_validator_tx(chain: &TestChain, start: Timestamp) -> Tx {
    let user = &chain.users[0];
    let tx = AddValidatorTx {
        base: chain.paying_base(user, BOND),
        validator: Validator {
            node_id: NODE,
            start,
            end: start + 2 * SECONDS_PER_DAY,
            weight: BOND,
        },
        bond: vec![chain.output(LockState::Bonded, BOND, user)],
        rewards_owner: OutputOwners::single(user.address()),
        delegation_shares: 0,
    };
    chain.sign(UnsignedTx::AddValidator(tx), user, 0)
}

#[test]
fn bond_splits_into_bonded_and_change_on_commit_and_merges_on_abort() {
    setup_logger(LevelFilter::Debug);

    // 1. Stage an AddValidator transaction bonding half of the user's balance, with both options.
    let mut chain = TestChain::new();
    let user = chain.users[0].address();
    let start = GENESIS_TIME + 1_000;
    let tx = add_validator_tx(&chain, start);
    let tx_id = tx.id().unwrap();
    let (proposal_id, commit_id, abort_id) = chain.stage_proposal(tx).unwrap();

    // 2. The validator starts in the future, so this node prefers to commit.
    assert_eq!(chain.processor.prefers_commit(&proposal_id), Some(true));

    // 3. On commit, the user holds the bond and the change, and the validator is pending.
    let on_commit = chain.processor.view(&commit_id).unwrap();
    let bonded = TestChain::utxos_of(on_commit, user, LockState::Bonded);
    assert_eq!(bonded.len(), 1);
    assert_eq!(bonded[0].output.amount(), BOND);
    assert_eq!(on_commit.lock_ids(&bonded[0].input_id()).bond_tx_id, Some(tx_id));
    let change = TestChain::utxos_of(on_commit, user, LockState::Unlocked);
    assert_eq!(change.len(), 1);
    assert_eq!(change[0].output.amount(), 4_999_000);
    assert!(on_commit.pending_stakers().contains(&StakerKey::primary(NODE)));

    // 4. On abort, the bond and the change merge back into one unlocked UTXO, minus the fee.
    let on_abort = chain.processor.view(&abort_id).unwrap();
    let unlocked = TestChain::utxos_of(on_abort, user, LockState::Unlocked);
    assert_eq!(unlocked.len(), 1);
    assert_eq!(unlocked[0].output.amount(), 9_999_000);
    assert!(TestChain::utxos_of(on_abort, user, LockState::Bonded).is_empty());
    assert!(!on_abort.pending_stakers().contains(&StakerKey::primary(NODE)));

    // 5. Accept the proposal and its commit option. The abort option is rejected with it.
    chain.processor.accept_block(&proposal_id).unwrap();
    chain.processor.accept_block(&commit_id).unwrap();
    assert!(!chain.processor.is_staged(&abort_id));
    assert_eq!(chain.processor.last_accepted(), commit_id);
    assert_eq!(TestChain::balance_of(chain.state(), user, LockState::Bonded), BOND);
    assert_eq!(TestChain::balance_of(chain.state(), user, LockState::Unlocked), 4_999_000);
    assert!(chain.state().tx_status(&tx_id).is_some());
}

#[test]
fn bond_already_spent_cannot_be_bonded_again() {
    setup_logger(LevelFilter::Debug);

    let mut chain = TestChain::new();
    let start = GENESIS_TIME + 1_000;
    let tx = add_validator_tx(&chain, start);
    chain.commit(tx.clone()).unwrap();

    // Executing the same transaction again fails before its inputs are looked at.
    let result = chain.processor.verify_tx(&chain.processor.last_accepted(), &tx);
    assert!(matches!(result, Err(BlockError::Tx(TxError::DuplicateTx { .. }))));

    // A second validator for the same node fails even when it spends fresh funds.
    let other = &chain.users[1];
    let second = AddValidatorTx {
        base: chain.paying_base(other, BOND),
        validator: Validator {
            node_id: NODE,
            start: start + 10,
            end: start + 10 + 2 * SECONDS_PER_DAY,
            weight: BOND,
        },
        bond: vec![chain.output(LockState::Bonded, BOND, other)],
        rewards_owner: OutputOwners::single(other.address()),
        delegation_shares: 0,
    };
    let second = chain.sign(UnsignedTx::AddValidator(second), other, 0);
    let result = chain.processor.verify_tx(&chain.processor.last_accepted(), &second);
    assert!(matches!(
        result,
        Err(BlockError::Tx(TxError::AlreadyPendingValidator { node_id })) if node_id == NODE
    ));
}

#[test]
fn advance_time_promotes_pending_validator() {
    setup_logger(LevelFilter::Debug);

    // 1. Add a validator starting 1000 seconds after genesis.
    let mut chain = TestChain::new();
    let start = GENESIS_TIME + 1_000;
    let tx = add_validator_tx(&chain, start);
    let tx_id = tx.id().unwrap();
    chain.commit(tx).unwrap();
    let parent = chain.processor.last_accepted();

    // 2. Time may not stand still, skip past the next event, or run ahead of the wall clock.
    let result = chain.processor.verify_tx(&parent, &chain.advance_time_tx(GENESIS_TIME));
    assert!(matches!(
        result,
        Err(BlockError::Tx(TxError::NotAfterCurrentTimestamp { .. }))
    ));
    chain.clock.set(start + 5);
    let result = chain.processor.verify_tx(&parent, &chain.advance_time_tx(start + 1));
    assert!(matches!(
        result,
        Err(BlockError::Tx(TxError::LaterThanNextStaker { next, .. })) if next == start
    ));
    chain.clock.set(GENESIS_TIME);
    let result = chain.processor.verify_tx(&parent, &chain.advance_time_tx(start));
    assert!(matches!(
        result,
        Err(BlockError::Tx(TxError::TooFarInTheFuture { .. }))
    ));

    // 3. With the wall clock caught up, the abort option leaves the state as it was.
    chain.clock.set(start);
    let (proposal_id, commit_id, abort_id) = chain.stage_proposal(chain.advance_time_tx(start)).unwrap();
    assert_eq!(chain.processor.prefers_commit(&proposal_id), Some(true));
    let on_abort = chain.processor.view(&abort_id).unwrap();
    assert_eq!(on_abort.timestamp(), GENESIS_TIME);
    assert!(on_abort.pending_stakers().contains(&StakerKey::primary(NODE)));

    // 4. The commit option moves the chain time and promotes the validator, reserving its reward.
    let supply_before = chain.state().current_supply();
    let on_commit = chain.processor.view(&commit_id).unwrap();
    assert_eq!(on_commit.timestamp(), start);
    assert!(!on_commit.pending_stakers().contains(&StakerKey::primary(NODE)));
    let staker = on_commit.current_stakers().get(&StakerKey::primary(NODE)).unwrap().clone();
    assert_eq!(staker.tx_id, tx_id);
    assert!(staker.potential_reward > 0);
    assert_eq!(on_commit.current_supply(), supply_before + staker.potential_reward);

    // 5. Accepting the commit option publishes the new time and the promotion.
    chain.drain_events();
    chain.processor.accept_block(&proposal_id).unwrap();
    chain.processor.accept_block(&commit_id).unwrap();
    assert_eq!(chain.chain_time(), start);

    let events = chain.drain_events();
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::AcceptBlock(accept) if accept.block == commit_id)));
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::RejectBlock(reject) if reject.block == abort_id)));
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::AdvanceTime(advance) if advance.chain_time == start)));
    assert!(events.iter().any(|event| matches!(
        event,
        Event::PromoteStaker(promote)
            if promote.staker_tx == tx_id && promote.potential_reward == staker.potential_reward
    )));
}

/// Add the validator, promote it, and advance to its end. Returns the id of its AddValidator
/// transaction and the time it ends at.
fn validator_at_end(chain: &mut TestChain) -> (Id, Timestamp) {
    let start = GENESIS_TIME + 1_000;
    let tx = add_validator_tx(chain, start);
    let tx_id = tx.id().unwrap();
    chain.commit(tx).unwrap();
    chain.advance_time(start).unwrap();
    let end = start + 2 * SECONDS_PER_DAY;
    chain.advance_time(end).unwrap();
    (tx_id, end)
}

fn reward_tx(chain: &TestChain, validator_tx_id: Id) -> RewardValidatorTx {
    let (ins, outs) = release(chain.state(), &validator_tx_id, true);
    RewardValidatorTx {
        base: chain.empty_base(),
        validator_tx_id,
        ins,
        outs,
    }
}

#[test]
fn reward_at_end_returns_bond_and_pays_reward() {
    setup_logger(LevelFilter::Debug);

    // 1. Run the validator to its end.
    let mut chain = TestChain::new();
    let user = chain.users[0].address();
    let (validator_tx_id, end) = validator_at_end(&mut chain);
    assert_eq!(chain.chain_time(), end);
    let staker = chain
        .state()
        .current_stakers()
        .get(&StakerKey::primary(NODE))
        .unwrap()
        .clone();
    let bonded: Vec<Id> = chain.state().lock_states().bonded_utxos(&validator_tx_id);
    assert_eq!(bonded.len(), 1);

    // 2. A reward transaction must release exactly the validator's bond.
    let reward = reward_tx(&chain, validator_tx_id);
    assert_eq!(reward.ins.len(), 1);
    let parent = chain.processor.last_accepted();

    let mut mutated = reward.clone();
    if let Output::Transfer(output) = &mut mutated.outs[0].output {
        output.amount -= 1;
    }
    let result = chain
        .processor
        .verify_tx(&parent, &Tx::system(UnsignedTx::RewardValidator(mutated)));
    assert!(matches!(result, Err(BlockError::Tx(TxError::TxBodyMismatch))));

    let mut truncated = reward.clone();
    truncated.ins.clear();
    let result = chain
        .processor
        .verify_tx(&parent, &Tx::system(UnsignedTx::RewardValidator(truncated)));
    assert!(matches!(result, Err(BlockError::Tx(TxError::TxBodyMismatch))));

    // 3. Only the staker ending next may be rewarded.
    let genesis_validator = chain
        .state()
        .current_stakers()
        .iter()
        .find(|staker| staker.node_id() != NODE)
        .unwrap()
        .tx_id;
    let wrong_target = reward_tx(&chain, genesis_validator);
    let result = chain
        .processor
        .verify_tx(&parent, &Tx::system(UnsignedTx::RewardValidator(wrong_target)));
    assert!(matches!(
        result,
        Err(BlockError::Tx(TxError::UnexpectedRewardTarget { expected: Some(expected), .. })) if expected == validator_tx_id
    ));

    // 4. Commit the reward.
    let supply_before = chain.state().current_supply();
    let outs_len = reward.outs.len() as u32;
    let tx = Tx::system(UnsignedTx::RewardValidator(reward));
    let reward_tx_id = tx.id().unwrap();
    chain.drain_events();
    chain.commit(tx).unwrap();

    // 5. The bond is released, the reward paid to the rewards owner, and the staker removed.
    let state = chain.state();
    assert!(state.utxo(&bonded[0]).is_none());
    assert!(state.lock_states().bonded_utxos(&validator_tx_id).is_empty());
    let paid = state
        .utxo(&UtxoId::new(reward_tx_id, outs_len).input_id())
        .unwrap();
    assert_eq!(paid.output.amount(), staker.potential_reward);
    assert_eq!(paid.output.owners(), &OutputOwners::single(user));
    assert_eq!(
        TestChain::balance_of(state, user, LockState::Unlocked),
        4_999_000 + BOND + staker.potential_reward
    );
    assert_eq!(TestChain::balance_of(state, user, LockState::Bonded), 0);
    assert!(!state.current_stakers().contains(&StakerKey::primary(NODE)));
    assert_eq!(state.current_supply(), supply_before);

    let events = chain.drain_events();
    assert!(events.iter().any(|event| matches!(
        event,
        Event::RewardStaker(reward)
            if reward.staker_tx == validator_tx_id && reward.committed && reward.reward == staker.potential_reward
    )));
}

#[test]
fn validator_below_uptime_requirement_forfeits_reward() {
    setup_logger(LevelFilter::Debug);

    let mut chain = TestChain::new();
    let user = chain.users[0].address();
    let (validator_tx_id, _) = validator_at_end(&mut chain);
    let potential_reward = chain
        .state()
        .current_stakers()
        .get(&StakerKey::primary(NODE))
        .unwrap()
        .potential_reward;

    // 1. With poor uptime this node prefers to abort the reward.
    chain.uptimes.set(NODE, 500_000);
    let tx = Tx::system(UnsignedTx::RewardValidator(reward_tx(&chain, validator_tx_id)));
    let (proposal_id, _, abort_id) = chain.stage_proposal(tx).unwrap();
    assert_eq!(chain.processor.prefers_commit(&proposal_id), Some(false));

    // 2. Aborting returns the bond without a reward and releases the reservation.
    let supply_before = chain.state().current_supply();
    chain.processor.accept_block(&proposal_id).unwrap();
    chain.processor.accept_block(&abort_id).unwrap();
    let state = chain.state();
    assert_eq!(state.current_supply(), supply_before - potential_reward);
    assert_eq!(TestChain::balance_of(state, user, LockState::Unlocked), 4_999_000 + BOND);
    assert!(!state.current_stakers().contains(&StakerKey::primary(NODE)));
}

#[test]
fn lock_reward_is_cut_to_supply_cap() {
    setup_logger(LevelFilter::Debug);

    // 1. Start a chain whose supply cap leaves less headroom than a year-long lock earns.
    let mut config = test_config();
    config.stake_reward.supply_cap = 56_100_000;
    let mut chain = TestChain::with_config(config);
    let cap = chain.config.stake_reward.supply_cap;
    let headroom = cap - chain.state().current_supply();

    let keypair = chain.users[0].clone();
    let amount: Amount = 3_000_000;
    let start = GENESIS_TIME + 100;
    let full_reward = reward::lock_reward(&chain.config.lock_reward, amount, SECONDS_PER_YEAR);
    assert!(full_reward > headroom);

    // 2. The pending lock carries its full reward.
    let tx = AddLockTx {
        base: chain.paying_base(&keypair, amount),
        locked_outs: vec![chain.output(LockState::Deposited, amount, &keypair)],
        start,
        end: start + SECONDS_PER_YEAR,
        amount,
        rewards_owner: OutputOwners::single(keypair.address()),
    };
    let tx = chain.sign(UnsignedTx::AddLock(tx), &keypair, 0);
    let lock_id = tx.id().unwrap();
    chain.commit(tx).unwrap();
    assert_eq!(
        chain.state().pending_locks().get(&lock_id).unwrap().potential_reward,
        full_reward
    );

    // 3. Promotion reserves only what the cap still allows.
    chain.advance_time(start).unwrap();
    let state = chain.state();
    assert_eq!(state.current_locks().get(&lock_id).unwrap().potential_reward, headroom);
    assert_eq!(state.current_supply(), cap);
}
