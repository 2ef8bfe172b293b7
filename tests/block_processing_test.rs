/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use log::LevelFilter;
use platformvm_rs::{
    block_processor::BlockError,
    events::Event,
    executor::TxError,
    interfaces::Mempool,
    types::{
        block::Block,
        crypto_primitives::Keypair,
        ids::{Id, ShortId},
        outputs::{LockState, OutputOwners},
        txs::{
            AddSubnetValidatorTx, CreateChainTx, CreateSubnetTx, SubnetAuth, SubnetValidator, Tx, UnsignedTx,
            Validator,
        },
    },
};

mod common;

use crate::common::{
    harness::{genesis_node_id, TestChain, GENESIS_TIME, INITIAL_BALANCE},
    logging::setup_logger,
};

/// A CreateSubnet transaction spending everything `keypair` holds unlocked. Transactions built
/// from the same state with different owners spend the same UTXOs.
fn create_subnet_tx(chain: &TestChain, keypair: &Keypair, owner: ShortId) -> Tx {
    let (ins, total) = chain.spend_all(keypair);
    let change = chain.output(LockState::Unlocked, total - chain.config.create_subnet_fee, keypair);
    let tx = CreateSubnetTx {
        base: chain.base_tx(ins, vec![change]),
        owner: OutputOwners::single(owner),
    };
    chain.sign(UnsignedTx::CreateSubnet(tx), keypair, 0)
}

#[test]
fn malformed_blocks_are_not_staged() {
    setup_logger(LevelFilter::Debug);

    let mut chain = TestChain::new();
    let user = &chain.users[0];
    let tx = create_subnet_tx(&chain, user, user.address());
    let parent = chain.processor.last_accepted();
    let height = chain.processor.last_accepted_height() + 1;
    let time = chain.chain_time();

    let result = chain.processor.verify_and_stage(Block::standard(parent, height, time, Vec::new()));
    assert!(matches!(result, Err(BlockError::EmptyBlock)));

    let result = chain
        .processor
        .verify_and_stage(Block::standard(parent, height, time + 1, vec![tx.clone()]));
    assert!(matches!(
        result,
        Err(BlockError::WrongTimestamp { expected, .. }) if expected == time
    ));

    let result = chain
        .processor
        .verify_and_stage(Block::standard(parent, height + 1, time, vec![tx.clone()]));
    assert!(matches!(result, Err(BlockError::WrongHeight { .. })));

    let result = chain.processor.verify_and_stage(Block::standard(Id::hash(b"nowhere"), height, time, vec![tx.clone()]));
    assert!(result.is_err());

    let result = chain.processor.verify_and_stage(Block::commit(parent, height));
    assert!(matches!(result, Err(BlockError::OptionWithoutProposal { .. })));

    let advance = chain.advance_time_tx(time + 1);
    let result = chain
        .processor
        .verify_and_stage(Block::standard(parent, height, time, vec![advance]));
    assert!(matches!(result, Err(BlockError::Tx(TxError::WrongTxKind { .. }))));

    let result = chain.processor.verify_and_stage(Block::proposal(parent, height, tx.clone()));
    assert!(matches!(result, Err(BlockError::Tx(TxError::WrongTxKind { .. }))));

    // A well formed block is staged once.
    let block = Block::standard(parent, height, time, vec![tx]);
    let block_id = chain.processor.verify_and_stage(block.clone()).unwrap();
    assert!(chain.processor.is_staged(&block_id));
    let result = chain.processor.verify_and_stage(block);
    assert!(matches!(result, Err(BlockError::AlreadyKnown { .. })));

    let result = chain.processor.accept_block(&Id::hash(b"unknown block"));
    assert!(matches!(result, Err(BlockError::NotStaged { .. })));
}

#[test]
fn proposal_block_is_followed_only_by_its_options() {
    setup_logger(LevelFilter::Debug);

    let mut chain = TestChain::new();
    let time = chain.chain_time();
    chain.clock.set(time + 1);
    let (proposal_id, commit_id, _) = chain.stage_proposal(chain.advance_time_tx(time + 1)).unwrap();

    let user = &chain.users[0];
    let tx = create_subnet_tx(&chain, user, user.address());
    let height = chain.processor.last_accepted_height() + 2;
    let result = chain
        .processor
        .verify_and_stage(Block::standard(proposal_id, height, time, vec![tx]));
    assert!(matches!(result, Err(BlockError::ProposalChildNotOption { .. })));
    assert!(chain.processor.view(&proposal_id).is_err());

    // An option cannot be accepted before the proposal block.
    let result = chain.processor.accept_block(&commit_id);
    assert!(matches!(result, Err(BlockError::ParentNotAccepted { .. })));

    chain.processor.accept_block(&proposal_id).unwrap();
    assert!(chain.processor.is_staged(&proposal_id));
    chain.processor.accept_block(&commit_id).unwrap();
    assert!(!chain.processor.is_staged(&proposal_id));
    assert_eq!(chain.chain_time(), time + 1);
}

#[test]
fn create_subnet_then_chain_in_it() {
    setup_logger(LevelFilter::Debug);

    // 1. Create a subnet owned by the user, burning the subnet fee.
    let mut chain = TestChain::new();
    let user = chain.users[0].clone();
    let subnet_tx = create_subnet_tx(&chain, &user, user.address());
    let subnet_id = subnet_tx.id().unwrap();
    chain.accept_standard(vec![subnet_tx]).unwrap();
    assert_eq!(
        chain.state().subnet_owner(&subnet_id),
        Some(&OutputOwners::single(user.address()))
    );
    let balance = TestChain::balance_of(chain.state(), user.address(), LockState::Unlocked);
    assert_eq!(balance, INITIAL_BALANCE - chain.config.create_subnet_fee);

    // 2. A chain in a subnet that does not exist is refused.
    let create_chain = |chain: &TestChain, subnet_id: Id| {
        let (ins, total) = chain.spend_all(&user);
        let change = chain.output(LockState::Unlocked, total - chain.config.create_blockchain_fee, &user);
        let tx = CreateChainTx {
            base: chain.base_tx(ins, vec![change]),
            subnet_id,
            genesis: b"{}".to_vec(),
            vm_id: Id::hash(b"dex vm"),
            fx_ids: Vec::new(),
            chain_name: "dex".to_string(),
            subnet_auth: SubnetAuth { sig_indices: vec![0] },
        };
        chain.sign(UnsignedTx::CreateChain(tx), &user, 1)
    };
    let parent = chain.processor.last_accepted();
    let result = chain.processor.verify_tx(&parent, &create_chain(&chain, Id::hash(b"no subnet")));
    assert!(matches!(
        result,
        Err(BlockError::Tx(TxError::SubnetDoesNotExist { .. }))
    ));

    // 3. The subnet owner's signature admits a chain into the subnet.
    let chain_tx = create_chain(&chain, subnet_id);
    let chain_id = chain_tx.id().unwrap();
    chain.accept_standard(vec![chain_tx]).unwrap();
    let record = chain.state().chain(&chain_id).unwrap();
    assert_eq!(record.subnet_id, subnet_id);
    assert_eq!(record.name, "dex");
    let balance = TestChain::balance_of(chain.state(), user.address(), LockState::Unlocked);
    assert_eq!(
        balance,
        INITIAL_BALANCE - chain.config.create_subnet_fee - chain.config.create_blockchain_fee
    );
}

/// Sign `unsigned` with `keypair` for each of its inputs, then add a subnet credential signed by
/// `subnet_signer` unless it is `None`.
fn sign_with_subnet_auth(unsigned: UnsignedTx, keypair: &Keypair, subnet_signer: Option<&Keypair>) -> Tx {
    let inputs = unsigned.base().map_or(0, |base| base.ins.len());
    let mut signers: Vec<Vec<&Keypair>> = vec![vec![keypair]; inputs];
    signers.extend(subnet_signer.map(|signer| vec![signer]));
    Tx::sign(unsigned, &signers).unwrap()
}

/// Create a subnet owned by `users[0]` and return its id.
fn accept_subnet(chain: &mut TestChain) -> Id {
    let user = chain.users[0].clone();
    let subnet_tx = create_subnet_tx(chain, &user, user.address());
    let subnet_id = subnet_tx.id().unwrap();
    chain.accept_standard(vec![subnet_tx]).unwrap();
    subnet_id
}

#[test]
fn chain_creation_needs_the_subnet_owners_credential() {
    setup_logger(LevelFilter::Debug);

    let mut chain = TestChain::new();
    let subnet_id = accept_subnet(&mut chain);
    let user = chain.users[0].clone();
    let stranger = chain.users[1].clone();
    let (ins, total) = chain.spend_all(&user);
    let input_count = ins.len();
    let change = chain.output(LockState::Unlocked, total - chain.config.create_blockchain_fee, &user);
    let unsigned = UnsignedTx::CreateChain(CreateChainTx {
        base: chain.base_tx(ins, vec![change]),
        subnet_id,
        genesis: b"{}".to_vec(),
        vm_id: Id::hash(b"dex vm"),
        fx_ids: Vec::new(),
        chain_name: "dex".to_string(),
        subnet_auth: SubnetAuth { sig_indices: vec![0] },
    });
    let parent = chain.processor.last_accepted();

    // 1. Without the trailing credential the credential count is short by one.
    let unauthorised = sign_with_subnet_auth(unsigned.clone(), &user, None);
    let result = chain.processor.verify_tx(&parent, &unauthorised);
    assert!(matches!(
        result,
        Err(BlockError::Tx(TxError::WrongNumberOfCredentials { expected, actual }))
            if expected == input_count + 1 && actual == input_count
    ));

    // 2. A trailing credential from someone other than the owner is refused.
    let forged = sign_with_subnet_auth(unsigned.clone(), &user, Some(&stranger));
    let result = chain.processor.verify_tx(&parent, &forged);
    assert!(matches!(
        result,
        Err(BlockError::Tx(TxError::InputCredentialSignersMismatch { index: 0 }))
    ));

    // 3. The owner's credential is accepted.
    let authorised = sign_with_subnet_auth(unsigned, &user, Some(&user));
    assert!(chain.processor.verify_tx(&parent, &authorised).is_ok());
}

#[test]
fn subnet_validator_needs_the_subnet_owners_credential() {
    setup_logger(LevelFilter::Debug);

    let mut chain = TestChain::new();
    let subnet_id = accept_subnet(&mut chain);
    let user = chain.users[0].clone();
    let stranger = chain.users[1].clone();
    let base = chain.paying_base(&user, 0);
    let input_count = base.ins.len();
    let start = GENESIS_TIME + 100;
    // Inside the period the genesis validator validates the primary network.
    let unsigned = UnsignedTx::AddSubnetValidator(AddSubnetValidatorTx {
        base,
        validator: SubnetValidator {
            validator: Validator {
                node_id: genesis_node_id(0),
                start,
                end: start + 2 * chain.config.min_stake_duration,
                weight: 1,
            },
            subnet_id,
        },
        subnet_auth: SubnetAuth { sig_indices: vec![0] },
    });
    let parent = chain.processor.last_accepted();

    // 1. Without the trailing credential the credential count is short by one.
    let unauthorised = sign_with_subnet_auth(unsigned.clone(), &user, None);
    let result = chain.processor.verify_tx(&parent, &unauthorised);
    assert!(matches!(
        result,
        Err(BlockError::Tx(TxError::WrongNumberOfCredentials { expected, actual }))
            if expected == input_count + 1 && actual == input_count
    ));

    // 2. A trailing credential from someone other than the owner is refused.
    let forged = sign_with_subnet_auth(unsigned.clone(), &user, Some(&stranger));
    let result = chain.processor.verify_tx(&parent, &forged);
    assert!(matches!(
        result,
        Err(BlockError::Tx(TxError::InputCredentialSignersMismatch { index: 0 }))
    ));

    // 3. The owner's credential is accepted.
    let authorised = sign_with_subnet_auth(unsigned, &user, Some(&user));
    assert!(chain.processor.verify_tx(&parent, &authorised).is_ok());
}

#[test]
fn conflicting_spends_are_refused_on_the_same_branch_only() {
    setup_logger(LevelFilter::Debug);

    // 1. Two transactions spending the same UTXO.
    let mut chain = TestChain::new();
    let user = chain.users[0].clone();
    let first = create_subnet_tx(&chain, &user, user.address());
    let second = create_subnet_tx(&chain, &user, chain.users[1].address());
    assert_ne!(first.id().unwrap(), second.id().unwrap());
    let parent = chain.processor.last_accepted();
    let height = chain.processor.last_accepted_height() + 1;
    let time = chain.chain_time();

    // 2. They cannot share a block.
    let result = chain
        .processor
        .verify_and_stage(Block::standard(parent, height, time, vec![first.clone(), second.clone()]));
    assert!(matches!(
        result,
        Err(BlockError::Tx(TxError::ConflictingBatchTxs { .. }))
    ));

    // 3. Nor can one follow the other on a branch of staged blocks.
    let first_block = chain
        .processor
        .verify_and_stage(Block::standard(parent, height, time, vec![first.clone()]))
        .unwrap();
    let result = chain
        .processor
        .verify_and_stage(Block::standard(first_block, height + 1, time, vec![second.clone()]));
    assert!(matches!(
        result,
        Err(BlockError::Tx(TxError::ConflictingBatchTxs { .. }))
    ));

    // 4. On a sibling branch they do not conflict.
    let second_block = chain
        .processor
        .verify_and_stage(Block::standard(parent, height, time, vec![second.clone()]))
        .unwrap();

    // 5. Accepting one branch rejects the other and returns its transaction to the mempool.
    chain.drain_events();
    chain.processor.accept_block(&first_block).unwrap();
    assert!(!chain.processor.is_staged(&second_block));
    assert!(chain.mempool.contains(&second));
    assert!(!chain.mempool.contains(&first));
    let events = chain.drain_events();
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::RejectBlock(reject) if reject.block == second_block)));
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::AcceptBlock(accept) if accept.block == first_block)));
}

#[test]
fn rejecting_a_block_rejects_its_descendants() {
    setup_logger(LevelFilter::Debug);

    let mut chain = TestChain::new();
    let first = create_subnet_tx(&chain, &chain.users[0], chain.users[0].address());
    let second = create_subnet_tx(&chain, &chain.users[1], chain.users[1].address());
    let parent = chain.processor.last_accepted();
    let height = chain.processor.last_accepted_height() + 1;
    let time = chain.chain_time();

    let first_block = chain
        .processor
        .verify_and_stage(Block::standard(parent, height, time, vec![first.clone()]))
        .unwrap();
    let second_block = chain
        .processor
        .verify_and_stage(Block::standard(first_block, height + 1, time, vec![second.clone()]))
        .unwrap();
    assert_eq!(
        chain.processor.view(&second_block).unwrap().utxos().len(),
        chain.state().utxos().len()
    );

    chain.drain_events();
    chain.processor.reject_block(&first_block).unwrap();
    assert!(!chain.processor.is_staged(&first_block));
    assert!(!chain.processor.is_staged(&second_block));
    assert!(chain.mempool.contains(&first));
    assert!(chain.mempool.contains(&second));
    let rejected = chain
        .drain_events()
        .iter()
        .filter(|event| matches!(event, Event::RejectBlock(_)))
        .count();
    assert_eq!(rejected, 2);

    let result = chain.processor.reject_block(&second_block);
    assert!(matches!(result, Err(BlockError::NotStaged { .. })));
}

#[test]
fn built_block_drops_transactions_that_fail() {
    setup_logger(LevelFilter::Debug);

    // 1. Fill the mempool with two conflicting transactions and an independent one.
    let mut chain = TestChain::new();
    let first = create_subnet_tx(&chain, &chain.users[0], chain.users[0].address());
    let conflicting = create_subnet_tx(&chain, &chain.users[0], chain.users[1].address());
    let independent = create_subnet_tx(&chain, &chain.users[1], chain.users[1].address());
    let mut mempool = chain.mempool.clone();
    mempool.add(first.clone());
    mempool.add(conflicting.clone());
    mempool.add(independent.clone());
    assert_eq!(chain.mempool.len(), 3);

    // 2. The built block takes every transaction that executes on top of the ones before it.
    let parent = chain.processor.last_accepted();
    chain.drain_events();
    let block = chain.processor.build_standard_block(&parent, usize::MAX).unwrap().unwrap();
    assert_eq!(block.txs(), vec![&first, &independent]);
    assert_eq!(block.height(), chain.processor.last_accepted_height() + 1);

    let conflicting_id = conflicting.id().unwrap();
    assert!(!chain.mempool.contains(&conflicting));
    assert!(chain.mempool.dropped().iter().any(|(tx_id, _)| *tx_id == conflicting_id));
    assert!(chain
        .drain_events()
        .iter()
        .any(|event| matches!(event, Event::DropTx(drop) if drop.tx == conflicting_id)));

    // 3. The built block is valid and accepting it empties the mempool.
    let block_id = chain.processor.verify_and_stage(block).unwrap();
    chain.processor.accept_block(&block_id).unwrap();
    assert_eq!(chain.mempool.len(), 0);
    assert!(chain.state().subnet_owner(&first.id().unwrap()).is_some());
    assert!(chain.state().subnet_owner(&independent.id().unwrap()).is_some());

    // 4. With nothing left to include, no block is built.
    let parent = chain.processor.last_accepted();
    assert!(chain.processor.build_standard_block(&parent, usize::MAX).unwrap().is_none());
}
