/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The error type of transaction verification and execution.

use std::fmt::{self, Display, Formatter};

use crate::{
    codec::CodecError,
    fx::FxError,
    interfaces::SharedMemoryError,
    state::chain_state::StateError,
    types::{
        ids::{Amount, Id, NodeId, Timestamp},
        outputs::LockState,
    },
};

#[derive(Debug)]
pub enum TxError {
    /* ↓↓↓ Structure ↓↓↓ */
    /// A list the transaction kind requires to be non-empty is empty.
    NilInput { field: &'static str },
    InvalidNetworkId { expected: u32, actual: u32 },
    InvalidChainId { expected: Id, actual: Id },
    OutputsNotSorted,
    InputsNotSortedUnique,
    SignatureIndicesNotSorted,
    /// An output or input carries a lock state not allowed where it appears.
    InvalidLockState { field: &'static str, state: LockState },
    InvalidOwners,
    TooManyShares { shares: u32 },
    WeightOutOfRange { weight: Amount },
    DurationOutOfRange { duration: u64 },
    InvalidTimeRange { start: Timestamp, end: Timestamp },
    EndOfTime { end: Timestamp },
    AmountMismatch { declared: Amount, actual: Amount },
    LockAmountTooLow { min: Amount, actual: Amount },
    GenesisTooLong { len: usize, max: usize },
    NameTooLong { len: usize, max: usize },
    IllegalNameCharacter { character: char },
    MemoTooLong { len: usize, max: usize },
    NotGovernanceTx,
    InvalidVoteOption { option: u32 },
    InvalidProposalThreshold { threshold: u32 },
    /// A system transaction carries credentials, inputs or outputs, or a reward transaction's
    /// inputs and outputs differ from the canonical unlock.
    TxBodyMismatch,
    Codec(CodecError),

    /* ↓↓↓ Spending ↓↓↓ */
    UnknownUtxo { utxo: Id },
    AssetIdMismatch { expected: Id, actual: Id },
    LockStateMismatch { utxo: Id, expected: LockState, actual: LockState },
    /// Locked value changes state in a way the spend mode does not allow.
    InvalidLockTransition { owner: Id, from: LockState, to: LockState },
    WrongNumberOfCredentials { expected: usize, actual: usize },
    /// A credential carries a different number of signatures than the owners' threshold or its
    /// signature indices require.
    WrongNumberOfSignatures { expected: usize, actual: usize },
    SignatureIndexOutOfBounds { index: u32 },
    /// A signature was made by a key other than the owner its index names.
    InputCredentialSignersMismatch { index: u32 },
    InvalidPublicKey,
    InvalidSignature,
    LockedByTime { locktime: Timestamp, now: Timestamp },
    InsufficientFunds { asset_id: Id },
    /// Consumed value of an asset other than the native asset exceeds what is produced.
    NonNativeBurn { asset_id: Id },

    /* ↓↓↓ Stakers ↓↓↓ */
    AlreadyValidating { node_id: NodeId },
    AlreadyPendingValidator { node_id: NodeId },
    DSValidatorSubset { node_id: NodeId },
    SubnetDoesNotExist { subnet_id: Id },
    UnexpectedRewardTarget { expected: Option<Id>, actual: Id },
    RewardBeforeEndTime { end: Timestamp, now: Timestamp },

    /* ↓↓↓ Time ↓↓↓ */
    NotAfterCurrentTimestamp { time: Timestamp, current: Timestamp },
    LaterThanNextStaker { time: Timestamp, next: Timestamp },
    TooFarInTheFuture { time: Timestamp, max: Timestamp },
    StartNotAfterCurrentTimestamp { start: Timestamp, current: Timestamp },
    FutureStartTime { start: Timestamp, max: Timestamp },

    /* ↓↓↓ Deposits ↓↓↓ */
    DepositOfferNotFound { offer_id: Id },
    DepositOfferInactive { offer_id: Id },
    DepositOfferBounds { offer_id: Id },

    /* ↓↓↓ Proposals ↓↓↓ */
    ProposalNotFound { proposal_id: Id },
    ProposalNotActive { proposal_id: Id },
    ProposalAlreadyVoted { proposal_id: Id, node_id: NodeId },
    NotValidator { node_id: NodeId },
    DuplicateProposal { existing: Id },
    ThresholdNotReached { proposal_id: Id },

    /* ↓↓↓ Blocks ↓↓↓ */
    DuplicateTx { tx_id: Id },
    ConflictingBatchTxs { utxo: Id },
    /// A transaction of this kind cannot appear where it was given.
    WrongTxKind { kind: &'static str },

    SharedMemory(SharedMemoryError),
    State(StateError),
    Overflow,
}

impl Display for TxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use TxError::*;
        match self {
            NilInput { field } => write!(f, "{} is empty", field),
            InvalidNetworkId { expected, actual } => {
                write!(f, "expected network id {}, got {}", expected, actual)
            }
            InvalidChainId { expected, actual } => {
                write!(f, "expected chain id {}, got {}", expected, actual)
            }
            OutputsNotSorted => write!(f, "outputs are not sorted and unique"),
            InputsNotSortedUnique => write!(f, "inputs are not sorted and unique"),
            SignatureIndicesNotSorted => write!(f, "signature indices are not strictly increasing"),
            InvalidLockState { field, state } => write!(f, "{} may not be {:?}", field, state),
            InvalidOwners => write!(f, "malformed output owners"),
            TooManyShares { shares } => write!(f, "delegation shares {} exceed the denominator", shares),
            WeightOutOfRange { weight } => write!(f, "weight {} out of range", weight),
            DurationOutOfRange { duration } => write!(f, "duration {} out of range", duration),
            InvalidTimeRange { start, end } => write!(f, "end {} is not after start {}", end, start),
            EndOfTime { end } => write!(f, "end {} is past the end of time", end),
            AmountMismatch { declared, actual } => {
                write!(f, "declared amount {} but outputs hold {}", declared, actual)
            }
            LockAmountTooLow { min, actual } => write!(f, "lock of {} is below the minimum {}", actual, min),
            GenesisTooLong { len, max } => write!(f, "genesis of {} bytes exceeds {}", len, max),
            NameTooLong { len, max } => write!(f, "name of {} bytes exceeds {}", len, max),
            IllegalNameCharacter { character } => write!(f, "illegal character {:?} in name", character),
            MemoTooLong { len, max } => write!(f, "memo of {} bytes exceeds {}", len, max),
            NotGovernanceTx => write!(f, "expected a governance transaction only inside a proposal"),
            InvalidVoteOption { option } => write!(f, "invalid vote option {}", option),
            InvalidProposalThreshold { threshold } => write!(f, "invalid proposal threshold {}", threshold),
            TxBodyMismatch => write!(f, "transaction body does not match the expected body"),
            Codec(err) => write!(f, "{}", err),
            UnknownUtxo { utxo } => write!(f, "unknown UTXO {}", utxo),
            AssetIdMismatch { expected, actual } => {
                write!(f, "expected asset {}, got {}", expected, actual)
            }
            LockStateMismatch { utxo, expected, actual } => write!(
                f,
                "UTXO {} is {:?} but was spent as {:?}",
                utxo, expected, actual
            ),
            InvalidLockTransition { owner, from, to } => {
                write!(f, "owner {} cannot move value from {:?} to {:?}", owner, from, to)
            }
            WrongNumberOfCredentials { expected, actual } => {
                write!(f, "expected {} credentials, got {}", expected, actual)
            }
            WrongNumberOfSignatures { expected, actual } => {
                write!(f, "expected {} signatures, got {}", expected, actual)
            }
            SignatureIndexOutOfBounds { index } => write!(f, "signature index {} names no owner", index),
            InputCredentialSignersMismatch { index } => {
                write!(f, "signature {} is not by the owner it names", index)
            }
            InvalidPublicKey => write!(f, "invalid public key in credential"),
            InvalidSignature => write!(f, "invalid signature in credential"),
            LockedByTime { locktime, now } => write!(f, "output is locked until {}, now is {}", locktime, now),
            InsufficientFunds { asset_id } => write!(f, "insufficient funds of asset {}", asset_id),
            NonNativeBurn { asset_id } => write!(f, "asset {} would be burned", asset_id),
            AlreadyValidating { node_id } => write!(f, "{} is already validating", node_id),
            AlreadyPendingValidator { node_id } => write!(f, "{} is already a pending validator", node_id),
            DSValidatorSubset { node_id } => write!(
                f,
                "{} does not validate the primary network for the whole period",
                node_id
            ),
            SubnetDoesNotExist { subnet_id } => write!(f, "subnet {} does not exist", subnet_id),
            UnexpectedRewardTarget { expected, actual } => match expected {
                Some(expected) => write!(f, "expected to reward {}, got {}", expected, actual),
                None => write!(f, "nothing to reward, got {}", actual),
            },
            RewardBeforeEndTime { end, now } => write!(f, "reward at {} before end {}", now, end),
            NotAfterCurrentTimestamp { time, current } => {
                write!(f, "time {} is not after current time {}", time, current)
            }
            LaterThanNextStaker { time, next } => {
                write!(f, "time {} is later than the next event at {}", time, next)
            }
            TooFarInTheFuture { time, max } => write!(f, "time {} is past {}", time, max),
            StartNotAfterCurrentTimestamp { start, current } => {
                write!(f, "start {} is not after current time {}", start, current)
            }
            FutureStartTime { start, max } => write!(f, "start {} is past {}", start, max),
            DepositOfferNotFound { offer_id } => write!(f, "deposit offer {} not found", offer_id),
            DepositOfferInactive { offer_id } => write!(f, "deposit offer {} is not active", offer_id),
            DepositOfferBounds { offer_id } => {
                write!(f, "deposit is outside the bounds of offer {}", offer_id)
            }
            ProposalNotFound { proposal_id } => write!(f, "proposal {} not found", proposal_id),
            ProposalNotActive { proposal_id } => write!(f, "proposal {} is not active", proposal_id),
            ProposalAlreadyVoted { proposal_id, node_id } => {
                write!(f, "{} already voted on proposal {}", node_id, proposal_id)
            }
            NotValidator { node_id } => write!(f, "{} is not a validator controlled by the signers", node_id),
            DuplicateProposal { existing } => write!(f, "proposal {} of the same kind is open", existing),
            ThresholdNotReached { proposal_id } => {
                write!(f, "proposal {} has not ended nor reached its threshold", proposal_id)
            }
            DuplicateTx { tx_id } => write!(f, "transaction {} was already accepted", tx_id),
            ConflictingBatchTxs { utxo } => write!(f, "UTXO {} is consumed twice", utxo),
            WrongTxKind { kind } => write!(f, "{} transaction not allowed here", kind),
            SharedMemory(err) => write!(f, "{}", err),
            State(err) => write!(f, "{}", err),
            Overflow => write!(f, "arithmetic overflow"),
        }
    }
}

impl std::error::Error for TxError {}

impl From<CodecError> for TxError {
    fn from(value: CodecError) -> Self {
        TxError::Codec(value)
    }
}

impl From<StateError> for TxError {
    fn from(value: StateError) -> Self {
        TxError::State(value)
    }
}

impl From<SharedMemoryError> for TxError {
    fn from(value: SharedMemoryError) -> Self {
        TxError::SharedMemory(value)
    }
}

impl From<FxError> for TxError {
    fn from(value: FxError) -> Self {
        match value {
            FxError::LockedByTime { locktime, now } => TxError::LockedByTime { locktime, now },
            FxError::SignatureIndicesNotSorted => TxError::SignatureIndicesNotSorted,
            FxError::WrongNumberOfSignatures { expected, actual } => {
                TxError::WrongNumberOfSignatures { expected, actual }
            }
            FxError::IndexOutOfBounds { index } => TxError::SignatureIndexOutOfBounds { index },
            FxError::SignerMismatch { index } => TxError::InputCredentialSignersMismatch { index },
            FxError::InvalidPublicKey => TxError::InvalidPublicKey,
            FxError::InvalidSignature => TxError::InvalidSignature,
        }
    }
}

impl From<crate::state::utxos::UtxoError> for TxError {
    fn from(value: crate::state::utxos::UtxoError) -> Self {
        match value {
            crate::state::utxos::UtxoError::NotFound { id } => TxError::UnknownUtxo { utxo: id },
            duplicate => TxError::State(StateError::Utxo(duplicate)),
        }
    }
}
