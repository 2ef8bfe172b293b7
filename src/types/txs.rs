/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Transactions.
//!
//! A [`Tx`] pairs an [`UnsignedTx`] with one [`Credential`] per input (plus, for transactions that
//! need further authority, trailing credentials). The id of a transaction is the SHA-256 digest of
//! its encoded unsigned body, and signatures are made over those same bytes.
//!
//! ## Kinds
//!
//! | Kind | Executed as | Notes |
//! |---|---|---|
//! | `AddValidator` | proposal | bonds the stake |
//! | `AddSubnetValidator` | proposal | authorised by the subnet owner |
//! | `AddLock` | proposal | deposits funds for a fixed reward |
//! | `AddDeposit` | proposal | deposits funds under a deposit offer |
//! | `AdvanceTime` | proposal | system |
//! | `RewardValidator` | proposal | system |
//! | `RewardLock` | proposal | system |
//! | `ProposalSubmit` | proposal | bonds the proposal bond |
//! | `ProposalVote` | proposal | authorised by the voting validator |
//! | `ProposalConclude` | proposal | system |
//! | `CreateSubnet`, `CreateChain`, `Import`, `Export` | decision | |
//! | `BaseFee`, `AddDepositOffer` | governance | only inside a `ProposalSubmit` |

use borsh::{BorshDeserialize, BorshSerialize};
use std::{collections::BTreeSet, io};

use super::{
    crypto_primitives::{Keypair, SignatureBytes},
    ids::{Amount, Id, NodeId, Timestamp},
    outputs::{OutputOwners, TransferableInput, TransferableOutput},
};
use crate::codec::{Codec, CodecError};

/// Fields every non-governance transaction carries.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BaseTx {
    pub network_id: u32,
    pub blockchain_id: Id,
    pub ins: Vec<TransferableInput>,
    pub outs: Vec<TransferableOutput>,
    pub memo: Vec<u8>,
}

impl BaseTx {
    /// A base with no inputs or outputs, as carried by system transactions.
    pub fn empty(network_id: u32, blockchain_id: Id) -> Self {
        Self {
            network_id,
            blockchain_id,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Validator {
    pub node_id: NodeId,
    pub start: Timestamp,
    pub end: Timestamp,
    pub weight: Amount,
}

impl Validator {
    pub fn duration(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SubnetValidator {
    pub validator: Validator,
    pub subnet_id: Id,
}

/// Indices of the subnet owner's addresses whose keys signed the trailing credential.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SubnetAuth {
    pub sig_indices: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AddValidatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    /// Outputs holding the stake, all `Bonded`. Their sum equals the validator's weight.
    pub bond: Vec<TransferableOutput>,
    pub rewards_owner: OutputOwners,
    /// Parts per million of delegator rewards kept by the validator.
    pub delegation_shares: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AddSubnetValidatorTx {
    pub base: BaseTx,
    pub validator: SubnetValidator,
    pub subnet_auth: SubnetAuth,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AddLockTx {
    pub base: BaseTx,
    /// Outputs holding the locked funds, all `Deposited`. Their sum equals `amount`.
    pub locked_outs: Vec<TransferableOutput>,
    pub start: Timestamp,
    pub end: Timestamp,
    pub amount: Amount,
    pub rewards_owner: OutputOwners,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AddDepositTx {
    pub base: BaseTx,
    pub deposited_outs: Vec<TransferableOutput>,
    pub deposit_offer_id: Id,
    pub start: Timestamp,
    pub end: Timestamp,
    pub amount: Amount,
    pub rewards_owner: OutputOwners,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ImportTx {
    pub base: BaseTx,
    pub source_chain: Id,
    pub imported_inputs: Vec<TransferableInput>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ExportTx {
    pub base: BaseTx,
    pub destination_chain: Id,
    pub exported_outs: Vec<TransferableOutput>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CreateChainTx {
    pub base: BaseTx,
    pub subnet_id: Id,
    pub genesis: Vec<u8>,
    pub vm_id: Id,
    pub fx_ids: Vec<Id>,
    pub chain_name: String,
    pub subnet_auth: SubnetAuth,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CreateSubnetTx {
    pub base: BaseTx,
    pub owner: OutputOwners,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AdvanceTimeTx {
    pub base: BaseTx,
    pub time: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RewardValidatorTx {
    pub base: BaseTx,
    pub validator_tx_id: Id,
    pub ins: Vec<TransferableInput>,
    pub outs: Vec<TransferableOutput>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RewardLockTx {
    pub base: BaseTx,
    pub lock_tx_id: Id,
    pub ins: Vec<TransferableInput>,
    pub outs: Vec<TransferableOutput>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ProposalConfig {
    pub start: Timestamp,
    pub end: Timestamp,
    /// Number of yes votes that accepts the proposal.
    pub threshold: u32,
}

/// Nests an [`UnsignedTx`], so its borsh impls are written out field by field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalSubmitTx {
    pub base: BaseTx,
    pub proposal: ProposalConfig,
    pub proposed_tx: Box<UnsignedTx>,
    pub bond: Vec<TransferableOutput>,
}

impl BorshSerialize for ProposalSubmitTx {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        self.base.serialize(writer)?;
        self.proposal.serialize(writer)?;
        self.proposed_tx.as_ref().serialize(writer)?;
        self.bond.serialize(writer)
    }
}

impl BorshDeserialize for ProposalSubmitTx {
    fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
        Ok(ProposalSubmitTx {
            base: BaseTx::deserialize_reader(reader)?,
            proposal: ProposalConfig::deserialize_reader(reader)?,
            proposed_tx: Box::new(UnsignedTx::deserialize_reader(reader)?),
            bond: Vec::<TransferableOutput>::deserialize_reader(reader)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ProposalVoteTx {
    pub base: BaseTx,
    pub proposal_id: Id,
    pub voter_node_id: NodeId,
    pub option_index: u32,
    pub start: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ProposalConcludeTx {
    pub base: BaseTx,
    pub proposal_id: Id,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BaseFeeTx {
    pub fee: Amount,
}

/// Terms under which funds can be deposited with [`AddDepositTx`].
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DepositOffer {
    /// Yearly interest in parts per million.
    pub interest_rate_nominator: u64,
    pub start: Timestamp,
    pub end: Timestamp,
    pub min_amount: Amount,
    pub min_duration: u64,
    pub max_duration: u64,
    pub memo: Vec<u8>,
}

impl DepositOffer {
    pub fn id(&self) -> Result<Id, CodecError> {
        Codec::standard().hash(self)
    }

    /// Whether the offer accepts deposits at `time`.
    pub fn is_active_at(&self, time: Timestamp) -> bool {
        self.start <= time && time < self.end
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AddDepositOfferTx {
    pub offer: DepositOffer,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum UnsignedTx {
    AddValidator(AddValidatorTx),
    AddSubnetValidator(AddSubnetValidatorTx),
    AddLock(AddLockTx),
    AddDeposit(AddDepositTx),
    Import(ImportTx),
    Export(ExportTx),
    CreateChain(CreateChainTx),
    CreateSubnet(CreateSubnetTx),
    AdvanceTime(AdvanceTimeTx),
    RewardValidator(RewardValidatorTx),
    RewardLock(RewardLockTx),
    ProposalSubmit(ProposalSubmitTx),
    ProposalVote(ProposalVoteTx),
    ProposalConclude(ProposalConcludeTx),
    BaseFee(BaseFeeTx),
    AddDepositOffer(AddDepositOfferTx),
}

/// Operations on every kind of [`UnsignedTx`]. Each method is called by [`UnsignedTx::visit`] for
/// the matching kind.
pub trait TxVisitor {
    type Output;

    fn add_validator(&mut self, tx: &AddValidatorTx) -> Self::Output;
    fn add_subnet_validator(&mut self, tx: &AddSubnetValidatorTx) -> Self::Output;
    fn add_lock(&mut self, tx: &AddLockTx) -> Self::Output;
    fn add_deposit(&mut self, tx: &AddDepositTx) -> Self::Output;
    fn import(&mut self, tx: &ImportTx) -> Self::Output;
    fn export(&mut self, tx: &ExportTx) -> Self::Output;
    fn create_chain(&mut self, tx: &CreateChainTx) -> Self::Output;
    fn create_subnet(&mut self, tx: &CreateSubnetTx) -> Self::Output;
    fn advance_time(&mut self, tx: &AdvanceTimeTx) -> Self::Output;
    fn reward_validator(&mut self, tx: &RewardValidatorTx) -> Self::Output;
    fn reward_lock(&mut self, tx: &RewardLockTx) -> Self::Output;
    fn proposal_submit(&mut self, tx: &ProposalSubmitTx) -> Self::Output;
    fn proposal_vote(&mut self, tx: &ProposalVoteTx) -> Self::Output;
    fn proposal_conclude(&mut self, tx: &ProposalConcludeTx) -> Self::Output;
    fn base_fee(&mut self, tx: &BaseFeeTx) -> Self::Output;
    fn add_deposit_offer(&mut self, tx: &AddDepositOfferTx) -> Self::Output;
}

impl UnsignedTx {
    pub fn visit<V: TxVisitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            UnsignedTx::AddValidator(tx) => visitor.add_validator(tx),
            UnsignedTx::AddSubnetValidator(tx) => visitor.add_subnet_validator(tx),
            UnsignedTx::AddLock(tx) => visitor.add_lock(tx),
            UnsignedTx::AddDeposit(tx) => visitor.add_deposit(tx),
            UnsignedTx::Import(tx) => visitor.import(tx),
            UnsignedTx::Export(tx) => visitor.export(tx),
            UnsignedTx::CreateChain(tx) => visitor.create_chain(tx),
            UnsignedTx::CreateSubnet(tx) => visitor.create_subnet(tx),
            UnsignedTx::AdvanceTime(tx) => visitor.advance_time(tx),
            UnsignedTx::RewardValidator(tx) => visitor.reward_validator(tx),
            UnsignedTx::RewardLock(tx) => visitor.reward_lock(tx),
            UnsignedTx::ProposalSubmit(tx) => visitor.proposal_submit(tx),
            UnsignedTx::ProposalVote(tx) => visitor.proposal_vote(tx),
            UnsignedTx::ProposalConclude(tx) => visitor.proposal_conclude(tx),
            UnsignedTx::BaseFee(tx) => visitor.base_fee(tx),
            UnsignedTx::AddDepositOffer(tx) => visitor.add_deposit_offer(tx),
        }
    }

    /// The base fields, for every kind except the governance payloads.
    pub fn base(&self) -> Option<&BaseTx> {
        match self {
            UnsignedTx::AddValidator(tx) => Some(&tx.base),
            UnsignedTx::AddSubnetValidator(tx) => Some(&tx.base),
            UnsignedTx::AddLock(tx) => Some(&tx.base),
            UnsignedTx::AddDeposit(tx) => Some(&tx.base),
            UnsignedTx::Import(tx) => Some(&tx.base),
            UnsignedTx::Export(tx) => Some(&tx.base),
            UnsignedTx::CreateChain(tx) => Some(&tx.base),
            UnsignedTx::CreateSubnet(tx) => Some(&tx.base),
            UnsignedTx::AdvanceTime(tx) => Some(&tx.base),
            UnsignedTx::RewardValidator(tx) => Some(&tx.base),
            UnsignedTx::RewardLock(tx) => Some(&tx.base),
            UnsignedTx::ProposalSubmit(tx) => Some(&tx.base),
            UnsignedTx::ProposalVote(tx) => Some(&tx.base),
            UnsignedTx::ProposalConclude(tx) => Some(&tx.base),
            UnsignedTx::BaseFee(_) | UnsignedTx::AddDepositOffer(_) => None,
        }
    }

    /// Whether this kind is executed as a proposal, yielding commit and abort successors.
    pub fn is_proposal(&self) -> bool {
        !self.is_decision() && !self.is_governance()
    }

    pub fn is_decision(&self) -> bool {
        matches!(
            self,
            UnsignedTx::CreateChain(_)
                | UnsignedTx::CreateSubnet(_)
                | UnsignedTx::Import(_)
                | UnsignedTx::Export(_)
        )
    }

    pub fn is_governance(&self) -> bool {
        matches!(self, UnsignedTx::BaseFee(_) | UnsignedTx::AddDepositOffer(_))
    }

    /// Whether this kind is issued by the chain itself and carries no credentials.
    pub fn is_system(&self) -> bool {
        matches!(
            self,
            UnsignedTx::AdvanceTime(_)
                | UnsignedTx::RewardValidator(_)
                | UnsignedTx::RewardLock(_)
                | UnsignedTx::ProposalConclude(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            UnsignedTx::AddValidator(_) => "AddValidator",
            UnsignedTx::AddSubnetValidator(_) => "AddSubnetValidator",
            UnsignedTx::AddLock(_) => "AddLock",
            UnsignedTx::AddDeposit(_) => "AddDeposit",
            UnsignedTx::Import(_) => "Import",
            UnsignedTx::Export(_) => "Export",
            UnsignedTx::CreateChain(_) => "CreateChain",
            UnsignedTx::CreateSubnet(_) => "CreateSubnet",
            UnsignedTx::AdvanceTime(_) => "AdvanceTime",
            UnsignedTx::RewardValidator(_) => "RewardValidator",
            UnsignedTx::RewardLock(_) => "RewardLock",
            UnsignedTx::ProposalSubmit(_) => "ProposalSubmit",
            UnsignedTx::ProposalVote(_) => "ProposalVote",
            UnsignedTx::ProposalConclude(_) => "ProposalConclude",
            UnsignedTx::BaseFee(_) => "BaseFee",
            UnsignedTx::AddDepositOffer(_) => "AddDepositOffer",
        }
    }

    /// Input ids of every UTXO this transaction consumes, including UTXOs imported from shared
    /// memory.
    pub fn consumed_ids(&self) -> BTreeSet<Id> {
        let mut ids: BTreeSet<Id> = self
            .base()
            .map(|base| base.ins.iter().map(TransferableInput::input_id).collect())
            .unwrap_or_default();
        match self {
            UnsignedTx::Import(tx) => ids.extend(tx.imported_inputs.iter().map(TransferableInput::input_id)),
            UnsignedTx::RewardValidator(tx) => ids.extend(tx.ins.iter().map(TransferableInput::input_id)),
            UnsignedTx::RewardLock(tx) => ids.extend(tx.ins.iter().map(TransferableInput::input_id)),
            _ => (),
        }
        ids
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CredentialSignature {
    pub public_key: [u8; 32],
    pub signature: SignatureBytes,
}

/// Signatures authorising the spend of one input, or one further authority such as a subnet
/// owner or a voting validator.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Credential {
    pub signatures: Vec<CredentialSignature>,
}

impl Credential {
    /// Sign `message` with each of `signers`, in order.
    pub fn sign(message: &[u8], signers: &[&Keypair]) -> Credential {
        Credential {
            signatures: signers
                .iter()
                .map(|keypair| CredentialSignature {
                    public_key: keypair.public().to_bytes(),
                    signature: keypair.sign(message),
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Tx {
    pub unsigned: UnsignedTx,
    pub credentials: Vec<Credential>,
}

impl Tx {
    /// Sign `unsigned`, producing one credential per entry of `signers`.
    pub fn sign(unsigned: UnsignedTx, signers: &[Vec<&Keypair>]) -> Result<Tx, CodecError> {
        let bytes = Codec::standard().encode(&unsigned)?;
        let credentials = signers
            .iter()
            .map(|keys| Credential::sign(&bytes, keys))
            .collect();
        Ok(Tx {
            unsigned,
            credentials,
        })
    }

    /// A transaction without credentials, as issued by the chain itself.
    pub fn system(unsigned: UnsignedTx) -> Tx {
        Tx {
            unsigned,
            credentials: Vec::new(),
        }
    }

    pub fn unsigned_bytes(&self) -> Result<Vec<u8>, CodecError> {
        Codec::standard().encode(&self.unsigned)
    }

    /// `sha256(encoded unsigned tx)`.
    pub fn id(&self) -> Result<Id, CodecError> {
        Codec::standard().hash(&self.unsigned)
    }
}
