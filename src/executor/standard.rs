/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Decision transactions: each yields a single successor state.

use std::collections::BTreeMap;

use super::{
    spend::{resolve, ResolvedInput},
    ExecOutcome, TxError, TxExecutor,
};
use crate::{
    codec::Codec,
    interfaces::{AtomicPut, AtomicRequests},
    state::chain_state::{ChainRecord, TxStatus},
    types::{
        outputs::{LockIds, TransferableOutput, Utxo, UtxoId},
        txs::{CreateChainTx, CreateSubnetTx, ExportTx, ImportTx},
    },
};

impl TxExecutor<'_> {
    pub(super) fn execute_create_subnet(&self, tx: &CreateSubnetTx) -> Result<ExecOutcome, TxError> {
        let inputs = resolve(self.data(), &tx.base.ins)?;
        let lock_ids = self.verify_spend(
            &inputs,
            &tx.base.outs,
            &self.tx.credentials,
            None,
            self.config().create_subnet_fee,
        )?;

        let mut state = self.transition(&tx.base.ins, &tx.base.outs, &lock_ids)?;
        state.data_mut().add_subnet(self.tx_id, tx.owner.clone());
        self.record(&mut state, TxStatus::Committed);
        Ok(ExecOutcome::Decision {
            state,
            atomic_requests: BTreeMap::new(),
        })
    }

    pub(super) fn execute_create_chain(&self, tx: &CreateChainTx) -> Result<ExecOutcome, TxError> {
        let owner = self
            .data()
            .subnet_owner(&tx.subnet_id)
            .ok_or(TxError::SubnetDoesNotExist {
                subnet_id: tx.subnet_id,
            })?;
        let (credentials, subnet_auth) = self.split_credentials(tx.base.ins.len())?;
        self.backend
            .fx
            .verify_permission(self.unsigned_bytes, &tx.subnet_auth.sig_indices, subnet_auth, owner)?;

        let inputs = resolve(self.data(), &tx.base.ins)?;
        let lock_ids = self.verify_spend(
            &inputs,
            &tx.base.outs,
            credentials,
            None,
            self.config().create_blockchain_fee,
        )?;

        let mut state = self.transition(&tx.base.ins, &tx.base.outs, &lock_ids)?;
        state.data_mut().add_chain(
            self.tx_id,
            ChainRecord {
                subnet_id: tx.subnet_id,
                name: tx.chain_name.clone(),
                vm_id: tx.vm_id,
                fx_ids: tx.fx_ids.clone(),
            },
        );
        self.record(&mut state, TxStatus::Committed);
        Ok(ExecOutcome::Decision {
            state,
            atomic_requests: BTreeMap::new(),
        })
    }

    /// Spend UTXOs exported to this chain by `tx.source_chain`, alongside the transaction's own
    /// inputs. The imported UTXOs are removed from shared memory when the block is accepted.
    pub(super) fn execute_import(&self, tx: &ImportTx) -> Result<ExecOutcome, TxError> {
        let imported_ids: Vec<_> = tx.imported_inputs.iter().map(|input| input.input_id()).collect();
        let values = self.backend.shared_memory.get(&tx.source_chain, &imported_ids)?;
        if values.len() != imported_ids.len() {
            return Err(TxError::NilInput {
                field: "imported UTXOs",
            });
        }

        let mut inputs = resolve(self.data(), &tx.base.ins)?;
        for ((input, utxo_id), value) in tx.imported_inputs.iter().zip(&imported_ids).zip(&values) {
            let utxo: Utxo = Codec::standard().decode(value)?;
            if utxo.input_id() != *utxo_id {
                return Err(TxError::UnknownUtxo { utxo: *utxo_id });
            }
            let state = utxo.output.lock_state();
            if state.is_locked() {
                return Err(TxError::InvalidLockState {
                    field: "imported UTXOs",
                    state,
                });
            }
            inputs.push(ResolvedInput {
                input,
                utxo,
                lock_ids: LockIds::UNLOCKED,
            });
        }
        let lock_ids = self.verify_spend(
            &inputs,
            &tx.base.outs,
            &self.tx.credentials,
            None,
            self.data().base_fee(),
        )?;

        let mut state = self.transition(&tx.base.ins, &tx.base.outs, &lock_ids)?;
        self.record(&mut state, TxStatus::Committed);
        let requests = AtomicRequests {
            put_requests: Vec::new(),
            remove_requests: imported_ids,
        };
        Ok(ExecOutcome::Decision {
            state,
            atomic_requests: BTreeMap::from([(tx.source_chain, requests)]),
        })
    }

    /// Spend into outputs that leave this chain for `tx.destination_chain`. Exported outputs are
    /// numbered after the base outputs and written to shared memory when the block is accepted.
    pub(super) fn execute_export(&self, tx: &ExportTx) -> Result<ExecOutcome, TxError> {
        let outputs: Vec<TransferableOutput> = tx.base.outs.iter().chain(&tx.exported_outs).cloned().collect();
        let inputs = resolve(self.data(), &tx.base.ins)?;
        let lock_ids = self.verify_spend(&inputs, &outputs, &self.tx.credentials, None, self.data().base_fee())?;

        let mut state = self.transition(&tx.base.ins, &tx.base.outs, &lock_ids[..tx.base.outs.len()])?;
        self.record(&mut state, TxStatus::Committed);

        let first_exported = tx.base.outs.len() as u32;
        let put_requests = (first_exported..)
            .zip(&tx.exported_outs)
            .map(|(index, output)| {
                let utxo = Utxo {
                    utxo_id: UtxoId::new(self.tx_id, index),
                    asset_id: output.asset_id,
                    output: output.output.clone(),
                };
                Ok(AtomicPut {
                    key: utxo.input_id(),
                    value: Codec::standard().encode(&utxo)?,
                    traits: output.output.owners().addrs.clone(),
                })
            })
            .collect::<Result<Vec<_>, TxError>>()?;
        let requests = AtomicRequests {
            put_requests,
            remove_requests: Vec::new(),
        };
        Ok(ExecOutcome::Decision {
            state,
            atomic_requests: BTreeMap::from([(tx.destination_chain, requests)]),
        })
    }
}
