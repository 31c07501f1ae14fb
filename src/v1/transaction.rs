use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::wallet::{sha256, AccountId, Hash256, Signature};

use super::utxo::Utxo;
use super::MINING_REWARD;

/// Points at one output of one transaction in a specific mined block.
/// Outputs are addressed by position, so output order inside a transaction is
/// part of the protocol.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Outpoint {
    pub block_hash: Hash256,
    pub txn_idx: u32,
    pub output_idx: u32,
}

/// Declares who is spending and which prior output is being consumed.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TxnInput {
    pub from: AccountId,
    pub output: Outpoint,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TxnOutput {
    pub value: u64,
    pub to: AccountId,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub inputs: Vec<TxnInput>,
    pub outputs: Vec<TxnOutput>,
    /// Ed25519 signatures over [hash_txn], keyed by signer. Signatures are
    /// excluded from the canonical bytes so that they can cover them.
    pub signatures: HashMap<AccountId, Signature>,
}

impl Outpoint {
    /// `block_hash ∥ LE32(txn_idx) ∥ LE32(output_idx)`
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(40);
        out.extend_from_slice(&self.block_hash);
        out.extend_from_slice(&self.txn_idx.to_le_bytes());
        out.extend_from_slice(&self.output_idx.to_le_bytes());

        out
    }
}

impl Transaction {
    pub fn new(inputs: Vec<TxnInput>, outputs: Vec<TxnOutput>) -> Transaction {
        Transaction {
            inputs,
            outputs,
            signatures: HashMap::new(),
        }
    }

    /// The deterministic byte form that gets hashed and signed: every input
    /// as `from ∥ outpoint`, in order, then every output as
    /// `to ∥ LE64(value)`, in order. Independent of any host serialization.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out: Vec<u8> = vec![];

        for input in &self.inputs {
            out.extend_from_slice(&input.from);
            out.extend_from_slice(&input.output.canonical_bytes());
        }

        for output in &self.outputs {
            out.extend_from_slice(&output.to);
            out.extend_from_slice(&output.value.to_le_bytes());
        }

        out
    }
}

/// A transaction's identity: the SHA-256 of its canonical bytes. This is the
/// message every input signer signs.
pub fn hash_txn(txn: &Transaction) -> Hash256 {
    sha256(&txn.canonical_bytes())
}

/// The coinbase transaction pays the block reward to the miner. It has no
/// inputs and is never signed; verifiers recognize it purely by being first
/// in the block.
pub fn make_coinbase_txn(miner: &AccountId) -> Transaction {
    Transaction {
        inputs: vec![],
        outputs: vec![TxnOutput {
            value: MINING_REWARD,
            to: *miner,
        }],
        signatures: HashMap::new(),
    }
}

/// Walks the account's stored outputs in order, taking each one until the
/// requested value is covered. Returns the inputs and the total they add up
/// to, or None when the outputs fall short.
pub fn collect_inputs(
    from: &AccountId,
    utxos: &[Utxo],
    value: u64,
) -> Option<(Vec<TxnInput>, u64)> {
    let mut accumulated: u64 = 0;
    let mut inputs: Vec<TxnInput> = vec![];

    for utxo in utxos {
        accumulated += utxo.value;
        inputs.push(TxnInput {
            from: *from,
            output: utxo.path,
        });

        if accumulated >= value {
            return Some((inputs, accumulated));
        }
    }

    None
}

impl std::fmt::Debug for Outpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outpoint")
            .field("block_hash", &hex::encode(self.block_hash))
            .field("txn_idx", &self.txn_idx)
            .field("output_idx", &self.output_idx)
            .finish()
    }
}

impl std::fmt::Debug for TxnInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxnInput")
            .field("from", &hex::encode(self.from))
            .field("output", &self.output)
            .finish()
    }
}

impl std::fmt::Debug for TxnOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxnOutput")
            .field("value", &self.value)
            .field("to", &hex::encode(self.to))
            .finish()
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let signers: Vec<String> = self.signatures.keys().map(hex::encode).collect();

        f.debug_struct("Transaction")
            .field("hash", &hex::encode(hash_txn(self)))
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("signers", &signers)
            .finish()
    }
}
