use crate::wallet::{verify_signature, AccountId};

use super::block::Block;
use super::keystore;
use super::store::{Bucket, Store};
use super::transaction::{hash_txn, Transaction};
use super::txn_verify_error::TxnVerifyResult;

use super::txn_verify_error::ErrorKind::BadOutpoint;
use super::txn_verify_error::ErrorKind::BadSignature;
use super::txn_verify_error::ErrorKind::ForeignOutput;
use super::txn_verify_error::ErrorKind::MissingSignature;
use super::txn_verify_error::ErrorKind::Store as StoreErr;
use super::txn_verify_error::ErrorKind::UnknownAccount;
use super::txn_verify_error::ErrorKind::ValueMismatch;

/// Verifies a non-coinbase transaction against the stored chain and
/// keystore. Every distinct input signer must be registered and must have
/// signed the transaction hash; every input must resolve to a stored output
/// that the spender owns; and the input and output totals must match. Does
/// not mutate anything, and does not check whether the spent outputs are
/// still unspent - that is enforced structurally when the UTXO index is
/// updated.
pub fn verify_transaction(txn: &Transaction, store: &Store) -> TxnVerifyResult<()> {
    let txn_hash = hash_txn(txn);

    // The distinct signers, in input order
    let mut signers: Vec<AccountId> = vec![];
    for input in &txn.inputs {
        if !signers.contains(&input.from) {
            signers.push(input.from);
        }
    }

    for signer in &signers {
        let public_key = match keystore::get_key(store, signer) {
            Err(err) => return Err(Box::new(StoreErr(err.to_string()))),
            Ok(None) => return Err(Box::new(UnknownAccount(*signer))),
            Ok(Some(key)) => key,
        };

        let signature = match txn.signatures.get(signer) {
            None => return Err(Box::new(MissingSignature(*signer))),
            Some(signature) => signature,
        };

        if !verify_signature(&public_key, &txn_hash, signature) {
            return Err(Box::new(BadSignature(*signer)));
        }
    }

    // Resolve each input to the output it spends and add up the values
    let mut input_sum: u64 = 0;

    for input in &txn.inputs {
        let outpoint = &input.output;

        let block: Block = match store.get_obj(Bucket::Chain, &outpoint.block_hash) {
            Err(err) => return Err(Box::new(StoreErr(err.to_string()))),
            Ok(None) => return Err(Box::new(BadOutpoint(*outpoint))),
            Ok(Some(block)) => block,
        };

        let spent_txn = match block.transactions.get(outpoint.txn_idx as usize) {
            None => return Err(Box::new(BadOutpoint(*outpoint))),
            Some(txn) => txn,
        };

        let output = match spent_txn.outputs.get(outpoint.output_idx as usize) {
            None => return Err(Box::new(BadOutpoint(*outpoint))),
            Some(output) => output,
        };

        // The spent output must actually belong to the account claiming it
        if output.to != input.from {
            return Err(Box::new(ForeignOutput(*outpoint, input.from)));
        }

        input_sum += output.value;
    }

    let output_sum = txn.outputs.iter().fold(0, |a, e| a + e.value);

    // Value conservation: a transaction can neither create nor destroy coins
    if input_sum != output_sum {
        return Err(Box::new(ValueMismatch(input_sum, output_sum)));
    }

    Ok(())
}
