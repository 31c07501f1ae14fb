use super::block::{meets_difficulty, pow_hash, Block};
use super::block_verify_error::BlockVerifyResult;
use super::store::Store;
use super::transaction::hash_txn;
use super::txn_verify::verify_transaction;
use super::MINING_REWARD;

use super::block_verify_error::ErrorKind::EmptyBlock;
use super::block_verify_error::ErrorKind::FailedProofOfWork;
use super::block_verify_error::ErrorKind::InvalidCoinbase;
use super::block_verify_error::ErrorKind::InvalidCoinbaseAmount;
use super::block_verify_error::ErrorKind::TxnError;

/// Full validation for a block that did not come out of the local miner.
/// AddBlock trusts locally mined blocks and skips this.
pub fn verify_block(block: &Block, store: &Store) -> BlockVerifyResult<()> {
    // The recorded proof of work must be reproducible from the body and
    // nonce, and must satisfy the difficulty predicate
    let hash = pow_hash(&block.body(), block.pow.nonce);
    if hash != block.pow.hash || !meets_difficulty(&hash) {
        return Err(Box::new(FailedProofOfWork));
    }

    // The first transaction must be the coinbase: no inputs, exactly one
    // output paying the block reward. Its signatures are not checked.
    let coinbase = match block.transactions.first() {
        None => return Err(Box::new(EmptyBlock)),
        Some(txn) => txn,
    };

    if !coinbase.inputs.is_empty() || coinbase.outputs.len() != 1 {
        return Err(Box::new(InvalidCoinbase));
    }

    if coinbase.outputs[0].value != MINING_REWARD {
        return Err(Box::new(InvalidCoinbaseAmount(
            MINING_REWARD,
            coinbase.outputs[0].value,
        )));
    }

    // Every other transaction gets the full treatment
    for txn in &block.transactions[1..] {
        if let Err(err) = verify_transaction(txn, store) {
            return Err(Box::new(TxnError(err, hash_txn(txn))));
        }
    }

    Ok(())
}
