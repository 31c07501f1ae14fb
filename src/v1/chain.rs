use std::path::Path;

use log::info;

use crate::wallet::{Account, AccountId, Hash256};

use super::block::Block;
use super::block_verify;
use super::block_verify_error::BlockVerifyResult;
use super::chain_error::ChainResult;
use super::keystore;
use super::mempool::Mempool;
use super::store::{Bucket, Store, LATEST_BLOCK_KEY};
use super::transaction::{collect_inputs, hash_txn, make_coinbase_txn, Transaction, TxnOutput};
use super::txn_verify::verify_transaction;
use super::utxo::{balance, generate_utxo, update_utxo_set, Utxo};
use super::{EMPTY_HASH, NULL_HASH};

use super::chain_error::ErrorKind::BadPredecessor;
use super::chain_error::ErrorKind::InsufficientFunds;
use super::chain_error::ErrorKind::NotMined;
use super::chain_error::ErrorKind::Txn;
use super::chain_error::ErrorKind::UnknownAccount;
use super::chain_error::ErrorKind::UnknownBlock;

/// The ledger engine: the backing store plus the process-local mempool, the
/// latest-block pointer, and the account id that collects mining rewards.
///
/// Everything here is synchronous and single-threaded. Operations run to
/// completion on the caller's thread, and mining blocks that thread until a
/// nonce is found. Callers that need concurrent access must wrap the whole
/// thing in their own lock.
pub struct Blockchain {
    pub store: Store,
    pub mempool: Mempool,
    mining_account: AccountId,
    latest_block: Hash256,
}

impl Blockchain {
    /// Opens the chain at `path`. When no latest-block pointer exists the
    /// store is treated as brand new: buckets are wiped, the UTXO index is
    /// rebuilt (empty), a genesis block paying `mining_account` is mined and
    /// appended, and the miner's public key is registered.
    pub fn open(path: &Path, mining_account: &Account) -> ChainResult<Blockchain> {
        let store = Store::open(path)?;
        let latest = store.get(Bucket::Misc, LATEST_BLOCK_KEY)?;

        let mut chain = Blockchain {
            store,
            mempool: Mempool::new(),
            mining_account: mining_account.id,
            latest_block: NULL_HASH,
        };

        match latest {
            Some(bytes) => {
                let mut hash = EMPTY_HASH;
                hash.copy_from_slice(&bytes);
                chain.latest_block = hash;
                info!("opened chain at block {}", hex::encode(hash));
            }
            None => chain.initialize(mining_account)?,
        }

        Ok(chain)
    }

    fn initialize(&mut self, mining_account: &Account) -> ChainResult<()> {
        info!("no chain found, initializing a new one");

        for bucket in [Bucket::Chain, Bucket::Utxo, Bucket::Keystore, Bucket::Misc] {
            self.store.clear(bucket)?;
        }

        self.latest_block = NULL_HASH;
        generate_utxo(&self.store, &self.latest_block)?;

        let mut genesis = Block::new();
        genesis
            .transactions
            .push(make_coinbase_txn(&self.mining_account));
        genesis.last_block_hash = NULL_HASH;
        genesis.mine();
        self.add_block(&genesis)?;

        keystore::add_key(&self.store, &mining_account.public_key)?;

        Ok(())
    }

    pub fn close(self) {}

    /// Registers a public key so its holder's outputs can be verified.
    pub fn add_key(&self, public_key: &[u8]) -> ChainResult<AccountId> {
        Ok(keystore::add_key(&self.store, public_key)?)
    }

    pub fn get_key(&self, account: &AccountId) -> ChainResult<Vec<u8>> {
        match keystore::get_key(&self.store, account)? {
            Some(key) => Ok(key),
            None => Err(Box::new(UnknownAccount(*account))),
        }
    }

    /// Builds, signs and queues a payment. Inputs are taken from the
    /// sender's stored outputs in order until the amount is covered. The
    /// transaction is only checked against the chain when it is drained for
    /// mining.
    pub fn send(&mut self, from: &Account, to: &AccountId, value: u64) -> ChainResult<()> {
        let utxos = self.get_utxos_for_user(&from.id)?;
        let available = balance(&utxos);

        let (inputs, accumulated) = match collect_inputs(&from.id, &utxos, value) {
            None => return Err(Box::new(InsufficientFunds(value, available))),
            Some(picked) => picked,
        };

        // Change first, then the payee. Outpoints address outputs by index,
        // so this order is part of the protocol; the change output stays
        // even when it is zero.
        let outputs = vec![
            TxnOutput {
                value: accumulated - value,
                to: from.id,
            },
            TxnOutput { value, to: *to },
        ];

        let mut txn = Transaction::new(inputs, outputs);
        let txn_hash = hash_txn(&txn);
        txn.signatures.insert(from.id, from.sign(&txn_hash));

        self.mempool.push(txn);

        Ok(())
    }

    /// Assembles and mines the next block: coinbase first, then the mempool
    /// in arrival order. Each queued transaction is verified as it is
    /// drained. One that fails is dropped and its error aborts the attempt;
    /// everything drained before it is requeued, so only the offender is
    /// lost.
    pub fn mine_next(&mut self) -> ChainResult<Block> {
        let mut drained: Vec<Transaction> = vec![];

        while let Some(txn) = self.mempool.pop() {
            if let Err(err) = verify_transaction(&txn, &self.store) {
                self.mempool.requeue(drained);
                return Err(Box::new(Txn(err)));
            }

            drained.push(txn);
        }

        let mut block = Block::new();
        block
            .transactions
            .push(make_coinbase_txn(&self.mining_account));
        block.transactions.extend(drained);

        block.last_block_hash = self.latest_block;
        block.mine();
        self.add_block(&block)?;

        Ok(block)
    }

    /// Appends a mined block. The block bytes and the latest-block pointer
    /// are written in one store transaction, then the UTXO index is brought
    /// up to date. Proof of work is not re-checked here: locally mined
    /// blocks are trusted, and blocks from anywhere else go through
    /// [Blockchain::verify_block] first.
    pub fn add_block(&mut self, block: &Block) -> ChainResult<()> {
        if block.last_block_hash != self.latest_block {
            return Err(Box::new(BadPredecessor(
                self.latest_block,
                block.last_block_hash,
            )));
        }

        if block.pow.hash == EMPTY_HASH {
            return Err(Box::new(NotMined));
        }

        let mut tx = self.store.write_tx();
        tx.put_obj(Bucket::Chain, &block.pow.hash, block)?;
        tx.put(Bucket::Misc, LATEST_BLOCK_KEY, &block.pow.hash);
        self.store.commit(tx)?;
        self.latest_block = block.pow.hash;

        update_utxo_set(&self.store, block)?;

        info!("appended block {}", hex::encode(block.pow.hash));

        Ok(())
    }

    /// Full validation for an externally produced block.
    pub fn verify_block(&self, block: &Block) -> BlockVerifyResult<()> {
        block_verify::verify_block(block, &self.store)
    }

    pub fn get_block(&self, hash: &Hash256) -> ChainResult<Block> {
        match self.store.get_obj(Bucket::Chain, hash)? {
            Some(block) => Ok(block),
            None => Err(Box::new(UnknownBlock(*hash))),
        }
    }

    /// The account's stored unspent outputs; empty for unknown accounts.
    pub fn get_utxos_for_user(&self, account: &AccountId) -> ChainResult<Vec<Utxo>> {
        Ok(self
            .store
            .get_obj(Bucket::Utxo, account)?
            .unwrap_or_default())
    }

    pub fn balance(&self, account: &AccountId) -> ChainResult<u64> {
        Ok(balance(&self.get_utxos_for_user(account)?))
    }

    /// Rebuilds the UTXO index from the chain in place. The result is
    /// identical to the incrementally maintained index; this exists as a
    /// recovery path and is exercised during initialization.
    pub fn generate_utxo(&self) -> ChainResult<()> {
        Ok(generate_utxo(&self.store, &self.latest_block)?)
    }

    pub fn latest_block(&self) -> Hash256 {
        self.latest_block
    }

    pub fn mining_account(&self) -> AccountId {
        self.mining_account
    }
}
