use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::wallet::{AccountId, Hash256};

use super::block::Block;
use super::store::{Bucket, Store, StoreResult};
use super::transaction::{Outpoint, Transaction};
use super::NULL_HASH;

/// An unspent output: the amount plus the path that created it. Derived
/// entirely from the chain, never signed, and always recomputable.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Utxo {
    pub value: u64,
    pub path: Outpoint,
}

/// Adds up a UTXO list.
pub fn balance(utxos: &[Utxo]) -> u64 {
    utxos.iter().fold(0, |a, e| a + e.value)
}

/// In-memory overlay over the utxo bucket. Reads fall through to the store
/// the first time an account is touched; accounts with nothing stored start
/// out empty. All mutation stays in the overlay until [UtxoIndex::persist]
/// writes the touched lists back in one store transaction.
pub struct UtxoIndex<'a> {
    store: &'a Store,
    overlay: HashMap<AccountId, Vec<Utxo>>,
}

impl<'a> UtxoIndex<'a> {
    pub fn new(store: &'a Store) -> UtxoIndex<'a> {
        UtxoIndex {
            store,
            overlay: HashMap::new(),
        }
    }

    /// The account's current list, loading it from the bucket on first
    /// access.
    pub fn get(&mut self, account: &AccountId) -> StoreResult<&mut Vec<Utxo>> {
        if !self.overlay.contains_key(account) {
            let stored: Vec<Utxo> = self
                .store
                .get_obj(Bucket::Utxo, account)?
                .unwrap_or_default();
            self.overlay.insert(*account, stored);
        }

        Ok(self.overlay.get_mut(account).unwrap())
    }

    /// Removes the outputs consumed by the transaction's inputs. Every input
    /// must match a UTXO owned by its `from` account; a miss means the
    /// transaction was invalid or the index is corrupt, and there is no way
    /// to continue from either.
    pub fn remove_spent_outputs(&mut self, txn: &Transaction) -> StoreResult<()> {
        for input in &txn.inputs {
            let utxos = self.get(&input.from)?;
            let pos = utxos
                .iter()
                .position(|utxo| utxo.path == input.output)
                .expect("No unspent output found for transaction input");

            // Order is not preserved: the last entry is swapped into the hole
            utxos.swap_remove(pos);
        }

        Ok(())
    }

    /// Appends one UTXO per transaction output, pathed at this block and
    /// transaction index.
    pub fn add_new_outputs(
        &mut self,
        txn: &Transaction,
        txn_idx: u32,
        block_hash: &Hash256,
    ) -> StoreResult<()> {
        for (output_idx, output) in txn.outputs.iter().enumerate() {
            let path = Outpoint {
                block_hash: *block_hash,
                txn_idx,
                output_idx: output_idx as u32,
            };

            self.get(&output.to)?.push(Utxo {
                value: output.value,
                path,
            });
        }

        Ok(())
    }

    /// Writes every touched account's list back to the bucket in one store
    /// transaction.
    pub fn persist(&self) -> StoreResult<()> {
        let mut tx = self.store.write_tx();

        for (account, utxos) in &self.overlay {
            tx.put_obj(Bucket::Utxo, account, utxos)?;
        }

        self.store.commit(tx)
    }

    /// Remove-then-add per transaction, in block order. The coinbase has no
    /// inputs so it applies cleanly, and a transaction can spend an output
    /// created earlier in the same block.
    fn apply_block(&mut self, block: &Block) -> StoreResult<()> {
        for (txn_idx, txn) in block.transactions.iter().enumerate() {
            self.remove_spent_outputs(txn)?;
            self.add_new_outputs(txn, txn_idx as u32, &block.pow.hash)?;
        }

        Ok(())
    }
}

/// Applies a freshly appended block to the stored UTXO index.
pub fn update_utxo_set(store: &Store, block: &Block) -> StoreResult<()> {
    let mut index = UtxoIndex::new(store);
    index.apply_block(block)?;

    index.persist()
}

/// Rebuilds the whole index from scratch: empties the utxo bucket, walks the
/// back-links from the latest block down to genesis, then re-applies every
/// block oldest-first.
pub fn generate_utxo(store: &Store, latest_block: &Hash256) -> StoreResult<()> {
    store.clear(Bucket::Utxo)?;

    let mut blocks: Vec<Block> = vec![];
    let mut current = *latest_block;

    while current != NULL_HASH {
        let block: Block = store
            .get_obj(Bucket::Chain, &current)?
            .expect("Chain walk hit a hash with no stored block");
        current = block.last_block_hash;
        blocks.push(block);
    }

    let mut index = UtxoIndex::new(store);
    for block in blocks.iter().rev() {
        index.apply_block(block)?;
    }

    index.persist()
}

impl std::fmt::Debug for Utxo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Utxo")
            .field("value", &self.value)
            .field("path", &self.path)
            .finish()
    }
}
