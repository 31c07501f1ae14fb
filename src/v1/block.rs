use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::wallet::{sha256, Hash256};

use super::transaction::Transaction;
use super::{DIFFICULTY_TARGET, EMPTY_HASH};

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoW {
    pub nonce: u64,
    pub hash: Hash256,
}

/// A block is identified by its proof-of-work hash. The first transaction is
/// always the coinbase; the chain is back-linked through `last_block_hash`
/// (NULL for genesis).
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Block {
    pub transactions: Vec<Transaction>,
    pub last_block_hash: Hash256,
    pub pow: PoW,
}

impl Block {
    pub fn new() -> Block {
        Block {
            transactions: vec![],
            last_block_hash: EMPTY_HASH,
            pow: PoW::default(),
        }
    }

    /// The byte form fed to the proof-of-work hash: every transaction's
    /// canonical bytes in order, then the predecessor hash. The predecessor
    /// must be linked in before this is called.
    pub fn body(&self) -> Vec<u8> {
        assert!(
            self.last_block_hash != EMPTY_HASH,
            "Tried to encode a block with no predecessor hash"
        );

        let mut out: Vec<u8> = vec![];
        for txn in &self.transactions {
            out.extend_from_slice(&txn.canonical_bytes());
        }
        out.extend_from_slice(&self.last_block_hash);

        out
    }

    /// Brute-forces the nonce, starting from zero, until the hash of
    /// `body ∥ LE64(nonce)` drops below [DIFFICULTY_TARGET]. Blocks the
    /// calling thread for as long as that takes; there is no cancellation.
    pub fn mine(&mut self) {
        info!(
            "mining block on top of {}",
            hex::encode(self.last_block_hash)
        );

        let body = self.body();
        let mut nonce: u64 = 0;

        loop {
            let hash = pow_hash(&body, nonce);

            if meets_difficulty(&hash) {
                debug!("found nonce {} -> {}", nonce, hex::encode(hash));
                self.pow = PoW { nonce, hash };
                return;
            }

            nonce += 1;
        }
    }
}

impl Default for Block {
    fn default() -> Block {
        Block::new()
    }
}

/// SHA-256 of the block body followed by the little-endian nonce. Verifiers
/// recompute this to check a block's proof of work.
pub fn pow_hash(body: &[u8], nonce: u64) -> Hash256 {
    let mut data = Vec::with_capacity(body.len() + 8);
    data.extend_from_slice(body);
    data.extend_from_slice(&nonce.to_le_bytes());

    sha256(&data)
}

/// Byte-lexicographic comparison against the fixed target.
pub fn meets_difficulty(hash: &Hash256) -> bool {
    DIFFICULTY_TARGET > *hash
}

impl std::fmt::Debug for PoW {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoW")
            .field("nonce", &self.nonce)
            .field("hash", &hex::encode(self.hash))
            .finish()
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("transactions", &self.transactions)
            .field("last_block_hash", &hex::encode(self.last_block_hash))
            .field("pow", &self.pow)
            .finish()
    }
}
