use std::fmt;
use std::path::Path;

use rocksdb::{IteratorMode, WriteBatch, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Reserved key in the misc bucket holding the 32-byte hash of the most
/// recently appended block.
pub const LATEST_BLOCK_KEY: &[u8] = b"latestBlock";

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Db(rocksdb::Error),
    Codec(bincode::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::Db(err) => write!(fmt, "Store error: {}", err),
            StoreError::Codec(err) => write!(fmt, "Stored value codec error: {}", err),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rocksdb::Error> for StoreError {
    fn from(err: rocksdb::Error) -> StoreError {
        StoreError::Db(err)
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> StoreError {
        StoreError::Codec(err)
    }
}

/// The four logical buckets of the database, kept apart by a key prefix in a
/// single RocksDB instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// block hash -> serialized block
    Chain,
    /// account id -> serialized UTXO list
    Utxo,
    /// account id -> raw public key bytes
    Keystore,
    /// reserved keys, currently only [LATEST_BLOCK_KEY]
    Misc,
}

impl Bucket {
    fn prefix(self) -> &'static [u8] {
        match self {
            Bucket::Chain => b"c:",
            Bucket::Utxo => b"u:",
            Bucket::Keystore => b"k:",
            Bucket::Misc => b"m:",
        }
    }

    fn key(self, key: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + key.len());
        out.extend_from_slice(self.prefix());
        out.extend_from_slice(key);

        out
    }
}

/// The key-value store backing the chain. Reads hit the database directly;
/// writes go through a [StoreTx] batch so that related mutations (a block
/// plus the latest-block pointer, or a set of UTXO lists) commit atomically.
pub struct Store {
    db: DB,
}

impl Store {
    pub fn open(path: &Path) -> StoreResult<Store> {
        let db = DB::open_default(path)?;

        Ok(Store { db })
    }

    pub fn get(&self, bucket: Bucket, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.db.get(bucket.key(key))?)
    }

    /// Reads and bincode-decodes a stored value.
    pub fn get_obj<T: DeserializeOwned>(
        &self,
        bucket: Bucket,
        key: &[u8],
    ) -> StoreResult<Option<T>> {
        match self.get(bucket, key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Starts a read-write store transaction.
    pub fn write_tx(&self) -> StoreTx {
        StoreTx {
            batch: WriteBatch::default(),
        }
    }

    /// Atomically applies everything accumulated in the transaction.
    pub fn commit(&self, tx: StoreTx) -> StoreResult<()> {
        Ok(self.db.write(tx.batch)?)
    }

    /// Deletes every key in the bucket. Full scan; only used when the chain
    /// is initialized or the UTXO index is rebuilt from scratch.
    pub fn clear(&self, bucket: Bucket) -> StoreResult<()> {
        let mut tx = self.write_tx();

        for item in self.db.iterator(IteratorMode::Start) {
            let (key, _) = item?;
            if key.starts_with(bucket.prefix()) {
                tx.batch.delete(key);
            }
        }

        self.commit(tx)
    }
}

/// A pending read-write transaction: puts and deletes accumulate here and
/// only reach the database on [Store::commit].
pub struct StoreTx {
    batch: WriteBatch,
}

impl StoreTx {
    pub fn put(&mut self, bucket: Bucket, key: &[u8], value: &[u8]) {
        self.batch.put(bucket.key(key), value);
    }

    pub fn put_obj<T: Serialize>(
        &mut self,
        bucket: Bucket,
        key: &[u8],
        value: &T,
    ) -> StoreResult<()> {
        let bytes = bincode::serialize(value)?;
        self.batch.put(bucket.key(key), bytes);

        Ok(())
    }

    pub fn delete(&mut self, bucket: Bucket, key: &[u8]) {
        self.batch.delete(bucket.key(key));
    }
}
