use crate::wallet::{account_id_from_public_key, AccountId};

use super::store::{Bucket, Store, StoreResult};

/// Registers a public key under its account id (the key's SHA-256). The
/// keystore only ever holds public halves; private keys stay with their
/// owners.
pub fn add_key(store: &Store, public_key: &[u8]) -> StoreResult<AccountId> {
    let id = account_id_from_public_key(public_key);

    let mut tx = store.write_tx();
    tx.put(Bucket::Keystore, &id, public_key);
    store.commit(tx)?;

    Ok(id)
}

/// Raw public key bytes for the account, or None when it was never
/// registered. Callers decide whether a miss is an error.
pub fn get_key(store: &Store, account: &AccountId) -> StoreResult<Option<Vec<u8>>> {
    store.get(Bucket::Keystore, account)
}
