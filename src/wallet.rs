use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use ring::digest::{Context, SHA256};
use ring::rand::SystemRandom;
use ring::signature::{Ed25519KeyPair, KeyPair, UnparsedPublicKey, ED25519};

pub type Hash256 = [u8; 32];

/// SHA-256 of an account's raw Ed25519 public key. This is how participants
/// are identified everywhere: in transaction outputs, in the keystore, and in
/// the UTXO index.
pub type AccountId = Hash256;

/// A raw Ed25519 signature (64 bytes) over a transaction hash.
pub type Signature = Vec<u8>;

pub fn sha256(data: &[u8]) -> Hash256 {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();

    let mut out = [0u8; 32];
    out.copy_from_slice(digest.as_ref());

    out
}

pub fn account_id_from_public_key(public_key: &[u8]) -> AccountId {
    sha256(public_key)
}

/// An Ed25519 keypair together with its derived account id.
///
/// The private key never leaves this struct. The rest of the system only ever
/// sees the public key (via the keystore) and the id.
pub struct Account {
    keypair: Ed25519KeyPair,
    pkcs8: Vec<u8>,
    pub public_key: Vec<u8>,
    pub id: AccountId,
}

impl Account {
    /// Generates a fresh keypair from the system RNG.
    pub fn create() -> Result<Account, Box<dyn Error>> {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng)
            .map_err(|_| "Failed to generate account keypair")?;

        Account::from_pkcs8(pkcs8.as_ref().to_vec())
    }

    /// Loads an account from a PKCS#8 document written by [Account::save].
    pub fn load(path: &Path) -> Result<Account, Box<dyn Error>> {
        let pkcs8 = fs::read(path)?;

        Account::from_pkcs8(pkcs8)
    }

    pub fn save(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        fs::write(path, &self.pkcs8)?;

        Ok(())
    }

    fn from_pkcs8(pkcs8: Vec<u8>) -> Result<Account, Box<dyn Error>> {
        let keypair =
            Ed25519KeyPair::from_pkcs8(&pkcs8).map_err(|_| "Invalid account key document")?;
        let public_key = keypair.public_key().as_ref().to_vec();
        let id = account_id_from_public_key(&public_key);

        Ok(Account {
            keypair,
            pkcs8,
            public_key,
            id,
        })
    }

    /// Signs a transaction hash. Ed25519 signing is deterministic, so no RNG
    /// is involved here.
    pub fn sign(&self, txn_hash: &Hash256) -> Signature {
        self.keypair.sign(txn_hash).as_ref().to_vec()
    }
}

pub fn verify_signature(public_key: &[u8], txn_hash: &Hash256, signature: &[u8]) -> bool {
    UnparsedPublicKey::new(&ED25519, public_key)
        .verify(txn_hash, signature)
        .is_ok()
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &hex::encode(self.id))
            .field("public_key", &hex::encode(&self.public_key))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_is_hash_of_public_key() {
        let account = Account::create().unwrap();

        assert_eq!(account.id, sha256(&account.public_key));
    }

    #[test]
    fn sign_and_verify() {
        let account = Account::create().unwrap();
        let txn_hash = sha256(b"some transaction");
        let signature = account.sign(&txn_hash);

        assert!(verify_signature(&account.public_key, &txn_hash, &signature));
    }

    #[test]
    fn verify_rejects_wrong_message() {
        let account = Account::create().unwrap();
        let txn_hash = sha256(b"some transaction");
        let signature = account.sign(&txn_hash);
        let other_hash = sha256(b"another transaction");

        assert!(!verify_signature(&account.public_key, &other_hash, &signature));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let account = Account::create().unwrap();
        let other = Account::create().unwrap();
        let txn_hash = sha256(b"some transaction");
        let signature = account.sign(&txn_hash);

        assert!(!verify_signature(&other.public_key, &txn_hash, &signature));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("miner.key");

        let account = Account::create().unwrap();
        account.save(&path).unwrap();

        let loaded = Account::load(&path).unwrap();
        assert_eq!(loaded.id, account.id);
        assert_eq!(loaded.public_key, account.public_key);

        // Both copies must produce signatures the other's public key accepts
        let txn_hash = sha256(b"payload");
        assert!(verify_signature(
            &account.public_key,
            &txn_hash,
            &loaded.sign(&txn_hash)
        ));
    }
}
