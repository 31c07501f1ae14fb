use std::error;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::wallet::AccountId;

use super::transaction::Outpoint;

pub type TxnVerifyResult<T> = std::result::Result<T, TxnVerifyError>;

pub type TxnVerifyError = Box<ErrorKind>;

#[derive(Debug, Serialize, Deserialize)]
pub enum ErrorKind {
    UnknownAccount(AccountId),
    MissingSignature(AccountId),
    BadSignature(AccountId),
    BadOutpoint(Outpoint),
    ForeignOutput(Outpoint, AccountId),
    ValueMismatch(u64, u64),
    Store(String),
}

impl ErrorKind {
    pub fn description(&self) -> &str {
        match *self {
            ErrorKind::UnknownAccount(_) => "Input signer is not in the keystore",
            ErrorKind::MissingSignature(_) => "Transaction carries no signature for an input signer",
            ErrorKind::BadSignature(_) => "Signature does not verify against the signer's key",
            ErrorKind::BadOutpoint(_) => "Input does not resolve to a stored output",
            ErrorKind::ForeignOutput(_, _) => "Input spends an output owned by someone else",
            ErrorKind::ValueMismatch(_, _) => "Input and output totals differ",
            ErrorKind::Store(_) => "Store error during verification",
        }
    }
}

impl error::Error for ErrorKind {}

impl fmt::Display for ErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match &*self {
            ErrorKind::UnknownAccount(account) => {
                write!(fmt, "{}: {}", self.description(), hex::encode(account))
            }
            ErrorKind::MissingSignature(signer) => {
                write!(fmt, "{}: {}", self.description(), hex::encode(signer))
            }
            ErrorKind::BadSignature(signer) => {
                write!(fmt, "{}: {}", self.description(), hex::encode(signer))
            }
            ErrorKind::BadOutpoint(outpoint) => write!(
                fmt,
                "{}: block: {}, txn: {}, output: {}",
                self.description(),
                hex::encode(outpoint.block_hash),
                outpoint.txn_idx,
                outpoint.output_idx
            ),
            ErrorKind::ForeignOutput(outpoint, from) => write!(
                fmt,
                "{}: block: {}, txn: {}, output: {}, claimed by: {}",
                self.description(),
                hex::encode(outpoint.block_hash),
                outpoint.txn_idx,
                outpoint.output_idx,
                hex::encode(from)
            ),
            ErrorKind::ValueMismatch(input_sum, output_sum) => write!(
                fmt,
                "{}: inputs: {}, outputs: {}",
                self.description(),
                input_sum,
                output_sum
            ),
            ErrorKind::Store(msg) => write!(fmt, "{}: {}", self.description(), msg),
        }
    }
}
