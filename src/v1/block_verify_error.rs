use std::error;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::wallet::Hash256;

use super::txn_verify_error::TxnVerifyError;

pub type BlockVerifyResult<T> = std::result::Result<T, BlockVerifyError>;

pub type BlockVerifyError = Box<ErrorKind>;

#[derive(Debug, Serialize, Deserialize)]
pub enum ErrorKind {
    FailedProofOfWork,
    EmptyBlock,
    InvalidCoinbase,
    InvalidCoinbaseAmount(u64, u64),
    TxnError(TxnVerifyError, Hash256),
}

impl ErrorKind {
    pub fn description(&self) -> &str {
        match *self {
            ErrorKind::FailedProofOfWork => "Block hash does not satisfy the difficulty target",
            ErrorKind::EmptyBlock => "Block has no transactions",
            ErrorKind::InvalidCoinbase => "Invalid coinbase transaction",
            ErrorKind::InvalidCoinbaseAmount(_, _) => "Invalid coinbase transaction amount",
            ErrorKind::TxnError(_, _) => "Invalid transaction in block",
        }
    }
}

impl error::Error for ErrorKind {}

impl fmt::Display for ErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match &*self {
            ErrorKind::FailedProofOfWork => write!(fmt, "{}", self.description()),
            ErrorKind::EmptyBlock => write!(fmt, "{}", self.description()),
            ErrorKind::InvalidCoinbase => write!(fmt, "{}", self.description()),
            ErrorKind::InvalidCoinbaseAmount(expected, actual) => write!(
                fmt,
                "{}: expected: {}, actual: {}",
                self.description(),
                expected,
                actual
            ),
            ErrorKind::TxnError(err, txn) => write!(
                fmt,
                "{}: error: {}, txn: {}",
                self.description(),
                err,
                hex::encode(txn)
            ),
        }
    }
}
