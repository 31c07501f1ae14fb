use std::error;
use std::fmt;

use crate::wallet::{AccountId, Hash256};

use super::block_verify_error::BlockVerifyError;
use super::store::StoreError;
use super::txn_verify_error::TxnVerifyError;

pub type ChainResult<T> = std::result::Result<T, ChainError>;

pub type ChainError = Box<ErrorKind>;

#[derive(Debug)]
pub enum ErrorKind {
    InsufficientFunds(u64, u64),
    BadPredecessor(Hash256, Hash256),
    NotMined,
    UnknownBlock(Hash256),
    UnknownAccount(AccountId),
    Store(StoreError),
    Txn(TxnVerifyError),
    Block(BlockVerifyError),
}

impl ErrorKind {
    pub fn description(&self) -> &str {
        match *self {
            ErrorKind::InsufficientFunds(_, _) => "Not enough unspent outputs to cover the amount",
            ErrorKind::BadPredecessor(_, _) => "Block does not extend the latest block",
            ErrorKind::NotMined => "Block has no proof of work",
            ErrorKind::UnknownBlock(_) => "No block stored under that hash",
            ErrorKind::UnknownAccount(_) => "Account is not in the keystore",
            ErrorKind::Store(_) => "Store error",
            ErrorKind::Txn(_) => "Transaction failed verification",
            ErrorKind::Block(_) => "Block failed verification",
        }
    }
}

impl error::Error for ErrorKind {}

impl fmt::Display for ErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match &*self {
            ErrorKind::InsufficientFunds(requested, available) => write!(
                fmt,
                "{}: requested: {}, available: {}",
                self.description(),
                requested,
                available
            ),
            ErrorKind::BadPredecessor(expected, actual) => write!(
                fmt,
                "{}: latest: {}, predecessor: {}",
                self.description(),
                hex::encode(expected),
                hex::encode(actual)
            ),
            ErrorKind::NotMined => write!(fmt, "{}", self.description()),
            ErrorKind::UnknownBlock(hash) => {
                write!(fmt, "{}: {}", self.description(), hex::encode(hash))
            }
            ErrorKind::UnknownAccount(account) => {
                write!(fmt, "{}: {}", self.description(), hex::encode(account))
            }
            ErrorKind::Store(err) => write!(fmt, "{}: {}", self.description(), err),
            ErrorKind::Txn(err) => write!(fmt, "{}: {}", self.description(), err),
            ErrorKind::Block(err) => write!(fmt, "{}: {}", self.description(), err),
        }
    }
}

impl From<StoreError> for ChainError {
    fn from(err: StoreError) -> ChainError {
        Box::new(ErrorKind::Store(err))
    }
}

impl From<TxnVerifyError> for ChainError {
    fn from(err: TxnVerifyError) -> ChainError {
        Box::new(ErrorKind::Txn(err))
    }
}

impl From<BlockVerifyError> for ChainError {
    fn from(err: BlockVerifyError) -> ChainError {
        Box::new(ErrorKind::Block(err))
    }
}
