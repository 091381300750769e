use thiserror::Error;

use crate::{
    account::AccountError, command::CommandError, customer::CustomerError, store::StoreError,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BankError {
    #[error(transparent)]
    CommandErr(#[from] CommandError),
    #[error(transparent)]
    AccountErr(#[from] AccountError),
    #[error(transparent)]
    CustomerErr(#[from] CustomerError),
    #[error(transparent)]
    StoreErr(#[from] StoreError),
}

/// Coarse classification callers can render messages from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input rejected before anything was read.
    Validation,
    /// An account or customer is not in a state that allows the operation.
    State,
    /// The operation would break a balance invariant.
    Consistency,
    NotFound,
    /// The ledger store itself failed.
    Storage,
}

impl BankError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BankError::CommandErr(_) => ErrorKind::Validation,
            BankError::AccountErr(err) => match err {
                AccountError::InsufficientFunds
                | AccountError::BalanceOverflow
                | AccountError::CurrencyMismatch { .. } => ErrorKind::Consistency,
                AccountError::NotOperable { .. }
                | AccountError::NonZeroBalance
                | AccountError::Closed { .. } => ErrorKind::State,
            },
            BankError::CustomerErr(err) => match err {
                CustomerError::EmptyName => ErrorKind::Validation,
                CustomerError::AccountsStillOpen
                | CustomerError::Closed { .. }
                | CustomerError::NotActive { .. } => ErrorKind::State,
            },
            BankError::StoreErr(err) => match err {
                StoreError::AccountNotFound(_) | StoreError::CustomerNotFound(_) => {
                    ErrorKind::NotFound
                }
                StoreError::LockTimeout(_)
                | StoreError::NotLocked(_)
                | StoreError::Unavailable(_) => ErrorKind::Storage,
            },
        }
    }

    /// Whether a failed money movement leaves a rejected transaction behind.
    ///
    /// Validation failures never reach the store, and a record for an unknown
    /// account would reference a row that does not exist.
    pub fn is_audited(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Validation | ErrorKind::NotFound)
    }
}
