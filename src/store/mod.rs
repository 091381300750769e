use std::fmt;

use thiserror::Error;

use crate::{
    account::{Account, AccountFilter},
    customer::Customer,
    id::{AccountId, CustomerId},
    transaction::{Transaction, TransactionFilter},
};

pub mod in_memory;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),
    #[error("Customer {0} not found")]
    CustomerNotFound(CustomerId),
    #[error("Timed out waiting for lock on {0}")]
    LockTimeout(RowKey),
    #[error("{0} is not locked by this unit of work")]
    NotLocked(RowKey),
    #[error("Ledger store unavailable: {0}")]
    Unavailable(String),
}

/// A lockable row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKey {
    Customer(CustomerId),
    Account(AccountId),
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Customer(id) => write!(f, "customer {id}"),
            RowKey::Account(id) => write!(f, "account {id}"),
        }
    }
}

/// Atomic unit of work against the ledger.
///
/// Rows are locked exclusively on first access and stay locked until the unit
/// is committed or dropped. Writes are staged and become visible together on
/// [`UnitOfWork::commit`]; dropping an uncommitted unit discards them.
pub trait UnitOfWork {
    /// Locks the account row and returns its current state (or the state this
    /// unit already staged for it).
    fn lock_account(&mut self, id: AccountId) -> Result<Account, StoreError>;

    fn lock_customer(&mut self, id: CustomerId) -> Result<Customer, StoreError>;

    /// Locks every account owned by the customer in ascending id order.
    /// The customer row should be locked first so no account is opened meanwhile.
    fn lock_customer_accounts(&mut self, id: CustomerId) -> Result<Vec<Account>, StoreError>;

    /// Stages a new version of a row locked by this unit.
    fn put_account(&mut self, account: Account) -> Result<(), StoreError>;

    fn put_customer(&mut self, customer: Customer) -> Result<(), StoreError>;

    /// Stages a brand-new account; its owner has to be locked by this unit.
    fn insert_account(&mut self, account: Account) -> Result<(), StoreError>;

    fn append_transaction(&mut self, transaction: Transaction) -> Result<(), StoreError>;

    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Durable storage for customers, accounts and the transaction log.
///
/// Methods outside [`UnitOfWork`] commit on their own, independently of any
/// unit of work in flight.
pub trait LedgerStore: Send + Sync {
    fn begin(&self) -> Result<Box<dyn UnitOfWork + '_>, StoreError>;

    fn insert_customer(&self, customer: Customer) -> Result<(), StoreError>;

    /// Append-only; every referenced account must exist.
    fn append_transaction(&self, transaction: Transaction) -> Result<(), StoreError>;

    fn customer(&self, id: CustomerId) -> Result<Customer, StoreError>;

    fn account(&self, id: AccountId) -> Result<Account, StoreError>;

    /// Matching accounts in creation order.
    fn accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>, StoreError>;

    /// Matching transactions, newest first.
    fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError>;
}
