use tracing::debug;

use crate::{
    command::MoneyCommand,
    store::{LedgerStore, StoreError, UnitOfWork},
    transaction::{Transaction, TransactionStatus},
};

/// Appends audit records for money movements. Never touches an existing record.
pub struct TransactionRecorder<'s, S: ?Sized> {
    store: &'s S,
}

impl<'s, S> TransactionRecorder<'s, S>
where
    S: LedgerStore + ?Sized,
{
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Records the outcome of `command` in its own commit, independent of any
    /// unit of work that may have been rolled back.
    pub fn record(
        &self,
        command: &MoneyCommand,
        status: TransactionStatus,
        reason: Option<String>,
    ) -> Result<Transaction, StoreError> {
        let transaction = Transaction::new(command, status, reason);
        self.store.append_transaction(transaction.clone())?;
        Ok(transaction)
    }

    /// Stages a success record so it commits or rolls back with `unit`.
    pub fn record_in(
        &self,
        unit: &mut dyn UnitOfWork,
        command: &MoneyCommand,
    ) -> Result<Transaction, StoreError> {
        let transaction = Transaction::new(command, TransactionStatus::Success, None);
        unit.append_transaction(transaction.clone())?;
        debug!(transaction = %transaction.id(), kind = ?transaction.kind(), "success staged");
        Ok(transaction)
    }
}
