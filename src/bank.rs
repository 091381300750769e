use crate::{
    account::{Account, AccountFilter, AccountKind, Currency},
    customer::Customer,
    engine::{BankEngine, TransferReceipt},
    error::BankError,
    id::{AccountId, CustomerId},
    lifecycle::LifecycleManager,
    store::{
        LedgerStore,
        in_memory::{InMemoryLedgerStore, StoreConfig},
    },
    transaction::{Transaction, TransactionFilter},
};

/// Entry point for callers: every operation the ledger exposes, over one store.
///
/// `Bank` holds no account state of its own; each call goes to the store.
#[derive(Debug, Default)]
pub struct Bank<S = InMemoryLedgerStore> {
    store: S,
}

impl Bank<InMemoryLedgerStore> {
    pub fn in_memory() -> Self {
        Self::new(InMemoryLedgerStore::new())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self::new(InMemoryLedgerStore::with_config(config))
    }
}

impl<S: LedgerStore> Bank<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> BankEngine<'_, S> {
        BankEngine::new(&self.store)
    }

    pub fn lifecycle(&self) -> LifecycleManager<'_, S> {
        LifecycleManager::new(&self.store)
    }

    pub fn deposit(&self, account: AccountId, amount: i64) -> Result<Account, BankError> {
        self.engine().deposit(account, amount)
    }

    pub fn withdraw(&self, account: AccountId, amount: i64) -> Result<Account, BankError> {
        self.engine().withdraw(account, amount)
    }

    pub fn transfer(
        &self,
        source: AccountId,
        target: AccountId,
        amount: i64,
    ) -> Result<TransferReceipt, BankError> {
        self.engine().transfer(source, target, amount)
    }

    pub fn register_customer(&self, name: &str) -> Result<Customer, BankError> {
        self.lifecycle().register_customer(name)
    }

    pub fn open_account(
        &self,
        customer: CustomerId,
        kind: AccountKind,
        currency: Currency,
    ) -> Result<Account, BankError> {
        self.lifecycle().open_account(customer, kind, currency)
    }

    pub fn activate_account(&self, account: AccountId) -> Result<Account, BankError> {
        self.lifecycle().activate_account(account)
    }

    pub fn block_account(&self, account: AccountId) -> Result<Account, BankError> {
        self.lifecycle().block_account(account)
    }

    pub fn close_account(&self, account: AccountId) -> Result<Account, BankError> {
        self.lifecycle().close_account(account)
    }

    pub fn activate_customer(&self, customer: CustomerId) -> Result<Customer, BankError> {
        self.lifecycle().activate_customer(customer)
    }

    pub fn block_customer(&self, customer: CustomerId) -> Result<Customer, BankError> {
        self.lifecycle().block_customer(customer)
    }

    pub fn close_customer(&self, customer: CustomerId) -> Result<Customer, BankError> {
        self.lifecycle().close_customer(customer)
    }

    pub fn customer(&self, id: CustomerId) -> Result<Customer, BankError> {
        Ok(self.store.customer(id)?)
    }

    pub fn account(&self, id: AccountId) -> Result<Account, BankError> {
        Ok(self.store.account(id)?)
    }

    pub fn list_accounts(&self, filter: AccountFilter) -> Result<Vec<Account>, BankError> {
        Ok(self.store.accounts(&filter)?)
    }

    /// Newest first.
    pub fn list_transactions(
        &self,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>, BankError> {
        Ok(self.store.transactions(&filter)?)
    }
}
