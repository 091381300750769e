use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::{Condvar, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use tracing::debug;

use crate::{
    account::{Account, AccountFilter},
    customer::Customer,
    id::{AccountId, CustomerId},
    transaction::{Transaction, TransactionFilter},
};

use super::{LedgerStore, RowKey, StoreError, UnitOfWork};

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How long a unit of work waits for a row held by another one.
    pub lock_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    customers: HashMap<CustomerId, Customer>,
    accounts: HashMap<AccountId, Account>,
    account_order: Vec<AccountId>,
    accounts_by_customer: HashMap<CustomerId, BTreeSet<AccountId>>,
    transactions: Vec<Transaction>,
}

impl Tables {
    fn customer(&self, id: CustomerId) -> Result<&Customer, StoreError> {
        self.customers
            .get(&id)
            .ok_or(StoreError::CustomerNotFound(id))
    }

    fn account(&self, id: AccountId) -> Result<&Account, StoreError> {
        self.accounts.get(&id).ok_or(StoreError::AccountNotFound(id))
    }

    fn check_references(
        &self,
        transaction: &Transaction,
        staged: &HashMap<AccountId, Account>,
    ) -> Result<(), StoreError> {
        match transaction
            .accounts()
            .find(|id| !self.accounts.contains_key(id) && !staged.contains_key(id))
        {
            Some(missing) => Err(StoreError::AccountNotFound(missing)),
            None => Ok(()),
        }
    }

    fn insert_account(&mut self, account: Account) {
        let id = account.id();
        self.accounts_by_customer
            .entry(account.customer_id())
            .or_default()
            .insert(id);
        if self.accounts.insert(id, account).is_none() {
            self.account_order.push(id);
        }
    }
}

/// Exclusive row locks, held by at most one unit of work at a time.
#[derive(Debug, Default)]
struct LockTable {
    held: Mutex<HashSet<RowKey>>,
    released: Condvar,
}

impl LockTable {
    fn acquire(&self, key: RowKey, timeout: Duration) -> Result<(), StoreError> {
        let held = self.held.lock().map_err(|_| poisoned())?;
        let (mut held, wait) = self
            .released
            .wait_timeout_while(held, timeout, |held| held.contains(&key))
            .map_err(|_| poisoned())?;
        if wait.timed_out() && held.contains(&key) {
            return Err(StoreError::LockTimeout(key));
        }
        held.insert(key);
        Ok(())
    }

    fn release(&self, keys: &[RowKey]) {
        if keys.is_empty() {
            return;
        }
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            held.remove(key);
        }
        drop(held);
        self.released.notify_all();
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

/// In-memory ledger with row-level pessimistic locking.
///
/// Committed state lives behind one `RwLock` that is only held for the duration
/// of a single read or of applying a commit, never while waiting on a row lock.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    tables: RwLock<Tables>,
    locks: LockTable,
    config: StoreConfig,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables.write().map_err(|_| poisoned())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn begin(&self) -> Result<Box<dyn UnitOfWork + '_>, StoreError> {
        Ok(Box::new(InMemoryUnit {
            store: self,
            held: Vec::new(),
            customers: HashMap::new(),
            accounts: HashMap::new(),
            new_accounts: Vec::new(),
            transactions: Vec::new(),
        }))
    }

    fn insert_customer(&self, customer: Customer) -> Result<(), StoreError> {
        self.write()?.customers.insert(customer.id(), customer);
        Ok(())
    }

    fn append_transaction(&self, transaction: Transaction) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.check_references(&transaction, &HashMap::new())?;
        debug!(transaction = %transaction.id(), "transaction appended");
        tables.transactions.push(transaction);
        Ok(())
    }

    fn customer(&self, id: CustomerId) -> Result<Customer, StoreError> {
        self.read()?.customer(id).cloned()
    }

    fn account(&self, id: AccountId) -> Result<Account, StoreError> {
        self.read()?.account(id).cloned()
    }

    fn accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>, StoreError> {
        let tables = self.read()?;
        if let Some(customer_id) = filter.customer_id {
            tables.customer(customer_id)?;
        }
        Ok(tables
            .account_order
            .iter()
            .filter_map(|id| tables.accounts.get(id))
            .filter(|account| filter.matches(account))
            .cloned()
            .collect())
    }

    fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError> {
        let tables = self.read()?;
        if let Some(customer_id) = filter.customer_id {
            tables.customer(customer_id)?;
        }
        if let Some(account_id) = filter.account_id {
            tables.account(account_id)?;
        }
        let owned_by = |transaction: &Transaction, customer_id: CustomerId| {
            transaction.accounts().any(|id| {
                tables
                    .accounts
                    .get(&id)
                    .is_some_and(|account| account.customer_id() == customer_id)
            })
        };
        Ok(tables
            .transactions
            .iter()
            .rev()
            .filter(|tx| filter.account_id.is_none_or(|id| tx.involves(id)))
            .filter(|tx| filter.customer_id.is_none_or(|id| owned_by(*tx, id)))
            .cloned()
            .collect())
    }
}

struct InMemoryUnit<'s> {
    store: &'s InMemoryLedgerStore,
    held: Vec<RowKey>,
    customers: HashMap<CustomerId, Customer>,
    accounts: HashMap<AccountId, Account>,
    new_accounts: Vec<AccountId>,
    transactions: Vec<Transaction>,
}

impl InMemoryUnit<'_> {
    fn holds(&self, key: RowKey) -> bool {
        self.held.contains(&key)
    }

    fn acquire(&mut self, key: RowKey) -> Result<(), StoreError> {
        if self.holds(key) {
            return Ok(());
        }
        self.store
            .locks
            .acquire(key, self.store.config.lock_timeout)?;
        debug!(%key, "row locked");
        self.held.push(key);
        Ok(())
    }

    fn is_dirty(&self) -> bool {
        !self.customers.is_empty() || !self.accounts.is_empty() || !self.transactions.is_empty()
    }
}

impl UnitOfWork for InMemoryUnit<'_> {
    fn lock_account(&mut self, id: AccountId) -> Result<Account, StoreError> {
        if let Some(staged) = self.accounts.get(&id) {
            return Ok(staged.clone());
        }
        // rows are never deleted, so a missing row is reported without waiting
        self.store.read()?.account(id)?;
        self.acquire(RowKey::Account(id))?;
        let account = self.store.read()?.account(id)?.clone();
        Ok(account)
    }

    fn lock_customer(&mut self, id: CustomerId) -> Result<Customer, StoreError> {
        if let Some(staged) = self.customers.get(&id) {
            return Ok(staged.clone());
        }
        self.store.read()?.customer(id)?;
        self.acquire(RowKey::Customer(id))?;
        let customer = self.store.read()?.customer(id)?.clone();
        Ok(customer)
    }

    fn lock_customer_accounts(&mut self, id: CustomerId) -> Result<Vec<Account>, StoreError> {
        let mut ids: Vec<AccountId> = {
            let tables = self.store.read()?;
            tables.customer(id)?;
            tables
                .accounts_by_customer
                .get(&id)
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default()
        };
        ids.extend(self.new_accounts.iter().copied().filter(|new| {
            self.accounts
                .get(new)
                .is_some_and(|account| account.customer_id() == id)
        }));
        ids.sort();
        ids.dedup();
        ids.into_iter().map(|id| self.lock_account(id)).collect()
    }

    fn put_account(&mut self, account: Account) -> Result<(), StoreError> {
        let key = RowKey::Account(account.id());
        if !self.holds(key) {
            return Err(StoreError::NotLocked(key));
        }
        self.accounts.insert(account.id(), account);
        Ok(())
    }

    fn put_customer(&mut self, customer: Customer) -> Result<(), StoreError> {
        let key = RowKey::Customer(customer.id());
        if !self.holds(key) {
            return Err(StoreError::NotLocked(key));
        }
        self.customers.insert(customer.id(), customer);
        Ok(())
    }

    fn insert_account(&mut self, account: Account) -> Result<(), StoreError> {
        let owner = RowKey::Customer(account.customer_id());
        if !self.holds(owner) {
            return Err(StoreError::NotLocked(owner));
        }
        self.acquire(RowKey::Account(account.id()))?;
        self.new_accounts.push(account.id());
        self.accounts.insert(account.id(), account);
        Ok(())
    }

    fn append_transaction(&mut self, transaction: Transaction) -> Result<(), StoreError> {
        self.transactions.push(transaction);
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        let customers = std::mem::take(&mut self.customers);
        let mut accounts = std::mem::take(&mut self.accounts);
        let new_accounts = std::mem::take(&mut self.new_accounts);
        let transactions = std::mem::take(&mut self.transactions);

        let store = self.store;
        let mut tables = store.write()?;
        for transaction in &transactions {
            tables.check_references(transaction, &accounts)?;
        }
        tables.customers.extend(customers);
        for id in new_accounts {
            if let Some(account) = accounts.remove(&id) {
                tables.insert_account(account);
            }
        }
        tables.accounts.extend(accounts);
        let appended = transactions.len();
        tables.transactions.extend(transactions);
        drop(tables);

        debug!(rows = self.held.len(), appended, "unit of work committed");
        Ok(())
    }
}

impl Drop for InMemoryUnit<'_> {
    fn drop(&mut self) {
        if self.is_dirty() {
            debug!(rows = self.held.len(), "unit of work rolled back");
        }
        self.store.locks.release(&self.held);
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        account::{AccountKind, BalanceChange, Currency, Status},
        command::{Amount, MoneyCommand},
        transaction::TransactionStatus,
    };

    use super::*;

    fn seed(store: &InMemoryLedgerStore, accounts: usize) -> (CustomerId, Vec<AccountId>) {
        let customer = Customer::register("Ada").unwrap();
        let customer_id = customer.id();
        store.insert_customer(customer).unwrap();

        let mut unit = store.begin().unwrap();
        unit.lock_customer(customer_id).unwrap();
        let mut ids = Vec::new();
        for _ in 0..accounts {
            let account = Account::open(customer_id, AccountKind::Personal, Currency::Eur);
            ids.push(account.id());
            unit.insert_account(account).unwrap();
        }
        unit.commit().unwrap();
        (customer_id, ids)
    }

    fn credit(amount: i64) -> BalanceChange {
        BalanceChange::Credit(Amount::try_from(amount).unwrap())
    }

    #[test]
    fn commit_makes_staged_rows_visible() {
        let store = InMemoryLedgerStore::new();
        let (_, ids) = seed(&store, 1);

        let mut unit = store.begin().unwrap();
        let mut account = unit.lock_account(ids[0]).unwrap();
        account.apply(credit(100)).unwrap();
        unit.put_account(account).unwrap();
        // staged state is what the same unit sees next
        assert_eq!(unit.lock_account(ids[0]).unwrap().balance(), 100);
        assert_eq!(store.account(ids[0]).unwrap().balance(), 0);

        unit.commit().unwrap();
        assert_eq!(store.account(ids[0]).unwrap().balance(), 100);
    }

    #[test]
    fn dropped_unit_rolls_back_and_releases_locks() {
        let store = InMemoryLedgerStore::with_config(StoreConfig {
            lock_timeout: Duration::from_millis(20),
        });
        let (_, ids) = seed(&store, 1);

        {
            let mut unit = store.begin().unwrap();
            let mut account = unit.lock_account(ids[0]).unwrap();
            account.apply(credit(100)).unwrap();
            unit.put_account(account).unwrap();
        }
        assert_eq!(store.account(ids[0]).unwrap().balance(), 0);

        let mut unit = store.begin().unwrap();
        unit.lock_account(ids[0]).unwrap();
    }

    #[test]
    fn second_unit_times_out_on_held_row() {
        let store = InMemoryLedgerStore::with_config(StoreConfig {
            lock_timeout: Duration::from_millis(20),
        });
        let (_, ids) = seed(&store, 1);

        let mut first = store.begin().unwrap();
        first.lock_account(ids[0]).unwrap();

        let mut second = store.begin().unwrap();
        let err = second.lock_account(ids[0]).unwrap_err();
        assert_eq!(err, StoreError::LockTimeout(RowKey::Account(ids[0])));
    }

    #[test]
    fn missing_rows_are_reported() {
        let store = InMemoryLedgerStore::new();
        let mut unit = store.begin().unwrap();
        let id = AccountId::new();
        assert_eq!(
            unit.lock_account(id).unwrap_err(),
            StoreError::AccountNotFound(id)
        );
        let id = CustomerId::new();
        assert_eq!(
            unit.lock_customer_accounts(id).unwrap_err(),
            StoreError::CustomerNotFound(id)
        );
    }

    #[test]
    fn writes_require_lock() {
        let store = InMemoryLedgerStore::new();
        let (customer_id, ids) = seed(&store, 1);
        let account = store.account(ids[0]).unwrap();

        let mut unit = store.begin().unwrap();
        assert_eq!(
            unit.put_account(account).unwrap_err(),
            StoreError::NotLocked(RowKey::Account(ids[0]))
        );
        let err = unit
            .insert_account(Account::open(
                customer_id,
                AccountKind::Savings,
                Currency::Usd,
            ))
            .unwrap_err();
        assert_eq!(err, StoreError::NotLocked(RowKey::Customer(customer_id)));
    }

    #[test]
    fn customer_accounts_are_locked_in_id_order() {
        let store = InMemoryLedgerStore::new();
        let (customer_id, mut ids) = seed(&store, 3);
        ids.sort();

        let mut unit = store.begin().unwrap();
        unit.lock_customer(customer_id).unwrap();
        let mut extra = Account::open(customer_id, AccountKind::Business, Currency::Yen);
        extra.set_status(Status::Blocked);
        let extra_id = extra.id();
        unit.insert_account(extra).unwrap();

        let locked = unit.lock_customer_accounts(customer_id).unwrap();
        let locked_ids: Vec<_> = locked.iter().map(Account::id).collect();
        let mut expected = ids.clone();
        expected.push(extra_id);
        expected.sort();
        assert_eq!(locked_ids, expected);
    }

    #[test]
    fn append_rejects_unknown_accounts() {
        let store = InMemoryLedgerStore::new();
        let id = AccountId::new();
        let tx = Transaction::new(
            &MoneyCommand::deposit(id, 1).unwrap(),
            TransactionStatus::Success,
            None,
        );
        assert_eq!(
            store.append_transaction(tx).unwrap_err(),
            StoreError::AccountNotFound(id)
        );
    }

    #[test]
    fn transactions_newest_first_and_filtered() {
        let store = InMemoryLedgerStore::new();
        let (alice, alice_accounts) = seed(&store, 1);
        let (bob, bob_accounts) = seed(&store, 1);
        let (a, b) = (alice_accounts[0], bob_accounts[0]);

        let commands = [
            MoneyCommand::deposit(a, 10).unwrap(),
            MoneyCommand::deposit(b, 20).unwrap(),
            MoneyCommand::transfer(a, b, 5).unwrap(),
        ];
        for command in &commands {
            store
                .append_transaction(Transaction::new(command, TransactionStatus::Success, None))
                .unwrap();
        }

        let all = store.transactions(&TransactionFilter::default()).unwrap();
        let amounts: Vec<_> = all.iter().map(|tx| tx.amount().get()).collect();
        assert_eq!(amounts, vec![5, 20, 10]);

        let of_bob = store
            .transactions(&TransactionFilter {
                customer_id: Some(bob),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(of_bob.len(), 2);

        let alice_and_a = store
            .transactions(&TransactionFilter {
                customer_id: Some(alice),
                account_id: Some(a),
            })
            .unwrap();
        assert_eq!(alice_and_a.len(), 2);

        let unknown = CustomerId::new();
        assert_eq!(
            store
                .transactions(&TransactionFilter {
                    customer_id: Some(unknown),
                    ..Default::default()
                })
                .unwrap_err(),
            StoreError::CustomerNotFound(unknown)
        );
    }

    #[test]
    fn accounts_filtered_in_creation_order() {
        let store = InMemoryLedgerStore::new();
        let (alice, alice_accounts) = seed(&store, 2);
        let (_, bob_accounts) = seed(&store, 1);

        let all: Vec<_> = store
            .accounts(&AccountFilter::default())
            .unwrap()
            .iter()
            .map(Account::id)
            .collect();
        let mut expected = alice_accounts.clone();
        expected.extend(&bob_accounts);
        assert_eq!(all.len(), 3);
        assert!(expected.iter().all(|id| all.contains(id)));

        let of_alice = store
            .accounts(&AccountFilter {
                customer_id: Some(alice),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(of_alice.len(), 2);

        let yen = store
            .accounts(&AccountFilter {
                currency: Some(Currency::Yen),
                ..Default::default()
            })
            .unwrap();
        assert!(yen.is_empty());
    }
}
