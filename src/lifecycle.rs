use tracing::info;

use crate::{
    account::{Account, AccountKind, Currency, Status},
    customer::Customer,
    error::BankError,
    id::{AccountId, CustomerId},
    store::LedgerStore,
};

/// Status changes for accounts and customers, plus their creation.
///
/// None of these operations touch balances or produce transaction records.
pub struct LifecycleManager<'s, S: ?Sized> {
    store: &'s S,
}

impl<'s, S> LifecycleManager<'s, S>
where
    S: LedgerStore + ?Sized,
{
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    pub fn register_customer(&self, name: &str) -> Result<Customer, BankError> {
        let customer = Customer::register(name)?;
        self.store.insert_customer(customer.clone())?;
        info!(customer = %customer.id(), "customer registered");
        Ok(customer)
    }

    pub fn open_account(
        &self,
        customer_id: CustomerId,
        kind: AccountKind,
        currency: Currency,
    ) -> Result<Account, BankError> {
        let mut unit = self.store.begin()?;
        let customer = unit.lock_customer(customer_id)?;
        customer.check_open_account()?;

        let account = Account::open(customer_id, kind, currency);
        unit.insert_account(account.clone())?;
        unit.commit()?;
        info!(customer = %customer_id, account = %account.id(), ?kind, ?currency, "account opened");
        Ok(account)
    }

    pub fn activate_account(&self, id: AccountId) -> Result<Account, BankError> {
        self.set_account_status(id, Status::Active)
    }

    pub fn block_account(&self, id: AccountId) -> Result<Account, BankError> {
        self.set_account_status(id, Status::Blocked)
    }

    /// Fails with `NonZeroBalance` unless the locked balance is zero.
    pub fn close_account(&self, id: AccountId) -> Result<Account, BankError> {
        self.set_account_status(id, Status::Closed)
    }

    /// Blocks the customer and, in the same unit of work, every account of
    /// theirs that is not closed.
    pub fn block_customer(&self, id: CustomerId) -> Result<Customer, BankError> {
        let mut unit = self.store.begin()?;
        let mut customer = unit.lock_customer(id)?;
        let status = customer.transition(Status::Blocked)?;

        let mut blocked = 0;
        for mut account in unit.lock_customer_accounts(id)? {
            if account.status() == Status::Closed || account.status() == status {
                continue;
            }
            account.set_status(status);
            unit.put_account(account)?;
            blocked += 1;
        }

        customer.set_status(status);
        unit.put_customer(customer.clone())?;
        unit.commit()?;
        info!(customer = %id, accounts = blocked, "customer blocked");
        Ok(customer)
    }

    /// Lifts a customer block. Accounts stay as they are.
    pub fn activate_customer(&self, id: CustomerId) -> Result<Customer, BankError> {
        let mut unit = self.store.begin()?;
        let mut customer = unit.lock_customer(id)?;
        let status = customer.transition(Status::Active)?;
        if customer.status() == status {
            return Ok(customer);
        }
        customer.set_status(status);
        unit.put_customer(customer.clone())?;
        unit.commit()?;
        info!(customer = %id, "customer activated");
        Ok(customer)
    }

    /// Never cascades: accounts have to be closed one by one first.
    pub fn close_customer(&self, id: CustomerId) -> Result<Customer, BankError> {
        let mut unit = self.store.begin()?;
        let mut customer = unit.lock_customer(id)?;
        let accounts = unit.lock_customer_accounts(id)?;
        customer.check_close(&accounts)?;
        if customer.status() == Status::Closed {
            return Ok(customer);
        }
        customer.set_status(Status::Closed);
        unit.put_customer(customer.clone())?;
        unit.commit()?;
        info!(customer = %id, "customer closed");
        Ok(customer)
    }

    fn set_account_status(&self, id: AccountId, to: Status) -> Result<Account, BankError> {
        let mut unit = self.store.begin()?;
        let mut account = unit.lock_account(id)?;
        let status = account.transition(to)?;
        if account.status() == status {
            return Ok(account);
        }
        let from = account.status();
        account.set_status(status);
        unit.put_account(account.clone())?;
        unit.commit()?;
        info!(account = %id, %from, to = %status, "account status changed");
        Ok(account)
    }
}
