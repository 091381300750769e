use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    command::Amount,
    id::{AccountId, CustomerId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Personal,
    Savings,
    Business,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Eur,
    Usd,
    Yen,
}

impl Currency {
    /// Number of minor units digits, e.g. 2 for cents.
    pub fn minor_unit_exponent(self) -> u32 {
        match self {
            Currency::Eur | Currency::Usd => 2,
            Currency::Yen => 0,
        }
    }

    pub fn to_major_units(self, minor: u64) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(minor), self.minor_unit_exponent())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Yen => "YEN",
        })
    }
}

/// Lifecycle state shared by accounts and customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Blocked,
    Closed,
}

impl Status {
    /// The only state that may take part in money movement.
    pub fn can_operate(self) -> bool {
        self == Status::Active
    }

    /// `closed` is terminal: nothing leaves it.
    pub fn allows(self, to: Status) -> bool {
        self != Status::Closed || to == Status::Closed
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Active => "active",
            Status::Blocked => "blocked",
            Status::Closed => "closed",
        })
    }
}

/// Side of a money movement an account is checked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRole {
    Account,
    Source,
    Target,
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccountRole::Account => "Account",
            AccountRole::Source => "Source account",
            AccountRole::Target => "Target account",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("{role} cannot perform actions")]
    NotOperable { role: AccountRole, status: Status },
    #[error("Insufficient funds")]
    InsufficientFunds,
    #[error("Balance limit exceeded")]
    BalanceOverflow,
    #[error("Only empty accounts can be closed")]
    NonZeroBalance,
    #[error("Closed account cannot become {to}")]
    Closed { to: Status },
    #[error("Cannot transfer {from} to a {to} account")]
    CurrencyMismatch { from: Currency, to: Currency },
}

/// A balance mutation produced by `check_deposit` / `check_withdraw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceChange {
    Credit(Amount),
    Debit(Amount),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    customer_id: CustomerId,
    kind: AccountKind,
    currency: Currency,
    balance: u64,
    status: Status,
    created_at: DateTime<Utc>,
}

impl Account {
    pub(crate) fn open(customer_id: CustomerId, kind: AccountKind, currency: Currency) -> Self {
        Self {
            id: AccountId::new(),
            customer_id,
            kind,
            currency,
            balance: 0,
            status: Status::Active,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Balance in minor units.
    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn can_operate(&self) -> bool {
        self.status.can_operate()
    }

    pub fn ensure_operable(&self, role: AccountRole) -> Result<(), AccountError> {
        if self.can_operate() {
            Ok(())
        } else {
            Err(AccountError::NotOperable {
                role,
                status: self.status,
            })
        }
    }

    pub fn check_deposit(
        &self,
        role: AccountRole,
        amount: Amount,
    ) -> Result<BalanceChange, AccountError> {
        self.ensure_operable(role)?;
        if self.balance.checked_add(amount.get()).is_none() {
            return Err(AccountError::BalanceOverflow);
        }
        Ok(BalanceChange::Credit(amount))
    }

    pub fn check_withdraw(
        &self,
        role: AccountRole,
        amount: Amount,
    ) -> Result<BalanceChange, AccountError> {
        self.ensure_operable(role)?;
        if self.balance >= amount.get() {
            Ok(BalanceChange::Debit(amount))
        } else {
            Err(AccountError::InsufficientFunds)
        }
    }

    /// Transfers never convert between currencies.
    pub fn ensure_same_currency(&self, target: &Account) -> Result<(), AccountError> {
        if self.currency == target.currency {
            Ok(())
        } else {
            Err(AccountError::CurrencyMismatch {
                from: self.currency,
                to: target.currency,
            })
        }
    }

    /// Applies a change produced by `check_deposit` / `check_withdraw`.
    /// The balance is left untouched if the change would take it below zero
    /// or past `u64::MAX`.
    pub(crate) fn apply(&mut self, change: BalanceChange) -> Result<(), AccountError> {
        self.balance = match change {
            BalanceChange::Credit(amount) => self
                .balance
                .checked_add(amount.get())
                .ok_or(AccountError::BalanceOverflow)?,
            BalanceChange::Debit(amount) => self
                .balance
                .checked_sub(amount.get())
                .ok_or(AccountError::InsufficientFunds)?,
        };
        Ok(())
    }

    /// Validates a lifecycle move and returns the status to store.
    pub fn transition(&self, to: Status) -> Result<Status, AccountError> {
        if !self.status.allows(to) {
            return Err(AccountError::Closed { to });
        }
        if to == Status::Closed && self.balance != 0 {
            return Err(AccountError::NonZeroBalance);
        }
        Ok(to)
    }

    pub(crate) fn set_status(&mut self, status: Status) {
        self.status = status;
    }
}

/// Selects accounts; unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountFilter {
    pub currency: Option<Currency>,
    pub customer_id: Option<CustomerId>,
}

impl AccountFilter {
    pub fn matches(&self, account: &Account) -> bool {
        self.currency.is_none_or(|currency| account.currency == currency)
            && self
                .customer_id
                .is_none_or(|customer_id| account.customer_id == customer_id)
    }
}
