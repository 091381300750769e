use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{id::AccountId, transaction::TransactionKind};

/// Positive amount in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u64")]
pub struct Amount(u64);

impl Amount {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<i64> for Amount {
    type Error = CommandError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match u64::try_from(value) {
            Ok(value) if value > 0 => Ok(Self(value)),
            _ => Err(CommandError::InvalidAmount),
        }
    }
}

impl From<Amount> for u64 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Amount must be greater than zero")]
    InvalidAmount,
    #[error("Cannot transfer to itself")]
    SelfTransfer,
}

/// A validated money movement. Building one never touches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoneyCommand {
    Deposit {
        account: AccountId,
        amount: Amount,
    },
    Withdraw {
        account: AccountId,
        amount: Amount,
    },
    Transfer {
        source: AccountId,
        target: AccountId,
        amount: Amount,
    },
}

impl MoneyCommand {
    pub fn deposit(account: AccountId, amount: i64) -> Result<Self, CommandError> {
        Ok(Self::Deposit {
            account,
            amount: Amount::try_from(amount)?,
        })
    }

    pub fn withdraw(account: AccountId, amount: i64) -> Result<Self, CommandError> {
        Ok(Self::Withdraw {
            account,
            amount: Amount::try_from(amount)?,
        })
    }

    pub fn transfer(
        source: AccountId,
        target: AccountId,
        amount: i64,
    ) -> Result<Self, CommandError> {
        if source == target {
            return Err(CommandError::SelfTransfer);
        }
        Ok(Self::Transfer {
            source,
            target,
            amount: Amount::try_from(amount)?,
        })
    }

    pub fn kind(&self) -> TransactionKind {
        match self {
            Self::Deposit { .. } => TransactionKind::Deposit,
            Self::Withdraw { .. } => TransactionKind::Withdrawal,
            Self::Transfer { .. } => TransactionKind::Transfer,
        }
    }

    pub fn amount(&self) -> Amount {
        match *self {
            Self::Deposit { amount, .. }
            | Self::Withdraw { amount, .. }
            | Self::Transfer { amount, .. } => amount,
        }
    }

    /// Account money leaves. Deposits have none.
    pub fn source(&self) -> Option<AccountId> {
        match *self {
            Self::Deposit { .. } => None,
            Self::Withdraw { account, .. } => Some(account),
            Self::Transfer { source, .. } => Some(source),
        }
    }

    /// Account money arrives at. Withdrawals have none.
    pub fn target(&self) -> Option<AccountId> {
        match *self {
            Self::Deposit { account, .. } => Some(account),
            Self::Withdraw { .. } => None,
            Self::Transfer { target, .. } => Some(target),
        }
    }
}
