use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    command::{Amount, MoneyCommand},
    id::{AccountId, CustomerId, TransactionId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
    Rejected,
}

/// Immutable audit record of one attempted money movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    #[serde(rename = "type")]
    kind: TransactionKind,
    amount: Amount,
    source_account_id: Option<AccountId>,
    target_account_id: Option<AccountId>,
    status: TransactionStatus,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl Transaction {
    /// Source/target shape always follows the command: deposits carry a target only,
    /// withdrawals a source only, transfers both.
    pub(crate) fn new(
        command: &MoneyCommand,
        status: TransactionStatus,
        rejection_reason: Option<String>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            kind: command.kind(),
            amount: command.amount(),
            source_account_id: command.source(),
            target_account_id: command.target(),
            status,
            rejection_reason,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn source_account_id(&self) -> Option<AccountId> {
        self.source_account_id
    }

    pub fn target_account_id(&self) -> Option<AccountId> {
        self.target_account_id
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn accounts(&self) -> impl Iterator<Item = AccountId> {
        self.source_account_id
            .into_iter()
            .chain(self.target_account_id)
    }

    pub fn involves(&self, account: AccountId) -> bool {
        self.accounts().any(|id| id == account)
    }
}

/// Selects transactions; a transaction matches an account or customer filter
/// on either its source or its target side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub customer_id: Option<CustomerId>,
    pub account_id: Option<AccountId>,
}
