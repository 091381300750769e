use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    account::{Account, Status},
    id::CustomerId,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CustomerError {
    #[error("Customer name must not be empty")]
    EmptyName,
    #[error("All accounts must first be closed")]
    AccountsStillOpen,
    #[error("Closed customer cannot become {to}")]
    Closed { to: Status },
    #[error("Customer is {status} and cannot open accounts")]
    NotActive { status: Status },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    id: CustomerId,
    name: String,
    status: Status,
    created_at: DateTime<Utc>,
}

impl Customer {
    pub(crate) fn register(name: &str) -> Result<Self, CustomerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CustomerError::EmptyName);
        }
        Ok(Self {
            id: CustomerId::new(),
            name: name.to_owned(),
            status: Status::Active,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> CustomerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn check_open_account(&self) -> Result<(), CustomerError> {
        if self.status.can_operate() {
            Ok(())
        } else {
            Err(CustomerError::NotActive {
                status: self.status,
            })
        }
    }

    pub fn transition(&self, to: Status) -> Result<Status, CustomerError> {
        if self.status.allows(to) {
            Ok(to)
        } else {
            Err(CustomerError::Closed { to })
        }
    }

    /// Closure is leaf-first: every owned account has to be closed already.
    pub fn check_close<'a>(
        &self,
        accounts: impl IntoIterator<Item = &'a Account>,
    ) -> Result<(), CustomerError> {
        self.transition(Status::Closed)?;
        if accounts
            .into_iter()
            .any(|account| account.status() != Status::Closed)
        {
            return Err(CustomerError::AccountsStillOpen);
        }
        Ok(())
    }

    pub(crate) fn set_status(&mut self, status: Status) {
        self.status = status;
    }
}
