//! Bootstraps [`crate::Bank`] from a CSV script. Could live in its own crate;
//! it sits here so the integration tests can drive it too.

use std::{
    collections::HashMap,
    io::{Read, Write},
};

use crate::{
    Bank, BankError,
    id::{AccountId, CustomerId},
    store::in_memory::StoreConfig,
};
use anyhow::Result;
use csv_parser::{CsvOperationParser, Operation, OperationKind};
use csv_printer::{AccountRow, print_accounts};
use thiserror::Error;
pub mod csv_parser;
pub mod csv_printer;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Malformed row: {0}")]
    Parse(#[from] csv::Error),
    #[error("`{field}` is required for {op:?}")]
    MissingField {
        op: OperationKind,
        field: &'static str,
    },
    #[error("Unknown alias `{0}`")]
    UnknownAlias(String),
    #[error("Alias `{0}` is already taken")]
    DuplicateAlias(String),
    #[error(transparent)]
    BankErr(#[from] BankError),
}

pub struct Service<'w, R, W: 'w> {
    pub input: R,
    pub output: &'w mut W,
    pub error_printer: Box<dyn FnMut(u64, ScriptError)>,
    pub config: StoreConfig,
}

impl<'w, R, W> Service<'w, R, W>
where
    R: Read,
    W: Write + 'w,
{
    pub fn run(mut self) -> Result<()> {
        let parser = CsvOperationParser::new(self.input);
        let mut runner = ScriptRunner::new(Bank::with_config(self.config));

        for (line, row) in parser {
            if let Err(err) = row
                .map_err(ScriptError::from)
                .and_then(|op| runner.apply(op))
            {
                (self.error_printer)(line, err);
            }
        }

        let rows = runner.report()?;
        print_accounts(self.output, rows.into_iter())
    }
}

/// Executes operations against a bank, resolving script aliases to ids.
struct ScriptRunner {
    bank: Bank,
    customers: HashMap<String, CustomerId>,
    accounts: HashMap<String, AccountId>,
    // (account alias, customer alias) in opening order
    opened: Vec<(String, String)>,
}

impl ScriptRunner {
    fn new(bank: Bank) -> Self {
        Self {
            bank,
            customers: HashMap::new(),
            accounts: HashMap::new(),
            opened: Vec::new(),
        }
    }

    fn apply(&mut self, op: Operation) -> Result<(), ScriptError> {
        let kind = op.op;
        let amount = || op.amount.ok_or(ScriptError::MissingField { op: kind, field: "amount" });
        match kind {
            OperationKind::Register => {
                let name = op.name.as_deref().unwrap_or(&op.subject);
                check_free(&op.subject, &self.customers)?;
                let customer = self.bank.register_customer(name)?;
                self.customers.insert(op.subject, customer.id());
            }
            OperationKind::Open => {
                let owner = op
                    .counterpart
                    .clone()
                    .ok_or(ScriptError::MissingField { op: kind, field: "counterpart" })?;
                let account_kind = op
                    .kind
                    .ok_or(ScriptError::MissingField { op: kind, field: "kind" })?;
                let currency = op
                    .currency
                    .ok_or(ScriptError::MissingField { op: kind, field: "currency" })?;
                check_free(&op.subject, &self.accounts)?;
                let customer_id = self.customer(&owner)?;
                let account = self.bank.open_account(customer_id, account_kind, currency)?;
                self.accounts.insert(op.subject.clone(), account.id());
                self.opened.push((op.subject, owner));
            }
            OperationKind::Deposit => {
                self.bank.deposit(self.account(&op.subject)?, amount()?)?;
            }
            OperationKind::Withdraw => {
                self.bank.withdraw(self.account(&op.subject)?, amount()?)?;
            }
            OperationKind::Transfer => {
                let target = op
                    .counterpart
                    .as_deref()
                    .ok_or(ScriptError::MissingField { op: kind, field: "counterpart" })?;
                self.bank
                    .transfer(self.account(&op.subject)?, self.account(target)?, amount()?)?;
            }
            OperationKind::ActivateAccount => {
                self.bank.activate_account(self.account(&op.subject)?)?;
            }
            OperationKind::BlockAccount => {
                self.bank.block_account(self.account(&op.subject)?)?;
            }
            OperationKind::CloseAccount => {
                self.bank.close_account(self.account(&op.subject)?)?;
            }
            OperationKind::ActivateCustomer => {
                self.bank.activate_customer(self.customer(&op.subject)?)?;
            }
            OperationKind::BlockCustomer => {
                self.bank.block_customer(self.customer(&op.subject)?)?;
            }
            OperationKind::CloseCustomer => {
                self.bank.close_customer(self.customer(&op.subject)?)?;
            }
        }
        Ok(())
    }

    fn customer(&self, alias: &str) -> Result<CustomerId, ScriptError> {
        self.customers
            .get(alias)
            .copied()
            .ok_or_else(|| ScriptError::UnknownAlias(alias.to_owned()))
    }

    fn account(&self, alias: &str) -> Result<AccountId, ScriptError> {
        self.accounts
            .get(alias)
            .copied()
            .ok_or_else(|| ScriptError::UnknownAlias(alias.to_owned()))
    }

    fn report(&self) -> Result<Vec<AccountRow>, ScriptError> {
        self.opened
            .iter()
            .map(|(alias, owner)| {
                let account = self.bank.account(self.account(alias)?)?;
                Ok(AccountRow {
                    account: alias.clone(),
                    customer: owner.clone(),
                    kind: account.kind(),
                    currency: account.currency(),
                    balance: account.currency().to_major_units(account.balance()),
                    status: account.status(),
                })
            })
            .collect()
    }
}

fn check_free<T>(alias: &str, taken: &HashMap<String, T>) -> Result<(), ScriptError> {
    if taken.contains_key(alias) {
        Err(ScriptError::DuplicateAlias(alias.to_owned()))
    } else {
        Ok(())
    }
}
