use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
    account::{Account, AccountRole},
    command::MoneyCommand,
    error::BankError,
    id::AccountId,
    recorder::TransactionRecorder,
    store::{LedgerStore, StoreError, UnitOfWork},
    transaction::TransactionStatus,
};

/// Both sides of a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub source: Account,
    pub target: Account,
}

/// Executes money movements.
///
/// Every operation re-reads the involved accounts under an exclusive row lock
/// and runs all checks against that locked state. A failed attempt is rolled
/// back as a whole and then, unless it never got past validation, recorded as
/// a rejected transaction in a separate commit.
pub struct BankEngine<'s, S: ?Sized> {
    store: &'s S,
    recorder: TransactionRecorder<'s, S>,
}

impl<'s, S> BankEngine<'s, S>
where
    S: LedgerStore + ?Sized,
{
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            recorder: TransactionRecorder::new(store),
        }
    }

    pub fn deposit(&self, account_id: AccountId, amount: i64) -> Result<Account, BankError> {
        let command = MoneyCommand::deposit(account_id, amount)?;
        let amount = command.amount();
        self.execute(&command, |unit| {
            let mut account = unit.lock_account(account_id)?;
            let change = account.check_deposit(AccountRole::Account, amount)?;
            account.apply(change)?;
            unit.put_account(account.clone())?;
            Ok(account)
        })
    }

    pub fn withdraw(&self, account_id: AccountId, amount: i64) -> Result<Account, BankError> {
        let command = MoneyCommand::withdraw(account_id, amount)?;
        let amount = command.amount();
        self.execute(&command, |unit| {
            let mut account = unit.lock_account(account_id)?;
            let change = account.check_withdraw(AccountRole::Account, amount)?;
            account.apply(change)?;
            unit.put_account(account.clone())?;
            Ok(account)
        })
    }

    pub fn transfer(
        &self,
        source_id: AccountId,
        target_id: AccountId,
        amount: i64,
    ) -> Result<TransferReceipt, BankError> {
        let command = MoneyCommand::transfer(source_id, target_id, amount)?;
        let amount = command.amount();
        self.execute(&command, |unit| {
            let (mut source, mut target) = lock_pair(unit, source_id, target_id)?;
            source.ensure_operable(AccountRole::Source)?;
            target.ensure_operable(AccountRole::Target)?;
            source.ensure_same_currency(&target)?;
            let debit = source.check_withdraw(AccountRole::Source, amount)?;
            let credit = target.check_deposit(AccountRole::Target, amount)?;
            source.apply(debit)?;
            target.apply(credit)?;
            unit.put_account(source.clone())?;
            unit.put_account(target.clone())?;
            Ok(TransferReceipt { source, target })
        })
    }

    /// Runs `attempt` in a fresh unit of work and stages the success record with
    /// it. The unit is gone (and its locks released) before a rejection is
    /// recorded.
    fn execute<T>(
        &self,
        command: &MoneyCommand,
        attempt: impl FnOnce(&mut dyn UnitOfWork) -> Result<T, BankError>,
    ) -> Result<T, BankError> {
        let outcome = self.store.begin().map_err(BankError::from).and_then(|mut unit| {
            let value = attempt(&mut *unit)?;
            self.recorder.record_in(&mut *unit, command)?;
            unit.commit()?;
            Ok(value)
        });

        match outcome {
            Ok(value) => {
                info!(
                    kind = ?command.kind(),
                    amount = command.amount().get(),
                    source = ?command.source(),
                    target = ?command.target(),
                    "money movement committed"
                );
                Ok(value)
            }
            Err(err) => {
                self.reject(command, &err);
                Err(err)
            }
        }
    }

    fn reject(&self, command: &MoneyCommand, err: &BankError) {
        if !err.is_audited() {
            warn!(kind = ?command.kind(), %err, "money movement failed before reaching the ledger");
            return;
        }
        match self
            .recorder
            .record(command, TransactionStatus::Rejected, Some(err.to_string()))
        {
            Ok(transaction) => warn!(
                transaction = %transaction.id(),
                kind = ?command.kind(),
                %err,
                "money movement rejected"
            ),
            // the caller still gets the original failure
            Err(audit_err) => error!(
                kind = ?command.kind(),
                %err,
                %audit_err,
                "failed to record rejected money movement"
            ),
        }
    }
}

/// Locks both rows in ascending id order so opposite transfers between the
/// same pair cannot deadlock.
fn lock_pair(
    unit: &mut dyn UnitOfWork,
    source: AccountId,
    target: AccountId,
) -> Result<(Account, Account), StoreError> {
    if source < target {
        let source = unit.lock_account(source)?;
        let target = unit.lock_account(target)?;
        Ok((source, target))
    } else {
        let target = unit.lock_account(target)?;
        let source = unit.lock_account(source)?;
        Ok((source, target))
    }
}
