use std::thread;

use bank_ledger::{
    Bank, BankError,
    account::{AccountError, AccountKind, Currency, Status},
    transaction::{TransactionFilter, TransactionStatus},
};

fn bank_with_accounts(balances: &[i64]) -> (Bank, Vec<bank_ledger::id::AccountId>) {
    let bank = Bank::in_memory();
    let customer = bank.register_customer("Edsger Dijkstra").unwrap();
    let ids = balances
        .iter()
        .map(|&balance| {
            let account = bank
                .open_account(customer.id(), AccountKind::Business, Currency::Usd)
                .unwrap();
            bank.deposit(account.id(), balance).unwrap();
            account.id()
        })
        .collect();
    (bank, ids)
}

#[test]
fn opposite_transfers_do_not_deadlock() {
    let (bank, ids) = bank_with_accounts(&[1000, 1000]);
    let (a, b) = (ids[0], ids[1]);

    thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..200 {
                bank.transfer(a, b, 5).unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..200 {
                bank.transfer(b, a, 5).unwrap();
            }
        });
    });

    assert_eq!(bank.account(a).unwrap().balance(), 1000);
    assert_eq!(bank.account(b).unwrap().balance(), 1000);
    let log = bank.list_transactions(TransactionFilter::default()).unwrap();
    assert_eq!(log.len(), 402);
    assert!(log.iter().all(|tx| tx.status() == TransactionStatus::Success));
}

#[test]
fn concurrent_withdrawals_never_overdraw() {
    let (bank, ids) = bank_with_accounts(&[100]);
    let account = ids[0];

    let results: Vec<Result<_, BankError>> = thread::scope(|s| {
        let handles: Vec<_> = (0..20)
            .map(|_| s.spawn(|| bank.withdraw(account, 10)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 10);
    for err in results.into_iter().filter_map(Result::err) {
        assert_eq!(err, BankError::AccountErr(AccountError::InsufficientFunds));
    }
    assert_eq!(bank.account(account).unwrap().balance(), 0);

    let log = bank
        .list_transactions(TransactionFilter {
            account_id: Some(account),
            ..Default::default()
        })
        .unwrap();
    // one deposit plus one record per withdrawal attempt
    assert_eq!(log.len(), 21);
    let rejected = log
        .iter()
        .filter(|tx| tx.status() == TransactionStatus::Rejected)
        .count();
    assert_eq!(rejected, 10);
}

#[test]
fn concurrent_deposits_are_all_applied() {
    let (bank, ids) = bank_with_accounts(&[1]);
    let account = ids[0];

    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..50 {
                    bank.deposit(account, 3).unwrap();
                }
            });
        }
    });

    assert_eq!(bank.account(account).unwrap().balance(), 1 + 8 * 50 * 3);
}

#[test]
fn customer_block_and_transfers_stay_consistent() {
    let bank = Bank::in_memory();
    let blocked = bank.register_customer("Blocked").unwrap();
    let other = bank.register_customer("Other").unwrap();
    let source = bank
        .open_account(blocked.id(), AccountKind::Personal, Currency::Eur)
        .unwrap()
        .id();
    let target = bank
        .open_account(other.id(), AccountKind::Personal, Currency::Eur)
        .unwrap()
        .id();
    bank.deposit(source, 10_000).unwrap();

    let moved: u64 = thread::scope(|s| {
        let mover = s.spawn(|| {
            (0..100)
                .filter_map(|_| bank.transfer(source, target, 10).ok())
                .count() as u64
                * 10
        });
        s.spawn(|| bank.block_customer(blocked.id()).unwrap());
        mover.join().unwrap()
    });

    assert_eq!(bank.account(source).unwrap().status(), Status::Blocked);
    assert_eq!(bank.account(source).unwrap().balance(), 10_000 - moved);
    assert_eq!(bank.account(target).unwrap().balance(), moved);
}
