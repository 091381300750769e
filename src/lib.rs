/// Account entity: balance checks that produce changes, lifecycle transitions.
pub mod account;

/// Customer entity and its lifecycle rules.
pub mod customer;

/// Money-movement commands, validated before any row is locked.
pub mod command;

/// Immutable audit records of attempted money movements.
pub mod transaction;

/// Strongly typed identifiers.
pub mod id;

/// Ledger store interface, plus "in memory" implementation with row locks.
///
/// The engine only depends on the traits, so a relational backend can be
/// plugged in without touching business logic.
pub mod store;

/// Appends success and rejection records to the transaction log.
pub mod recorder;

/// Deposit, withdrawal and transfer under row locks.
pub mod engine;

/// Account and customer status changes.
pub mod lifecycle;

/// The operations callers use, wired over one store.
pub mod bank;

/// Error type shared by every operation, with its coarse classification.
pub mod error;

/// Runs ledger scripts from CSV; used by the binary and the integration tests.
pub mod bin_utils;

pub use bank::Bank;
pub use error::{BankError, ErrorKind};
