use std::io::Write;

use crate::account::{AccountKind, Currency, Status};
use anyhow::{Context, Result};
use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

/// Account row of the final report; balance is in major units.
#[derive(Debug, Serialize)]
pub struct AccountRow {
    pub account: String,
    pub customer: String,
    pub kind: AccountKind,
    pub currency: Currency,
    pub balance: Decimal,
    pub status: Status,
}

/// Writes the account report, header first.
pub fn print_accounts<W>(output: &mut W, rows: impl Iterator<Item = AccountRow>) -> Result<()>
where
    W: Write,
{
    let mut report = Writer::from_writer(output);
    for row in rows {
        let account = row.account.clone();
        report
            .serialize(row)
            .with_context(|| format!("Failed to write report row for `{account}`"))?;
    }
    report.flush().context("Failed to flush account report")?;
    Ok(())
}
