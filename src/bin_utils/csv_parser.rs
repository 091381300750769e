use std::io::Read;

use crate::account::{AccountKind, Currency};
use csv::{DeserializeRecordsIntoIter, ReaderBuilder, Trim};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Register,
    Open,
    Deposit,
    Withdraw,
    Transfer,
    ActivateAccount,
    BlockAccount,
    CloseAccount,
    ActivateCustomer,
    BlockCustomer,
    CloseCustomer,
}

/// One script line.
///
/// `subject` is the alias the operation creates or acts on. `counterpart` is
/// the owning customer for `open` and the target account for `transfer`.
#[derive(Debug, Deserialize)]
pub struct Operation {
    pub op: OperationKind,
    pub subject: String,
    #[serde(default)]
    pub counterpart: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub kind: Option<AccountKind>,
    #[serde(default)]
    pub currency: Option<Currency>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Parses ledger operations in CSV format, yielding the line each came from.
/// Lines starting with `#` are skipped.
pub struct CsvOperationParser<R> {
    rows: DeserializeRecordsIntoIter<R, Operation>,
}

impl<R> CsvOperationParser<R>
where
    R: Read,
{
    pub fn new(script: R) -> Self {
        let rows = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .comment(Some(b'#'))
            .from_reader(script)
            .into_deserialize();
        Self { rows }
    }
}

impl<R> Iterator for CsvOperationParser<R>
where
    R: Read,
{
    type Item = (u64, csv::Result<Operation>);

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.rows.reader().position().line();
        self.rows.next().map(|row| (line, row))
    }
}
