use std::{fs::File, time::Duration};

use anyhow::{Context, Result};
use bank_ledger::{
    ErrorKind,
    bin_utils::{ScriptError, Service},
    store::in_memory::StoreConfig,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries the report
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn store_config() -> Result<StoreConfig> {
    let mut config = StoreConfig::default();
    if let Ok(raw) = std::env::var("LEDGER_LOCK_TIMEOUT_MS") {
        let millis: u64 = raw
            .parse()
            .with_context(|| format!("Invalid LEDGER_LOCK_TIMEOUT_MS `{raw}`"))?;
        config.lock_timeout = Duration::from_millis(millis);
    }
    Ok(config)
}

fn main() -> Result<()> {
    init_tracing();

    let filename = std::env::args()
        .nth(1)
        .context("Expected a file name as the first argument")?;
    let file = File::open(&filename).with_context(|| format!("Failed to open `{filename}`"))?;

    let service = Service {
        input: file,
        output: &mut std::io::stdout(),
        error_printer: Box::new(|line, err| match &err {
            ScriptError::BankErr(bank_err) if bank_err.kind() != ErrorKind::Storage => {
                eprintln!("Rejected at line {line}: {err}")
            }
            _ => eprintln!("Error at line {line}: {err}"),
        }),
        config: store_config()?,
    };
    service.run()
}
