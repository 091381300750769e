use std::{cell::RefCell, rc::Rc, str::from_utf8};

use bank_ledger::{
    ErrorKind,
    bin_utils::{ScriptError, Service},
    store::in_memory::StoreConfig,
};

const TEST_FILE: &str = include_str!("ledger.csv");

#[test]
fn process_ledger_script() {
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&errors);
    let mut output = Vec::new();
    let service = Service {
        input: TEST_FILE.as_bytes(),
        output: &mut output,
        error_printer: Box::new(move |_line, err| sink.borrow_mut().push(err)),
        config: StoreConfig::default(),
    };
    service.run().unwrap();

    assert_eq!(
        from_utf8(&output).unwrap(),
        "account,customer,kind,currency,balance,status\n\
         ada-eur,ada,personal,EUR,499.50,active\n\
         ada-yen,ada,savings,YEN,0,closed\n\
         alan-eur,alan,business,EUR,300.50,blocked\n"
    );

    let errors = errors.borrow();
    let kinds: Vec<_> = errors
        .iter()
        .map(|err| match err {
            ScriptError::BankErr(err) => Some(err.kind()),
            _ => None,
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            Some(ErrorKind::Consistency),
            Some(ErrorKind::Validation),
            Some(ErrorKind::Validation),
            Some(ErrorKind::State),
            Some(ErrorKind::State),
            Some(ErrorKind::State),
            None,
        ]
    );
    assert_eq!(errors[0].to_string(), "Insufficient funds");
    assert_eq!(errors[3].to_string(), "Only empty accounts can be closed");
    assert!(matches!(&errors[6], ScriptError::UnknownAlias(alias) if alias == "nobody"));
}

#[test]
fn malformed_rows_are_reported_and_skipped() {
    let script = "\
op,subject,counterpart,amount,kind,currency,name
register,ada,,,,,Ada
open,ada-usd,ada,,personal,GBP,
open,ada-usd,ada,,personal,USD,
deposit,ada-usd,,,,,
deposit,ada-usd,,1999,,,
";
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&errors);
    let mut output = Vec::new();
    Service {
        input: script.as_bytes(),
        output: &mut output,
        error_printer: Box::new(move |line, err| sink.borrow_mut().push((line, err))),
        config: StoreConfig::default(),
    }
    .run()
    .unwrap();

    assert_eq!(
        from_utf8(&output).unwrap(),
        "account,customer,kind,currency,balance,status\nada-usd,ada,personal,USD,19.99,active\n"
    );
    let errors = errors.borrow();
    assert_eq!(errors.len(), 2);
    assert!(matches!(errors[0].1, ScriptError::Parse(_)));
    assert!(matches!(
        errors[1].1,
        ScriptError::MissingField { field: "amount", .. }
    ));
}
