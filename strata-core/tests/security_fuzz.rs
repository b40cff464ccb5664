use proptest::prelude::*;
use proptest::strategy::ValueTree;
use proptest::test_runner::{Config, TestRunner};
use strata_core::test_utils::RecordingDriver;
use strata_core::{Dialect, Error, Value};

const DIALECTS: [Dialect; 3] = [Dialect::MySql, Dialect::Postgres, Dialect::Sqlite];

fn runner(cases: u32) -> TestRunner {
    TestRunner::new(Config {
        cases,
        failure_persistence: None,
        ..Config::default()
    })
}

// Identifier-ish strings, including both quote characters but never `.` or
// whitespace (those select qualified or aliased wrapping).
fn column_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_`\"\\-]{1,32}".prop_map(|s| s)
}

#[test]
fn filter_eq_quotes_identifier() {
    let mut runner = runner(128);
    let column = column_strategy();
    let value = any::<i64>();

    for _ in 0..128 {
        let column = column.new_tree(&mut runner).unwrap().current();
        let value = value.new_tree(&mut runner).unwrap().current();
        for dialect in DIALECTS {
            let (connection, _driver) = RecordingDriver::connection(dialect);
            let builder = connection.table("users").filter_eq(&column, value);
            let sql = builder.to_sql();
            assert!(
                sql.contains(&dialect.quote_identifier(&column)),
                "{dialect}: {sql}"
            );
            assert_eq!(builder.bindings(), vec![Value::Integer(value)]);
        }
    }
}

#[test]
fn quoting_doubles_embedded_quote_characters() {
    let mut runner = runner(128);
    let column = column_strategy();

    for _ in 0..128 {
        let column = column.new_tree(&mut runner).unwrap().current();
        for dialect in DIALECTS {
            let quote = dialect.quote_char();
            let quoted = dialect.quote_identifier(&column);
            let inner = &quoted[1..quoted.len() - 1];
            assert_eq!(
                inner.matches(quote).count(),
                column.matches(quote).count() * 2
            );
            assert_eq!(inner.replace(&format!("{quote}{quote}"), &quote.to_string()), column);
        }
    }
}

#[test]
fn placeholders_match_bindings() {
    let mut runner = runner(64);
    let values = prop::collection::vec(any::<i64>(), 1..16);
    let text = "[a-z' ;-]{0,24}";

    for _ in 0..64 {
        let values = values.new_tree(&mut runner).unwrap().current();
        let name = text.new_tree(&mut runner).unwrap().current();
        for dialect in DIALECTS {
            let (connection, _driver) = RecordingDriver::connection(dialect);
            let builder = connection
                .table("users")
                .filter_in("id", values.clone())
                .unwrap()
                .or_filter_eq("name", name.as_str())
                .limit(10);
            let sql = builder.to_sql();
            assert_eq!(sql.matches('?').count(), builder.bindings().len(), "{sql}");
            assert_eq!(builder.bindings().len(), values.len() + 1);
        }
    }
}

#[test]
fn filter_in_rejects_empty_list() {
    let mut runner = runner(64);
    let column = column_strategy();

    for _ in 0..64 {
        let column = column.new_tree(&mut runner).unwrap().current();
        let (connection, _driver) = RecordingDriver::connection(Dialect::Sqlite);
        let err = connection
            .table("users")
            .filter_in(&column, Vec::<i64>::new())
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
