//! Runs against `DATABASE_URL` when it names a MySQL server; skipped otherwise.
#![cfg(feature = "mysql")]

mod common;

#[tokio::test]
async fn mysql_typed_round_trip() {
    let Some(connection) = common::connect_from_env("mysql").await else {
        eprintln!("DATABASE_URL is not a mysql url; skipping");
        return;
    };
    common::typed_round_trip(&connection).await;
}
