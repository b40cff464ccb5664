//! Backend-agnostic round trip shared by the live database suites.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use futures_util::TryStreamExt;
use strata_core::{Connection, Direction, Migration, Migrations, Migrator, Result, Row, SchemaBuilder, Value};
use uuid::Uuid;

pub struct CreateAccounts;

#[async_trait]
impl Migration for CreateAccounts {
    async fn up(&self, schema: &SchemaBuilder) -> Result<()> {
        schema
            .create("accounts", |table| {
                table.id();
                table.string("email").unique();
                table.integer("votes").default(0);
                table.uuid("token").nullable();
                table.json("settings").nullable();
                table.timestamps();
            })
            .await
    }

    async fn down(&self, schema: &SchemaBuilder) -> Result<()> {
        schema.drop_if_exists("accounts").await
    }
}

pub fn migrations() -> Migrations {
    Migrations::new().add("20240301000000_create_accounts", CreateAccounts)
}

/// Connection for `scheme` from `DATABASE_URL`, or `None` when the variable
/// is unset or points at another backend.
pub async fn connect_from_env(scheme: &str) -> Option<Connection> {
    let url = std::env::var("DATABASE_URL").ok()?;
    if !url.starts_with(scheme) {
        return None;
    }
    let config = strata_core::ConnectionConfig::new(url).with_max_connections(2);
    Some(Connection::connect(&config).await.unwrap())
}

fn as_datetime(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::DateTime(at) => Some(*at),
        Value::Text(text) => NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|at| at.and_utc()),
        _ => None,
    }
}

fn as_uuid(value: Option<&Value>) -> Option<Uuid> {
    match value? {
        Value::Uuid(id) => Some(*id),
        Value::Text(text) => text.parse().ok(),
        _ => None,
    }
}

fn as_json(value: Option<&Value>) -> Option<serde_json::Value> {
    match value? {
        Value::Json(json) => Some(json.clone()),
        Value::Text(text) => serde_json::from_str(text).ok(),
        _ => None,
    }
}

/// Migrate, write typed rows, read them back whole, aggregate, then reset.
pub async fn typed_round_trip(connection: &Connection) {
    let schema = connection.schema();
    schema.drop_if_exists("accounts").await.unwrap();
    schema.drop_if_exists("migrations").await.unwrap();

    let migrator = Migrator::new(connection.clone(), migrations());
    migrator.run().await.unwrap();

    let created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let token = Uuid::new_v4();
    let settings = serde_json::json!({"theme": "dark"});
    let accounts = connection.table("accounts");
    let id = accounts
        .insert_get_id(
            &Row::new()
                .with("email", "ada@example.com")
                .with("votes", 3_i64)
                .with("token", token)
                .with("settings", settings.clone())
                .with("created_at", created),
        )
        .await
        .unwrap()
        .unwrap();
    accounts
        .insert(&[Row::new().with("email", "bob@example.com").with("votes", 4_i64)])
        .await
        .unwrap();

    let rows = connection
        .table("accounts")
        .order_by("id", Direction::Asc)
        .get()
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    let ada = &rows[0];
    assert_eq!(ada.get("id").and_then(Value::as_i64), Some(id));
    assert_eq!(as_datetime(ada.get("created_at")), Some(created));
    assert_eq!(ada.get("updated_at"), Some(&Value::Null));
    assert_eq!(as_uuid(ada.get("token")), Some(token));
    assert_eq!(as_json(ada.get("settings")), Some(settings));
    assert_eq!(rows[1].get("token"), Some(&Value::Null));

    let found = connection.table("accounts").find(id).await.unwrap().unwrap();
    assert_eq!(found.get("email"), Some(&Value::from("ada@example.com")));
    let first = connection
        .table("accounts")
        .filter_eq("email", "bob@example.com")
        .first()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.get("votes").and_then(Value::as_i64), Some(4));

    assert!((accounts.avg("votes").await.unwrap() - 3.5).abs() < f64::EPSILON);
    assert!((accounts.sum("votes").await.unwrap() - 7.0).abs() < f64::EPSILON);

    let streamed: Vec<Row> = accounts.chunked(1).unwrap().try_collect().await.unwrap();
    assert_eq!(streamed.len(), 2);

    migrator.reset().await.unwrap();
    assert!(!schema.has_table("accounts").await.unwrap());
}
