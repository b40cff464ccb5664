use std::fmt;
use std::marker::PhantomData;

use futures_util::stream::BoxStream;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::model::{self, Model};
use crate::query::grammar::QueryGrammar;
use crate::query::object::{
    Aggregate, AggregateFunction, Boolean, Direction, JoinClause, JoinType, Operator, Order,
    QueryObject, WhereClause,
};
use crate::query::processor::hydrate;
use crate::value::{Attributes, FromRow, Row, Value};

/// Fluent builder over a [`QueryObject`], bound to a [`Connection`].
///
/// Bindings are derived from the query object whenever a statement executes
/// (wheres then havings; update values then wheres), so a builder can be
/// executed repeatedly.
pub struct QueryBuilder<T = Row> {
    connection: Connection,
    query: QueryObject,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for QueryBuilder<T> {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            query: self.query.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for QueryBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("dialect", &self.connection.dialect())
            .field("query", &self.query)
            .finish()
    }
}

impl<T: Model> QueryBuilder<T> {
    /// Builder over the model's table and primary key.
    pub fn for_model(connection: &Connection) -> Self {
        let mut builder = Self::table(connection, T::table_name());
        builder.query.primary_key = T::primary_key().to_owned();
        builder
    }

    /// Mass-assign `attributes`, insert them and hydrate the new model.
    #[tracing::instrument(skip(self, attributes), fields(table = %self.query.from))]
    pub async fn create(&self, attributes: Attributes) -> Result<T> {
        let mut row = model::fill::<T>(attributes)?;
        if let Some(id) = self.insert_get_id(&row).await? {
            row.set(&self.query.primary_key, id);
        }
        T::from_row(&row)
    }
}

impl<T: FromRow> QueryBuilder<T> {
    pub fn table(connection: &Connection, table: &str) -> Self {
        Self {
            connection: connection.clone(),
            query: QueryObject::new(table),
            _marker: PhantomData,
        }
    }

    pub fn query(&self) -> &QueryObject {
        &self.query
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    fn grammar(&self) -> &'static dyn QueryGrammar {
        self.connection.query_grammar()
    }

    pub fn primary_key(mut self, column: &str) -> Self {
        self.query.primary_key = column.to_owned();
        self
    }

    /// Replace the projection.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.selects = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.selects.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn distinct(mut self) -> Self {
        self.query.distinct = true;
        self
    }

    /// Alias the `from` table.
    pub fn alias(mut self, alias: &str) -> Self {
        self.query.alias = Some(alias.to_owned());
        self
    }

    fn push_basic(mut self, column: &str, operator: Operator, value: Value, boolean: Boolean) -> Self {
        self.query.wheres.push(WhereClause::Basic {
            column: column.to_owned(),
            operator,
            value,
            boolean,
        });
        self
    }

    pub fn filter(self, column: &str, operator: Operator, value: impl Into<Value>) -> Self {
        self.push_basic(column, operator, value.into(), Boolean::And)
    }

    pub fn and_filter(self, column: &str, operator: Operator, value: impl Into<Value>) -> Self {
        self.filter(column, operator, value)
    }

    pub fn or_filter(self, column: &str, operator: Operator, value: impl Into<Value>) -> Self {
        self.push_basic(column, operator, value.into(), Boolean::Or)
    }

    pub fn filter_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Operator::Eq, value)
    }

    pub fn or_filter_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.or_filter(column, Operator::Eq, value)
    }

    fn push_in<I, V>(mut self, column: &str, values: I, boolean: Boolean, negated: bool) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            let method = if negated { "filter_not_in" } else { "filter_in" };
            return Err(Error::Validation(format!(
                "{method} on `{column}` requires a non-empty array of values"
            )));
        }
        self.query.wheres.push(WhereClause::In {
            column: column.to_owned(),
            values,
            boolean,
            negated,
        });
        Ok(self)
    }

    /// `column in (...)`. An empty list is a validation error.
    pub fn filter_in<I, V>(self, column: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_in(column, values, Boolean::And, false)
    }

    pub fn or_filter_in<I, V>(self, column: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_in(column, values, Boolean::Or, false)
    }

    pub fn filter_not_in<I, V>(self, column: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_in(column, values, Boolean::And, true)
    }

    fn push_between(mut self, column: &str, low: Value, high: Value, negated: bool) -> Self {
        self.query.wheres.push(WhereClause::Between {
            column: column.to_owned(),
            low,
            high,
            boolean: Boolean::And,
            negated,
        });
        self
    }

    pub fn filter_between(self, column: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.push_between(column, low.into(), high.into(), false)
    }

    pub fn filter_not_between(self, column: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.push_between(column, low.into(), high.into(), true)
    }

    fn push_null(mut self, column: &str, boolean: Boolean, negated: bool) -> Self {
        self.query.wheres.push(WhereClause::Null {
            column: column.to_owned(),
            boolean,
            negated,
        });
        self
    }

    pub fn filter_null(self, column: &str) -> Self {
        self.push_null(column, Boolean::And, false)
    }

    pub fn or_filter_null(self, column: &str) -> Self {
        self.push_null(column, Boolean::Or, false)
    }

    pub fn filter_not_null(self, column: &str) -> Self {
        self.push_null(column, Boolean::And, true)
    }

    pub fn having(mut self, column: &str, operator: Operator, value: impl Into<Value>) -> Self {
        self.query.havings.push(WhereClause::Basic {
            column: column.to_owned(),
            operator,
            value: value.into(),
            boolean: Boolean::And,
        });
        self
    }

    pub fn or_having(mut self, column: &str, operator: Operator, value: impl Into<Value>) -> Self {
        self.query.havings.push(WhereClause::Basic {
            column: column.to_owned(),
            operator,
            value: value.into(),
            boolean: Boolean::Or,
        });
        self
    }

    pub fn join(self, table: &str, first: &str, operator: Operator, second: &str) -> Self {
        self.push_join(JoinClause::new(JoinType::Inner, table).on(first, operator, second))
    }

    pub fn inner_join(self, table: &str, first: &str, operator: Operator, second: &str) -> Self {
        self.join(table, first, operator, second)
    }

    pub fn left_join(self, table: &str, first: &str, operator: Operator, second: &str) -> Self {
        self.push_join(JoinClause::new(JoinType::Left, table).on(first, operator, second))
    }

    /// Add a prepared join, e.g. one with several `on` conditions. A join
    /// without conditions is rejected.
    pub fn join_clause(self, join: JoinClause) -> Result<Self> {
        if join.conditions.is_empty() {
            return Err(Error::Validation(format!(
                "join on `{}` needs at least one condition",
                join.table
            )));
        }
        Ok(self.push_join(join))
    }

    fn push_join(mut self, join: JoinClause) -> Self {
        self.query.joins.push(join);
        self
    }

    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.groups.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.query.orders.push(Order {
            column: column.to_owned(),
            direction,
        });
        self
    }

    pub fn order_by_desc(self, column: &str) -> Self {
        self.order_by(column, Direction::Desc)
    }

    /// Newest first by primary key.
    pub fn latest(self) -> Self {
        let column = self.query.primary_key.clone();
        self.order_by(&column, Direction::Desc)
    }

    pub fn latest_by(self, column: &str) -> Self {
        self.order_by(column, Direction::Desc)
    }

    /// Oldest first by primary key.
    pub fn oldest(self) -> Self {
        let column = self.query.primary_key.clone();
        self.order_by(&column, Direction::Asc)
    }

    pub fn oldest_by(self, column: &str) -> Self {
        self.order_by(column, Direction::Asc)
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.query.offset = Some(offset);
        self
    }

    /// Compiled select; `?` placeholders in binding order.
    pub fn to_sql(&self) -> String {
        self.grammar().compile_select(&self.query)
    }

    /// Values for [`QueryBuilder::to_sql`]'s placeholders.
    pub fn bindings(&self) -> Vec<Value> {
        self.query.select_bindings()
    }

    #[tracing::instrument(skip(self), fields(table = %self.query.from))]
    pub async fn get(&self) -> Result<Vec<T>> {
        self.fetch(&self.query).await
    }

    async fn fetch(&self, query: &QueryObject) -> Result<Vec<T>> {
        let sql = self.grammar().compile_select(query);
        let bindings = query.select_bindings();
        let rows = self
            .connection
            .processor()
            .process_select(&self.connection, &sql, &bindings)
            .await?;
        hydrate(&rows)
    }

    /// First matching row; the builder's own limit is left untouched.
    pub async fn first(&self) -> Result<Option<T>> {
        let mut query = self.query.clone();
        query.limit = Some(1);
        Ok(self.fetch(&query).await?.into_iter().next())
    }

    pub async fn find(&self, id: impl Into<Value>) -> Result<Option<T>> {
        let column = self.query.primary_key.clone();
        self.clone().filter(&column, Operator::Eq, id).first().await
    }

    pub async fn exists(&self) -> Result<bool> {
        let sql = self.grammar().compile_exists(&self.query);
        let rows = self.connection.select(&sql, &self.bindings()).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("exists"))
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    /// Insert several rows; columns come from the first row.
    #[tracing::instrument(skip(self, rows), fields(table = %self.query.from, rows = rows.len()))]
    pub async fn insert(&self, rows: &[Attributes]) -> Result<u64> {
        let Some(first) = rows.first() else {
            return Ok(0);
        };
        let columns: Vec<String> = first.columns().map(str::to_owned).collect();
        let mut bindings = Vec::with_capacity(columns.len() * rows.len());
        for row in rows {
            for column in &columns {
                bindings.push(row.get(column).cloned().unwrap_or(Value::Null));
            }
        }
        let sql = self.grammar().compile_insert(&self.query, &columns, rows.len());
        Ok(self.connection.raw_query(&sql, &bindings).await?.rows_affected)
    }

    /// Insert one row and return the generated key.
    #[tracing::instrument(skip(self, attributes), fields(table = %self.query.from))]
    pub async fn insert_get_id(&self, attributes: &Attributes) -> Result<Option<i64>> {
        let columns: Vec<String> = attributes.columns().map(str::to_owned).collect();
        let bindings: Vec<Value> = attributes.iter().map(|(_, value)| value.clone()).collect();
        let sql = self.grammar().compile_insert(&self.query, &columns, 1);
        self.connection
            .processor()
            .process_insert_get_id(&self.connection, &sql, &bindings)
            .await
    }

    #[tracing::instrument(skip(self, attributes), fields(table = %self.query.from))]
    pub async fn update(&self, attributes: &Attributes) -> Result<u64> {
        if attributes.is_empty() {
            return Err(Error::Validation(format!(
                "update on `{}` requires at least one column",
                self.query.from
            )));
        }
        let columns: Vec<String> = attributes.columns().map(str::to_owned).collect();
        let mut bindings: Vec<Value> = attributes.iter().map(|(_, value)| value.clone()).collect();
        bindings.extend(self.query.where_bindings());
        let sql = self.grammar().compile_update(&self.query, &columns);
        self.connection
            .processor()
            .process_update(&self.connection, &sql, &bindings)
            .await
    }

    #[tracing::instrument(skip(self), fields(table = %self.query.from))]
    pub async fn delete(&self) -> Result<u64> {
        let sql = self.grammar().compile_delete(&self.query);
        let bindings = self.query.where_bindings();
        self.connection
            .processor()
            .process_delete(&self.connection, &sql, &bindings)
            .await
    }

    /// Run an aggregate over a copy of the query, leaving this builder as is.
    ///
    /// Returns `0` when the statement yields no row.
    #[tracing::instrument(skip(self), fields(table = %self.query.from))]
    pub async fn aggregate(&self, function: AggregateFunction, column: &str) -> Result<Value> {
        if column.trim().is_empty() {
            return Err(Error::Validation(format!(
                "{} on `{}` requires a column",
                function.as_sql(),
                self.query.from
            )));
        }
        let mut query = self.query.clone();
        query.aggregate = Some(Aggregate {
            function,
            column: column.to_owned(),
        });
        query.selects.clear();
        query.orders.clear();
        query.limit = None;
        query.offset = None;

        let sql = self.grammar().compile_select(&query);
        let rows = self.connection.select(&sql, &query.select_bindings()).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("aggregate"))
            .cloned()
            .unwrap_or(Value::Integer(0)))
    }

    pub async fn count(&self) -> Result<i64> {
        self.count_column("*").await
    }

    pub async fn count_column(&self, column: &str) -> Result<i64> {
        let value = self.aggregate(AggregateFunction::Count, column).await?;
        Ok(value.as_i64().unwrap_or(0))
    }

    pub async fn sum(&self, column: &str) -> Result<f64> {
        let value = self.aggregate(AggregateFunction::Sum, column).await?;
        Ok(value.as_f64().unwrap_or(0.0))
    }

    pub async fn avg(&self, column: &str) -> Result<f64> {
        let value = self.aggregate(AggregateFunction::Avg, column).await?;
        Ok(value.as_f64().unwrap_or(0.0))
    }

    pub async fn min(&self, column: &str) -> Result<Value> {
        self.aggregate(AggregateFunction::Min, column).await
    }

    pub async fn max(&self, column: &str) -> Result<Value> {
        self.aggregate(AggregateFunction::Max, column).await
    }

    /// Stream every matching row, fetching `size` rows per statement.
    ///
    /// Without an explicit order the pages are ordered by primary key.
    pub fn chunked(&self, size: u64) -> Result<BoxStream<'_, Result<T>>>
    where
        T: Send,
    {
        if size == 0 {
            return Err(Error::Validation("chunk size must be positive".to_owned()));
        }
        let mut base = self.query.clone();
        if base.orders.is_empty() {
            base.orders.push(Order {
                column: base.primary_key.clone(),
                direction: Direction::Asc,
            });
        }
        Ok(Box::pin(async_stream::try_stream! {
            let mut offset = 0u64;
            loop {
                let mut page = base.clone();
                page.limit = Some(size);
                page.offset = Some(offset);
                let rows = self.fetch(&page).await?;
                let done = (rows.len() as u64) < size;
                for row in rows {
                    yield row;
                }
                if done {
                    break;
                }
                offset += size;
            }
        }))
    }
}
