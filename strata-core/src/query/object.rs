use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::error::Error;
use crate::value::Value;

/// Comparison operator for basic clauses and join conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
}

impl Operator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Like => "like",
            Self::NotLike => "not like",
        }
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(op: &str) -> Result<Self, Self::Err> {
        match op.trim().to_ascii_lowercase().as_str() {
            "=" => Ok(Self::Eq),
            "!=" | "<>" => Ok(Self::NotEq),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Lte),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Gte),
            "like" => Ok(Self::Like),
            "not like" => Ok(Self::NotLike),
            _ => Err(Error::Validation(format!("unknown comparison operator `{op}`"))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Connective placed in front of a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Boolean {
    #[default]
    And,
    Or,
}

impl Boolean {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// One entry of a `where` or `having` list.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereClause {
    Basic {
        column: String,
        operator: Operator,
        value: Value,
        boolean: Boolean,
    },
    In {
        column: String,
        values: Vec<Value>,
        boolean: Boolean,
        negated: bool,
    },
    Between {
        column: String,
        low: Value,
        high: Value,
        boolean: Boolean,
        negated: bool,
    },
    Null {
        column: String,
        boolean: Boolean,
        negated: bool,
    },
}

impl WhereClause {
    pub fn boolean(&self) -> Boolean {
        match self {
            Self::Basic { boolean, .. }
            | Self::In { boolean, .. }
            | Self::Between { boolean, .. }
            | Self::Null { boolean, .. } => *boolean,
        }
    }

    /// Append this clause's values in placeholder order.
    pub fn push_bindings(&self, out: &mut Vec<Value>) {
        match self {
            Self::Basic { value, .. } => out.push(value.clone()),
            Self::In { values, .. } => out.extend(values.iter().cloned()),
            Self::Between { low, high, .. } => {
                out.push(low.clone());
                out.push(high.clone());
            }
            Self::Null { .. } => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

impl JoinType {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "inner",
            Self::Left => "left",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCondition {
    pub first: String,
    pub operator: Operator,
    pub second: String,
    pub boolean: Boolean,
}

/// A join target with its `on` conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    pub kind: JoinType,
    pub table: String,
    pub conditions: SmallVec<[JoinCondition; 2]>,
}

impl JoinClause {
    pub fn new(kind: JoinType, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            conditions: SmallVec::new(),
        }
    }

    pub fn on(mut self, first: impl Into<String>, operator: Operator, second: impl Into<String>) -> Self {
        self.conditions.push(JoinCondition {
            first: first.into(),
            operator,
            second: second.into(),
            boolean: Boolean::And,
        });
        self
    }

    pub fn or_on(mut self, first: impl Into<String>, operator: Operator, second: impl Into<String>) -> Self {
        self.conditions.push(JoinCondition {
            first: first.into(),
            operator,
            second: second.into(),
            boolean: Boolean::Or,
        });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub function: AggregateFunction,
    pub column: String,
}

/// Shape of one statement, compiled by a [`QueryGrammar`](super::grammar::QueryGrammar).
#[derive(Debug, Clone, PartialEq)]
pub struct QueryObject {
    pub from: String,
    pub alias: Option<String>,
    pub primary_key: String,
    pub selects: Vec<String>,
    pub distinct: bool,
    pub joins: Vec<JoinClause>,
    pub wheres: Vec<WhereClause>,
    pub groups: Vec<String>,
    pub havings: Vec<WhereClause>,
    pub orders: Vec<Order>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub aggregate: Option<Aggregate>,
}

impl QueryObject {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            from: table.into(),
            alias: None,
            primary_key: "id".to_owned(),
            selects: Vec::new(),
            distinct: false,
            joins: Vec::new(),
            wheres: Vec::new(),
            groups: Vec::new(),
            havings: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            aggregate: None,
        }
    }

    pub fn where_bindings(&self) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.wheres.len());
        for clause in &self.wheres {
            clause.push_bindings(&mut out);
        }
        out
    }

    pub fn having_bindings(&self) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.havings.len());
        for clause in &self.havings {
            clause.push_bindings(&mut out);
        }
        out
    }

    /// Bindings for a select: wheres then havings.
    pub fn select_bindings(&self) -> Vec<Value> {
        let mut out = self.where_bindings();
        out.extend(self.having_bindings());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_operators() {
        assert_eq!("<>".parse::<Operator>().unwrap(), Operator::NotEq);
        assert_eq!("LIKE".parse::<Operator>().unwrap(), Operator::Like);
        assert!("~~".parse::<Operator>().is_err());
    }

    #[test]
    fn select_bindings_put_wheres_before_havings() {
        let mut query = QueryObject::new("orders");
        query.havings.push(WhereClause::Basic {
            column: "total".to_owned(),
            operator: Operator::Gt,
            value: Value::Integer(100),
            boolean: Boolean::And,
        });
        query.wheres.push(WhereClause::In {
            column: "status".to_owned(),
            values: vec!["open".into(), "paid".into()],
            boolean: Boolean::And,
            negated: false,
        });
        query.wheres.push(WhereClause::Null {
            column: "deleted_at".to_owned(),
            boolean: Boolean::And,
            negated: false,
        });
        assert_eq!(
            query.select_bindings(),
            vec![
                Value::Text("open".to_owned()),
                Value::Text("paid".to_owned()),
                Value::Integer(100)
            ]
        );
    }
}
