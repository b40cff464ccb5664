use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::Error;
use crate::query::grammar::{MySqlGrammar, PostgresGrammar, QueryGrammar, SqliteGrammar};
use crate::schema::grammar::{
    MySqlSchemaGrammar, PostgresSchemaGrammar, SchemaGrammar, SqliteSchemaGrammar,
};

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Dialect {
    MySql,
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Infer the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Result<Self, Error> {
        let scheme = url
            .split_once(':')
            .map(|(scheme, _)| scheme)
            .ok_or_else(|| Error::Configuration(format!("connection url `{url}` has no scheme")))?;
        scheme.parse()
    }

    /// Character used to quote identifiers.
    pub fn quote_char(self) -> char {
        match self {
            Self::MySql => '`',
            Self::Postgres | Self::Sqlite => '"',
        }
    }

    /// Quote a single identifier segment, doubling embedded quote characters.
    pub fn quote_identifier(self, segment: &str) -> String {
        let quote = self.quote_char();
        let mut out = String::with_capacity(segment.len() + 2);
        out.push(quote);
        for ch in segment.chars() {
            if ch == quote {
                out.push(quote);
            }
            out.push(ch);
        }
        out.push(quote);
        out
    }

    /// Placeholder for the `n`th (1-based) binding as the driver receives it.
    pub fn placeholder(self, n: usize) -> String {
        match self {
            Self::Postgres => format!("${n}"),
            Self::MySql | Self::Sqlite => "?".to_owned(),
        }
    }

    /// Whether inserted ids come back through a `returning` clause.
    pub fn supports_returning(self) -> bool {
        matches!(self, Self::Postgres)
    }

    /// Rewrite compiled `?` placeholders into the driver's native form.
    ///
    /// Only PostgreSQL changes anything: each `?` outside a quoted literal or
    /// quoted identifier becomes `$1`, `$2`, ... in left-to-right order.
    pub fn rewrite_placeholders(self, sql: &str) -> Cow<'_, str> {
        if self != Self::Postgres || !sql.contains('?') {
            return Cow::Borrowed(sql);
        }

        let mut out = String::with_capacity(sql.len() + 8);
        let mut in_literal = false;
        let mut in_identifier = false;
        let mut n = 0usize;
        for ch in sql.chars() {
            match ch {
                '\'' if !in_identifier => in_literal = !in_literal,
                '"' if !in_literal => in_identifier = !in_identifier,
                '?' if !in_literal && !in_identifier => {
                    n += 1;
                    out.push_str(&self.placeholder(n));
                    continue;
                }
                _ => {}
            }
            out.push(ch);
        }
        Cow::Owned(out)
    }

    /// Query grammar for this dialect.
    pub fn query_grammar(self) -> &'static dyn QueryGrammar {
        match self {
            Self::MySql => &MySqlGrammar,
            Self::Postgres => &PostgresGrammar,
            Self::Sqlite => &SqliteGrammar,
        }
    }

    /// Schema grammar for this dialect.
    pub fn schema_grammar(self) -> &'static dyn SchemaGrammar {
        match self {
            Self::MySql => &MySqlSchemaGrammar,
            Self::Postgres => &PostgresSchemaGrammar,
            Self::Sqlite => &SqliteSchemaGrammar,
        }
    }

    /// Short label used for metrics and log fields.
    pub fn label(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MySql => "MySQL",
            Self::Postgres => "PostgreSQL",
            Self::Sqlite => "SQLite",
        })
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(driver: &str) -> Result<Self, Self::Err> {
        match driver.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(Error::Configuration(format!("Unsupported driver: {driver}"))),
        }
    }
}

impl TryFrom<String> for Dialect {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
