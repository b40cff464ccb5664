use crate::dialect::Dialect;

/// Errors raised while compiling, executing or migrating.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unsupported driver, malformed URL or a missing configuration field.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A builder call received arguments it cannot compile.
    #[error("{0}")]
    Validation(String),
    /// The grammar has no rendering for a type or command.
    #[error("{feature} is not supported by the {dialect} grammar")]
    Unsupported { feature: String, dialect: Dialect },
    /// The ledger references a migration that is not registered.
    #[error("Migration file for \"{0}\" not found.")]
    MigrationNotFound(String),
    /// Mass assignment rejected by a model's fillable/guarded lists.
    #[error("{0}")]
    MassAssignment(String),
    /// A row cell could not be converted to the requested type.
    #[error("cannot decode column `{column}`: {message}")]
    Decode { column: String, message: String },
    /// Transaction bookkeeping failed (handle already finished, nested misuse).
    #[error("transaction error: {0}")]
    Transaction(String),
    /// Underlying sqlx error.
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        map_sqlx_error(err)
    }
}

/// Result alias for strata operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Convert sqlx errors into strata errors, keeping configuration failures distinct.
pub fn map_sqlx_error(err: sqlx::Error) -> Error {
    match err {
        sqlx::Error::Configuration(inner) => Error::Configuration(inner.to_string()),
        sqlx::Error::ColumnDecode { index, source } => Error::Decode {
            column: index,
            message: source.to_string(),
        },
        other => Error::Database(other),
    }
}

impl Error {
    pub(crate) fn unsupported(feature: impl Into<String>, dialect: Dialect) -> Self {
        Self::Unsupported {
            feature: feature.into(),
            dialect,
        }
    }

    pub(crate) fn decode(column: &str, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.to_owned(),
            message: message.into(),
        }
    }
}
