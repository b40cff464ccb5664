use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::query::QueryBuilder;
use crate::value::{Attributes, FromRow};

/// A table-backed type that the query builder can hydrate and create.
pub trait Model: FromRow + Send + Sync {
    fn table_name() -> &'static str;

    fn primary_key() -> &'static str {
        "id"
    }

    /// Columns accepted by mass assignment.
    fn fillable() -> &'static [&'static str] {
        &[]
    }

    /// Columns refused by mass assignment; `["*"]` with no fillable list refuses all.
    fn guarded() -> &'static [&'static str] {
        &["*"]
    }

    fn query(connection: &Connection) -> QueryBuilder<Self>
    where
        Self: Sized,
    {
        QueryBuilder::for_model(connection)
    }
}

fn is_totally_guarded<M: Model>() -> bool {
    M::fillable().is_empty() && M::guarded() == ["*"]
}

fn is_guarded<M: Model>(column: &str) -> bool {
    if M::guarded().is_empty() {
        return false;
    }
    is_totally_guarded::<M>() || M::guarded().iter().any(|guarded| *guarded == column)
}

/// Whether `column` may be mass assigned on `M`.
pub fn is_fillable<M: Model>(column: &str) -> bool {
    if M::fillable().iter().any(|fillable| *fillable == column) {
        return true;
    }
    if is_guarded::<M>(column) {
        return false;
    }
    M::fillable().is_empty()
}

/// Keep the attributes `M` accepts.
///
/// A totally guarded model rejects the first key with a `MassAssignment`
/// error; otherwise guarded keys are dropped silently.
pub fn fill<M: Model>(attributes: Attributes) -> Result<Attributes> {
    let totally_guarded = is_totally_guarded::<M>();
    let mut filled = Attributes::new();
    for (column, value) in attributes {
        if is_fillable::<M>(&column) {
            filled.set(&column, value);
        } else if totally_guarded {
            return Err(Error::MassAssignment(format!(
                "Add {column} to fillable property to allow mass assignment on {}.",
                M::table_name()
            )));
        }
    }
    Ok(filled)
}
