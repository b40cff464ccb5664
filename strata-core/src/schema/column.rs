use std::fmt;

/// Logical column types understood by every schema grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Uuid,
    Integer,
    TinyInteger,
    SmallInteger,
    BigInteger,
    Char,
    String,
    Text,
    LongText,
    Float,
    Double,
    Boolean,
    Date,
    DateTime,
    Time,
    Timestamp,
    Year,
    Json,
    Binary,
}

impl ColumnType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Uuid => "uuid",
            Self::Integer => "integer",
            Self::TinyInteger => "tinyInteger",
            Self::SmallInteger => "smallInteger",
            Self::BigInteger => "bigInteger",
            Self::Char => "char",
            Self::String => "string",
            Self::Text => "text",
            Self::LongText => "longText",
            Self::Float => "float",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::Year => "year",
            Self::Json => "json",
            Self::Binary => "binary",
        }
    }

    /// Integer types that may carry an auto-increment modifier.
    pub fn is_serial(self) -> bool {
        matches!(
            self,
            Self::Integer | Self::TinyInteger | Self::SmallInteger | Self::BigInteger
        )
    }

    /// Types that accept `CURRENT_TIMESTAMP` through `use_current`.
    pub fn is_current_timestamp_capable(self) -> bool {
        matches!(self, Self::DateTime | Self::Timestamp)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A column default.
///
/// `Raw` is emitted verbatim, so string literals must carry their own
/// quotes; [`DefaultValue::string`] builds a correctly quoted one.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Raw(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl DefaultValue {
    /// A single-quoted string literal with embedded quotes doubled.
    pub fn string(value: &str) -> Self {
        Self::Raw(format!("'{}'", value.replace('\'', "''")))
    }
}

impl From<&str> for DefaultValue {
    fn from(value: &str) -> Self {
        Self::Raw(value.to_owned())
    }
}

impl From<String> for DefaultValue {
    fn from(value: String) -> Self {
        Self::Raw(value)
    }
}

impl From<i32> for DefaultValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<i64> for DefaultValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for DefaultValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for DefaultValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for DefaultValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// One column of a [`Blueprint`](super::Blueprint) with its attribute bag.
///
/// Setters mutate in place and return `&mut Self` so calls chain off the
/// blueprint helper that created the column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub(crate) name: String,
    pub(crate) column_type: ColumnType,
    pub(crate) nullable: bool,
    pub(crate) default: Option<DefaultValue>,
    pub(crate) on_update: Option<String>,
    pub(crate) unsigned: bool,
    pub(crate) auto_increment: bool,
    pub(crate) length: Option<u32>,
    pub(crate) precision: Option<u32>,
    pub(crate) after: Option<String>,
    pub(crate) first: bool,
    pub(crate) comment: Option<String>,
    pub(crate) use_current: bool,
    pub(crate) use_current_on_update: bool,
    pub(crate) primary: bool,
    pub(crate) unique: bool,
    pub(crate) index: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            default: None,
            on_update: None,
            unsigned: false,
            auto_increment: false,
            length: None,
            precision: None,
            after: None,
            first: false,
            comment: None,
            use_current: false,
            use_current_on_update: false,
            primary: false,
            unique: false,
            index: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn nullable(&mut self) -> &mut Self {
        self.nullable = true;
        self
    }

    pub fn default(&mut self, value: impl Into<DefaultValue>) -> &mut Self {
        self.default = Some(value.into());
        self
    }

    /// Raw `on update` expression (MySQL only).
    pub fn on_update(&mut self, expression: impl Into<String>) -> &mut Self {
        self.on_update = Some(expression.into());
        self
    }

    pub fn unsigned(&mut self) -> &mut Self {
        self.unsigned = true;
        self
    }

    pub fn auto_increment(&mut self) -> &mut Self {
        self.auto_increment = true;
        self
    }

    /// Place the column after `column` (MySQL only).
    pub fn after(&mut self, column: impl Into<String>) -> &mut Self {
        self.after = Some(column.into());
        self
    }

    /// Place the column first in the table (MySQL only).
    pub fn first(&mut self) -> &mut Self {
        self.first = true;
        self
    }

    pub fn comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.comment = Some(comment.into());
        self
    }

    /// Default a datetime/timestamp column to `CURRENT_TIMESTAMP`.
    pub fn use_current(&mut self) -> &mut Self {
        self.use_current = true;
        self
    }

    /// Refresh a datetime/timestamp column on every update (MySQL only).
    pub fn use_current_on_update(&mut self) -> &mut Self {
        self.use_current_on_update = true;
        self
    }

    /// Add a primary key command for this column.
    pub fn primary(&mut self) -> &mut Self {
        self.primary = true;
        self
    }

    /// Add a unique index command for this column.
    pub fn unique(&mut self) -> &mut Self {
        self.unique = true;
        self
    }

    /// Add a plain index command for this column.
    pub fn index(&mut self) -> &mut Self {
        self.index = true;
        self
    }

    /// Character length for `char`/`string` columns.
    pub fn length(&mut self, length: u32) -> &mut Self {
        self.length = Some(length);
        self
    }

    /// Precision for `float` columns (MySQL only).
    pub fn precision(&mut self, precision: u32) -> &mut Self {
        self.precision = Some(precision);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_chain_on_the_same_column() {
        let mut column = ColumnDefinition::new("nickname", ColumnType::String);
        column.nullable().default("'anon'").after("name");

        assert!(column.is_nullable());
        assert_eq!(column.default, Some(DefaultValue::Raw("'anon'".into())));
        assert_eq!(column.after.as_deref(), Some("name"));
    }

    #[test]
    fn string_default_is_quoted_and_escaped() {
        assert_eq!(DefaultValue::string("it's"), DefaultValue::Raw("'it''s'".into()));
    }

    #[test]
    fn serial_types_are_integers_only() {
        assert!(ColumnType::BigInteger.is_serial());
        assert!(!ColumnType::Float.is_serial());
        assert!(ColumnType::Timestamp.is_current_timestamp_capable());
        assert!(!ColumnType::Date.is_current_timestamp_capable());
    }
}
