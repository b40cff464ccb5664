use crate::error::{Error, Result};

/// Names of the non-foreign blueprint commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    Create,
    Add,
    Drop,
    DropIfExists,
    Primary,
    Unique,
    Index,
    DropPrimary,
    DropUnique,
    DropIndex,
    DropForeign,
    DropColumn,
    RenameColumn,
}

impl CommandName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Add => "add",
            Self::Drop => "drop",
            Self::DropIfExists => "dropIfExists",
            Self::Primary => "primary",
            Self::Unique => "unique",
            Self::Index => "index",
            Self::DropPrimary => "dropPrimary",
            Self::DropUnique => "dropUnique",
            Self::DropIndex => "dropIndex",
            Self::DropForeign => "dropForeign",
            Self::DropColumn => "dropColumn",
            Self::RenameColumn => "renameColumn",
        }
    }
}

/// A table-level operation other than a foreign key.
#[derive(Debug, Clone, PartialEq)]
pub struct PlainCommand {
    pub(crate) name: CommandName,
    pub(crate) columns: Vec<String>,
    pub(crate) index_name: String,
    pub(crate) from: Option<String>,
    pub(crate) to: Option<String>,
    pub(crate) should_be_skipped: bool,
}

impl PlainCommand {
    pub(crate) fn new(name: CommandName) -> Self {
        Self {
            name,
            columns: Vec::new(),
            index_name: String::new(),
            from: None,
            to: None,
            should_be_skipped: false,
        }
    }

    pub(crate) fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    pub(crate) fn with_index_name(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = index_name.into();
        self
    }

    pub fn name(&self) -> CommandName {
        self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Both ends of a rename, or a validation error naming what is missing.
    pub(crate) fn rename_pair(&self) -> Result<(&str, &str)> {
        match (self.from.as_deref(), self.to.as_deref()) {
            (Some(from), Some(to)) if !from.is_empty() && !to.is_empty() => Ok((from, to)),
            _ => Err(Error::Validation(
                "renameColumn command requires both 'from' and 'to' parameters.".to_owned(),
            )),
        }
    }
}

/// `foreign key (...) references ...`, configured fluently.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyCommand {
    pub(crate) columns: Vec<String>,
    pub(crate) index_name: String,
    pub(crate) reference_column: String,
    pub(crate) reference_table: String,
    pub(crate) on_delete: Option<String>,
    pub(crate) on_update: Option<String>,
    pub(crate) should_be_skipped: bool,
}

impl ForeignKeyCommand {
    pub(crate) fn new(columns: Vec<String>, index_name: String) -> Self {
        Self {
            columns,
            index_name,
            reference_column: String::new(),
            reference_table: String::new(),
            on_delete: None,
            on_update: None,
            should_be_skipped: false,
        }
    }

    /// Referenced column on the parent table.
    pub fn references(&mut self, column: impl Into<String>) -> &mut Self {
        self.reference_column = column.into();
        self
    }

    /// Parent table.
    pub fn on(&mut self, table: impl Into<String>) -> &mut Self {
        self.reference_table = table.into();
        self
    }

    pub fn on_delete(&mut self, action: impl Into<String>) -> &mut Self {
        self.on_delete = Some(action.into());
        self
    }

    pub fn on_update(&mut self, action: impl Into<String>) -> &mut Self {
        self.on_update = Some(action.into());
        self
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub(crate) fn ensure_target(&self) -> Result<()> {
        if self.reference_table.is_empty() || self.reference_column.is_empty() {
            return Err(Error::Validation(format!(
                "Foreign key `{}` requires both references() and on().",
                self.index_name
            )));
        }
        Ok(())
    }
}

/// A blueprint command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Plain(PlainCommand),
    Foreign(ForeignKeyCommand),
}

impl Command {
    pub fn is(&self, name: CommandName) -> bool {
        matches!(self, Self::Plain(command) if command.name == name)
    }

    pub fn is_foreign(&self) -> bool {
        matches!(self, Self::Foreign(_))
    }

    pub fn is_skipped(&self) -> bool {
        match self {
            Self::Plain(command) => command.should_be_skipped,
            Self::Foreign(command) => command.should_be_skipped,
        }
    }

    /// Suppress this command; an earlier statement already covered it.
    pub(crate) fn skip(&mut self) {
        match self {
            Self::Plain(command) => command.should_be_skipped = true,
            Self::Foreign(command) => command.should_be_skipped = true,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Plain(command) => command.name.as_str(),
            Self::Foreign(_) => "foreign",
        }
    }
}

impl From<PlainCommand> for Command {
    fn from(command: PlainCommand) -> Self {
        Self::Plain(command)
    }
}

/// Target of a `drop_*` index command: an explicit name or the indexed
/// columns, from which the conventional name is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexTarget {
    Name(String),
    Columns(Vec<String>),
}

impl From<&str> for IndexTarget {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for IndexTarget {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<&[&str]> for IndexTarget {
    fn from(columns: &[&str]) -> Self {
        Self::Columns(columns.iter().map(|c| (*c).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for IndexTarget {
    fn from(columns: [&str; N]) -> Self {
        Self::Columns(columns.iter().map(|c| (*c).to_owned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_requires_both_ends() {
        let mut command = PlainCommand::new(CommandName::RenameColumn);
        command.from = Some("a".into());
        let err = command.rename_pair().unwrap_err();
        assert!(err.to_string().contains("'from' and 'to'"));

        command.to = Some("b".into());
        assert_eq!(command.rename_pair().unwrap(), ("a", "b"));
    }

    #[test]
    fn foreign_requires_parent_table_and_column() {
        let mut command = ForeignKeyCommand::new(vec!["role_id".into()], "users_role_id_foreign".into());
        assert!(command.ensure_target().is_err());
        command.references("id").on("roles");
        assert!(command.ensure_target().is_ok());
    }

    #[test]
    fn skip_marks_either_variant() {
        let mut plain = Command::from(PlainCommand::new(CommandName::Primary));
        plain.skip();
        assert!(plain.is_skipped());
        assert!(plain.is(CommandName::Primary));

        let mut foreign = Command::Foreign(ForeignKeyCommand::new(Vec::new(), String::new()));
        assert!(!foreign.is_skipped());
        foreign.skip();
        assert!(foreign.is_skipped());
        assert_eq!(foreign.label(), "foreign");
    }
}
