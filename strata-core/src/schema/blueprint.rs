use crate::error::Result;
use crate::schema::column::{ColumnDefinition, ColumnType};
use crate::schema::command::{
    Command, CommandName, ForeignKeyCommand, IndexTarget, PlainCommand,
};
use crate::schema::grammar::SchemaGrammar;

/// Accumulates one schema change (a table create or alter).
///
/// Column helpers return the new [`ColumnDefinition`] for chaining
/// modifiers; command helpers record table-level operations. Compile with
/// [`Blueprint::to_sql`] or execute through
/// [`SchemaBuilder`](super::SchemaBuilder).
#[derive(Debug, Clone, PartialEq)]
pub struct Blueprint {
    table: String,
    columns: Vec<ColumnDefinition>,
    commands: Vec<Command>,
}

impl Blueprint {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_creating(&self) -> bool {
        self.commands.iter().any(|command| command.is(CommandName::Create))
    }

    // Columns

    pub fn add_column(&mut self, column: ColumnDefinition) -> &mut ColumnDefinition {
        let index = self.columns.len();
        self.columns.push(column);
        &mut self.columns[index]
    }

    fn column(&mut self, name: &str, column_type: ColumnType) -> &mut ColumnDefinition {
        self.add_column(ColumnDefinition::new(name, column_type))
    }

    /// Auto-incrementing unsigned big integer named `id`.
    pub fn id(&mut self) -> &mut ColumnDefinition {
        self.big_increments("id")
    }

    pub fn increments(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Integer)
            .unsigned()
            .auto_increment()
    }

    pub fn small_increments(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::SmallInteger)
            .unsigned()
            .auto_increment()
    }

    pub fn big_increments(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::BigInteger)
            .unsigned()
            .auto_increment()
    }

    pub fn uuid(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Uuid)
    }

    pub fn char(&mut self, name: &str, length: u32) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Char).length(length)
    }

    /// `varchar(255)`; adjust with [`ColumnDefinition::length`].
    pub fn string(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::String).length(255)
    }

    pub fn text(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Text)
    }

    pub fn long_text(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::LongText)
    }

    pub fn integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Integer)
    }

    pub fn tiny_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::TinyInteger)
    }

    pub fn small_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::SmallInteger)
    }

    pub fn big_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::BigInteger)
    }

    pub fn float(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Float)
    }

    pub fn double(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Double)
    }

    pub fn boolean(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Boolean)
    }

    pub fn date(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Date)
    }

    pub fn date_time(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::DateTime)
    }

    pub fn time(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Time)
    }

    pub fn timestamp(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Timestamp)
    }

    /// Nullable `created_at` and `updated_at` timestamps.
    pub fn timestamps(&mut self) {
        self.timestamp("created_at").nullable();
        self.timestamp("updated_at").nullable();
    }

    pub fn year(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Year)
    }

    pub fn json(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Json)
    }

    pub fn binary(&mut self, name: &str) -> &mut ColumnDefinition {
        self.column(name, ColumnType::Binary)
    }

    // Commands

    fn push(&mut self, command: PlainCommand) {
        self.commands.push(Command::Plain(command));
    }

    pub fn create(&mut self) {
        self.push(PlainCommand::new(CommandName::Create));
    }

    #[allow(clippy::should_implement_trait)]
    pub fn drop(&mut self) {
        self.push(PlainCommand::new(CommandName::Drop));
    }

    pub fn drop_if_exists(&mut self) {
        self.push(PlainCommand::new(CommandName::DropIfExists));
    }

    pub fn drop_column(&mut self, column: &str) {
        self.drop_columns(&[column]);
    }

    pub fn drop_columns(&mut self, columns: &[&str]) {
        self.push(PlainCommand::new(CommandName::DropColumn).with_columns(owned(columns)));
    }

    pub fn rename_column(&mut self, from: &str, to: &str) {
        let mut command = PlainCommand::new(CommandName::RenameColumn);
        command.from = Some(from.to_owned());
        command.to = Some(to.to_owned());
        self.push(command);
    }

    pub fn primary(&mut self, columns: &[&str], name: Option<&str>) {
        self.index_command(CommandName::Primary, "primary", columns, name);
    }

    pub fn unique(&mut self, columns: &[&str], name: Option<&str>) {
        self.index_command(CommandName::Unique, "unique", columns, name);
    }

    pub fn index(&mut self, columns: &[&str], name: Option<&str>) {
        self.index_command(CommandName::Index, "index", columns, name);
    }

    pub fn drop_primary(&mut self, target: impl Into<IndexTarget>) {
        self.drop_index_command(CommandName::DropPrimary, "primary", target.into());
    }

    pub fn drop_unique(&mut self, target: impl Into<IndexTarget>) {
        self.drop_index_command(CommandName::DropUnique, "unique", target.into());
    }

    pub fn drop_index(&mut self, target: impl Into<IndexTarget>) {
        self.drop_index_command(CommandName::DropIndex, "index", target.into());
    }

    pub fn drop_foreign(&mut self, target: impl Into<IndexTarget>) {
        self.drop_index_command(CommandName::DropForeign, "foreign", target.into());
    }

    /// Start a foreign key on `column`; finish it with `references` and `on`.
    pub fn foreign(&mut self, column: &str) -> &mut ForeignKeyCommand {
        let columns = vec![column.to_owned()];
        let index_name = self.default_index_name("foreign", &columns);
        let index = self.commands.len();
        self.commands
            .push(Command::Foreign(ForeignKeyCommand::new(columns, index_name)));
        match &mut self.commands[index] {
            Command::Foreign(command) => command,
            Command::Plain(_) => unreachable!("foreign command was just pushed"),
        }
    }

    fn index_command(
        &mut self,
        name: CommandName,
        suffix: &str,
        columns: &[&str],
        index_name: Option<&str>,
    ) {
        let columns = owned(columns);
        let index_name = match index_name {
            Some(index_name) => index_name.to_owned(),
            None => self.default_index_name(suffix, &columns),
        };
        self.push(
            PlainCommand::new(name)
                .with_columns(columns)
                .with_index_name(index_name),
        );
    }

    fn drop_index_command(&mut self, name: CommandName, suffix: &str, target: IndexTarget) {
        let index_name = match target {
            IndexTarget::Name(index_name) => index_name,
            IndexTarget::Columns(columns) => self.default_index_name(suffix, &columns),
        };
        self.push(PlainCommand::new(name).with_index_name(index_name));
    }

    /// `<table>_<col1>_..._<suffix>`, lowercased with `-` and `.` turned into `_`.
    pub fn default_index_name(&self, suffix: &str, columns: &[String]) -> String {
        let mut parts = Vec::with_capacity(columns.len() + 2);
        parts.push(self.table.as_str());
        parts.extend(columns.iter().map(String::as_str));
        parts.push(suffix);
        parts
            .join("_")
            .replace(['-', '.'], "_")
            .to_lowercase()
    }

    /// Commands as compiled: an implied `add` when altering with new
    /// columns, then the recorded commands, then column-level indexes.
    fn effective_commands(&self) -> Vec<Command> {
        let mut commands = Vec::with_capacity(self.commands.len() + 1);
        if !self.columns.is_empty() && !self.is_creating() {
            commands.push(Command::Plain(PlainCommand::new(CommandName::Add)));
        }
        commands.extend(self.commands.iter().cloned());

        for column in &self.columns {
            let flags = [
                (column.primary, CommandName::Primary, "primary"),
                (column.unique, CommandName::Unique, "unique"),
                (column.index, CommandName::Index, "index"),
            ];
            for (enabled, name, suffix) in flags {
                if enabled {
                    let columns = vec![column.name.clone()];
                    let index_name = self.default_index_name(suffix, &columns);
                    commands.push(Command::Plain(
                        PlainCommand::new(name)
                            .with_columns(columns)
                            .with_index_name(index_name),
                    ));
                }
            }
        }
        commands
    }

    /// Compile every command into SQL statements, in order.
    ///
    /// Commands folded into an earlier statement (an inlined primary or
    /// foreign key) are skipped.
    pub fn to_sql(&self, grammar: &dyn SchemaGrammar) -> Result<Vec<String>> {
        let mut commands = self.effective_commands();
        let mut statements = Vec::new();
        for index in 0..commands.len() {
            if commands[index].is_skipped() {
                continue;
            }
            statements.extend(grammar.compile_command(self, &mut commands, index)?);
        }
        Ok(statements)
    }
}

fn owned(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|column| (*column).to_owned()).collect()
}
