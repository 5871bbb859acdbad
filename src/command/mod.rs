mod function;
mod mapping;
mod policy;
mod table;

pub use function::{CreateFunctionCommand, DropFunctionCommand};
pub use mapping::{CreateMappingCommand, DropMappingCommand};
pub use policy::{AlterPolicyCommand, DeletePolicyCommand};
pub use table::{AlterMergeTableCommand, CreateTableCommand, CreateTablesCommand, DropTableCommand};

use crate::primitives::{QuotedText, ScriptingContext};

/// A parsed or synthesized control command. Immutable once constructed.
/// One tagged variant per command family; shared behavior (`sort_index`,
/// `script_path`, `to_script`) is dispatched by a single `match` in this
/// enum's own methods.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateTable(CreateTableCommand),
    CreateTables(CreateTablesCommand),
    AlterMergeTable(AlterMergeTableCommand),
    DropTable(DropTableCommand),
    CreateFunction(CreateFunctionCommand),
    DropFunction(DropFunctionCommand),
    CreateMapping(CreateMappingCommand),
    DropMapping(DropMappingCommand),
    AlterPolicy(AlterPolicyCommand),
    DeletePolicy(DeletePolicyCommand),
}

impl Command {
    pub fn friendly_name(&self) -> &'static str {
        match self {
            Self::CreateTable(_) => ".create table",
            Self::CreateTables(_) => ".create tables",
            Self::AlterMergeTable(_) => ".create-merge table",
            Self::DropTable(_) => ".drop table",
            Self::CreateFunction(_) => ".create function",
            Self::DropFunction(_) => ".drop function",
            Self::CreateMapping(_) => ".create table ingestion mapping",
            Self::DropMapping(_) => ".drop table ingestion mapping",
            Self::AlterPolicy(_) => ".alter policy",
            Self::DeletePolicy(_) => ".delete policy",
        }
    }

    pub fn sort_index(&self) -> String {
        match self {
            Self::CreateTable(cmd) => cmd.sort_index(),
            Self::CreateTables(cmd) => cmd.sort_index(),
            Self::AlterMergeTable(cmd) => cmd.sort_index(),
            Self::DropTable(cmd) => cmd.sort_index(),
            Self::CreateFunction(cmd) => cmd.sort_index(),
            Self::DropFunction(cmd) => cmd.sort_index(),
            Self::CreateMapping(cmd) => cmd.sort_index(),
            Self::DropMapping(cmd) => cmd.sort_index(),
            Self::AlterPolicy(cmd) => cmd.sort_index(),
            Self::DeletePolicy(cmd) => cmd.sort_index(),
        }
    }

    pub fn script_path(&self) -> String {
        match self {
            Self::CreateTable(cmd) => cmd.script_path(),
            Self::CreateTables(cmd) => cmd.script_path(),
            Self::AlterMergeTable(cmd) => cmd.script_path(),
            Self::DropTable(cmd) => cmd.script_path(),
            Self::CreateFunction(cmd) => cmd.script_path(),
            Self::DropFunction(cmd) => cmd.script_path(),
            Self::CreateMapping(cmd) => cmd.script_path(),
            Self::DropMapping(cmd) => cmd.script_path(),
            Self::AlterPolicy(cmd) => cmd.script_path(),
            Self::DeletePolicy(cmd) => cmd.script_path(),
        }
    }

    pub fn to_script(&self, context: &ScriptingContext) -> String {
        match self {
            Self::CreateTable(cmd) => cmd.to_script(context),
            Self::CreateTables(cmd) => cmd.to_script(context),
            Self::AlterMergeTable(cmd) => cmd.to_script(context),
            Self::DropTable(cmd) => cmd.to_script(context),
            Self::CreateFunction(cmd) => cmd.to_script(context),
            Self::DropFunction(cmd) => cmd.to_script(context),
            Self::CreateMapping(cmd) => cmd.to_script(context),
            Self::DropMapping(cmd) => cmd.to_script(context),
            Self::AlterPolicy(cmd) => cmd.to_script(context),
            Self::DeletePolicy(cmd) => cmd.to_script(context),
        }
    }

    /// Declared integer priority, used only as a stable tiebreaker when two
    /// commands of unrelated kinds share a `sort_index` within one stage.
    pub fn kind_priority(&self) -> i32 {
        match self {
            Self::DropFunction(_) => 0,
            Self::DropMapping(_) => 1,
            Self::DropTable(_) => 2,
            Self::CreateTable(_) => 3,
            Self::CreateTables(_) => 3,
            Self::AlterMergeTable(_) => 4,
            Self::AlterPolicy(_) => 5,
            Self::DeletePolicy(_) => 5,
            Self::CreateMapping(_) => 6,
            Self::CreateFunction(_) => 7,
        }
    }
}

/// Shared `with (folder="...", docstring="...")` clause builder used by
/// create-table, create-tables, and create-function.
pub(crate) fn with_clause(folder: &Option<String>, doc_string: &Option<String>) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(folder) = folder {
        parts.push(format!("folder={}", QuotedText::new(folder.clone()).script()));
    }
    if let Some(doc_string) = doc_string {
        parts.push(format!(
            "docstring={}",
            QuotedText::new(doc_string.clone()).script()
        ));
    }
    if parts.is_empty() {
        None
    } else {
        Some(format!("with ({})", parts.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{EntityName, TableColumn};

    #[test]
    fn create_table_round_trips_columns_and_with_clause() {
        let cmd = Command::CreateTable(CreateTableCommand {
            name: EntityName::new("T"),
            columns: vec![TableColumn::new("a", "int")],
            folder: Some("Folder".to_string()),
            doc_string: None,
        });
        assert_eq!(
            cmd.to_script(&ScriptingContext::default()),
            ".create table T (a:int) with (folder=\"Folder\")"
        );
        assert_eq!(cmd.script_path(), "tables/create/Folder/T");
    }

    #[test]
    fn drop_precedes_create_by_kind_priority_when_sort_index_ties() {
        let drop = Command::DropTable(DropTableCommand {
            name: EntityName::new("T"),
        });
        let create = Command::CreateTable(CreateTableCommand {
            name: EntityName::new("T"),
            columns: vec![],
            folder: None,
            doc_string: None,
        });
        assert!(drop.kind_priority() < create.kind_priority());
    }
}
