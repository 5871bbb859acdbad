use crate::primitives::{EntityName, ScriptingContext, TableColumn};

use super::with_clause;

/// `.create table Name (col:type, ...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableCommand {
    pub name: EntityName,
    pub columns: Vec<TableColumn>,
    pub folder: Option<String>,
    pub doc_string: Option<String>,
}

impl CreateTableCommand {
    pub fn sort_index(&self) -> String {
        self.name.raw().to_string()
    }

    pub fn script_path(&self) -> String {
        match &self.folder {
            Some(folder) => format!("tables/create/{folder}/{}", self.name.raw()),
            None => format!("tables/create/{}", self.name.raw()),
        }
    }

    pub fn to_script(&self, _context: &ScriptingContext) -> String {
        let columns = columns_script(&self.columns);
        let mut script = format!(".create table {} ({columns})", self.name.script());
        if let Some(clause) = with_clause(&self.folder, &self.doc_string) {
            script.push(' ');
            script.push_str(&clause);
        }
        script
    }
}

pub(super) fn columns_script(columns: &[TableColumn]) -> String {
    columns
        .iter()
        .map(TableColumn::script)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Batched `.create tables` form produced by the plural batcher (§4.1):
/// several `CreateTable` payloads sharing `(folder, doc_string)` emitted as
/// one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTablesCommand {
    pub folder: Option<String>,
    pub doc_string: Option<String>,
    pub tables: Vec<(EntityName, Vec<TableColumn>)>,
}

impl CreateTablesCommand {
    pub fn sort_index(&self) -> String {
        self.tables
            .iter()
            .map(|(name, _)| name.raw())
            .min()
            .unwrap_or_default()
            .to_string()
    }

    pub fn script_path(&self) -> String {
        match &self.folder {
            Some(folder) => format!("tables/create/{folder}"),
            None => "tables/create".to_string(),
        }
    }

    pub fn to_script(&self, _context: &ScriptingContext) -> String {
        let groups = self
            .tables
            .iter()
            .map(|(name, columns)| format!("{} ({})", name.script(), columns_script(columns)))
            .collect::<Vec<_>>()
            .join(", ");
        let mut script = format!(".create tables ({groups})");
        if let Some(clause) = with_clause(&self.folder, &self.doc_string) {
            script.push(' ');
            script.push_str(&clause);
        }
        script
    }
}

/// `.create-merge table Name (col:type, ...)`: the additive column-set
/// change the delta engine prefers over drop+create (§4.4 step 4). Carries
/// the table's full target column set, not just the newly added ones.
#[derive(Debug, Clone, PartialEq)]
pub struct AlterMergeTableCommand {
    pub name: EntityName,
    pub columns: Vec<TableColumn>,
}

impl AlterMergeTableCommand {
    pub fn sort_index(&self) -> String {
        self.name.raw().to_string()
    }

    pub fn script_path(&self) -> String {
        format!("tables/create-merge/{}", self.name.raw())
    }

    pub fn to_script(&self, _context: &ScriptingContext) -> String {
        format!(
            ".create-merge table {} ({})",
            self.name.script(),
            columns_script(&self.columns)
        )
    }
}

/// `.drop table Name`.
#[derive(Debug, Clone, PartialEq)]
pub struct DropTableCommand {
    pub name: EntityName,
}

impl DropTableCommand {
    pub fn sort_index(&self) -> String {
        self.name.raw().to_string()
    }

    pub fn script_path(&self) -> String {
        format!("tables/drop/{}", self.name.raw())
    }

    pub fn to_script(&self, _context: &ScriptingContext) -> String {
        format!(".drop table {}", self.name.script())
    }
}
