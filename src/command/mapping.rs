use crate::primitives::{EntityName, QuotedText, ScriptingContext};

/// `.create table Table ingestion Kind mapping "Name" '<json>'`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateMappingCommand {
    pub table: EntityName,
    pub name: EntityName,
    pub kind: String,
    pub mapping_json: String,
    pub remove_oldest_if_required: Option<bool>,
}

impl CreateMappingCommand {
    pub fn sort_index(&self) -> String {
        format!("{}|{}|{}", self.table.raw(), self.kind, self.name.raw())
    }

    pub fn script_path(&self) -> String {
        format!("tables/ingestion-mappings/create/{}", self.table.raw())
    }

    pub fn to_script(&self, _context: &ScriptingContext) -> String {
        let mut script = format!(
            ".create table {} ingestion {} mapping {} '{}'",
            self.table.script(),
            self.kind,
            QuotedText::new(self.name.raw()).script(),
            self.mapping_json
        );
        if let Some(remove_oldest) = self.remove_oldest_if_required {
            script.push_str(&format!(" with (removeOldestIfRequired={remove_oldest})"));
        }
        script
    }
}

/// `.drop table Table ingestion Kind mapping "Name"`.
#[derive(Debug, Clone, PartialEq)]
pub struct DropMappingCommand {
    pub table: EntityName,
    pub name: EntityName,
    pub kind: String,
}

impl DropMappingCommand {
    pub fn sort_index(&self) -> String {
        format!("{}|{}|{}", self.table.raw(), self.kind, self.name.raw())
    }

    pub fn script_path(&self) -> String {
        format!("tables/ingestion-mappings/drop/{}", self.table.raw())
    }

    pub fn to_script(&self, _context: &ScriptingContext) -> String {
        format!(
            ".drop table {} ingestion {} mapping {}",
            self.table.script(),
            self.kind,
            QuotedText::new(self.name.raw()).script()
        )
    }
}
