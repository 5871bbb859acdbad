use crate::primitives::{EntityName, ScriptingContext};

use super::with_clause;

/// `.create function Name(params) { body }`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateFunctionCommand {
    pub name: EntityName,
    pub parameters: String,
    pub body: String,
    pub folder: Option<String>,
    pub doc_string: Option<String>,
}

impl CreateFunctionCommand {
    pub fn sort_index(&self) -> String {
        self.name.raw().to_string()
    }

    pub fn script_path(&self) -> String {
        match &self.folder {
            Some(folder) => format!("functions/create/{folder}/{}", self.name.raw()),
            None => format!("functions/create/{}", self.name.raw()),
        }
    }

    pub fn to_script(&self, _context: &ScriptingContext) -> String {
        let mut script = format!(
            ".create function {}({}) {{ {} }}",
            self.name.script(),
            self.parameters,
            self.body
        );
        if let Some(clause) = with_clause(&self.folder, &self.doc_string) {
            script.push(' ');
            script.push_str(&clause);
        }
        script
    }
}

/// `.drop function Name`.
#[derive(Debug, Clone, PartialEq)]
pub struct DropFunctionCommand {
    pub name: EntityName,
}

impl DropFunctionCommand {
    pub fn sort_index(&self) -> String {
        self.name.raw().to_string()
    }

    pub fn script_path(&self) -> String {
        format!("functions/drop/{}", self.name.raw())
    }

    pub fn to_script(&self, _context: &ScriptingContext) -> String {
        format!(".drop function {}", self.name.script())
    }
}
