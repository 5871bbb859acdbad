use std::collections::BTreeMap;

use crate::command::Command;
use crate::primitives::ScriptingContext;

/// Joins every command's `to_script` output with a blank line, the
/// delta-kusto convention for a single-file script.
pub fn emit_script(commands: &[Command], context: &ScriptingContext) -> String {
    commands
        .iter()
        .map(|command| command.to_script(context))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Groups commands by `script_path`, producing the `<root>/<script_path>.kql`
/// layout described in §6. Commands sharing a `script_path` (e.g. batched
/// plural forms already collapsed, or two policies on the same table and
/// kind that the caller passed in raw) are joined in the order given.
pub fn emit_script_files(
    commands: &[Command],
    context: &ScriptingContext,
) -> BTreeMap<String, String> {
    let mut files: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for command in commands {
        files
            .entry(format!("{}.kql", command.script_path()))
            .or_default()
            .push(command.to_script(context));
    }
    files
        .into_iter()
        .map(|(path, scripts)| (path, scripts.join("\n\n")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CreateTableCommand, DropTableCommand};
    use crate::primitives::{EntityName, TableColumn};

    #[test]
    fn single_script_joins_commands_with_blank_line() {
        let commands = vec![
            Command::DropTable(DropTableCommand {
                name: EntityName::new("Old"),
            }),
            Command::CreateTable(CreateTableCommand {
                name: EntityName::new("New"),
                columns: vec![TableColumn::new("a", "int")],
                folder: None,
                doc_string: None,
            }),
        ];
        let script = emit_script(&commands, &ScriptingContext::default());
        assert_eq!(script, ".drop table Old\n\n.create table New (a:int)");
    }

    #[test]
    fn multi_file_layout_keys_by_script_path() {
        let commands = vec![Command::CreateTable(CreateTableCommand {
            name: EntityName::new("New"),
            columns: vec![],
            folder: None,
            doc_string: None,
        })];
        let files = emit_script_files(&commands, &ScriptingContext::default());
        assert_eq!(files.len(), 1);
        assert!(files.contains_key("tables/create/New.kql"));
    }
}
