use std::collections::BTreeMap;

use crate::command::Command;
use crate::error::DeltaError;
use crate::policy::{PolicyKind, PolicyPayload};
use crate::primitives::{EntityName, EntityType, TableColumn};

/// Folded shape of a `.create table` (plus any subsequent `.create-merge`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableSpec {
    pub columns: Vec<TableColumn>,
    pub folder: Option<String>,
    pub doc_string: Option<String>,
}

/// Folded shape of a `.create function`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionSpec {
    pub parameters: String,
    pub body: String,
    pub folder: Option<String>,
    pub doc_string: Option<String>,
}

/// Folded shape of a `.create table ... ingestion ... mapping`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingSpec {
    pub mapping_json: String,
    pub remove_oldest_if_required: Option<bool>,
}

/// `(table, mapping name, mapping kind)`.
pub type MappingKey = (EntityName, EntityName, String);

/// `(entity type, entity name, policy kind)`.
pub type PolicyKey = (EntityType, EntityName, PolicyKind);

/// The canonical state reached by folding a command sequence under
/// last-wins semantics, keyed by `BTreeMap` for deterministic iteration.
/// Two models built from scripts that differ only in command order, or in
/// drop/recreate churn on the same entity, compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatabaseModel {
    pub tables: BTreeMap<EntityName, TableSpec>,
    pub functions: BTreeMap<EntityName, FunctionSpec>,
    pub mappings: BTreeMap<MappingKey, MappingSpec>,
    pub entity_policies: BTreeMap<PolicyKey, PolicyPayload>,
}

impl DatabaseModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a command sequence into a model under last-wins semantics
    /// (§4.3). Fails fast on the first command that references a missing
    /// entity.
    #[tracing::instrument(level = "debug", skip_all, fields(command_count = commands.len()))]
    pub fn from_commands(commands: &[Command]) -> Result<Self, DeltaError> {
        let mut model = Self::new();
        for command in commands {
            model.fold(command)?;
        }
        tracing::debug!(
            tables = model.tables.len(),
            functions = model.functions.len(),
            mappings = model.mappings.len(),
            policies = model.entity_policies.len(),
            "folded command stream"
        );
        Ok(model)
    }

    /// Applies one command to this model under the same fold rules used by
    /// `from_commands`. Used by callers replaying a computed delta, and by
    /// the reachability property test in `delta.rs`.
    pub fn apply(&mut self, command: &Command) -> Result<(), DeltaError> {
        self.fold(command)
    }

    fn fold(&mut self, command: &Command) -> Result<(), DeltaError> {
        match command {
            Command::CreateTable(cmd) => {
                self.tables.insert(
                    cmd.name.clone(),
                    TableSpec {
                        columns: cmd.columns.clone(),
                        folder: cmd.folder.clone(),
                        doc_string: cmd.doc_string.clone(),
                    },
                );
            }
            Command::CreateTables(cmd) => {
                for (name, columns) in &cmd.tables {
                    self.tables.insert(
                        name.clone(),
                        TableSpec {
                            columns: columns.clone(),
                            folder: cmd.folder.clone(),
                            doc_string: cmd.doc_string.clone(),
                        },
                    );
                }
            }
            Command::AlterMergeTable(cmd) => {
                let spec = self.tables.entry(cmd.name.clone()).or_default();
                spec.columns = cmd.columns.clone();
            }
            Command::DropTable(cmd) => {
                self.tables.remove(&cmd.name);
                self.mappings.retain(|(table, _, _), _| table != &cmd.name);
            }
            Command::CreateFunction(cmd) => {
                self.functions.insert(
                    cmd.name.clone(),
                    FunctionSpec {
                        parameters: cmd.parameters.clone(),
                        body: cmd.body.clone(),
                        folder: cmd.folder.clone(),
                        doc_string: cmd.doc_string.clone(),
                    },
                );
            }
            Command::DropFunction(cmd) => {
                self.functions.remove(&cmd.name);
            }
            Command::CreateMapping(cmd) => {
                if !self.tables.contains_key(&cmd.table) {
                    return Err(DeltaError::MissingTableForMapping {
                        table: cmd.table.raw().to_string(),
                        mapping: cmd.name.raw().to_string(),
                    });
                }
                self.mappings.insert(
                    (cmd.table.clone(), cmd.name.clone(), cmd.kind.clone()),
                    MappingSpec {
                        mapping_json: cmd.mapping_json.clone(),
                        remove_oldest_if_required: cmd.remove_oldest_if_required,
                    },
                );
            }
            Command::DropMapping(cmd) => {
                self.mappings
                    .remove(&(cmd.table.clone(), cmd.name.clone(), cmd.kind.clone()));
            }
            Command::AlterPolicy(cmd) => {
                if cmd.entity_type == EntityType::Table && !self.tables.contains_key(&cmd.entity_name)
                {
                    return Err(DeltaError::MissingTableForPolicy {
                        entity: cmd.entity_name.raw().to_string(),
                        policy_kind: cmd.policy_kind.keyword().to_string(),
                    });
                }
                self.entity_policies.insert(
                    (cmd.entity_type, cmd.entity_name.clone(), cmd.policy_kind.clone()),
                    cmd.payload.clone(),
                );
            }
            Command::DeletePolicy(cmd) => {
                self.entity_policies.remove(&(
                    cmd.entity_type,
                    cmd.entity_name.clone(),
                    cmd.policy_kind.clone(),
                ));
            }
        }
        Ok(())
    }
}
