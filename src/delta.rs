use crate::command::{
    AlterMergeTableCommand, AlterPolicyCommand, Command, CreateFunctionCommand,
    CreateMappingCommand, CreateTableCommand, CreateTablesCommand, DeletePolicyCommand,
    DropFunctionCommand, DropMappingCommand, DropTableCommand,
};
use crate::model::DatabaseModel;
use crate::primitives::TableColumn;

/// Computes the ordered command sequence that drives `current` to `target`:
/// pairwise alignment of the two models by entity key, emitting drop/create/
/// alter commands in dependency-safe order. Pure: never fails, never
/// mutates either input. `compute_delta(m, m)` is always empty (§8 property
/// 3).
#[tracing::instrument(level = "debug", skip_all, fields(
    current_tables = current.tables.len(),
    target_tables = target.tables.len(),
))]
pub fn compute_delta(current: &DatabaseModel, target: &DatabaseModel) -> Vec<Command> {
    let mut commands = Vec::new();

    drop_functions(current, target, &mut commands);
    drop_mappings(current, target, &mut commands);
    drop_tables(current, target, &mut commands);

    let mut create_table_commands = Vec::new();
    create_or_alter_tables(current, target, &mut create_table_commands);
    sort_by_index(&mut create_table_commands);
    commands.extend(batch_create_tables(create_table_commands));

    policy_deltas(current, target, &mut commands);
    create_mappings(current, target, &mut commands);
    create_functions(current, target, &mut commands);

    tracing::debug!(command_count = commands.len(), "computed delta");
    commands
}

fn sort_by_index(commands: &mut [Command]) {
    commands.sort_by(|a, b| {
        a.sort_index()
            .cmp(&b.sort_index())
            .then(a.kind_priority().cmp(&b.kind_priority()))
    });
}

fn drop_functions(current: &DatabaseModel, target: &DatabaseModel, out: &mut Vec<Command>) {
    let mut commands: Vec<Command> = current
        .functions
        .keys()
        .filter(|name| !target.functions.contains_key(*name))
        .map(|name| Command::DropFunction(DropFunctionCommand { name: name.clone() }))
        .collect();
    sort_by_index(&mut commands);
    out.extend(commands);
}

fn drop_mappings(current: &DatabaseModel, target: &DatabaseModel, out: &mut Vec<Command>) {
    let mut commands: Vec<Command> = current
        .mappings
        .keys()
        .filter(|key| !target.mappings.contains_key(*key))
        .map(|(table, name, kind)| {
            Command::DropMapping(DropMappingCommand {
                table: table.clone(),
                name: name.clone(),
                kind: kind.clone(),
            })
        })
        .collect();
    sort_by_index(&mut commands);
    out.extend(commands);
}

fn drop_tables(current: &DatabaseModel, target: &DatabaseModel, out: &mut Vec<Command>) {
    let mut commands: Vec<Command> = current
        .tables
        .keys()
        .filter(|name| !target.tables.contains_key(*name))
        .map(|name| Command::DropTable(DropTableCommand { name: name.clone() }))
        .collect();
    sort_by_index(&mut commands);
    out.extend(commands);
}

fn create_or_alter_tables(current: &DatabaseModel, target: &DatabaseModel, out: &mut Vec<Command>) {
    for (name, target_spec) in &target.tables {
        match current.tables.get(name) {
            None => out.push(Command::CreateTable(CreateTableCommand {
                name: name.clone(),
                columns: target_spec.columns.clone(),
                folder: target_spec.folder.clone(),
                doc_string: target_spec.doc_string.clone(),
            })),
            Some(current_spec) => {
                if current_spec == target_spec {
                    continue;
                }
                let additive = is_additive_column_change(&current_spec.columns, &target_spec.columns);
                match additive {
                    true if current_spec.folder == target_spec.folder
                        && current_spec.doc_string == target_spec.doc_string =>
                    {
                        out.push(Command::AlterMergeTable(AlterMergeTableCommand {
                            name: name.clone(),
                            columns: target_spec.columns.clone(),
                        }));
                    }
                    _ => {
                        out.push(Command::DropTable(DropTableCommand { name: name.clone() }));
                        out.push(Command::CreateTable(CreateTableCommand {
                            name: name.clone(),
                            columns: target_spec.columns.clone(),
                            folder: target_spec.folder.clone(),
                            doc_string: target_spec.doc_string.clone(),
                        }));
                    }
                }
            }
        }
    }
}

/// `true` when `target` is `current` plus new columns with no type changes
/// to shared names; `false` when the change is breaking (renamed/retyped/
/// removed column) and must become drop+create, or when there's no column
/// change at all.
fn is_additive_column_change(current: &[TableColumn], target: &[TableColumn]) -> bool {
    for current_column in current {
        match target.iter().find(|c| c.name == current_column.name) {
            Some(target_column) if target_column.column_type == current_column.column_type => {}
            _ => return false,
        }
    }
    target.len() > current.len()
}

/// Post-pass (§4.1): groups `CreateTable`s by `(folder, doc_string)` into a
/// single `CreateTables` per group when more than one table shares a group,
/// preserving `sort_index` order within the group and across the stage.
fn batch_create_tables(commands: Vec<Command>) -> Vec<Command> {
    let mut out = Vec::new();
    let mut index = 0;
    while index < commands.len() {
        let Command::CreateTable(first) = &commands[index] else {
            out.push(commands[index].clone());
            index += 1;
            continue;
        };
        let group_key = (first.folder.clone(), first.doc_string.clone());
        let mut group = vec![(first.name.clone(), first.columns.clone())];
        let mut next = index + 1;
        while let Some(Command::CreateTable(candidate)) = commands.get(next) {
            if (candidate.folder.clone(), candidate.doc_string.clone()) != group_key {
                break;
            }
            group.push((candidate.name.clone(), candidate.columns.clone()));
            next += 1;
        }
        if group.len() > 1 {
            out.push(Command::CreateTables(CreateTablesCommand {
                folder: group_key.0,
                doc_string: group_key.1,
                tables: group,
            }));
        } else {
            out.push(commands[index].clone());
        }
        index = next;
    }
    out
}

fn policy_deltas(current: &DatabaseModel, target: &DatabaseModel, out: &mut Vec<Command>) {
    let mut commands = Vec::new();

    for key in current.entity_policies.keys() {
        if !target.entity_policies.contains_key(key) {
            let (entity_type, entity_name, policy_kind) = key.clone();
            commands.push(Command::DeletePolicy(DeletePolicyCommand {
                policy_kind,
                entity_type,
                entity_name,
            }));
        }
    }

    for (key, target_payload) in &target.entity_policies {
        let emit = match current.entity_policies.get(key) {
            None => true,
            Some(current_payload) => current_payload != target_payload,
        };
        if emit {
            let (entity_type, entity_name, policy_kind) = key.clone();
            commands.push(Command::AlterPolicy(AlterPolicyCommand {
                policy_kind,
                entity_type,
                entity_name,
                payload: target_payload.clone(),
            }));
        }
    }

    sort_by_index(&mut commands);
    out.extend(commands);
}

fn create_mappings(current: &DatabaseModel, target: &DatabaseModel, out: &mut Vec<Command>) {
    let mut commands: Vec<Command> = target
        .mappings
        .iter()
        .filter(|entry| {
            let (key, spec) = *entry;
            current.mappings.get(key) != Some(spec)
        })
        .map(|((table, name, kind), spec)| {
            Command::CreateMapping(CreateMappingCommand {
                table: table.clone(),
                name: name.clone(),
                kind: kind.clone(),
                mapping_json: spec.mapping_json.clone(),
                remove_oldest_if_required: spec.remove_oldest_if_required,
            })
        })
        .collect();
    sort_by_index(&mut commands);
    out.extend(commands);
}

fn create_functions(current: &DatabaseModel, target: &DatabaseModel, out: &mut Vec<Command>) {
    let mut commands: Vec<Command> = target
        .functions
        .iter()
        .filter(|entry| {
            let (name, spec) = *entry;
            current.functions.get(name) != Some(spec)
        })
        .map(|(name, spec)| {
            Command::CreateFunction(CreateFunctionCommand {
                name: name.clone(),
                parameters: spec.parameters.clone(),
                body: spec.body.clone(),
                folder: spec.folder.clone(),
                doc_string: spec.doc_string.clone(),
            })
        })
        .collect();
    sort_by_index(&mut commands);
    out.extend(commands);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MappingSpec, TableSpec};
    use crate::policy::{CachingPolicyPayload, PolicyKind};
    use crate::primitives::{EntityName, EntityType, ScriptingContext};
    use chrono::Duration;

    fn table_model(columns: Vec<TableColumn>) -> DatabaseModel {
        let mut model = DatabaseModel::new();
        model.tables.insert(
            EntityName::new("T"),
            TableSpec {
                columns,
                folder: None,
                doc_string: None,
            },
        );
        model
    }

    #[test]
    fn empty_delta_for_identical_models() {
        let model = table_model(vec![TableColumn::new("a", "int")]);
        assert!(compute_delta(&model, &model).is_empty());
    }

    #[test]
    fn s1_caching_none_to_one_emits_single_alter() {
        let current = table_model(vec![TableColumn::new("a", "int")]);
        let mut target = current.clone();
        target.entity_policies.insert(
            (EntityType::Table, EntityName::new("T"), PolicyKind::Caching),
            CachingPolicyPayload {
                hot_data: Some(Duration::hours(12)),
                hot_index: None,
                hot_windows: vec![],
            }
            .to_payload(),
        );

        let delta = compute_delta(&current, &target);
        assert_eq!(delta.len(), 1);
        assert!(matches!(delta[0], Command::AlterPolicy(_)));
    }

    #[test]
    fn s2_caching_one_to_none_emits_single_delete() {
        let mut current = table_model(vec![TableColumn::new("a", "int")]);
        current.entity_policies.insert(
            (EntityType::Table, EntityName::new("T"), PolicyKind::Caching),
            CachingPolicyPayload {
                hot_data: Some(Duration::hours(12)),
                hot_index: None,
                hot_windows: vec![],
            }
            .to_payload(),
        );
        let target = table_model(vec![TableColumn::new("a", "int")]);

        let delta = compute_delta(&current, &target);
        assert_eq!(delta.len(), 1);
        assert!(matches!(delta[0], Command::DeletePolicy(_)));
    }

    #[test]
    fn s3_unchanged_caching_emits_nothing() {
        let mut current = table_model(vec![TableColumn::new("a", "int")]);
        current.entity_policies.insert(
            (EntityType::Table, EntityName::new("T"), PolicyKind::Caching),
            CachingPolicyPayload {
                hot_data: Some(Duration::milliseconds(45)),
                hot_index: None,
                hot_windows: vec![],
            }
            .to_payload(),
        );
        let target = current.clone();
        assert!(compute_delta(&current, &target).is_empty());
    }

    #[test]
    fn s4_column_add_emits_single_create_merge() {
        let current = table_model(vec![TableColumn::new("a", "int")]);
        let target = table_model(vec![TableColumn::new("a", "int"), TableColumn::new("b", "string")]);

        let delta = compute_delta(&current, &target);
        assert_eq!(delta.len(), 1);
        match &delta[0] {
            Command::AlterMergeTable(cmd) => {
                assert_eq!(
                    cmd.columns,
                    vec![TableColumn::new("a", "int"), TableColumn::new("b", "string")]
                );
                assert_eq!(
                    cmd.to_script(&ScriptingContext::default()),
                    ".create-merge table T (a:int, b:string)"
                );
            }
            other => panic!("expected AlterMergeTable, got {other:?}"),
        }
    }

    #[test]
    fn s5_drop_table_cascades_mapping_drop_before_table_drop() {
        let mut current = table_model(vec![TableColumn::new("a", "int")]);
        current.mappings.insert(
            (EntityName::new("T"), EntityName::new("M"), "json".to_string()),
            MappingSpec {
                mapping_json: "[]".to_string(),
                remove_oldest_if_required: None,
            },
        );
        let target = DatabaseModel::new();

        let delta = compute_delta(&current, &target);
        let mapping_index = delta
            .iter()
            .position(|c| matches!(c, Command::DropMapping(_)))
            .expect("drop mapping present");
        let table_index = delta
            .iter()
            .position(|c| matches!(c, Command::DropTable(_)))
            .expect("drop table present");
        assert!(mapping_index < table_index);
    }

    #[test]
    fn s6_policy_on_new_table_is_ordered_after_create_table() {
        let current = DatabaseModel::new();
        let mut target = table_model(vec![TableColumn::new("a", "int")]);
        target.entity_policies.insert(
            (EntityType::Table, EntityName::new("T"), PolicyKind::Retention),
            CachingPolicyPayload {
                hot_data: Some(Duration::hours(1)),
                hot_index: None,
                hot_windows: vec![],
            }
            .to_payload(),
        );

        let delta = compute_delta(&current, &target);
        let create_index = delta
            .iter()
            .position(|c| matches!(c, Command::CreateTable(_)))
            .expect("create table present");
        let policy_index = delta
            .iter()
            .position(|c| matches!(c, Command::AlterPolicy(_)))
            .expect("alter policy present");
        assert!(create_index < policy_index);
    }

    #[test]
    fn breaking_column_type_change_becomes_drop_then_create() {
        let current = table_model(vec![TableColumn::new("a", "int")]);
        let target = table_model(vec![TableColumn::new("a", "string")]);

        let delta = compute_delta(&current, &target);
        assert_eq!(delta.len(), 2);
        assert!(matches!(delta[0], Command::DropTable(_)));
        assert!(matches!(delta[1], Command::CreateTable(_)));
    }

    #[test]
    fn reachability_applying_the_delta_reaches_target() {
        let current = table_model(vec![TableColumn::new("a", "int")]);
        let mut target = table_model(vec![TableColumn::new("a", "int"), TableColumn::new("b", "string")]);
        target.entity_policies.insert(
            (EntityType::Table, EntityName::new("T"), PolicyKind::Caching),
            CachingPolicyPayload {
                hot_data: Some(Duration::hours(1)),
                hot_index: None,
                hot_windows: vec![],
            }
            .to_payload(),
        );

        let delta = compute_delta(&current, &target);
        let mut applied = current.clone();
        for command in &delta {
            applied.apply(command).expect("apply delta command");
        }
        assert_eq!(applied, target);
    }

    #[test]
    fn plural_batching_groups_same_folder_tables() {
        let current = DatabaseModel::new();
        let mut target = DatabaseModel::new();
        for name in ["A", "B"] {
            target.tables.insert(
                EntityName::new(name),
                TableSpec {
                    columns: vec![TableColumn::new("x", "int")],
                    folder: Some("Shared".to_string()),
                    doc_string: None,
                },
            );
        }

        let delta = compute_delta(&current, &target);
        assert_eq!(delta.len(), 1);
        assert!(matches!(delta[0], Command::CreateTables(_)));
    }
}
