use crate::policy::{PolicyKind, PolicyPayload};
use crate::primitives::{EntityName, EntityType, ScriptingContext};

/// `.alter <entity_type> <name> policy <kind> \`\`\`<json>\`\`\``. Shared by
/// all sixteen policy kinds: they differ only in `policy_kind` and the shape
/// of `payload` (§4.1).
#[derive(Debug, Clone, PartialEq)]
pub struct AlterPolicyCommand {
    pub policy_kind: PolicyKind,
    pub entity_type: EntityType,
    pub entity_name: EntityName,
    pub payload: PolicyPayload,
}

impl AlterPolicyCommand {
    pub fn sort_index(&self) -> String {
        format!(
            "{}|{}|{}",
            self.entity_type, self.entity_name, self.policy_kind
        )
    }

    pub fn script_path(&self) -> String {
        policy_script_path(self.entity_type, &self.entity_name, &self.policy_kind, "create")
    }

    pub fn to_script(&self, context: &ScriptingContext) -> String {
        format!(
            ".alter {} policy {}\n```\n{}\n```",
            entity_qualifier(self.entity_type, &self.entity_name, context),
            self.policy_kind,
            self.payload.to_script_block()
        )
    }
}

/// `.delete <entity_type> <name> policy <kind>`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletePolicyCommand {
    pub policy_kind: PolicyKind,
    pub entity_type: EntityType,
    pub entity_name: EntityName,
}

impl DeletePolicyCommand {
    pub fn sort_index(&self) -> String {
        format!(
            "{}|{}|{}",
            self.entity_type, self.entity_name, self.policy_kind
        )
    }

    pub fn script_path(&self) -> String {
        policy_script_path(self.entity_type, &self.entity_name, &self.policy_kind, "drop")
    }

    pub fn to_script(&self, context: &ScriptingContext) -> String {
        format!(
            ".delete {} policy {}",
            entity_qualifier(self.entity_type, &self.entity_name, context),
            self.policy_kind
        )
    }
}

/// Single canonical `script_path` function for policy commands, per the
/// redesign note that per-variant literal paths drift and sometimes swap
/// Table/Database cases.
fn policy_script_path(
    entity_type: EntityType,
    entity_name: &EntityName,
    policy_kind: &PolicyKind,
    action: &str,
) -> String {
    match entity_type {
        EntityType::Table => format!(
            "tables/policies/{policy_kind}/{action}/{}",
            entity_name.raw()
        ),
        EntityType::Database => format!("databases/policies/{policy_kind}/{action}"),
    }
}

/// `table Name` / `database Name`, or just `database` when `name` is the
/// scripting context's current database.
fn entity_qualifier(
    entity_type: EntityType,
    entity_name: &EntityName,
    context: &ScriptingContext,
) -> String {
    if entity_type == EntityType::Database && context.is_current_database(entity_name) {
        "database".to_string()
    } else {
        format!("{entity_type} {}", entity_name.script())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn omits_database_name_when_matches_current_context() {
        let cmd = AlterPolicyCommand {
            policy_kind: PolicyKind::Caching,
            entity_type: EntityType::Database,
            entity_name: EntityName::new("MyDb"),
            payload: PolicyPayload::from_value(json!({"DataHotSpan": "12:00:00"})),
        };
        let context = ScriptingContext::with_current_database("MyDb");
        assert!(cmd.to_script(&context).starts_with(".alter database policy caching"));

        let other_context = ScriptingContext::with_current_database("OtherDb");
        assert!(
            cmd.to_script(&other_context)
                .starts_with(".alter database MyDb policy caching")
        );
    }

    #[test]
    fn table_policy_script_path_is_distinct_from_database_policy_script_path() {
        let table_path = policy_script_path(
            EntityType::Table,
            &EntityName::new("T"),
            &PolicyKind::Retention,
            "create",
        );
        let database_path =
            policy_script_path(EntityType::Database, &EntityName::new("T"), &PolicyKind::Retention, "create");
        assert_eq!(table_path, "tables/policies/retention/create/T");
        assert_eq!(database_path, "databases/policies/retention/create");
    }
}
