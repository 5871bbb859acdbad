use crate::command::{AlterPolicyCommand, Command, DeletePolicyCommand};
use crate::error::DeltaError;
use crate::policy::{PolicyKind, PolicyPayload};
use crate::primitives::{EntityName, EntityType, ScriptingContext};

use super::properties::read_entity_name;

fn malformed(text: &str, reason: impl Into<String>) -> DeltaError {
    DeltaError::MalformedScript {
        text: text.to_string(),
        reason: reason.into(),
    }
}

/// `.alter <entity> policy <kind> ``` <json> ``` `. The entity name may be
/// omitted on a database policy, in which case `context`'s current database
/// resolves it.
pub(super) fn parse_alter_policy(text: &str, context: &ScriptingContext) -> Result<Command, DeltaError> {
    let rest = text
        .strip_prefix(".alter ")
        .ok_or_else(|| malformed(text, "expected `.alter`"))?;
    let (entity_type, rest) = read_entity_type(text, rest)?;
    let (entity_name, rest) = read_policy_entity_name(text, rest, entity_type, context)?;
    let rest = rest
        .trim_start()
        .strip_prefix("policy")
        .ok_or_else(|| malformed(text, "expected `policy`"))?;
    let (kind_word, rest) = read_word(rest);
    let policy_kind = PolicyKind::parse_keyword(&kind_word);
    let json_text = extract_backtick_block(rest, text)?;
    let payload = PolicyPayload::parse_json(&json_text).map_err(|err| DeltaError::InvalidPolicyPayload {
        policy_kind: policy_kind.keyword().to_string(),
        reason: err.to_string(),
    })?;
    Ok(Command::AlterPolicy(AlterPolicyCommand {
        policy_kind,
        entity_type,
        entity_name,
        payload,
    }))
}

pub(super) fn parse_delete_policy(text: &str, context: &ScriptingContext) -> Result<Command, DeltaError> {
    let rest = text
        .strip_prefix(".delete ")
        .ok_or_else(|| malformed(text, "expected `.delete`"))?;
    let (entity_type, rest) = read_entity_type(text, rest)?;
    let (entity_name, rest) = read_policy_entity_name(text, rest, entity_type, context)?;
    let rest = rest
        .trim_start()
        .strip_prefix("policy")
        .ok_or_else(|| malformed(text, "expected `policy`"))?;
    let (kind_word, _rest) = read_word(rest);
    let policy_kind = PolicyKind::parse_keyword(&kind_word);
    Ok(Command::DeletePolicy(DeletePolicyCommand {
        policy_kind,
        entity_type,
        entity_name,
    }))
}

fn read_entity_type<'a>(original_text: &str, text: &'a str) -> Result<(EntityType, &'a str), DeltaError> {
    let trimmed = text.trim_start();
    if let Some(rest) = trimmed.strip_prefix("table") {
        return Ok((EntityType::Table, rest));
    }
    if let Some(rest) = trimmed.strip_prefix("database") {
        return Ok((EntityType::Database, rest));
    }
    Err(malformed(original_text, "expected `table` or `database`"))
}

/// Reads the entity name following the entity-type keyword. A database
/// policy statement may omit the name entirely (`.alter database policy
/// caching ...`), which the `ScriptingContext`'s current database resolves.
fn read_policy_entity_name<'a>(
    original_text: &str,
    rest: &'a str,
    entity_type: EntityType,
    context: &ScriptingContext,
) -> Result<(EntityName, &'a str), DeltaError> {
    let trimmed = rest.trim_start();
    if entity_type == EntityType::Database && trimmed.starts_with("policy") {
        let name = context.current_database_name.clone().ok_or_else(|| {
            DeltaError::RequiresScriptingContext {
                command: "database policy (name omitted)".to_string(),
            }
        })?;
        return Ok((name, trimmed));
    }
    read_entity_name(rest)
}

fn read_word(text: &str) -> (String, &str) {
    let trimmed = text.trim_start();
    let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
    (trimmed[..end].to_string(), &trimmed[end..])
}

fn extract_backtick_block(text: &str, original_text: &str) -> Result<String, DeltaError> {
    let start = text
        .find("```")
        .ok_or_else(|| malformed(original_text, "expected a ``` json block"))?;
    let after_open = &text[start + 3..];
    let end = after_open
        .find("```")
        .ok_or_else(|| malformed(original_text, "unterminated ``` json block"))?;
    Ok(after_open[..end].trim().to_string())
}
