mod policy;
mod properties;

use std::collections::BTreeMap;

use crate::command::{
    AlterMergeTableCommand, Command, CreateFunctionCommand, CreateMappingCommand,
    CreateTableCommand, CreateTablesCommand, DropFunctionCommand, DropMappingCommand,
    DropTableCommand,
};
use crate::error::DeltaError;
use crate::primitives::{EntityName, QuotedText, ScriptingContext, TableColumn};

use properties::{find_unescaped_quote, parse_properties, read_entity_name, split_with_clause};

type Factory = fn(&str, &ScriptingContext) -> Result<Command, DeltaError>;

// Matched by longest header prefix, ties broken by the declared priority.
const REGISTRY: &[(&str, Factory, i32)] = &[
    (".create-merge table", parse_create_merge_table, 4),
    (".create tables", parse_create_tables, 3),
    (".create table", parse_create_table_or_mapping, 3),
    (".drop table", parse_drop_table_or_mapping, 2),
    (".create function", parse_create_function, 7),
    (".drop function", parse_drop_function, 0),
    (".alter table", policy::parse_alter_policy, 5),
    (".alter database", policy::parse_alter_policy, 5),
    (".delete table", policy::parse_delete_policy, 5),
    (".delete database", policy::parse_delete_policy, 5),
];

fn malformed(text: &str, reason: impl Into<String>) -> DeltaError {
    DeltaError::MalformedScript {
        text: text.to_string(),
        reason: reason.into(),
    }
}

/// Rejects any property key outside `allowed` (`folder`/`docstring` on the
/// create-table family, `removeoldestifrequired` on create-mapping; §4.2).
fn validate_properties(
    command: &str,
    props: &BTreeMap<String, String>,
    allowed: &[&str],
) -> Result<(), DeltaError> {
    for key in props.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(DeltaError::UnknownProperty {
                command: command.to_string(),
                property: key.clone(),
            });
        }
    }
    Ok(())
}

const FOLDER_DOCSTRING_PROPERTIES: &[&str] = &["folder", "docstring"];
const MAPPING_PROPERTIES: &[&str] = &["removeoldestifrequired"];

/// Parses a whole control script into an ordered sequence of [`Command`]
/// values (§4.2): splits on statement boundaries, then dispatches each
/// statement to the registered factory whose header it matches. `context`
/// resolves database-policy statements that omit the database name.
#[tracing::instrument(level = "debug", skip_all, fields(script_len = script.len()))]
pub fn parse_script(script: &str, context: &ScriptingContext) -> Result<Vec<Command>, DeltaError> {
    let statements = split_statements(script);
    tracing::debug!(statement_count = statements.len(), "split script into statements");
    statements
        .iter()
        .map(|statement| parse_statement(statement, context))
        .collect()
}

fn parse_statement(text: &str, context: &ScriptingContext) -> Result<Command, DeltaError> {
    let best = REGISTRY
        .iter()
        .filter(|(header, _, _)| text.starts_with(header))
        .max_by(|a, b| a.0.len().cmp(&b.0.len()).then(b.2.cmp(&a.2)));
    match best {
        Some((_, factory, _)) => factory(text, context),
        None => Err(DeltaError::UnsupportedCommand {
            text: text.to_string(),
        }),
    }
}

/// Splits a script into individual statements on top-level `;` or blank
/// lines, tracking `` ` `` `` ` `` `` ` `` fenced blocks and quoted strings so
/// separators inside them don't split a statement in half.
fn split_statements(script: &str) -> Vec<String> {
    let chars: Vec<char> = script.chars().collect();
    let mut statements = Vec::new();
    let mut start = 0usize;
    let mut index = 0usize;
    let mut in_double = false;
    let mut in_single = false;
    let mut in_triple = false;

    while index < chars.len() {
        let c = chars[index];
        if in_triple {
            if c == '`' && chars.get(index + 1) == Some(&'`') && chars.get(index + 2) == Some(&'`') {
                in_triple = false;
                index += 3;
            } else {
                index += 1;
            }
            continue;
        }
        if in_double {
            if c == '\\' {
                index += 2;
            } else {
                if c == '"' {
                    in_double = false;
                }
                index += 1;
            }
            continue;
        }
        if in_single {
            if c == '\\' {
                index += 2;
            } else {
                if c == '\'' {
                    in_single = false;
                }
                index += 1;
            }
            continue;
        }
        if c == '`' && chars.get(index + 1) == Some(&'`') && chars.get(index + 2) == Some(&'`') {
            in_triple = true;
            index += 3;
            continue;
        }
        if c == '"' {
            in_double = true;
            index += 1;
            continue;
        }
        if c == '\'' {
            in_single = true;
            index += 1;
            continue;
        }
        if c == ';' {
            statements.push(chars[start..index].iter().collect::<String>());
            index += 1;
            start = index;
            continue;
        }
        if c == '\n' && chars.get(index + 1) == Some(&'\n') {
            statements.push(chars[start..index].iter().collect::<String>());
            index += 1;
            while chars.get(index) == Some(&'\n') {
                index += 1;
            }
            start = index;
            continue;
        }
        index += 1;
    }
    statements.push(chars[start..].iter().collect::<String>());

    statements
        .into_iter()
        .map(|statement| statement.trim().to_string())
        .filter(|statement| !statement.is_empty())
        .collect()
}

/// Splits `text` on top-level occurrences of `sep`, treating `(`/`)` as
/// depth brackets so a comma inside a nested column list doesn't end a
/// group early.
fn split_top_level(text: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            c if c == sep && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}

fn parse_column_list(text: &str, original_text: &str) -> Result<Vec<TableColumn>, DeltaError> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| malformed(original_text, "expected a parenthesized column list"))?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    split_top_level(inner, ',')
        .into_iter()
        .map(|entry| {
            let mut parts = entry.splitn(2, ':');
            let name_part = parts
                .next()
                .ok_or_else(|| malformed(original_text, "expected a column name"))?;
            let type_part = parts
                .next()
                .ok_or_else(|| malformed(original_text, "expected a column type"))?;
            let (name, _) = read_entity_name(name_part)?;
            Ok(TableColumn::new(name, type_part.trim().to_string()))
        })
        .collect()
}

fn parse_create_table_or_mapping(text: &str, _context: &ScriptingContext) -> Result<Command, DeltaError> {
    let rest = text
        .strip_prefix(".create table ")
        .ok_or_else(|| malformed(text, "expected `.create table`"))?;
    let (name, remainder) = read_entity_name(rest)?;
    if let Some(after_ingestion) = remainder.trim_start().strip_prefix("ingestion ") {
        return parse_create_mapping_tail(text, name, after_ingestion);
    }
    let (head, with_props) = split_with_clause(remainder);
    let columns = parse_column_list(head, text)?;
    let props = with_props.map(parse_properties).unwrap_or_default();
    validate_properties(".create table", &props, FOLDER_DOCSTRING_PROPERTIES)?;
    Ok(Command::CreateTable(CreateTableCommand {
        name,
        columns,
        folder: props.get("folder").cloned(),
        doc_string: props.get("docstring").cloned(),
    }))
}

fn parse_create_tables(text: &str, _context: &ScriptingContext) -> Result<Command, DeltaError> {
    let rest = text
        .strip_prefix(".create tables ")
        .ok_or_else(|| malformed(text, "expected `.create tables`"))?;
    let (head, with_props) = split_with_clause(rest);
    let inner = head
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| malformed(text, "expected a parenthesized table list"))?;

    let mut tables = Vec::new();
    for group in split_top_level(inner, ',') {
        let group = group.trim();
        if group.is_empty() {
            continue;
        }
        let (name, remainder) = read_entity_name(group)?;
        let columns = parse_column_list(remainder, text)?;
        tables.push((name, columns));
    }

    let props = with_props.map(parse_properties).unwrap_or_default();
    validate_properties(".create tables", &props, FOLDER_DOCSTRING_PROPERTIES)?;
    Ok(Command::CreateTables(CreateTablesCommand {
        folder: props.get("folder").cloned(),
        doc_string: props.get("docstring").cloned(),
        tables,
    }))
}

fn parse_create_merge_table(text: &str, _context: &ScriptingContext) -> Result<Command, DeltaError> {
    let rest = text
        .strip_prefix(".create-merge table ")
        .ok_or_else(|| malformed(text, "expected `.create-merge table`"))?;
    let (name, remainder) = read_entity_name(rest)?;
    let columns = parse_column_list(remainder, text)?;
    Ok(Command::AlterMergeTable(AlterMergeTableCommand { name, columns }))
}

fn parse_drop_table_or_mapping(text: &str, _context: &ScriptingContext) -> Result<Command, DeltaError> {
    let rest = text
        .strip_prefix(".drop table ")
        .ok_or_else(|| malformed(text, "expected `.drop table`"))?;
    let (name, remainder) = read_entity_name(rest)?;
    if let Some(after_ingestion) = remainder.trim_start().strip_prefix("ingestion ") {
        let (kind, rest) = read_word(after_ingestion);
        let rest = rest
            .trim_start()
            .strip_prefix("mapping")
            .ok_or_else(|| malformed(text, "expected `mapping`"))?;
        let (mapping_name, _rest) = read_quoted_literal(rest, text)?;
        return Ok(Command::DropMapping(DropMappingCommand {
            table: name,
            name: EntityName::new(mapping_name),
            kind,
        }));
    }
    Ok(Command::DropTable(DropTableCommand { name }))
}

fn parse_create_mapping_tail(
    original_text: &str,
    table: EntityName,
    rest: &str,
) -> Result<Command, DeltaError> {
    let (kind, rest) = read_word(rest);
    let rest = rest
        .trim_start()
        .strip_prefix("mapping")
        .ok_or_else(|| malformed(original_text, "expected `mapping`"))?;
    let (mapping_name, rest) = read_quoted_literal(rest, original_text)?;
    let (head, with_props) = split_with_clause(rest);
    let mapping_json = extract_single_quoted_block(head, original_text)?;
    let props = with_props.map(parse_properties).unwrap_or_default();
    validate_properties(".create table ingestion mapping", &props, MAPPING_PROPERTIES)?;
    let remove_oldest_if_required = props
        .get("removeoldestifrequired")
        .map(|value| value.eq_ignore_ascii_case("true"));
    Ok(Command::CreateMapping(CreateMappingCommand {
        table,
        name: EntityName::new(mapping_name),
        kind,
        mapping_json,
        remove_oldest_if_required,
    }))
}

fn parse_create_function(text: &str, _context: &ScriptingContext) -> Result<Command, DeltaError> {
    let rest = text
        .strip_prefix(".create function ")
        .ok_or_else(|| malformed(text, "expected `.create function`"))?;
    let (head, with_props) = split_with_clause(rest);
    let (name, remainder) = read_entity_name(head)?;
    let trimmed = remainder.trim_start();
    let after_open_paren = trimmed
        .strip_prefix('(')
        .ok_or_else(|| malformed(text, "expected `(` after function name"))?;
    let close_paren = after_open_paren
        .find(')')
        .ok_or_else(|| malformed(text, "expected `)` after parameters"))?;
    let parameters = after_open_paren[..close_paren].trim().to_string();

    let after_params = after_open_paren[close_paren + 1..].trim_start();
    let after_open_brace = after_params
        .strip_prefix('{')
        .ok_or_else(|| malformed(text, "expected `{` to open the function body"))?;
    let close_brace = after_open_brace
        .rfind('}')
        .ok_or_else(|| malformed(text, "expected `}` to close the function body"))?;
    let body = after_open_brace[..close_brace].trim().to_string();

    let props = with_props.map(parse_properties).unwrap_or_default();
    validate_properties(".create function", &props, FOLDER_DOCSTRING_PROPERTIES)?;
    Ok(Command::CreateFunction(CreateFunctionCommand {
        name,
        parameters,
        body,
        folder: props.get("folder").cloned(),
        doc_string: props.get("docstring").cloned(),
    }))
}

fn parse_drop_function(text: &str, _context: &ScriptingContext) -> Result<Command, DeltaError> {
    let rest = text
        .strip_prefix(".drop function ")
        .ok_or_else(|| malformed(text, "expected `.drop function`"))?;
    let (name, _rest) = read_entity_name(rest)?;
    Ok(Command::DropFunction(DropFunctionCommand { name }))
}

fn read_word(text: &str) -> (String, &str) {
    let trimmed = text.trim_start();
    let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
    (trimmed[..end].to_string(), &trimmed[end..])
}

fn read_quoted_literal<'a>(text: &'a str, original_text: &str) -> Result<(String, &'a str), DeltaError> {
    let trimmed = text.trim_start();
    let after_quote = trimmed
        .strip_prefix('"')
        .ok_or_else(|| malformed(original_text, "expected a quoted name"))?;
    let end = find_unescaped_quote(after_quote)
        .ok_or_else(|| malformed(original_text, "unterminated quoted name"))?;
    let quoted = QuotedText::parse_quoted(&format!("\"{}\"", &after_quote[..end]))
        .ok_or_else(|| malformed(original_text, "invalid quoted name"))?;
    Ok((quoted.literal().to_string(), &after_quote[end + 1..]))
}

fn extract_single_quoted_block(text: &str, original_text: &str) -> Result<String, DeltaError> {
    let trimmed = text.trim();
    let start = trimmed
        .find('\'')
        .ok_or_else(|| malformed(original_text, "expected a single-quoted mapping body"))?;
    let end = trimmed
        .rfind('\'')
        .ok_or_else(|| malformed(original_text, "expected a single-quoted mapping body"))?;
    if end <= start {
        return Err(malformed(original_text, "empty mapping body"));
    }
    Ok(trimmed[start + 1..end].to_string())
}
