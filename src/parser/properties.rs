use std::collections::BTreeMap;

use crate::error::DeltaError;
use crate::primitives::{EntityName, QuotedText};

fn malformed(text: &str, reason: impl Into<String>) -> DeltaError {
    DeltaError::MalformedScript {
        text: text.to_string(),
        reason: reason.into(),
    }
}

/// Splits `"<head> with (<props>)"` into `(head, Some(props))`, or
/// `(text, None)` when there is no `with` clause.
pub(super) fn split_with_clause(text: &str) -> (&str, Option<&str>) {
    if let Some(start) = find_case_insensitive(text, "with (").or_else(|| find_case_insensitive(text, "with(")) {
        let open_paren = text[start..].find('(').map(|i| start + i).unwrap_or(start);
        if let Some(rel_end) = text[open_paren + 1..].find(')') {
            let end = open_paren + 1 + rel_end;
            return (text[..start].trim_end(), Some(&text[open_paren + 1..end]));
        }
    }
    (text, None)
}

/// Case-insensitive substring search that never leaves the original
/// string's coordinate space: every candidate start comes from `haystack`'s
/// own `char_indices`, so the byte offset returned is always a valid slice
/// point into `haystack` even when case-folding a matched character changes
/// its length (e.g. `İ` lowercases to two code points).
fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let needle_lower: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();
    if needle_lower.is_empty() {
        return Some(0);
    }
    for (start, _) in haystack.char_indices() {
        let mut candidate = haystack[start..].chars().flat_map(char::to_lowercase);
        if needle_lower.iter().all(|&expected| candidate.next() == Some(expected)) {
            return Some(start);
        }
    }
    None
}

/// Parses `key1=value1, key2=value2` into a lowercase-keyed map, values
/// de-quoted when they were written as DSL string literals.
pub(super) fn parse_properties(props: &str) -> BTreeMap<String, String> {
    props
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.splitn(2, '=');
            let key = parts.next()?.trim().to_lowercase();
            if key.is_empty() {
                return None;
            }
            let raw_value = parts.next()?.trim();
            let value = QuotedText::parse_quoted(raw_value)
                .map(|text| text.literal().to_string())
                .unwrap_or_else(|| raw_value.to_string());
            Some((key, value))
        })
        .collect()
}

/// Reads one entity name from the front of `input`: a `["quoted name"]`
/// form, or a bare run of identifier/dot characters. Returns the name and
/// the unconsumed remainder.
pub(super) fn read_entity_name(input: &str) -> Result<(EntityName, &str), DeltaError> {
    let trimmed = input.trim_start();
    if let Some(after_bracket_open) = trimmed.strip_prefix('[') {
        let after_quote_open = after_bracket_open
            .strip_prefix('"')
            .ok_or_else(|| malformed(trimmed, "expected `[\"` to open a quoted entity name"))?;
        let end = find_unescaped_quote(after_quote_open)
            .ok_or_else(|| malformed(trimmed, "unterminated quoted entity name"))?;
        let quoted = QuotedText::parse_quoted(&format!("\"{}\"", &after_quote_open[..end]))
            .ok_or_else(|| malformed(trimmed, "invalid quoted entity name"))?;
        let rest = &after_quote_open[end + 1..];
        let rest = rest
            .strip_prefix(']')
            .ok_or_else(|| malformed(trimmed, "expected `]` to close a quoted entity name"))?;
        return Ok((EntityName::new(quoted.literal().to_string()), rest));
    }

    let end = trimmed
        .find(|c: char| c.is_whitespace() || "(),:;".contains(c))
        .unwrap_or(trimmed.len());
    if end == 0 {
        return Err(malformed(trimmed, "expected an entity name"));
    }
    Ok((EntityName::new(&trimmed[..end]), &trimmed[end..]))
}

pub(super) fn find_unescaped_quote(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'\\' => index += 2,
            b'"' => return Some(index),
            _ => index += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_with_clause() {
        let (head, props) = split_with_clause("T (a:int) with (folder=\"F\", docstring=\"D\")");
        assert_eq!(head, "T (a:int)");
        assert_eq!(props, Some("folder=\"F\", docstring=\"D\""));
    }

    #[test]
    fn splits_with_clause_after_a_name_with_length_expanding_case_folding() {
        let (head, props) = split_with_clause("\u{130}stanbul (a:int) with (folder=\"F\")");
        assert_eq!(head, "\u{130}stanbul (a:int)");
        assert_eq!(props, Some("folder=\"F\""));
    }

    #[test]
    fn reads_quoted_entity_name() {
        let (name, rest) = read_entity_name("[\"my table\"] (a:int)").expect("read name");
        assert_eq!(name.raw(), "my table");
        assert_eq!(rest.trim_start(), "(a:int)");
    }

    #[test]
    fn reads_bare_entity_name() {
        let (name, rest) = read_entity_name("Table (a:int)").expect("read name");
        assert_eq!(name.raw(), "Table");
        assert_eq!(rest.trim_start(), "(a:int)");
    }
}
