use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

fn bare_identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

/// A database, table, function, column, or mapping identifier.
///
/// Equality is case-sensitive on the raw name; the quoted script form is
/// derived, never stored, so two `EntityName`s built from the same raw text
/// always compare equal regardless of how they were constructed.
#[derive(Debug, Clone, Eq)]
pub struct EntityName {
    raw: String,
}

impl EntityName {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Script form of the name: bare if it matches `[A-Za-z_][A-Za-z0-9_]*`,
    /// quoted as `["..."]` otherwise.
    pub fn script(&self) -> String {
        if bare_identifier_pattern().is_match(&self.raw) {
            self.raw.clone()
        } else {
            format!("[\"{}\"]", escape_quoted(&self.raw))
        }
    }

    fn needs_quoting(&self) -> bool {
        !bare_identifier_pattern().is_match(&self.raw)
    }
}

impl PartialEq for EntityName {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl std::hash::Hash for EntityName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl PartialOrd for EntityName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntityName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for EntityName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EntityName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

fn escape_quoted(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A string with two representations: the literal text, and its DSL-quoted
/// form. Equality compares the literal text only.
#[derive(Debug, Clone, Eq)]
pub struct QuotedText {
    literal: String,
}

impl QuotedText {
    pub fn new(literal: impl Into<String>) -> Self {
        Self {
            literal: literal.into(),
        }
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn script(&self) -> String {
        format!("\"{}\"", escape_quoted(&self.literal))
    }

    /// Parses a DSL-quoted literal (`"..."`), unescaping `\"` and `\\`.
    pub fn parse_quoted(text: &str) -> Option<Self> {
        let inner = text.strip_prefix('"')?.strip_suffix('"')?;
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                match chars.next() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => out.push('\\'),
                }
            } else {
                out.push(ch);
            }
        }
        Some(Self::new(out))
    }
}

impl PartialEq for QuotedText {
    fn eq(&self, other: &Self) -> bool {
        self.literal == other.literal
    }
}

impl fmt::Display for QuotedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.script())
    }
}

/// `(name, type)` pair making up one column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub name: EntityName,
    pub column_type: String,
}

impl TableColumn {
    pub fn new(name: impl Into<EntityName>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
        }
    }

    pub fn script(&self) -> String {
        format!("{}:{}", self.name.script(), self.column_type)
    }
}

/// Closed set of entities a policy can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityType {
    Table,
    Database,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Database => "database",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hot-cache window, used by the caching policy's `HotWindows` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl HotWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

/// Caller-supplied qualification context. When `current_database_name` is
/// set, database-scoped commands omit the explicit database identifier in
/// favor of "current database" syntax.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptingContext {
    pub current_database_name: Option<EntityName>,
}

impl ScriptingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_current_database(name: impl Into<EntityName>) -> Self {
        Self {
            current_database_name: Some(name.into()),
        }
    }

    /// `true` when `name` is the context's current database, i.e. the
    /// database qualifier can be omitted from emitted script.
    pub fn is_current_database(&self, name: &EntityName) -> bool {
        matches!(&self.current_database_name, Some(current) if current == name)
    }
}
