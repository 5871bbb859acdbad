use std::fmt;

use chrono::Duration;
use serde_json::{Map, Number, Value};

use crate::primitives::HotWindow;

/// Closed set of policy kinds the core understands. `Other` is an escape
/// hatch for grammar entries this crate doesn't model by name yet; it still
/// round-trips (the keyword is carried verbatim).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PolicyKind {
    Caching,
    Retention,
    Update,
    Partitioning,
    RowLevelSecurity,
    Sharding,
    IngestionBatching,
    IngestionTime,
    StreamingIngestion,
    Merge,
    AutoDelete,
    HardRetentionViolations,
    ManagedIdentity,
    Encoding,
    RestrictedViewAccess,
    ShardGroups,
    Other(String),
}

impl PolicyKind {
    /// The keyword used in `.alter <entity>-policy <keyword>`.
    pub fn keyword(&self) -> &str {
        match self {
            Self::Caching => "caching",
            Self::Retention => "retention",
            Self::Update => "update",
            Self::Partitioning => "partitioning",
            Self::RowLevelSecurity => "row_level_security",
            Self::Sharding => "sharding",
            Self::IngestionBatching => "ingestionbatching",
            Self::IngestionTime => "ingestiontime",
            Self::StreamingIngestion => "streamingingestion",
            Self::Merge => "merge",
            Self::AutoDelete => "auto_delete",
            Self::HardRetentionViolations => "hard_retention_violations",
            Self::ManagedIdentity => "managed_identity",
            Self::Encoding => "encoding",
            Self::RestrictedViewAccess => "restricted_view_access",
            Self::ShardGroups => "shard_groups",
            Self::Other(keyword) => keyword,
        }
    }

    pub fn parse_keyword(keyword: &str) -> Self {
        match keyword {
            "caching" => Self::Caching,
            "retention" => Self::Retention,
            "update" => Self::Update,
            "partitioning" => Self::Partitioning,
            "row_level_security" => Self::RowLevelSecurity,
            "sharding" => Self::Sharding,
            "ingestionbatching" => Self::IngestionBatching,
            "ingestiontime" => Self::IngestionTime,
            "streamingingestion" => Self::StreamingIngestion,
            "merge" => Self::Merge,
            "auto_delete" => Self::AutoDelete,
            "hard_retention_violations" => Self::HardRetentionViolations,
            "managed_identity" => Self::ManagedIdentity,
            "encoding" => Self::Encoding,
            "restricted_view_access" => Self::RestrictedViewAccess,
            "shard_groups" => Self::ShardGroups,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A deserialized JSON policy document, compared by semantic equality
/// (field order irrelevant, numeric spelling irrelevant, arrays ordered).
/// Equality normalizes by recursively sorting object keys and folding
/// integral floats (`1.0` -> `1`) before comparing.
#[derive(Debug, Clone)]
pub struct PolicyPayload {
    value: Value,
}

impl PolicyPayload {
    pub fn from_value(value: Value) -> Self {
        Self { value }
    }

    pub fn parse_json(text: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::from_value(serde_json::from_str(text)?))
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Canonical pretty-printed JSON, used inside the emitted
    /// ```` ```...``` ```` block. Keys are sorted so the emitted text is
    /// deterministic regardless of construction order.
    pub fn to_script_block(&self) -> String {
        let normalized = normalize_value(self.value.clone());
        serde_json::to_string_pretty(&normalized).unwrap_or_else(|_| "{}".to_string())
    }

    fn normalized(&self) -> Value {
        normalize_value(self.value.clone())
    }
}

impl PartialEq for PolicyPayload {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}
impl Eq for PolicyPayload {}

/// Recursively sorts object keys and normalizes integral floats (`1.0` -> `1`)
/// so two payloads differing only in spelling or field order compare equal.
fn normalize_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map
                .into_iter()
                .map(|(key, child)| (key, normalize_value(child)))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = Map::new();
            for (key, child) in entries {
                out.insert(key, child);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_value).collect()),
        Value::Number(number) => Value::Number(normalize_number(number)),
        primitive => primitive,
    }
}

fn normalize_number(number: Number) -> Number {
    if number.is_i64() || number.is_u64() {
        return number;
    }
    if let Some(float) = number.as_f64() {
        if float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
            return Number::from(float as i64);
        }
    }
    number
}

/// Formats a `chrono::Duration` as a Kusto timespan literal (`d.hh:mm:ss`).
pub fn format_timespan(duration: Duration) -> String {
    let total_seconds = duration.num_seconds();
    let days = total_seconds / 86_400;
    let remainder = total_seconds % 86_400;
    let hours = remainder / 3_600;
    let minutes = (remainder % 3_600) / 60;
    let seconds = remainder % 60;
    if days != 0 {
        format!("{days}.{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

/// Typed convenience constructor for the caching policy payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CachingPolicyPayload {
    pub hot_data: Option<Duration>,
    pub hot_index: Option<Duration>,
    pub hot_windows: Vec<HotWindow>,
}

impl CachingPolicyPayload {
    pub fn to_payload(&self) -> PolicyPayload {
        let mut map = Map::new();
        if let Some(hot_data) = self.hot_data {
            map.insert(
                "DataHotSpan".to_string(),
                Value::String(format_timespan(hot_data)),
            );
        }
        if let Some(hot_index) = self.hot_index {
            map.insert(
                "IndexHotSpan".to_string(),
                Value::String(format_timespan(hot_index)),
            );
        }
        if !self.hot_windows.is_empty() {
            let windows = self
                .hot_windows
                .iter()
                .map(|window| {
                    let mut entry = Map::new();
                    entry.insert("Start".to_string(), Value::String(window.start.to_rfc3339()));
                    entry.insert("End".to_string(), Value::String(window.end.to_rfc3339()));
                    Value::Object(entry)
                })
                .collect();
            map.insert("HotWindows".to_string(), Value::Array(windows));
        }
        PolicyPayload::from_value(Value::Object(map))
    }
}

/// Typed convenience constructor for the retention policy payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionPolicyPayload {
    pub soft_delete_period: Duration,
    pub recoverability_enabled: bool,
}

impl RetentionPolicyPayload {
    pub fn to_payload(&self) -> PolicyPayload {
        let mut map = Map::new();
        map.insert(
            "SoftDeletePeriod".to_string(),
            Value::String(format_timespan(self.soft_delete_period)),
        );
        map.insert(
            "Recoverability".to_string(),
            Value::String(
                if self.recoverability_enabled {
                    "Enabled"
                } else {
                    "Disabled"
                }
                .to_string(),
            ),
        );
        PolicyPayload::from_value(Value::Object(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn semantically_equal_payloads_ignore_key_order_and_numeric_spelling() {
        let left = PolicyPayload::from_value(json!({"a": 1, "b": 2.0}));
        let right = PolicyPayload::from_value(json!({"b": 2, "a": 1.0}));
        assert_eq!(left, right);
    }

    #[test]
    fn payloads_with_real_differences_are_not_equal() {
        let left = PolicyPayload::from_value(json!({"a": 1}));
        let right = PolicyPayload::from_value(json!({"a": 2}));
        assert_ne!(left, right);
    }

    #[test]
    fn caching_payload_emits_hot_data_as_timespan() {
        let payload = CachingPolicyPayload {
            hot_data: Some(Duration::hours(12)),
            hot_index: None,
            hot_windows: vec![],
        }
        .to_payload();
        assert_eq!(payload.value()["DataHotSpan"], json!("12:00:00"));
    }

    #[test]
    fn policy_kind_keyword_round_trips() {
        for kind in [
            PolicyKind::Caching,
            PolicyKind::Retention,
            PolicyKind::IngestionBatching,
            PolicyKind::ShardGroups,
        ] {
            assert_eq!(PolicyKind::parse_keyword(kind.keyword()), kind);
        }
    }
}
