use thiserror::Error;

/// Domain error raised by the parser, the database model fold, and policy
/// payload construction. The delta engine itself never fails: by
/// construction two valid models always produce a valid delta.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeltaError {
    #[error("unsupported command: {text}")]
    UnsupportedCommand { text: String },

    #[error("malformed script near `{text}`: {reason}")]
    MalformedScript { text: String, reason: String },

    #[error("unknown property `{property}` on {command}")]
    UnknownProperty { command: String, property: String },

    #[error("mapping `{mapping}` references unknown table `{table}`")]
    MissingTableForMapping { table: String, mapping: String },

    #[error("{policy_kind} policy references unknown table `{entity}`")]
    MissingTableForPolicy {
        entity: String,
        policy_kind: String,
    },

    #[error("invalid {policy_kind} policy payload: {reason}")]
    InvalidPolicyPayload { policy_kind: String, reason: String },

    #[error("{command} requires a scripting context to qualify its entity name")]
    RequiresScriptingContext { command: String },
}
