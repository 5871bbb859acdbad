pub mod command;
pub mod delta;
pub mod emit;
pub mod error;
pub mod model;
pub mod parser;
pub mod policy;
pub mod primitives;

pub use command::Command;
pub use delta::compute_delta;
pub use emit::{emit_script, emit_script_files};
pub use error::DeltaError;
pub use model::DatabaseModel;
pub use parser::parse_script;
pub use policy::{CachingPolicyPayload, PolicyKind, PolicyPayload, RetentionPolicyPayload};
pub use primitives::{EntityName, EntityType, HotWindow, QuotedText, ScriptingContext, TableColumn};

#[cfg(test)]
mod tests {
    use super::*;

    /// End-to-end: parse a target script, diff it against an empty current
    /// model, and emit the delta. Exercises every public seam in one pass.
    #[test]
    fn parses_diffs_and_emits_a_fresh_database() {
        let target_script = r#"
.create table Users (id:long, name:string) with (folder="Core")

.create function GetActiveUsers(ignored:long) { Users | where id > 0 }
"#;
        let context = ScriptingContext::default();
        let target_commands = parse_script(target_script, &context).expect("parse target");
        let target_model = DatabaseModel::from_commands(&target_commands).expect("fold target");

        let delta = compute_delta(&DatabaseModel::new(), &target_model);
        let script = emit_script(&delta, &context);

        let reparsed = parse_script(&script, &context).expect("reparse emitted delta");
        let rebuilt = DatabaseModel::from_commands(&reparsed).expect("fold reparsed delta");
        assert_eq!(rebuilt, target_model);
    }
}
