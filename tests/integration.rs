use delta_kusto::{
    compute_delta, emit_script, emit_script_files, parse_script, Command, DatabaseModel,
    ScriptingContext,
};

fn model_of(script: &str, context: &ScriptingContext) -> DatabaseModel {
    let commands = parse_script(script, context).expect("parse script");
    DatabaseModel::from_commands(&commands).expect("fold commands")
}

#[test]
fn full_pipeline_drives_an_empty_database_to_a_two_table_schema() {
    let context = ScriptingContext::default();
    let target_script = r#"
.create table Users (id:long, name:string) with (folder="Core")

.create table Sessions (id:guid, userId:long)

.create table Sessions ingestion json mapping "Default" '[{"column":"id","path":"$.id"}]'
"#;
    let target = model_of(target_script, &context);

    let delta = compute_delta(&DatabaseModel::new(), &target);
    let script = emit_script(&delta, &context);
    let rebuilt = model_of(&script, &context);

    assert_eq!(rebuilt, target);
}

#[test]
fn no_op_delta_between_identical_scripts_is_empty() {
    let context = ScriptingContext::default();
    let script = ".create table T (a:int) with (folder=\"F\")";
    let model = model_of(script, &context);
    assert!(compute_delta(&model, &model).is_empty());
}

#[test]
fn dropping_a_table_emits_the_drop_before_its_now_orphaned_policy_delete() {
    let context = ScriptingContext::default();
    let current_script = r#"
.create table T (a:int)

.alter table T policy retention
```
{"SoftDeletePeriod": "365.00:00:00", "Recoverability": "Enabled"}
```
"#;
    let current = model_of(current_script, &context);
    let target = DatabaseModel::new();

    let delta = compute_delta(&current, &target);
    let table_index = delta
        .iter()
        .position(|c| matches!(c, Command::DropTable(_)))
        .expect("drop table present");
    let policy_index = delta
        .iter()
        .position(|c| matches!(c, Command::DeletePolicy(_)))
        .expect("delete policy present");
    assert!(table_index < policy_index);
}

#[test]
fn semantically_equivalent_policy_payload_emits_no_delta() {
    let context = ScriptingContext::default();
    let current_script = r#"
.create table T (a:int)

.alter table T policy caching
```
{"DataHotSpan": "1.00:00:00", "IndexHotSpan": "12:00:00"}
```
"#;
    // Same policy, but with its JSON keys reordered — PolicyPayload's
    // semantic equality should still treat this as identical.
    let target_script = r#"
.create table T (a:int)

.alter table T policy caching
```
{"IndexHotSpan": "12:00:00", "DataHotSpan": "1.00:00:00"}
```
"#;
    let current = model_of(current_script, &context);
    let target = model_of(target_script, &context);
    assert!(compute_delta(&current, &target).is_empty());
}

#[test]
fn database_scoped_policy_round_trips_through_current_database_context() {
    let context = ScriptingContext::with_current_database("MyDb");
    let script = r#"
.alter database policy retention
```
{"SoftDeletePeriod": "7.00:00:00", "Recoverability": "Disabled"}
```
"#;
    let commands = parse_script(script, &context).expect("parse");
    assert_eq!(commands.len(), 1);

    let rendered = emit_script(&commands, &context);
    assert!(rendered.starts_with(".alter database policy retention"));

    // Without the matching context, the same model renders the explicit name.
    let other_context = ScriptingContext::default();
    let rendered_explicit = emit_script(&commands, &other_context);
    assert!(rendered_explicit.starts_with(".alter database MyDb policy retention"));
}

#[test]
fn emit_script_files_lays_out_one_file_per_script_path() {
    let context = ScriptingContext::default();
    let target = model_of(
        r#"
.create table A (x:int) with (folder="Folder")

.create function F(x:long) { A | count }
"#,
        &context,
    );
    let delta = compute_delta(&DatabaseModel::new(), &target);
    let files = emit_script_files(&delta, &context);

    assert!(files.contains_key("tables/create/Folder/A.kql"));
    assert!(files.contains_key("functions/create/F.kql"));
}

#[test]
fn unsupported_command_surfaces_as_a_parse_error() {
    let error = parse_script(".show database schema", &ScriptingContext::default())
        .expect_err("unsupported command must fail to parse");
    assert!(matches!(error, delta_kusto::DeltaError::UnsupportedCommand { .. }));
}
