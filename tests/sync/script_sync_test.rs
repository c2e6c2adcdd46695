// tests/sync/script_sync_test.rs
#[path = "../common/mod.rs"]
mod common;

use cellsync::flux::{body_nodes, ArgType, DeleteFuncNodeArgs, InputArg, Program, ScriptStatus, NEW_FROM};
use cellsync::service::Notification;
use common::{harness, parse_program, MockExecutor, MockParser};

fn engine() -> common::Harness {
    harness(MockParser::new(), MockExecutor::returning(Default::default()))
}

const SCRIPT: &str = "from(bucket: \"telegraf\")\n\t|> range(start: -1h)\n\t|> filter(fn: pred)";

fn names(sync: &cellsync::ScriptSync) -> Vec<String> {
    sync.body()
        .iter()
        .flat_map(|b| b.funcs.iter().map(|f| f.name.clone()))
        .collect()
}

// ===== debounced text edits =====

#[tokio::test(start_paused = true)]
async fn test_rapid_edits_parse_once_with_last_text() {
    let h = engine();

    let first = h.sync.update_script("from(");
    let second = h.sync.update_script("from(bucket: \"a\")");
    let third = h.sync.update_script(SCRIPT);
    first.await.unwrap();
    second.await.unwrap();
    third.await.unwrap();

    assert_eq!(h.parser.calls(), 1);
    assert_eq!(h.parser.parsed(), vec![SCRIPT.to_string()]);
    assert_eq!(h.sync.script(), SCRIPT);
    assert_eq!(names(&h.sync), vec!["from", "range", "filter"]);
}

#[tokio::test(start_paused = true)]
async fn test_text_is_stored_before_parse_runs() {
    let h = engine();

    let pending = h.sync.update_script(SCRIPT);
    assert_eq!(h.sync.script(), SCRIPT);
    assert_eq!(h.parser.calls(), 0);

    pending.await.unwrap();
    assert_eq!(h.parser.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_edit_clears_tree_without_parsing() {
    let h = engine();
    h.sync.request_parse(SCRIPT, true).await;
    assert!(!h.sync.body().is_empty());

    h.sync.update_script("").await.unwrap();

    assert_eq!(h.parser.calls(), 1);
    assert_eq!(h.sync.ast(), Program::empty());
    assert!(h.sync.body().is_empty());
    assert_eq!(h.sync.status(), ScriptStatus::None);
}

#[tokio::test(start_paused = true)]
async fn test_immediate_parse_cancels_pending_debounce() {
    let h = engine();

    let pending = h.sync.update_script("from(bucket: \"stale\")");
    h.sync.request_parse(SCRIPT, true).await;
    pending.await.unwrap();

    assert_eq!(h.parser.parsed(), vec![SCRIPT.to_string()]);
    assert_eq!(h.sync.script(), SCRIPT);
}

// ===== immediate parses =====

#[tokio::test]
async fn test_body_is_projection_of_parsed_tree() {
    let h = engine();

    let status = h.sync.request_parse(SCRIPT, true).await;

    assert_eq!(status, ScriptStatus::Success);
    assert_eq!(h.sync.ast(), parse_program(SCRIPT));
    assert_eq!(h.sync.body(), body_nodes(&h.sync.ast(), &[]));
}

#[tokio::test]
async fn test_repeated_parse_is_idempotent() {
    let h = engine();

    h.sync.request_parse(SCRIPT, true).await;
    let first = h.sync.snapshot();
    h.sync.request_parse(SCRIPT, true).await;

    assert_eq!(h.sync.snapshot(), first);
}

#[tokio::test]
async fn test_parse_error_keeps_previous_tree() {
    let h = engine();
    h.sync.request_parse(SCRIPT, true).await;
    let ast = h.sync.ast();
    let body = h.sync.body();

    let status = h.sync.request_parse("from(bucket: !!)", true).await;

    assert_eq!(status, ScriptStatus::error("unexpected token !!"));
    assert_eq!(h.sync.ast(), ast);
    assert_eq!(h.sync.body(), body);
    assert_eq!(h.sync.script(), SCRIPT);
}

#[tokio::test]
async fn test_non_propagating_parse_keeps_script() {
    let h = engine().sync.with_script("a()");

    h.request_parse(SCRIPT, false).await;

    assert_eq!(h.script(), "a()");
    assert_eq!(h.body().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_result_is_discarded() {
    let h = engine();

    let (slow, fast) = tokio::join!(
        h.sync.request_parse("slow()", true),
        h.sync.request_parse("fast()", true),
    );

    assert_eq!(fast, ScriptStatus::Success);
    assert_eq!(slow, ScriptStatus::Success);
    assert_eq!(h.sync.script(), "fast()");
    assert_eq!(names(&h.sync), vec!["fast"]);
}

#[tokio::test]
async fn test_suggestions_type_arguments() {
    use cellsync::flux::Suggestion;

    let parser = MockParser::with_suggestions(vec![
        Suggestion::new("filter").with_param("fn", "function")
    ]);
    let h = harness(parser, MockExecutor::returning(Default::default()));

    assert_eq!(h.sync.load_suggestions().await, 1);
    h.sync.request_parse(SCRIPT, true).await;

    let body = h.sync.body();
    let filter = &body[0].funcs[2];
    assert_eq!(filter.args[0].arg_type, ArgType::Function);
}

#[tokio::test]
async fn test_suggestion_failure_leaves_catalog_empty() {
    let h = engine();
    assert_eq!(h.sync.load_suggestions().await, 0);
    assert!(h.sync.suggestions().is_empty());
}

// ===== structural edits =====

#[tokio::test]
async fn test_append_from_seeds_empty_script() {
    let h = engine();

    h.sync.append_from().await;

    assert_eq!(h.sync.script(), NEW_FROM);
    assert_eq!(names(&h.sync), vec!["from", "range"]);
}

#[tokio::test]
async fn test_append_join_adds_body() {
    let h = engine();
    h.sync.request_parse(SCRIPT, true).await;

    h.sync.append_join().await;

    assert_eq!(h.sync.body().len(), 2);
    assert!(h.sync.script().starts_with(SCRIPT));
    assert_eq!(h.sync.body()[1].funcs[0].name, "join");
}

#[tokio::test]
async fn test_add_node_appends_call() {
    let h = engine();
    h.sync.request_parse(SCRIPT, true).await;

    h.sync.add_node("mean", "body-0", None).await;

    assert_eq!(names(&h.sync), vec!["from", "range", "filter", "mean"]);
    assert!(h.sync.script().ends_with("|> mean()"));
}

#[tokio::test]
async fn test_toggle_yield_twice_restores_chain() {
    let h = engine();
    h.sync.request_parse(SCRIPT, true).await;

    h.sync.toggle_yield("body-0", None, 0).await;
    assert_eq!(names(&h.sync), vec!["from", "yield", "range", "filter"]);

    h.sync.toggle_yield("body-0", None, 0).await;
    assert_eq!(names(&h.sync), vec!["from", "range", "filter"]);
}

#[tokio::test]
async fn test_delete_func_node_removes_call() {
    let h = engine();
    h.sync.request_parse(SCRIPT, true).await;

    h.sync
        .delete_func_node(&DeleteFuncNodeArgs {
            body_id: "body-0".to_string(),
            declaration_id: None,
            func_id: "body-0/func-1".to_string(),
            yield_node_index: None,
        })
        .await;

    assert_eq!(names(&h.sync), vec!["from", "filter"]);
}

#[tokio::test]
async fn test_delete_body() {
    let h = engine();
    h.sync
        .request_parse(&format!("{}\n\nother()", SCRIPT), true)
        .await;

    h.sync.delete_body("body-0").await;

    assert_eq!(h.sync.script(), "other()");
}

#[tokio::test]
async fn test_change_arg_with_generate_rewrites_script() {
    let h = engine();
    h.sync.request_parse(SCRIPT, true).await;

    h.sync
        .change_arg(&InputArg {
            body_id: "body-0".to_string(),
            declaration_id: None,
            func_id: "body-0/func-0".to_string(),
            key: "bucket".to_string(),
            value: "db/rp".to_string(),
            arg_type: ArgType::String,
            generate: true,
        })
        .await;

    assert!(h.sync.script().starts_with("from(bucket: \"db/rp\")"));
    assert_eq!(h.sync.body()[0].funcs[0].args[0].value, "db/rp");
}

#[tokio::test]
async fn test_change_arg_without_generate_keeps_script() {
    let h = engine();
    h.sync.request_parse(SCRIPT, true).await;
    let calls = h.parser.calls();

    h.sync
        .change_arg(&InputArg {
            body_id: "body-0".to_string(),
            declaration_id: None,
            func_id: "body-0/func-0".to_string(),
            key: "bucket".to_string(),
            value: "db/rp".to_string(),
            arg_type: ArgType::String,
            generate: false,
        })
        .await;

    assert_eq!(h.parser.calls(), calls);
    assert_eq!(h.sync.script(), SCRIPT);
    assert_eq!(h.sync.body()[0].funcs[0].args[0].value, "db/rp");
}

#[tokio::test]
async fn test_script_up_to_yield_does_not_parse() {
    let h = engine();
    h.sync.request_parse(SCRIPT, true).await;
    let calls = h.parser.calls();

    let preview = h.sync.script_up_to_yield("body-0", None, 1, false);

    assert_eq!(preview, "from(bucket: \"telegraf\")\n\t|> range(start: -1h)\n\t|> yield()");
    assert_eq!(h.parser.calls(), calls);
}

#[tokio::test]
async fn test_declarations_are_addressable() {
    let h = engine();
    h.sync
        .request_parse("tbl1 = from(bucket: \"a\")\n\t|> range(start: -1h)", true)
        .await;

    h.sync.add_node("last", "body-0", Some("body-0/decl-0")).await;

    let body = h.sync.body();
    let decl = &body[0].declarations[0];
    assert_eq!(decl.name, "tbl1");
    let names: Vec<&str> = decl.funcs.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["from", "range", "last"]);
}

// ===== validation and context =====

#[tokio::test]
async fn test_validate_notifies_success() {
    let mut h = engine();
    let sync = h.sync.clone().with_script(SCRIPT);

    assert_eq!(sync.validate().await, ScriptStatus::Success);
    assert_eq!(h.notifications.try_recv().unwrap(), Notification::ValidateSuccess);
}

#[tokio::test]
async fn test_validate_failure_is_silent() {
    let mut h = engine();
    let sync = h.sync.clone().with_script("bad !!");

    assert!(sync.validate().await.is_error());
    assert!(h.notifications.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_validation_overtaken_by_newer_parse_is_discarded() {
    let mut h = engine();
    let sync = h.sync.clone().with_script("slow()");

    let (validated, fast) = tokio::join!(sync.validate(), sync.request_parse("fast()", true));

    assert_eq!(fast, ScriptStatus::Success);
    assert_eq!(validated, ScriptStatus::Success);
    assert_eq!(sync.script(), "fast()");
    assert_eq!(names(&sync), vec!["fast"]);
    assert!(h.notifications.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_validate_cancels_pending_debounce() {
    let h = engine();

    let pending = h.sync.update_script(SCRIPT);
    h.sync.validate().await;
    pending.await.unwrap();

    assert_eq!(h.parser.calls(), 1);
}

#[tokio::test]
async fn test_context_edits_reach_engine() {
    let h = engine();
    h.sync.request_parse(SCRIPT, true).await;

    let ctx = h.sync.context(Some(common::service()));
    assert_eq!(ctx.body, h.sync.body());
    assert!(ctx.data.is_empty());

    ctx.add_node("count", "body-0", None).await;
    assert_eq!(names(&h.sync), vec!["from", "range", "filter", "count"]);
    // The snapshot does not follow later edits.
    assert_eq!(ctx.body[0].funcs.len(), 3);
    assert_eq!(
        ctx.script_up_to_yield("body-0", None, 0, false),
        "from(bucket: \"telegraf\")\n\t|> yield()"
    );
}
