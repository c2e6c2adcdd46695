// tests/query/cell_editor_test.rs
#[path = "../common/mod.rs"]
mod common;

use cellsync::editor::initial_source;
use cellsync::flux::{Suggestion, TimeSeriesResult};
use cellsync::query::{Cell, CellQuery, QueryConfig, QueryStatus, Source, SourceLinks};
use cellsync::CellEditor;
use common::{harness, service, table, MockExecutor, MockParser};

fn source(id: &str) -> Source {
    Source {
        id: id.to_string(),
        name: format!("influx-{}", id),
        links: SourceLinks {
            self_link: format!("/chronograf/v1/sources/{}", id),
            ..SourceLinks::default()
        },
        ..Source::default()
    }
}

fn cell(queries: Vec<CellQuery>) -> Cell {
    Cell {
        i: "cell-1".to_string(),
        name: "CPU".to_string(),
        cell_type: "line".to_string(),
        queries,
    }
}

fn raw(query: &str, source: Option<&str>) -> CellQuery {
    CellQuery {
        query: query.to_string(),
        query_config: None,
        source: source.map(str::to_string),
    }
}

fn editor(cell: Cell) -> CellEditor {
    let h = harness(MockParser::new(), MockExecutor::returning(Default::default()));
    CellEditor::new(cell, h.sync, vec![source("1"), source("2")], source("1"))
}

// ===== sources =====

#[test]
fn test_initial_source_follows_first_query() {
    let sources = vec![source("1"), source("2")];
    let c = cell(vec![raw("SELECT 1", Some("/chronograf/v1/sources/2"))]);

    assert_eq!(initial_source(&c, &sources, &source("1")), source("2"));
}

#[test]
fn test_initial_source_falls_back_to_default() {
    let sources = vec![source("1"), source("2")];

    let unknown = cell(vec![raw("SELECT 1", Some("/chronograf/v1/sources/9"))]);
    assert_eq!(initial_source(&unknown, &sources, &source("1")), source("1"));

    let empty = cell(Vec::new());
    assert_eq!(initial_source(&empty, &sources, &source("1")), source("1"));
}

#[test]
fn test_drafts_start_on_initial_source() {
    let editor = editor(cell(vec![
        raw("SELECT 1", Some("/chronograf/v1/sources/2")),
        raw("SELECT 2", None),
    ]));

    assert_eq!(editor.drafts().len(), 2);
    assert!(editor
        .drafts()
        .drafts()
        .iter()
        .all(|q| q.source == Some(source("2"))));
    assert_eq!(editor.source(), source("2"));
    assert!(!editor.is_flux_source());
}

#[test]
fn test_change_service_moves_every_draft() {
    let mut editor = editor(cell(vec![raw("SELECT 1", None), raw("SELECT 2", None)]));

    editor.change_service(service(), source("2"));

    assert!(editor.is_flux_source());
    assert_eq!(editor.service(), Some(&service()));
    assert_eq!(editor.source(), source("2"));
    assert!(editor
        .save()
        .queries
        .iter()
        .all(|q| q.source.as_deref() == Some("/chronograf/v1/sources/2")));
}

// ===== query status =====

#[test]
fn test_status_applies_to_reported_query() {
    let mut editor = editor(cell(vec![raw("SELECT 1", None), raw("SELECT 2", None)]));
    let second = editor.drafts().drafts()[1].id.clone();
    let done = QueryStatus {
        success: Some("ok".to_string()),
        ..QueryStatus::default()
    };

    editor.apply_query_status(&second, done.clone());

    assert_eq!(editor.drafts().drafts()[0].status, None);
    assert_eq!(editor.drafts().draft(&second).unwrap().status, Some(done));
}

#[test]
fn test_repeated_status_is_ignored() {
    let mut editor = editor(cell(vec![raw("SELECT 1", None)]));
    let id = editor.drafts().drafts()[0].id.clone();

    editor.apply_query_status(&id, QueryStatus::loading());
    editor.drafts_mut().apply_query_status(&id, QueryStatus::default());
    editor.apply_query_status(&id, QueryStatus::loading());

    assert_eq!(editor.drafts().draft(&id).unwrap().status, Some(QueryStatus::default()));
}

// ===== save =====

#[test]
fn test_save_keeps_cell_identity() {
    let editor = editor(cell(vec![raw("SELECT 1", Some("/chronograf/v1/sources/1"))]));

    let saved = editor.save();

    assert_eq!(saved.i, "cell-1");
    assert_eq!(saved.name, "CPU");
    assert_eq!(saved.queries.len(), 1);
    assert_eq!(saved.queries[0].query, "SELECT 1");
    assert!(editor.is_saveable());
}

#[test]
fn test_empty_cell_is_not_saveable() {
    let editor = editor(cell(Vec::new()));

    assert_eq!(editor.drafts().len(), 1);
    assert!(!editor.is_saveable());
    assert_eq!(editor.active_query().unwrap().id, editor.drafts().drafts()[0].id);
}

#[test]
fn test_structured_draft_round_trips_through_save() {
    let config = QueryConfig {
        database: Some("telegraf".to_string()),
        retention_policy: Some("autogen".to_string()),
        measurement: Some("cpu".to_string()),
        fields: vec![cellsync::query::Field::func("mean", "usage_idle")],
        ..QueryConfig::with_id("persisted")
    };
    let editor = editor(cell(vec![CellQuery {
        query: String::new(),
        query_config: Some(config),
        source: None,
    }]));

    let saved = editor.save();

    insta::assert_snapshot!(saved.queries[0].query, @r#"SELECT mean("usage_idle") AS "mean_usage_idle" FROM "telegraf"."autogen"."cpu" WHERE time > :dashboardTime:"#);
}

// ===== open =====

#[tokio::test]
async fn test_open_in_script_mode_fetches() {
    let h = harness(
        MockParser::with_suggestions(vec![Suggestion::new("from")]),
        MockExecutor::returning(TimeSeriesResult {
            tables: vec![table("a")],
            did_truncate: false,
        }),
    );
    let sync = h.sync.clone().with_script("from(bucket: \"telegraf\")");
    let mut editor = CellEditor::new(cell(Vec::new()), sync, vec![source("1")], source("1"));
    editor.change_service(service(), source("1"));

    editor.open().await;

    assert_eq!(editor.sync().suggestions().len(), 1);
    assert_eq!(editor.sync().data(), vec![table("a")]);
    assert_eq!(h.executor.calls(), 1);
}

#[tokio::test]
async fn test_open_without_service_only_loads_catalog() {
    let h = harness(
        MockParser::with_suggestions(vec![Suggestion::new("from")]),
        MockExecutor::returning(TimeSeriesResult::default()),
    );
    let sync = h.sync.clone().with_script("from(bucket: \"telegraf\")");
    let editor = CellEditor::new(cell(Vec::new()), sync, vec![source("1")], source("1"));

    editor.open().await;

    assert_eq!(editor.sync().suggestions().len(), 1);
    assert_eq!(h.executor.calls(), 0);
}
