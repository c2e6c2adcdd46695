// tests/sync/time_series_test.rs
#[path = "../common/mod.rs"]
mod common;

use cellsync::flux::{ScriptStatus, TimeSeriesResult};
use cellsync::service::Notification;
use common::{harness, service, table, MockExecutor, MockParser};

const SCRIPT: &str = "from(bucket: \"telegraf\")\n\t|> range(start: -1h)";

#[tokio::test]
async fn test_fetch_stores_tables() {
    let mut h = harness(
        MockParser::new(),
        MockExecutor::returning(TimeSeriesResult {
            tables: vec![table("a"), table("b")],
            did_truncate: false,
        }),
    );
    let sync = h.sync.clone().with_script(SCRIPT);

    let status = sync.fetch_time_series(&service()).await;

    assert_eq!(status, ScriptStatus::Success);
    assert_eq!(sync.data(), vec![table("a"), table("b")]);
    assert_eq!(sync.body().len(), 1);
    assert!(h.notifications.try_recv().is_err());
}

#[tokio::test]
async fn test_truncated_response_notifies_once_and_keeps_tables() {
    let mut h = harness(
        MockParser::new(),
        MockExecutor::returning(TimeSeriesResult {
            tables: vec![table("a")],
            did_truncate: true,
        })
        .with_max_bytes(2_000_000),
    );
    let sync = h.sync.clone().with_script(SCRIPT);

    sync.fetch_time_series(&service()).await;

    assert_eq!(sync.data(), vec![table("a")]);
    let notification = h.notifications.try_recv().unwrap();
    assert_eq!(notification, Notification::ResponseTruncated { max_bytes: 2_000_000 });
    assert_eq!(notification.message(), "Large response truncated to first 2 MB.");
    assert!(h.notifications.try_recv().is_err());
}

#[tokio::test]
async fn test_execution_error_clears_data_and_notifies() {
    let ok = harness(
        MockParser::new(),
        MockExecutor::returning(TimeSeriesResult {
            tables: vec![table("a")],
            did_truncate: false,
        }),
    );
    let sync = ok.sync.clone().with_script(SCRIPT);
    sync.fetch_time_series(&service()).await;
    assert_eq!(sync.data().len(), 1);

    let mut h = harness(MockParser::new(), MockExecutor::failing("bucket not found"));
    let sync = h.sync.clone().with_script(SCRIPT);
    sync.fetch_time_series(&service()).await;
    sync.fetch_time_series(&service()).await;

    assert!(sync.data().is_empty());
    assert_eq!(
        h.notifications.try_recv().unwrap(),
        Notification::TimeSeriesError {
            message: "bucket not found".to_string()
        }
    );
    // The script itself is fine, so the final parse still succeeds.
    assert_eq!(sync.status(), ScriptStatus::Success);
}

#[tokio::test]
async fn test_parse_error_skips_execution() {
    let mut h = harness(
        MockParser::new(),
        MockExecutor::returning(TimeSeriesResult::default()),
    );
    let sync = h.sync.clone().with_script("from(bucket: !!)");

    let status = sync.fetch_time_series(&service()).await;

    assert_eq!(status, ScriptStatus::error("unexpected token !!"));
    assert_eq!(sync.status(), status);
    assert_eq!(h.executor.calls(), 0);
    assert!(h.notifications.try_recv().is_err());
}

#[tokio::test]
async fn test_empty_script_is_a_no_op() {
    let h = harness(
        MockParser::new(),
        MockExecutor::returning(TimeSeriesResult::default()),
    );

    let status = h.sync.fetch_time_series(&service()).await;

    assert_eq!(status, ScriptStatus::None);
    assert_eq!(h.parser.calls(), 0);
    assert_eq!(h.executor.calls(), 0);
}

#[tokio::test]
async fn test_final_parse_does_not_change_script() {
    let h = harness(
        MockParser::new(),
        MockExecutor::returning(TimeSeriesResult::default()),
    );
    let sync = h.sync.clone().with_script(SCRIPT);

    sync.fetch_time_series(&service()).await;

    // One validation parse, one refresh parse.
    assert_eq!(h.parser.calls(), 2);
    assert_eq!(sync.script(), SCRIPT);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_overtaken_by_newer_parse_stops() {
    let mut h = harness(
        MockParser::new(),
        MockExecutor::returning(TimeSeriesResult {
            tables: vec![table("a")],
            did_truncate: false,
        }),
    );
    let sync = h.sync.clone().with_script("slow() !!");

    let svc = service();
    let (fetched, fast) = tokio::join!(
        sync.fetch_time_series(&svc),
        sync.request_parse("fast()", true),
    );

    assert_eq!(fast, ScriptStatus::Success);
    assert_eq!(fetched, ScriptStatus::Success);
    assert_eq!(sync.status(), ScriptStatus::Success);
    assert_eq!(sync.script(), "fast()");
    let names: Vec<String> = sync
        .body()
        .iter()
        .flat_map(|b| b.funcs.iter().map(|f| f.name.clone()))
        .collect();
    assert_eq!(names, vec!["fast"]);
    assert_eq!(h.executor.calls(), 0);
    assert!(sync.data().is_empty());
    assert!(h.notifications.try_recv().is_err());
}
