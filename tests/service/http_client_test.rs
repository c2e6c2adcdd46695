// tests/service/http_client_test.rs
//! HTTP clients against an in-process server.

use std::collections::HashMap;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use cellsync::flux::ArgType;
use cellsync::service::{
    ConfigResolver, FluxHttpClient, FluxParser, HttpConfigResolver, QueryExecutor, QueryRequest,
    Service, ServiceError,
};
use serde_json::{json, Value};

const CSV: &str = "#datatype,string,long,dateTime:RFC3339,double,string\n\
#group,false,false,false,false,true\n\
#default,_result,,,,\n\
,result,table,_time,_value,host\n\
,,0,2018-06-01T00:00:00Z,1.5,a\n\
,,0,2018-06-01T00:01:00Z,2.5,a\n\
,,1,2018-06-01T00:00:00Z,7,b\n\
,,1,2018-06-01T00:01:00Z,8,b\n";

const ERROR_CSV: &str = "#datatype,string,string\n\
#group,true,true\n\
#default,,\n\
,error,reference\n\
,failed to initialize execute state,\n";

fn program_json() -> Value {
    json!({
        "type": "Program",
        "body": [{
            "type": "ExpressionStatement",
            "location": {"start": {"line": 1, "column": 1}, "source": "from(bucket: \"telegraf\")"},
            "expression": {
                "type": "CallExpression",
                "callee": {"type": "Identifier", "name": "from"},
                "arguments": [{
                    "type": "ObjectExpression",
                    "properties": [{
                        "type": "Property",
                        "key": {"type": "Identifier", "name": "bucket"},
                        "value": {"type": "StringLiteral", "value": "telegraf"}
                    }]
                }]
            }
        }]
    })
}

fn csv_reply(params: &HashMap<String, String>, body: &str) -> (StatusCode, String) {
    if params.get("path").map(String::as_str) != Some("/v2/query") {
        return (StatusCode::NOT_FOUND, "unknown path".to_string());
    }
    (StatusCode::OK, body.to_string())
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route(
            "/ast",
            post(|Json(req): Json<Value>| async move {
                let script = req["body"].as_str().unwrap_or_default();
                if script.contains("!!") {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({"message": "expected expression, got !!"})),
                    );
                }
                (StatusCode::OK, Json(json!({"ast": program_json()})))
            }),
        )
        .route(
            "/suggestions",
            get(|| async {
                Json(json!({"funcs": [
                    {"name": "from", "params": {"bucket": "string"}},
                    {"name": "range", "params": {"start": "duration", "stop": "duration"}}
                ]}))
            }),
        )
        .route(
            "/services/ok/proxy",
            post(|Query(params): Query<HashMap<String, String>>| async move {
                csv_reply(&params, CSV)
            }),
        )
        .route(
            "/services/error-table/proxy",
            post(|Query(params): Query<HashMap<String, String>>| async move {
                csv_reply(&params, ERROR_CSV)
            }),
        )
        .route(
            "/services/down/proxy",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "engine unavailable"})),
                )
            }),
        )
        .route(
            "/queries",
            post(|Json(req): Json<Value>| async move {
                let queries: Vec<Value> = req["queries"]
                    .as_array()
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .map(|q| {
                        json!({
                            "id": q["id"],
                            "query": q["query"],
                            "durationMs": 3_600_000,
                            "queryConfig": {
                                "id": q["id"],
                                "database": "telegraf",
                                "measurement": "cpu",
                                "fields": [{"value": "usage_idle", "type": "field"}]
                            }
                        })
                    })
                    .collect();
                Json(json!({"queries": queries}))
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{addr}")
}

fn client(base: &str) -> FluxHttpClient {
    FluxHttpClient::new(format!("{base}/ast"), format!("{base}/suggestions"))
}

fn service(base: &str, name: &str) -> Service {
    Service::with_proxy(format!("{base}/services/{name}/proxy"))
}

// ===== parser =====

#[tokio::test]
async fn test_parse_returns_tree() {
    let base = spawn_server().await;

    let program = client(&base).parse("from(bucket: \"telegraf\")").await.unwrap();

    assert_eq!(program.body.len(), 1);
    assert_eq!(
        program.body[0].location_source(),
        Some("from(bucket: \"telegraf\")")
    );
}

#[tokio::test]
async fn test_rejected_script_is_parse_error() {
    let base = spawn_server().await;

    let err = client(&base).parse("from(!!)").await.unwrap_err();

    assert!(err.is_parse_error());
    assert_eq!(err.diagnostic(), "expected expression, got !!");
}

#[tokio::test]
async fn test_suggestions() {
    let base = spawn_server().await;

    let suggestions = client(&base).suggestions().await.unwrap();

    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[1].name, "range");
    assert_eq!(
        cellsync::flux::suggestion::param_type(&suggestions, "range", "start"),
        Some(ArgType::Duration)
    );
}

#[tokio::test]
async fn test_unreachable_parser_is_transport_error() {
    let err = client("http://127.0.0.1:1").parse("x").await.unwrap_err();

    assert!(matches!(err, ServiceError::Transport { .. }));
    assert!(!err.is_parse_error());
}

// ===== execution =====

#[tokio::test]
async fn test_execute_decodes_tables() {
    let base = spawn_server().await;

    let result = client(&base)
        .execute(&service(&base, "ok"), "from(bucket: \"telegraf\")")
        .await
        .unwrap();

    assert!(!result.did_truncate);
    assert_eq!(result.tables.len(), 2);
    assert_eq!(result.tables[0].name, "host=a");
    assert_eq!(result.tables[1].data.len(), 3);
}

#[tokio::test]
async fn test_large_response_is_truncated() {
    let base = spawn_server().await;
    // Room for the annotations, the header and one data row plus a bit.
    let cap = CSV.lines().take(5).map(|l| l.len() + 1).sum::<usize>() + 10;
    let client = client(&base).with_max_response_bytes(cap);

    let result = client
        .execute(&service(&base, "ok"), "from(bucket: \"telegraf\")")
        .await
        .unwrap();

    assert!(result.did_truncate);
    assert_eq!(client.max_response_bytes(), cap);
    assert_eq!(result.tables.len(), 1);
    assert_eq!(result.tables[0].data.len(), 2);
}

#[tokio::test]
async fn test_error_table_is_execution_error() {
    let base = spawn_server().await;

    let err = client(&base)
        .execute(&service(&base, "error-table"), "bad()")
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Execution(_)));
    assert_eq!(err.diagnostic(), "failed to initialize execute state");
}

#[tokio::test]
async fn test_server_error_carries_message() {
    let base = spawn_server().await;

    let err = client(&base)
        .execute(&service(&base, "down"), "from()")
        .await
        .unwrap_err();

    match err {
        ServiceError::Status {
            status, message, ..
        } => {
            assert_eq!(status, 500);
            assert_eq!(message, "engine unavailable");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

// ===== resolution =====

#[tokio::test]
async fn test_resolve_queries() {
    let base = spawn_server().await;
    let resolver = HttpConfigResolver::new();

    let resolved = resolver
        .resolve(
            &format!("{base}/queries"),
            &[QueryRequest {
                query: "SELECT usage_idle FROM cpu".to_string(),
                id: "q1".to_string(),
            }],
        )
        .await
        .unwrap();

    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].id, "q1");
    assert_eq!(resolved[0].duration_ms, Some(3_600_000));
    assert_eq!(resolved[0].query_config.measurement.as_deref(), Some("cpu"));
}
