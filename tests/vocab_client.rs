//! HTTP-level behavior of `VocabClient` against a local axum server.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{patch, post};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use vocab_sync::client::{LD_JSON, MERGE_PATCH_JSON};
use vocab_sync::model::TermPayload;
use vocab_sync::{ApiError, TermApi, VocabClient, list_all_ids};

#[derive(Debug, Clone)]
struct Seen {
    route: &'static str,
    id: Option<String>,
    content_type: Option<String>,
    accept: Option<String>,
    body: String,
    query: HashMap<String, String>,
}

type Log = Arc<Mutex<Vec<Seen>>>;

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn record(
    log: &Log,
    route: &'static str,
    id: Option<String>,
    headers: &HeaderMap,
    body: String,
    query: HashMap<String, String>,
) {
    log.lock().await.push(Seen {
        route,
        id,
        content_type: header_value(headers, header::CONTENT_TYPE),
        accept: header_value(headers, header::ACCEPT),
        body,
        query,
    });
}

async fn create(State(log): State<Log>, headers: HeaderMap, body: String) -> StatusCode {
    let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    record(&log, "create", None, &headers, body, HashMap::new()).await;
    if parsed.get("id").is_some() {
        StatusCode::CREATED
    } else {
        StatusCode::BAD_REQUEST
    }
}

async fn patch_term(
    State(log): State<Log>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: String,
) -> StatusCode {
    let known = id == "ADDICTO:0000001";
    record(&log, "patch", Some(id), &headers, body, HashMap::new()).await;
    if known {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn delete_term(
    State(log): State<Log>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> StatusCode {
    record(&log, "delete", Some(id), &headers, String::new(), HashMap::new()).await;
    StatusCode::NO_CONTENT
}

async fn list(
    State(log): State<Log>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, String) {
    let label = query.get("label").cloned().unwrap_or_default();
    let page: usize = query
        .get("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1);
    record(&log, "list", None, &headers, String::new(), query).await;

    match label.as_str() {
        "boom" => (StatusCode::INTERNAL_SERVER_ERROR, String::new()),
        "garbage" => (StatusCode::OK, "<html>not json</html>".to_string()),
        _ => {
            let all = ["ADDICTO:0000001", "ADDICTO:0000002", "ADDICTO:0000003"];
            let members: Vec<Value> = all
                .iter()
                .skip((page - 1) * 2)
                .take(2)
                .map(|id| json!({"@id": format!("/terms/{id}"), "id": id, "label": "x"}))
                .collect();
            let body = json!({
                "@context": "/contexts/Term",
                "hydra:totalItems": all.len(),
                "hydra:member": members,
            });
            (StatusCode::OK, body.to_string())
        }
    }
}

async fn spawn_server() -> (String, Log) {
    let log: Log = Arc::default();
    let terms = Router::new()
        .route("/terms", post(create).get(list))
        .route("/terms/{id}", patch(patch_term).delete(delete_term))
        .with_state(log.clone());
    let app = Router::new().nest("/api", terms);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    // No trailing slash on purpose; the client must add one before joining.
    (format!("http://{addr}/api"), log)
}

fn client(base_url: &str) -> VocabClient {
    VocabClient::new(base_url, Some(Duration::from_secs(5))).expect("client")
}

fn payload(id: &str) -> TermPayload {
    TermPayload {
        id: Some(id.to_string()),
        label: Some("vaping".to_string()),
        curation_status: Some("Proposed".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn create_posts_ld_json_to_terms() {
    let (base, log) = spawn_server().await;
    let status = client(&base)
        .create_term(&payload("ADDICTO:0000001"))
        .await
        .expect("create");
    assert_eq!(status, 201);

    let seen = log.lock().await.clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].route, "create");
    assert_eq!(seen[0].content_type.as_deref(), Some(LD_JSON));
    assert_eq!(seen[0].accept.as_deref(), Some(LD_JSON));
    let body: Value = serde_json::from_str(&seen[0].body).expect("json body");
    assert_eq!(
        body,
        json!({"id": "ADDICTO:0000001", "label": "vaping", "curationStatus": "Proposed"})
    );
}

#[tokio::test]
async fn patch_uses_merge_patch_and_reports_status() {
    let (base, log) = spawn_server().await;
    let api = client(&base);

    assert_eq!(
        api.patch_term("ADDICTO:0000001", &payload("ADDICTO:0000001"))
            .await
            .expect("patch"),
        200
    );
    assert_eq!(
        api.patch_term("ADDICTO:0000404", &payload("ADDICTO:0000404"))
            .await
            .expect("patch"),
        404
    );

    let seen = log.lock().await.clone();
    assert_eq!(seen[0].id.as_deref(), Some("ADDICTO:0000001"));
    assert_eq!(seen[0].content_type.as_deref(), Some(MERGE_PATCH_JSON));
    assert_eq!(seen[0].accept.as_deref(), Some(LD_JSON));
    assert_eq!(seen[1].id.as_deref(), Some("ADDICTO:0000404"));
}

#[tokio::test]
async fn non_success_statuses_are_returned_not_raised() {
    let (base, _log) = spawn_server().await;
    let status = client(&base)
        .create_term(&TermPayload::default())
        .await
        .expect("create");
    assert_eq!(status, 400);
}

#[tokio::test]
async fn delete_targets_term_path() {
    let (base, log) = spawn_server().await;
    let status = client(&base)
        .delete_term("ADDICTO:0000002")
        .await
        .expect("delete");
    assert_eq!(status, 204);
    let seen = log.lock().await.clone();
    assert_eq!(seen[0].route, "delete");
    assert_eq!(seen[0].id.as_deref(), Some("ADDICTO:0000002"));
}

#[tokio::test]
async fn list_sends_paging_query_and_decodes_hydra_collection() {
    let (base, log) = spawn_server().await;
    let page = client(&base).list_terms("x", 2, 2).await.expect("list");
    assert_eq!(page.total_items, 3);
    assert_eq!(page.members.len(), 1);
    assert_eq!(page.members[0].id, "ADDICTO:0000003");

    let seen = log.lock().await.clone();
    assert_eq!(seen[0].query.get("label").map(String::as_str), Some("x"));
    assert_eq!(seen[0].query.get("page").map(String::as_str), Some("2"));
    assert_eq!(seen[0].query.get("itemsPerPage").map(String::as_str), Some("2"));
}

#[tokio::test]
async fn list_all_ids_walks_every_page() {
    let (base, log) = spawn_server().await;
    let ids = list_all_ids(&client(&base), "", 2).await.expect("list all");
    assert_eq!(ids, vec!["ADDICTO:0000001", "ADDICTO:0000002", "ADDICTO:0000003"]);
    assert_eq!(log.lock().await.len(), 2);
}

#[tokio::test]
async fn list_errors_carry_url_and_reason() {
    let (base, _log) = spawn_server().await;
    let api = client(&base);

    let err = api.list_terms("boom", 1, 10).await.unwrap_err();
    assert_matches!(err, ApiError::Status { status: 500, ref url } if url.ends_with("/api/terms"));

    let err = api.list_terms("garbage", 1, 10).await.unwrap_err();
    assert_matches!(err, ApiError::Decode { .. });
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = client(&format!("http://{addr}/"))
        .create_term(&payload("ADDICTO:0000001"))
        .await
        .unwrap_err();
    assert_matches!(err, ApiError::Transport(_));
}
