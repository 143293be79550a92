use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tracker_engine::{
    BackendSettings, DebouncedSaver, RecordSaver, RecordStore, RestRecordStore, SaveError,
    SaveFailureKind, SaveOperation, StoreError,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, Serialize)]
struct Plan {
    date: String,
    notes: String,
}

fn store_for(server: &MockServer) -> RestRecordStore {
    RestRecordStore::new(BackendSettings::new(server.uri(), "anon-key")).unwrap()
}

#[tokio::test]
async fn update_by_id_patches_the_filtered_row() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/day_plans"))
        .and(query_param("id", "eq.2026-10-15"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .and(header("prefer", "return=representation"))
        .and(body_json(json!({ "notes": "rest day" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "id": "2026-10-15", "notes": "rest day" }])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    store_for(&server)
        .update_by_id("day_plans", "2026-10-15", &json!({ "notes": "rest day" }))
        .await
        .expect("update ok");
}

#[tokio::test]
async fn error_status_is_reported_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = store_for(&server)
        .update_by_id("day_plans", "2026-10-15", &json!({}))
        .await
        .unwrap_err();
    match err {
        StoreError::HttpStatus { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid api key");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(250)))
        .mount(&server)
        .await;

    let settings = BackendSettings {
        request_timeout: Duration::from_millis(50),
        ..BackendSettings::new(server.uri(), "anon-key")
    };
    let store = RestRecordStore::new(settings).unwrap();
    let saver = RecordSaver::new(store, "day_plans", |plan: &Plan| plan.date.clone());

    let err = saver
        .save(Plan {
            date: "2026-10-15".to_string(),
            notes: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, SaveFailureKind::Timeout);
}

#[tokio::test]
async fn debounced_burst_reaches_backend_once_with_latest_plan() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/day_plans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "2026-10-15" }])))
        .mount(&server)
        .await;

    let operation: Arc<dyn SaveOperation<Plan>> = Arc::new(RecordSaver::new(
        store_for(&server),
        "day_plans",
        |plan: &Plan| plan.date.clone(),
    ));
    let saver = DebouncedSaver::builder()
        .shared_operation(operation)
        .delay(Duration::from_millis(50))
        .build()
        .unwrap();

    for notes in ["r", "re", "rest", "rest day"] {
        saver.request_save(Plan {
            date: "2026-10-15".to_string(),
            notes: notes.to_string(),
        });
    }
    tokio::time::sleep(Duration::from_millis(400)).await;

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body, json!({ "date": "2026-10-15", "notes": "rest day" }));
    assert!(!saver.is_saving());
}

#[tokio::test]
async fn fetch_by_id_returns_first_matching_row() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/day_plans"))
        .and(query_param("date", "eq.2026-10-15"))
        .and(query_param("select", "*"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "date": "2026-10-15", "notes": "stored" }])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/day_plans"))
        .and(query_param("date", "eq.2026-10-16"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let settings = BackendSettings {
        key_column: "date".to_string(),
        ..BackendSettings::new(server.uri(), "anon-key")
    };
    let store = RestRecordStore::new(settings).unwrap();

    let row = store.fetch_by_id("day_plans", "2026-10-15").await.unwrap();
    assert_eq!(row, Some(json!({ "date": "2026-10-15", "notes": "stored" })));

    let missing = store.fetch_by_id("day_plans", "2026-10-16").await.unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn update_of_missing_row_inserts_it() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/day_plans"))
        .and(query_param("date", "eq.2026-10-16"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/day_plans"))
        .and(header("apikey", "anon-key"))
        .and(body_json(json!({ "date": "2026-10-16", "notes": "new day" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let settings = BackendSettings {
        key_column: "date".to_string(),
        ..BackendSettings::new(server.uri(), "anon-key")
    };
    RestRecordStore::new(settings)
        .unwrap()
        .update_by_id("day_plans", "2026-10-16", &json!({ "notes": "new day" }))
        .await
        .expect("missing row created");
}

#[tokio::test]
async fn update_matching_no_row_fails_when_creation_is_off() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let settings = BackendSettings {
        create_missing: false,
        ..BackendSettings::new(server.uri(), "anon-key")
    };
    let store = RestRecordStore::new(settings).unwrap();

    let err = store
        .update_by_id("day_plans", "2026-10-16", &json!({}))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, StoreError::NotFound { table, id } if table == "day_plans" && id == "2026-10-16"),
        "unexpected error {err:?}"
    );

    let saver = RecordSaver::new(store, "day_plans", |plan: &Plan| plan.date.clone());
    let err: SaveError = saver
        .save(Plan {
            date: "2026-10-16".to_string(),
            notes: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, SaveFailureKind::NotFound);
}
