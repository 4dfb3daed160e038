//! Workflow guard rails: searching before any ingestion, re-initializing an
//! already-provisioned vector store, and listing over a damaged record.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use fichario::schema::parse_metadata;
use fichario::store::{DocumentStore, DocumentUpsert};
use fichario::{api, config, workflow::WorkflowService};
use httpmock::{Method::GET, Method::POST, MockServer};
use serde_json::json;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::OnceCell;
use tower::ServiceExt;

static INIT: OnceCell<()> = OnceCell::const_new();
static DRIVE_SERVER: OnceCell<&'static MockServer> = OnceCell::const_new();
static OPENAI_SERVER: OnceCell<&'static MockServer> = OnceCell::const_new();
static DATA_DIR: OnceCell<&'static tempfile::TempDir> = OnceCell::const_new();

fn set_env(key: &str, value: &str) {
    // SAFETY: Tests run in a single process and establish deterministic configuration upfront.
    unsafe { std::env::set_var(key, value) }
}

async fn init_harness() -> (&'static MockServer, &'static MockServer) {
    INIT.get_or_init(|| async {
        let drive_server: &'static MockServer = Box::leak(Box::new(MockServer::start_async().await));
        let openai_server: &'static MockServer =
            Box::leak(Box::new(MockServer::start_async().await));
        let data_dir: &'static tempfile::TempDir =
            Box::leak(Box::new(tempfile::tempdir().expect("temp dir")));

        set_env("OPENAI_API_KEY", "sk-test");
        set_env("OPENAI_BASE_URL", &openai_server.base_url());
        set_env("OPENAI_MODEL", "gpt-4o");
        set_env("DRIVE_BASE_URL", &drive_server.base_url());
        set_env("DRIVE_ACCESS_TOKEN", "drive-token");
        set_env(
            "DATABASE_PATH",
            data_dir
                .path()
                .join("unused.db")
                .to_str()
                .expect("utf-8 path"),
        );
        set_env("BATCH_DELAY_MS", "0");

        DRIVE_SERVER.set(drive_server).ok();
        OPENAI_SERVER.set(openai_server).ok();
        DATA_DIR.set(data_dir).ok();

        config::init_config();
    })
    .await;

    (
        DRIVE_SERVER.get().expect("drive server initialized"),
        OPENAI_SERVER.get().expect("openai server initialized"),
    )
}

fn db_path(name: &str) -> PathBuf {
    DATA_DIR.get().expect("data dir initialized").path().join(name)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn search_without_ingested_corpus_is_rejected() {
    init_harness().await;

    let store = DocumentStore::connect(&db_path("empty.db"))
        .await
        .expect("document store");
    let app = api::create_router(Arc::new(WorkflowService::new(store)));

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/search")
                .header("content-type", "application/json")
                .body(Body::from(json!({"q": "metformina"}).to_string()))
                .expect("request"),
        )
        .await
        .expect("search response");

    // No vector store was ever provisioned, so the query fails before any
    // gateway call rather than returning a vacuous answer.
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Search failed");
    assert_eq!(json["message"], "No documents have been ingested yet");
}

#[tokio::test]
async fn reinit_returns_persisted_store_without_creating_a_new_index() {
    let (_, openai) = init_harness().await;

    let create_mock = openai
        .mock_async(|when, then| {
            when.method(POST).path("/vector_stores");
            then.status(200).json_body(json!({"id": "vs_new"}));
        })
        .await;

    let store = DocumentStore::connect(&db_path("reinit.db"))
        .await
        .expect("document store");
    store
        .persist_vector_store("vs_existing")
        .await
        .expect("persist");
    let app = api::create_router(Arc::new(WorkflowService::new(store)));

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/vector-store/init")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("init response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["vectorStoreId"], "vs_existing");
    // The persisted identifier short-circuits provisioning entirely.
    create_mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn listing_degrades_row_with_unreadable_metadata() {
    let (drive, _) = init_harness().await;

    drive
        .mock_async(|when, then| {
            when.method(GET)
                .path("/files")
                .query_param("q", "mimeType='application/pdf' and trashed=false");
            then.status(200).json_body(json!({
                "files": [{
                    "id": "damaged-1",
                    "name": "estudo.pdf",
                    "mimeType": "application/pdf"
                }]
            }));
        })
        .await;

    let path = db_path("damaged.db");
    let store = DocumentStore::connect(&path).await.expect("document store");
    store
        .upsert_document(DocumentUpsert {
            drive_file_id: "damaged-1".into(),
            original_file_name: "estudo.pdf".into(),
            renamed_file_name: None,
            vector_store_file_id: Some("vsf_1".into()),
            metadata: Some(
                parse_metadata(
                    r#"{
                        "identificacao": {"titulo": "Metformin Trial", "ano": 2024},
                        "conclusao_clinica": "Reduziu HbA1c.",
                        "resumo_teleprompter": "Estudo randomizado."
                    }"#,
                )
                .expect("sample metadata"),
            ),
        })
        .await
        .expect("upsert");

    // Corrupt the stored column out of band, as a partial write would.
    let raw = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(SqliteConnectOptions::new().filename(&path))
        .await
        .expect("raw pool");
    sqlx::query("UPDATE documents SET metadata_json = '{broken' WHERE drive_file_id = ?")
        .bind("damaged-1")
        .execute(&raw)
        .await
        .expect("corrupt row");

    let app = api::create_router(Arc::new(WorkflowService::new(store)));
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/api/drive/pdfs")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("listing response");

    // The damaged row reads as unprocessed instead of failing the listing.
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let files = json["files"].as_array().expect("files");
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["id"], "damaged-1");
    assert_eq!(files[0]["processed"], false);
    assert!(files[0].get("metadata").is_none());
}
