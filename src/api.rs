//! HTTP surface for Fichario.
//!
//! This module exposes a compact Axum router with the JSON endpoints the
//! front end consumes:
//!
//! - `GET /api/drive/pdfs` – List drive PDFs annotated with their processing state.
//! - `POST /api/vector-store/init` – Ensure the hosted vector store exists (idempotent).
//! - `POST /api/drive/process/:file_id` – Run the full ingestion workflow for one file.
//! - `POST /api/drive/process-all` – Sequentially process every listed file.
//! - `POST /api/search` – Answer a natural-language query over ingested documents.
//! - `GET /api/metrics` – Observe workflow counters.
//!
//! Handlers are generic over [`WorkflowApi`] so they can be exercised with
//! stub services in tests.

use crate::schema::{DocumentMetadata, SearchAnswer, SearchQuery};
use crate::workflow::{BatchOutcome, IngestError, PdfStatus, SearchError, WorkflowApi};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the workflow API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: WorkflowApi + 'static,
{
    Router::new()
        .route("/api/drive/pdfs", get(list_pdfs::<S>))
        .route("/api/vector-store/init", post(init_vector_store::<S>))
        .route("/api/drive/process/:file_id", post(process_file::<S>))
        .route("/api/drive/process-all", post(process_all::<S>))
        .route("/api/search", post(search::<S>))
        .route("/api/metrics", get(get_metrics::<S>))
        .with_state(service)
}

/// One listed file in the `GET /api/drive/pdfs` response.
#[derive(Serialize)]
struct PdfFileDto {
    /// External drive identifier.
    id: String,
    /// Current display name on the drive.
    name: String,
    /// MIME type reported by the drive.
    #[serde(rename = "mimeType")]
    mime_type: String,
    /// Last modification timestamp, when reported.
    #[serde(rename = "modifiedTime", skip_serializing_if = "Option::is_none")]
    modified_time: Option<String>,
    /// Whether a fichamento has been persisted for this file.
    processed: bool,
    /// Persisted fichamento, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<DocumentMetadata>,
}

impl From<PdfStatus> for PdfFileDto {
    fn from(status: PdfStatus) -> Self {
        Self {
            id: status.file.id,
            name: status.file.name,
            mime_type: status.file.mime_type,
            modified_time: status.file.modified_time,
            processed: status.processed,
            metadata: status.metadata,
        }
    }
}

/// Response body for `GET /api/drive/pdfs`.
#[derive(Serialize)]
struct PdfsResponse {
    files: Vec<PdfFileDto>,
}

/// List drive PDFs merged with their persisted processing state.
async fn list_pdfs<S>(State(service): State<Arc<S>>) -> Result<Json<PdfsResponse>, AppError>
where
    S: WorkflowApi,
{
    let statuses = service.list_pdfs().await?;
    Ok(Json(PdfsResponse {
        files: statuses.into_iter().map(PdfFileDto::from).collect(),
    }))
}

/// Response body for `POST /api/vector-store/init`.
#[derive(Serialize)]
struct InitVectorStoreResponse {
    #[serde(rename = "vectorStoreId")]
    vector_store_id: String,
}

/// Ensure the vector store exists, creating it at most once.
async fn init_vector_store<S>(
    State(service): State<Arc<S>>,
) -> Result<Json<InitVectorStoreResponse>, AppError>
where
    S: WorkflowApi,
{
    let vector_store_id = service.init_vector_store().await?;
    Ok(Json(InitVectorStoreResponse { vector_store_id }))
}

/// Success response for `POST /api/drive/process/:file_id`.
#[derive(Serialize)]
struct ProcessResponse {
    success: bool,
    #[serde(rename = "fileId")]
    file_id: String,
    metadata: DocumentMetadata,
    #[serde(rename = "newFileName")]
    new_file_name: String,
}

/// Run the full ingestion workflow for one drive file.
async fn process_file<S>(
    State(service): State<Arc<S>>,
    Path(file_id): Path<String>,
) -> Result<Json<ProcessResponse>, AppError>
where
    S: WorkflowApi,
{
    let outcome = service.process_file(&file_id).await?;
    tracing::info!(
        file_id = %outcome.file_id,
        new_file_name = %outcome.new_file_name,
        "Process request completed"
    );
    Ok(Json(ProcessResponse {
        success: true,
        file_id: outcome.file_id,
        metadata: outcome.metadata,
        new_file_name: outcome.new_file_name,
    }))
}

/// One per-file failure in the batch report.
#[derive(Serialize)]
struct BatchFailureDto {
    #[serde(rename = "fileId")]
    file_id: String,
    message: String,
}

/// Response body for `POST /api/drive/process-all`.
#[derive(Serialize)]
struct BatchResponse {
    processed: Vec<String>,
    failed: Vec<BatchFailureDto>,
}

impl From<BatchOutcome> for BatchResponse {
    fn from(outcome: BatchOutcome) -> Self {
        Self {
            processed: outcome.processed,
            failed: outcome
                .failed
                .into_iter()
                .map(|failure| BatchFailureDto {
                    file_id: failure.file_id,
                    message: failure.message,
                })
                .collect(),
        }
    }
}

/// Process every listed file sequentially with the configured pacing.
async fn process_all<S>(State(service): State<Arc<S>>) -> Result<Json<BatchResponse>, AppError>
where
    S: WorkflowApi,
{
    let outcome = service.process_all().await?;
    Ok(Json(BatchResponse::from(outcome)))
}

/// Answer a natural-language query over the ingested documents.
async fn search<S>(
    State(service): State<Arc<S>>,
    Json(query): Json<SearchQuery>,
) -> Result<Json<SearchAnswer>, AppError>
where
    S: WorkflowApi,
{
    let answer = service.search(query).await?;
    Ok(Json(answer))
}

/// Return a concise snapshot of workflow counters.
async fn get_metrics<S>(
    State(service): State<Arc<S>>,
) -> Json<crate::metrics::MetricsSnapshot>
where
    S: WorkflowApi,
{
    Json(service.metrics_snapshot())
}

enum AppError {
    Ingest(IngestError),
    Search(SearchError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::Search(SearchError::EmptyQuery) => (
                StatusCode::BAD_REQUEST,
                "Invalid request",
                SearchError::EmptyQuery.to_string(),
            ),
            AppError::Search(err) => (StatusCode::INTERNAL_SERVER_ERROR, "Search failed", err.to_string()),
            AppError::Ingest(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Processing failed",
                err.to_string(),
            ),
        };
        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(inner: IngestError) -> Self {
        Self::Ingest(inner)
    }
}

impl From<SearchError> for AppError {
    fn from(inner: SearchError) -> Self {
        Self::Search(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::create_router;
    use crate::metrics::MetricsSnapshot;
    use crate::schema::{parse_metadata, DocumentSummary, SearchAnswer, SearchQuery};
    use crate::workflow::{
        BatchOutcome, IngestError, IngestOutcome, PdfStatus, SearchError, WorkflowApi,
    };
    use crate::drive::DriveFile;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    fn sample_metadata() -> crate::schema::DocumentMetadata {
        parse_metadata(
            r#"{
                "identificacao": {"titulo": "Metformin Trial", "ano": 2024,
                                   "autores": ["Silva, J."], "area_tema": ["Endocrinologia"]},
                "conclusao_clinica": "Reduziu HbA1c.",
                "resumo_teleprompter": "Estudo randomizado."
            }"#,
        )
        .expect("sample metadata")
    }

    #[derive(Default)]
    struct StubWorkflow {
        processed_ids: Mutex<Vec<String>>,
        search_queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl WorkflowApi for StubWorkflow {
        async fn list_pdfs(&self) -> Result<Vec<PdfStatus>, IngestError> {
            Ok(vec![
                PdfStatus {
                    file: DriveFile {
                        id: "f1".into(),
                        name: "2024_Silva_Metformin_Trial_Endocrinologia.pdf".into(),
                        mime_type: "application/pdf".into(),
                        modified_time: Some("2024-05-01T10:00:00Z".into()),
                    },
                    processed: true,
                    metadata: Some(sample_metadata()),
                },
                PdfStatus {
                    file: DriveFile {
                        id: "f2".into(),
                        name: "unprocessed.pdf".into(),
                        mime_type: "application/pdf".into(),
                        modified_time: None,
                    },
                    processed: false,
                    metadata: None,
                },
            ])
        }

        async fn init_vector_store(&self) -> Result<String, IngestError> {
            Ok("vs_123".into())
        }

        async fn process_file(&self, file_id: &str) -> Result<IngestOutcome, IngestError> {
            self.processed_ids.lock().await.push(file_id.to_string());
            Ok(IngestOutcome {
                file_id: file_id.to_string(),
                new_file_name: "2024_Silva_Metformin_Trial_Endocrinologia.pdf".into(),
                metadata: sample_metadata(),
            })
        }

        async fn process_all(&self) -> Result<BatchOutcome, IngestError> {
            Ok(BatchOutcome::default())
        }

        async fn search(&self, query: SearchQuery) -> Result<SearchAnswer, SearchError> {
            if query.q.trim().is_empty() {
                return Err(SearchError::EmptyQuery);
            }
            self.search_queries.lock().await.push(query.q);
            Ok(SearchAnswer {
                content: "- Metformina reduz HbA1c".into(),
                documents: vec![DocumentSummary {
                    metadata: sample_metadata(),
                    display_name: "2024_Silva_Metformin_Trial_Endocrinologia.pdf".into(),
                }],
            })
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                documents_processed: 1,
                ingest_failures: 0,
                searches_served: 2,
            }
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn pdfs_listing_exposes_processing_state() {
        let app = create_router(Arc::new(StubWorkflow::default()));
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/api/drive/pdfs")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let files = json["files"].as_array().expect("files array");
        assert_eq!(files.len(), 2);
        assert_eq!(files[0]["mimeType"], "application/pdf");
        assert_eq!(files[0]["processed"], true);
        assert_eq!(files[0]["metadata"]["identificacao"]["titulo"], "Metformin Trial");
        assert_eq!(files[1]["processed"], false);
        assert!(files[1].get("metadata").is_none());
        assert!(files[1].get("modifiedTime").is_none());
    }

    #[tokio::test]
    async fn process_route_reports_new_file_name() {
        let service = Arc::new(StubWorkflow::default());
        let app = create_router(service.clone());
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/drive/process/file-42")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["fileId"], "file-42");
        assert_eq!(
            json["newFileName"],
            "2024_Silva_Metformin_Trial_Endocrinologia.pdf"
        );
        assert_eq!(json["metadata"]["identificacao"]["ano"], 2024);

        let processed = service.processed_ids.lock().await;
        assert_eq!(processed.as_slice(), ["file-42"]);
    }

    #[tokio::test]
    async fn vector_store_init_returns_identifier() {
        let app = create_router(Arc::new(StubWorkflow::default()));
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/vector-store/init")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["vectorStoreId"], "vs_123");
    }

    #[tokio::test]
    async fn empty_search_query_is_rejected_with_400() {
        let app = create_router(Arc::new(StubWorkflow::default()));
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/search")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({"q": "   "}).to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Invalid request");
    }

    #[tokio::test]
    async fn search_returns_content_and_document_catalog() {
        let app = create_router(Arc::new(StubWorkflow::default()));
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/search")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({"q": "metformina", "filtros": {"ano": "2024"}}).to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["content"], "- Metformina reduz HbA1c");
        let documents = json["documents"].as_array().expect("documents");
        assert_eq!(documents.len(), 1);
        assert_eq!(
            documents[0]["display_name"],
            "2024_Silva_Metformin_Trial_Endocrinologia.pdf"
        );
    }

    #[tokio::test]
    async fn metrics_route_reports_counters() {
        let app = create_router(Arc::new(StubWorkflow::default()));
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/api/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["documents_processed"], 1);
        assert_eq!(json["searches_served"], 2);
    }
}
