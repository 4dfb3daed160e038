//! Workflow service coordinating the drive gateway, AI gateway, and store.

use crate::{
    config::get_config,
    drive::DriveService,
    metrics::{MetricsSnapshot, WorkflowMetrics},
    openai::OpenAiService,
    schema::{parse_metadata, DocumentSummary, SearchAnswer, SearchQuery},
    store::{DocumentStore, DocumentUpsert},
    workflow::{
        instructions::{extraction_instructions, extraction_user_message, search_instructions},
        naming::file_name_for,
        types::{
            BatchFailure, BatchOutcome, ExtractionError, IngestError, IngestOutcome, PdfStatus,
            SearchError,
        },
    },
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const VECTOR_STORE_NAME: &str = "fichario-library";
const EXTRACTOR_ASSISTANT_NAME: &str = "fichario-extrator";
const SEARCH_ASSISTANT_NAME: &str = "fichario-pesquisa";
const NO_RESULTS_FALLBACK: &str = "Nenhum resultado encontrado.";

/// Coordinates the full ingestion pipeline and the search workflow.
///
/// The service owns long-lived handles to the drive client, the AI gateway
/// client, the document store, and the metrics registry. Construct it once
/// near process start and share it through an `Arc`.
pub struct WorkflowService {
    drive: DriveService,
    openai: OpenAiService,
    store: DocumentStore,
    metrics: Arc<WorkflowMetrics>,
    batch_delay: Duration,
}

/// Abstraction over the workflow layer used by the HTTP surface.
#[async_trait]
pub trait WorkflowApi: Send + Sync {
    /// List drive PDFs annotated with their processing state.
    async fn list_pdfs(&self) -> Result<Vec<PdfStatus>, IngestError>;

    /// Ensure a vector store exists and return its identifier. Idempotent.
    async fn init_vector_store(&self) -> Result<String, IngestError>;

    /// Run the full ingestion workflow for one drive file.
    async fn process_file(&self, file_id: &str) -> Result<IngestOutcome, IngestError>;

    /// Run the ingestion workflow for every listed file, sequentially.
    async fn process_all(&self) -> Result<BatchOutcome, IngestError>;

    /// Answer a natural-language query over the ingested documents.
    async fn search(&self, query: SearchQuery) -> Result<SearchAnswer, SearchError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl WorkflowService {
    /// Build a new workflow service from environment configuration.
    pub fn new(store: DocumentStore) -> Self {
        let config = get_config();
        let drive = DriveService::new().expect("Failed to initialize drive client");
        let openai = OpenAiService::new().expect("Failed to initialize AI gateway client");

        Self {
            drive,
            openai,
            store,
            metrics: Arc::new(WorkflowMetrics::new()),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
        }
    }

    /// List drive PDFs merged with the persisted processing state.
    pub async fn list_pdfs(&self) -> Result<Vec<PdfStatus>, IngestError> {
        let files = self
            .drive
            .list_pdfs()
            .await
            .map_err(IngestError::SourceFetch)?;
        let records = self.store.get_all_documents().await?;
        let mut by_id: HashMap<String, _> = records
            .into_iter()
            .map(|record| (record.drive_file_id.clone(), record))
            .collect();

        let mut statuses = Vec::with_capacity(files.len());
        for file in files {
            let record = by_id.remove(&file.id);
            let metadata = match &record {
                // A row with unreadable metadata degrades to "unprocessed"
                // rather than failing the whole listing.
                Some(record) => match record.metadata() {
                    Ok(metadata) => metadata,
                    Err(err) => {
                        tracing::warn!(
                            drive_file_id = %record.drive_file_id,
                            error = %err,
                            "Listing document with unreadable stored metadata as unprocessed"
                        );
                        None
                    }
                },
                None => None,
            };
            statuses.push(PdfStatus {
                file,
                processed: metadata.is_some(),
                metadata,
            });
        }
        Ok(statuses)
    }

    /// Return the persisted vector-store identifier, provisioning one when absent.
    ///
    /// Resolution order: persisted row, then the legacy `VECTOR_STORE_ID`
    /// configuration (adopted and persisted on first use), then a freshly
    /// created store. The persistence layer keeps the first writer's value,
    /// so a lost race logs the orphaned upstream store instead of using it.
    pub async fn ensure_vector_store(&self) -> Result<String, IngestError> {
        if let Some(id) = self.store.get_vector_store().await? {
            return Ok(id);
        }

        if let Some(legacy) = &get_config().vector_store_id {
            let winner = self.store.persist_vector_store(legacy).await?;
            tracing::info!(vector_store_id = %winner, "Adopted pre-provisioned vector store");
            return Ok(winner);
        }

        let created = self
            .openai
            .create_vector_store(VECTOR_STORE_NAME)
            .await
            .map_err(IngestError::VectorStore)?;
        let winner = self.store.persist_vector_store(&created).await?;
        if winner != created {
            tracing::warn!(
                orphaned = %created,
                persisted = %winner,
                "Concurrent vector store creation; upstream store is unused"
            );
        }
        Ok(winner)
    }

    async fn run_ingestion(&self, file_id: &str) -> Result<IngestOutcome, IngestError> {
        tracing::info!(file_id, "Processing drive file");

        let file = self
            .drive
            .get_file(file_id)
            .await
            .map_err(IngestError::SourceFetch)?;
        let content = self
            .drive
            .download(file_id)
            .await
            .map_err(IngestError::SourceFetch)?;
        tracing::debug!(file_id, name = %file.name, bytes = content.len(), "Fetched source file");

        let vector_store_id = self.ensure_vector_store().await?;

        let uploaded_file_id = self
            .openai
            .upload_file(&file.name, content)
            .await
            .map_err(IngestError::Upload)?;
        let vector_store_file_id = self
            .openai
            .attach_file(&vector_store_id, &uploaded_file_id)
            .await
            .map_err(IngestError::Upload)?;
        tracing::debug!(file_id, vector_store_file_id, "File attached to vector store");

        let assistant_id = self
            .openai
            .create_assistant(
                EXTRACTOR_ASSISTANT_NAME,
                extraction_instructions(),
                &vector_store_id,
            )
            .await
            .map_err(|err| IngestError::Extraction(ExtractionError::Run(err)))?;
        let run = self
            .openai
            .run_single_turn(&assistant_id, &extraction_user_message(&file.name))
            .await
            .map_err(|err| IngestError::Extraction(ExtractionError::Run(err)))?;
        let reply = run
            .reply
            .ok_or(IngestError::Extraction(ExtractionError::NoReply))?;

        let metadata = parse_metadata(&reply)
            .map_err(|err| IngestError::Extraction(ExtractionError::Parse(err)))?;
        tracing::debug!(file_id, titulo = %metadata.identificacao.titulo, "Metadata extracted");

        let new_file_name = file_name_for(&metadata);
        self.drive
            .rename(file_id, &new_file_name)
            .await
            .map_err(IngestError::Rename)?;

        self.store
            .upsert_document(DocumentUpsert {
                drive_file_id: file_id.to_string(),
                original_file_name: file.name,
                renamed_file_name: Some(new_file_name.clone()),
                vector_store_file_id: Some(vector_store_file_id),
                metadata: Some(metadata.clone()),
            })
            .await?;

        self.cleanup_transients(&assistant_id, &run.thread_id).await;

        tracing::info!(file_id, new_file_name, "Drive file processed");
        Ok(IngestOutcome {
            file_id: file_id.to_string(),
            new_file_name,
            metadata,
        })
    }

    /// Run the ingestion workflow for one file, recording metrics either way.
    pub async fn process_file(&self, file_id: &str) -> Result<IngestOutcome, IngestError> {
        match self.run_ingestion(file_id).await {
            Ok(outcome) => {
                self.metrics.record_processed();
                Ok(outcome)
            }
            Err(err) => {
                self.metrics.record_failure();
                tracing::error!(file_id, error = %err, "Ingestion failed");
                Err(err)
            }
        }
    }

    /// Process every listed PDF sequentially, pacing with the configured delay.
    pub async fn process_all(&self) -> Result<BatchOutcome, IngestError> {
        let files = self
            .drive
            .list_pdfs()
            .await
            .map_err(IngestError::SourceFetch)?;
        tracing::info!(count = files.len(), "Starting batch processing");

        let mut outcome = BatchOutcome::default();
        for (position, file) in files.iter().enumerate() {
            if position > 0 {
                tokio::time::sleep(self.batch_delay).await;
            }
            match self.process_file(&file.id).await {
                Ok(_) => outcome.processed.push(file.id.clone()),
                Err(err) => outcome.failed.push(BatchFailure {
                    file_id: file.id.clone(),
                    message: err.to_string(),
                }),
            }
        }

        tracing::info!(
            processed = outcome.processed.len(),
            failed = outcome.failed.len(),
            "Batch processing finished"
        );
        Ok(outcome)
    }

    /// Answer a query by running a transient search assistant over the store.
    pub async fn search(&self, query: SearchQuery) -> Result<SearchAnswer, SearchError> {
        if query.q.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let vector_store_id = match self.store.get_vector_store().await? {
            Some(id) => id,
            // Legacy deployments configure the index id; adopt and persist it
            // so later calls take the store path.
            None => match &get_config().vector_store_id {
                Some(legacy) => {
                    let winner = self.store.persist_vector_store(legacy).await?;
                    tracing::info!(vector_store_id = %winner, "Adopted pre-provisioned vector store");
                    winner
                }
                None => return Err(SearchError::NotInitialized),
            },
        };

        let instructions = search_instructions(query.filtros.as_ref());
        let assistant_id = self
            .openai
            .create_assistant(SEARCH_ASSISTANT_NAME, &instructions, &vector_store_id)
            .await?;
        let run = self.openai.run_single_turn(&assistant_id, &query.q).await?;
        let content = run
            .reply
            .unwrap_or_else(|| NO_RESULTS_FALLBACK.to_string());

        self.cleanup_transients(&assistant_id, &run.thread_id).await;

        let mut documents = Vec::new();
        for record in self.store.documents_with_metadata().await? {
            match record.metadata() {
                Ok(Some(metadata)) => documents.push(DocumentSummary {
                    metadata,
                    display_name: record.display_name().to_string(),
                }),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        drive_file_id = %record.drive_file_id,
                        error = %err,
                        "Skipping document with unreadable stored metadata"
                    );
                }
            }
        }

        self.metrics.record_search();
        tracing::info!(documents = documents.len(), "Search answered");
        Ok(SearchAnswer { content, documents })
    }

    /// Best-effort deletion of the transient assistant and thread.
    async fn cleanup_transients(&self, assistant_id: &str, thread_id: &str) {
        if let Err(err) = self.openai.delete_assistant(assistant_id).await {
            tracing::warn!(assistant_id, error = %err, "Failed to delete transient assistant");
        }
        if let Err(err) = self.openai.delete_thread(thread_id).await {
            tracing::warn!(thread_id, error = %err, "Failed to delete transient thread");
        }
    }

    /// Return the current workflow metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl WorkflowApi for WorkflowService {
    async fn list_pdfs(&self) -> Result<Vec<PdfStatus>, IngestError> {
        WorkflowService::list_pdfs(self).await
    }

    async fn init_vector_store(&self) -> Result<String, IngestError> {
        WorkflowService::ensure_vector_store(self).await
    }

    async fn process_file(&self, file_id: &str) -> Result<IngestOutcome, IngestError> {
        WorkflowService::process_file(self, file_id).await
    }

    async fn process_all(&self) -> Result<BatchOutcome, IngestError> {
        WorkflowService::process_all(self).await
    }

    async fn search(&self, query: SearchQuery) -> Result<SearchAnswer, SearchError> {
        WorkflowService::search(self, query).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        WorkflowService::metrics_snapshot(self)
    }
}
