//! Core data types and error definitions for the ingestion and search workflows.

use crate::{
    drive::{DriveError, DriveFile},
    openai::OpenAiError,
    schema::{DocumentMetadata, MetadataParseError},
    store::StoreError,
};
use thiserror::Error;

/// Errors emitted while running the extraction step of an ingestion.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Assistant run failed at the gateway.
    #[error("assistant run failed: {0}")]
    Run(#[from] OpenAiError),
    /// Run completed but produced no assistant-authored text message.
    #[error("assistant produced no text reply")]
    NoReply,
    /// Reply did not parse into the metadata contract.
    #[error(transparent)]
    Parse(#[from] MetadataParseError),
}

/// Errors emitted by the ingestion workflow.
///
/// Each variant names the step that failed; side effects of earlier completed
/// steps are never rolled back.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Drive fetch or listing failed.
    #[error("Failed to fetch source file: {0}")]
    SourceFetch(#[source] DriveError),
    /// Vector store could not be provisioned or persisted.
    #[error("Failed to provision vector store: {0}")]
    VectorStore(#[source] OpenAiError),
    /// File upload or attachment was rejected by the gateway.
    #[error("Failed to upload file to the AI gateway: {0}")]
    Upload(#[source] OpenAiError),
    /// Metadata extraction produced no usable fichamento.
    #[error("Failed to extract metadata: {0}")]
    Extraction(#[source] ExtractionError),
    /// Drive rename was rejected.
    #[error("Failed to rename drive file: {0}")]
    Rename(#[source] DriveError),
    /// Persistence failed.
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),
}

/// Errors emitted by the search workflow.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Query was empty after trimming; rejected before any external call.
    #[error("Query must not be empty")]
    EmptyQuery,
    /// No vector store has ever been provisioned, so there is nothing to search.
    #[error("No documents have been ingested yet")]
    NotInitialized,
    /// Gateway call failed.
    #[error("AI gateway search failed: {0}")]
    Gateway(#[from] OpenAiError),
    /// Persistence failed while loading the document catalog.
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),
}

/// Summary of a completed ingestion run for one file.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// External drive identifier of the processed file.
    pub file_id: String,
    /// Derived name applied at the drive.
    pub new_file_name: String,
    /// Validated fichamento persisted for the file.
    pub metadata: DocumentMetadata,
}

/// One drive PDF annotated with its processing state.
#[derive(Debug, Clone)]
pub struct PdfStatus {
    /// Drive file metadata.
    pub file: DriveFile,
    /// Whether a fichamento has been persisted for this file.
    pub processed: bool,
    /// The persisted fichamento, when extraction has run.
    pub metadata: Option<DocumentMetadata>,
}

/// Per-file failure inside a batch run.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    /// External drive identifier of the failing file.
    pub file_id: String,
    /// Failure message reported for the file.
    pub message: String,
}

/// Report produced by processing every listed file sequentially.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Identifiers of files ingested successfully.
    pub processed: Vec<String>,
    /// Per-file failures; one file failing never halts the rest.
    pub failed: Vec<BatchFailure>,
}
