//! Ingestion and search workflows orchestrating the drive gateway, the AI
//! gateway, and the document store.

pub mod instructions;
pub mod naming;
mod service;
pub mod types;

pub use service::{WorkflowApi, WorkflowService};
pub use types::{
    BatchFailure, BatchOutcome, ExtractionError, IngestError, IngestOutcome, PdfStatus,
    SearchError,
};
