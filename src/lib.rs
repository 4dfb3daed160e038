#![deny(missing_docs)]
//! Fichario: a document-research service over a cloud drive.
//!
//! The crate lists PDFs from a drive folder, runs each one through a hosted
//! AI assistant to extract a structured fichamento, renames the file after
//! its bibliographic identity, persists the result in SQLite, and answers
//! natural-language questions over the ingested corpus.

pub mod api;
pub mod config;
pub mod drive;
pub mod logging;
pub mod metrics;
pub mod openai;
pub mod schema;
pub mod store;
pub mod workflow;
