//! Shared types used by the drive client.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned while interacting with the drive API.
#[derive(Debug, Error)]
pub enum DriveError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid drive URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Requested file identifier does not resolve.
    #[error("Drive file not found: {0}")]
    NotFound(String),
    /// Drive responded with an unexpected status code.
    #[error("Unexpected drive response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from the drive API.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// File metadata as reported by the drive API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveFile {
    /// External file identifier.
    pub id: String,
    /// Current display name.
    pub name: String,
    /// MIME type reported by the drive.
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Last modification timestamp, when reported.
    #[serde(rename = "modifiedTime", skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ListFilesResponse {
    #[serde(default)]
    pub(crate) files: Vec<DriveFile>,
    #[serde(rename = "nextPageToken")]
    pub(crate) next_page_token: Option<String>,
}
