//! Shared types used by the AI gateway client.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors returned while interacting with the AI gateway.
#[derive(Debug, Error)]
pub enum OpenAiError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid AI gateway URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Gateway responded with an unexpected status code.
    #[error("Unexpected AI gateway response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from the gateway.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Assistant run ended in a non-successful terminal state.
    #[error("Assistant run ended with status '{status}'")]
    RunFailed {
        /// Terminal status reported by the gateway.
        status: String,
    },
}

/// Result of one single-turn assistant run.
#[derive(Debug, Clone)]
pub struct AssistantRunOutcome {
    /// Identifier of the transient thread, needed for cleanup.
    pub thread_id: String,
    /// First assistant-authored text message, when one was produced.
    pub reply: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct CreatedObject {
    pub(crate) id: String,
}

#[derive(Deserialize)]
pub(crate) struct RunObject {
    pub(crate) id: String,
    pub(crate) status: String,
}

#[derive(Deserialize)]
pub(crate) struct MessageListResponse {
    pub(crate) data: Vec<ThreadMessage>,
}

#[derive(Deserialize)]
pub(crate) struct ThreadMessage {
    pub(crate) role: String,
    #[serde(default)]
    pub(crate) content: Vec<MessageContent>,
}

#[derive(Deserialize)]
pub(crate) struct MessageContent {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) text: Option<MessageText>,
}

#[derive(Deserialize)]
pub(crate) struct MessageText {
    pub(crate) value: String,
}
