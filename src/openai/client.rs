//! HTTP client wrapper for the AI gateway's file, vector-store, and assistant APIs.

use crate::config::get_config;
use crate::openai::types::{
    AssistantRunOutcome, CreatedObject, MessageListResponse, OpenAiError, RunObject,
};
use reqwest::{Client, Method};
use serde_json::json;
use std::time::Duration;

/// Delay between run-status polls. No overall timeout is layered on top; the
/// gateway's own run lifecycle bounds how long a run can stay in flight.
const POLL_INTERVAL: Duration = Duration::from_millis(750);

/// Run states that end polling.
const TERMINAL_STATUSES: [&str; 5] = ["completed", "failed", "cancelled", "expired", "incomplete"];

/// Lightweight HTTP client for AI gateway operations.
pub struct OpenAiService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) model: String,
}

impl OpenAiService {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, OpenAiError> {
        let config = get_config();
        let client = Client::builder().user_agent("fichario/0.1").build()?;

        let base_url =
            normalize_base_url(&config.openai_base_url).map_err(OpenAiError::InvalidUrl)?;
        tracing::debug!(url = %base_url, model = %config.openai_model, "Initialized AI gateway client");

        Ok(Self {
            client,
            base_url,
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
        })
    }

    /// Create a hosted vector store and return its identifier.
    pub async fn create_vector_store(&self, name: &str) -> Result<String, OpenAiError> {
        let response = self
            .request(Method::POST, "vector_stores")
            .json(&json!({ "name": name }))
            .send()
            .await?;
        let created: CreatedObject = self.parse(response).await?;
        tracing::info!(vector_store_id = %created.id, "Created vector store");
        Ok(created.id)
    }

    /// Upload binary file content for assistant use, returning the file identifier.
    pub async fn upload_file(
        &self,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<String, OpenAiError> {
        let part = reqwest::multipart::Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = reqwest::multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", part);

        let response = self
            .request(Method::POST, "files")
            .multipart(form)
            .send()
            .await?;
        let created: CreatedObject = self.parse(response).await?;
        tracing::debug!(file_id = %created.id, file_name, "Uploaded file");
        Ok(created.id)
    }

    /// Attach an uploaded file to a vector store, returning the attachment identifier.
    pub async fn attach_file(
        &self,
        vector_store_id: &str,
        file_id: &str,
    ) -> Result<String, OpenAiError> {
        let response = self
            .request(Method::POST, &format!("vector_stores/{vector_store_id}/files"))
            .json(&json!({ "file_id": file_id }))
            .send()
            .await?;
        let created: CreatedObject = self.parse(response).await?;
        tracing::debug!(vector_store_id, file_id, "Attached file to vector store");
        Ok(created.id)
    }

    /// Create a transient assistant with file search scoped to one vector store.
    pub async fn create_assistant(
        &self,
        name: &str,
        instructions: &str,
        vector_store_id: &str,
    ) -> Result<String, OpenAiError> {
        let body = json!({
            "model": self.model,
            "name": name,
            "instructions": instructions,
            "tools": [{ "type": "file_search" }],
            "tool_resources": {
                "file_search": { "vector_store_ids": [vector_store_id] }
            }
        });

        let response = self
            .request(Method::POST, "assistants")
            .json(&body)
            .send()
            .await?;
        let created: CreatedObject = self.parse(response).await?;
        tracing::debug!(assistant_id = %created.id, name, "Created assistant");
        Ok(created.id)
    }

    /// Run an assistant for a single user turn, polling the run to a terminal
    /// state and extracting the first assistant-authored text message.
    pub async fn run_single_turn(
        &self,
        assistant_id: &str,
        user_message: &str,
    ) -> Result<AssistantRunOutcome, OpenAiError> {
        let thread_body = json!({
            "messages": [{ "role": "user", "content": user_message }]
        });
        let response = self
            .request(Method::POST, "threads")
            .json(&thread_body)
            .send()
            .await?;
        let thread: CreatedObject = self.parse(response).await?;

        let response = self
            .request(Method::POST, &format!("threads/{}/runs", thread.id))
            .json(&json!({ "assistant_id": assistant_id }))
            .send()
            .await?;
        let run: RunObject = self.parse(response).await?;

        let status = self.poll_run(&thread.id, &run.id, run.status).await?;
        if status != "completed" {
            tracing::error!(thread_id = %thread.id, run_id = %run.id, status, "Assistant run did not complete");
            return Err(OpenAiError::RunFailed { status });
        }

        let reply = self.first_assistant_text(&thread.id).await?;
        Ok(AssistantRunOutcome {
            thread_id: thread.id,
            reply,
        })
    }

    /// Delete a transient assistant.
    pub async fn delete_assistant(&self, assistant_id: &str) -> Result<(), OpenAiError> {
        let response = self
            .request(Method::DELETE, &format!("assistants/{assistant_id}"))
            .send()
            .await?;
        self.parse::<serde_json::Value>(response).await?;
        Ok(())
    }

    /// Delete a transient thread.
    pub async fn delete_thread(&self, thread_id: &str) -> Result<(), OpenAiError> {
        let response = self
            .request(Method::DELETE, &format!("threads/{thread_id}"))
            .send()
            .await?;
        self.parse::<serde_json::Value>(response).await?;
        Ok(())
    }

    async fn poll_run(
        &self,
        thread_id: &str,
        run_id: &str,
        mut status: String,
    ) -> Result<String, OpenAiError> {
        while !TERMINAL_STATUSES.contains(&status.as_str()) {
            if status == "requires_action" {
                // File search never legitimately requires a tool submission.
                return Err(OpenAiError::RunFailed { status });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            let response = self
                .request(Method::GET, &format!("threads/{thread_id}/runs/{run_id}"))
                .send()
                .await?;
            let run: RunObject = self.parse(response).await?;
            status = run.status;
        }
        Ok(status)
    }

    async fn first_assistant_text(&self, thread_id: &str) -> Result<Option<String>, OpenAiError> {
        let response = self
            .request(Method::GET, &format!("threads/{thread_id}/messages"))
            .query(&[("order", "desc"), ("limit", "20")])
            .send()
            .await?;
        let messages: MessageListResponse = self.parse(response).await?;

        let reply = messages
            .data
            .into_iter()
            .filter(|message| message.role == "assistant")
            .flat_map(|message| message.content)
            .find(|content| content.kind == "text")
            .and_then(|content| content.text)
            .map(|text| text.value);
        Ok(reply)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        self.client
            .request(method, url)
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, OpenAiError> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = OpenAiError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "AI gateway request failed");
            Err(error)
        }
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
