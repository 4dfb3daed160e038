//! HTTP client wrapper for the drive API.

use crate::config::get_config;
use crate::drive::types::{DriveError, DriveFile, ListFilesResponse};
use reqwest::{Client, Method, StatusCode};
use serde_json::json;

const FILE_FIELDS: &str = "id,name,mimeType,modifiedTime";

/// Lightweight HTTP client for drive operations.
pub struct DriveService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) access_token: String,
    pub(crate) folder_id: Option<String>,
}

impl DriveService {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, DriveError> {
        let config = get_config();
        let client = Client::builder().user_agent("fichario/0.1").build()?;

        let base_url = normalize_base_url(&config.drive_base_url).map_err(DriveError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            folder = ?config.drive_folder_id,
            "Initialized drive HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            access_token: config.drive_access_token.clone(),
            folder_id: config.drive_folder_id.clone(),
        })
    }

    /// List every PDF visible in the configured folder scope.
    pub async fn list_pdfs(&self) -> Result<Vec<DriveFile>, DriveError> {
        let mut query = "mimeType='application/pdf' and trashed=false".to_string();
        if let Some(folder) = &self.folder_id {
            query.push_str(&format!(" and '{folder}' in parents"));
        }

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .request(Method::GET, "files")
                .query(&[("q", query.as_str()), ("fields", &format!("nextPageToken,files({FILE_FIELDS})"))]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let error = DriveError::UnexpectedStatus { status, body };
                tracing::error!(error = %error, "Failed to list drive files");
                return Err(error);
            }

            let payload: ListFilesResponse = response.json().await?;
            files.extend(payload.files);

            match payload.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        tracing::debug!(count = files.len(), "Listed drive PDFs");
        Ok(files)
    }

    /// Fetch the metadata of a single file.
    pub async fn get_file(&self, file_id: &str) -> Result<DriveFile, DriveError> {
        let response = self
            .request(Method::GET, &format!("files/{file_id}"))
            .query(&[("fields", FILE_FIELDS)])
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::NOT_FOUND => Err(DriveError::NotFound(file_id.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = DriveError::UnexpectedStatus { status, body };
                tracing::error!(file_id, error = %error, "Drive metadata fetch failed");
                Err(error)
            }
        }
    }

    /// Download the binary content of a file.
    pub async fn download(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        let response = self
            .request(Method::GET, &format!("files/{file_id}"))
            .query(&[("alt", "media")])
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.bytes().await?.to_vec()),
            StatusCode::NOT_FOUND => Err(DriveError::NotFound(file_id.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = DriveError::UnexpectedStatus { status, body };
                tracing::error!(file_id, error = %error, "Drive download failed");
                Err(error)
            }
        }
    }

    /// Rename a file in place, returning its updated metadata.
    pub async fn rename(&self, file_id: &str, new_name: &str) -> Result<DriveFile, DriveError> {
        let response = self
            .request(Method::PATCH, &format!("files/{file_id}"))
            .query(&[("fields", FILE_FIELDS)])
            .json(&json!({ "name": new_name }))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                tracing::debug!(file_id, new_name, "Drive file renamed");
                Ok(response.json().await?)
            }
            StatusCode::NOT_FOUND => Err(DriveError::NotFound(file_id.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = DriveError::UnexpectedStatus { status, body };
                tracing::error!(file_id, new_name, error = %error, "Drive rename failed");
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        self.client.request(method, url).bearer_auth(&self.access_token)
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
