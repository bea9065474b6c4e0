//! Transcript storage in an OpenAI vector store
//!
//! The vector store is the only authoritative copy of the transcript corpus.
//! This client lists its members (enriched with file names and sizes from
//! the Files API), uploads new transcripts and detaches old ones.

use futures::future::join_all;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::Config;
use crate::error::ApiError;
use crate::providers::http_client;

const BETA_HEADER: (&str, &str) = ("OpenAI-Beta", "assistants=v2");
const UNKNOWN_FILENAME: &str = "Unknown";

/// Upstream step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    List,
    Upload,
    Attach,
    Delete,
}

impl Step {
    fn failure(&self) -> &'static str {
        match self {
            Step::List => "Failed to list files",
            Step::Upload => "Failed to upload file",
            Step::Attach => "Failed to add file to vector store",
            Step::Delete => "Failed to delete file",
        }
    }
}

#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("{0}")]
    NotConfigured(&'static str),

    /// Non-success upstream status; `body` is the raw upstream text
    #[error("{step:?} failed with {status}: {body}")]
    Upstream { step: Step, status: u16, body: String },

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl VectorStoreError {
    /// Convert to an API error; `fallback` is shown for transport and parse
    /// failures, while upstream rejections are surfaced verbatim.
    pub fn into_api_error(self, fallback: &str) -> ApiError {
        match self {
            VectorStoreError::NotConfigured(msg) => ApiError::Internal(msg.to_string()),
            VectorStoreError::Upstream { step, status, body } => {
                ApiError::upstream(status, format!("{}: {}", step.failure(), body))
            }
            other => {
                tracing::error!(error = %other, "vector store request failed");
                ApiError::Internal(fallback.to_string())
            }
        }
    }
}

/// A transcript as listed to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptFile {
    pub id: String,
    pub filename: String,
    pub bytes: u64,
    pub status: String,
    pub created_at: i64,
}

/// One page of the vector store listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptPage {
    pub files: Vec<TranscriptFile>,
    pub has_more: bool,
    pub last_id: Option<String>,
}

/// Result of a completed upload
#[derive(Debug, Clone)]
pub struct UploadedTranscript {
    pub file_id: String,
    pub vector_store_file: Value,
}

#[derive(Debug, Deserialize)]
struct MemberFile {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    created_at: i64,
}

#[derive(Debug, Deserialize)]
struct MemberPage {
    data: Vec<MemberFile>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    last_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileDetails {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

pub struct VectorStoreClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    store_id: Option<String>,
}

impl VectorStoreClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        store_id: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
            store_id,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            http_client(config.timeout_secs)?,
            config.openai.base_url.clone(),
            config.openai.api_key.clone(),
            config.vector_store_id.clone(),
        ))
    }

    fn credentials(&self) -> Result<(&str, &str), VectorStoreError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(VectorStoreError::NotConfigured("OpenAI API key not configured"))?;
        let store = self
            .store_id
            .as_deref()
            .ok_or(VectorStoreError::NotConfigured("Vector store ID not configured"))?;
        Ok((key, store))
    }

    /// Fail early when the API key or store id is missing
    pub fn ensure_configured(&self) -> Result<(), VectorStoreError> {
        self.credentials().map(|_| ())
    }

    async fn send(step: Step, request: RequestBuilder) -> Result<String, VectorStoreError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(?step, %status, %body, "vector store API error");
            return Err(VectorStoreError::Upstream {
                step,
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    fn parse<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, VectorStoreError> {
        serde_json::from_str(body).map_err(|e| {
            VectorStoreError::InvalidResponse(format!("{} - Body: {}", e, body))
        })
    }

    /// List one page of vector store members, newest first
    pub async fn list_files(
        &self,
        limit: u32,
        after: Option<&str>,
    ) -> Result<TranscriptPage, VectorStoreError> {
        let (key, store) = self.credentials()?;

        let mut params = vec![("limit", limit.to_string())];
        if let Some(cursor) = after {
            params.push(("after", cursor.to_string()));
        }

        let request = self
            .client
            .get(format!("{}/vector_stores/{}/files", self.base_url, store))
            .query(&params)
            .bearer_auth(key)
            .header(BETA_HEADER.0, BETA_HEADER.1);

        let body = Self::send(Step::List, request).await?;
        let page: MemberPage = Self::parse(&body)?;

        let details = join_all(page.data.iter().map(|f| self.file_details(&f.id))).await;

        let files = page
            .data
            .into_iter()
            .zip(details)
            .map(|(member, details)| {
                let (filename, bytes) = match details {
                    Ok(d) => (
                        d.filename.unwrap_or_else(|| UNKNOWN_FILENAME.to_string()),
                        d.bytes.unwrap_or(0),
                    ),
                    Err(e) => {
                        tracing::warn!(file_id = %member.id, error = %e, "file lookup failed");
                        (UNKNOWN_FILENAME.to_string(), 0)
                    }
                };
                TranscriptFile {
                    id: member.id,
                    filename,
                    bytes,
                    status: member.status,
                    created_at: member.created_at,
                }
            })
            .collect();

        Ok(TranscriptPage {
            files,
            has_more: page.has_more,
            last_id: page.last_id,
        })
    }

    async fn file_details(&self, file_id: &str) -> Result<FileDetails, VectorStoreError> {
        let (key, _) = self.credentials()?;
        let request = self
            .client
            .get(format!("{}/files/{}", self.base_url, file_id))
            .bearer_auth(key);

        let body = Self::send(Step::List, request).await?;
        Self::parse(&body)
    }

    /// Upload a transcript to the Files API and attach it to the vector store
    pub async fn upload_file(
        &self,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedTranscript, VectorStoreError> {
        let (key, store) = self.credentials()?;

        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)?;
        let form = Form::new().text("purpose", "assistants").part("file", part);

        let request = self
            .client
            .post(format!("{}/files", self.base_url))
            .bearer_auth(key)
            .multipart(form);

        let body = Self::send(Step::Upload, request).await?;
        let created: CreatedFile = Self::parse(&body)?;
        tracing::info!(file_id = %created.id, %filename, "transcript uploaded");

        let request = self
            .client
            .post(format!("{}/vector_stores/{}/files", self.base_url, store))
            .bearer_auth(key)
            .header(BETA_HEADER.0, BETA_HEADER.1)
            .json(&json!({ "file_id": created.id }));

        let body = Self::send(Step::Attach, request).await?;
        let vector_store_file: Value = Self::parse(&body)?;
        tracing::info!(file_id = %created.id, vector_store_id = %store, "transcript added to vector store");

        Ok(UploadedTranscript {
            file_id: created.id,
            vector_store_file,
        })
    }

    /// Remove a file from the vector store
    pub async fn delete_file(&self, file_id: &str) -> Result<(), VectorStoreError> {
        let (key, store) = self.credentials()?;

        let request = self
            .client
            .delete(format!(
                "{}/vector_stores/{}/files/{}",
                self.base_url, store, file_id
            ))
            .bearer_auth(key)
            .header(BETA_HEADER.0, BETA_HEADER.1);

        Self::send(Step::Delete, request).await?;
        tracing::info!(%file_id, vector_store_id = %store, "transcript removed from vector store");
        Ok(())
    }
}
