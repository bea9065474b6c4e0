//! HTTP client for the assistant server
//!
//! Used by the terminal front-end. Speaks the same JSON the routes emit and
//! turns failures into the short messages shown to the user.

use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::{ChatTransport, OutgoingMessage, Reply};
use crate::gate::IssuedToken;
use crate::providers::http_client;
use crate::routes::{
    is_text_upload, DeleteResponse, HealthResponse, LogoutResponse, UploadResponse,
};
use crate::vector_store::{TranscriptFile, TranscriptPage};

pub const CLIENT_TIMEOUT_SECS: u64 = 30;

pub const AUTH_FAILED: &str = "Authentication failed. Please check your access credentials.";
pub const FORBIDDEN: &str = "Access forbidden. You don't have permission to use this service.";
pub const UNREACHABLE: &str =
    "Unable to connect to AI service. Please check your internet connection and try again.";
pub const UNAVAILABLE: &str = "AI service is temporarily unavailable. Please try again later.";
pub const SERVER_TROUBLE: &str =
    "AI service is experiencing issues. Please try again in a few moments.";
pub const GENERIC_CHAT_FAILURE: &str = "Failed to get response from AI. Please try again.";

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-success status
    #[error("{message} ({status})")]
    Status { status: StatusCode, message: String },

    /// No response at all: refused connection or timeout
    #[error("connection failed: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Refused locally, nothing was sent
    #[error("{0}")]
    Rejected(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            ClientError::Unreachable(e)
        } else if e.is_decode() {
            ClientError::InvalidResponse(e.to_string())
        } else {
            ClientError::Request(e)
        }
    }
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text shown in place of an AI answer when a chat turn fails
    pub fn user_message(&self) -> &'static str {
        match self {
            ClientError::Status { status, .. } => match status.as_u16() {
                401 => AUTH_FAILED,
                403 => FORBIDDEN,
                404 => UNAVAILABLE,
                s if s >= 500 => SERVER_TROUBLE,
                _ => GENERIC_CHAT_FAILURE,
            },
            ClientError::Unreachable(_) => UNREACHABLE,
            ClientError::Request(_)
            | ClientError::InvalidResponse(_)
            | ClientError::Rejected(_) => GENERIC_CHAT_FAILURE,
        }
    }
}

/// A failed chat turn, displayed as its user-facing message
#[derive(Debug, Error)]
#[error("{}", .0.user_message())]
pub struct ChatFailure(#[source] pub ClientError);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    response_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    password: &'a str,
}

pub struct AssistantClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl AssistantClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Ok(Self {
            http: http_client(CLIENT_TIMEOUT_SECS)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self.http.get(self.url("/health")).send().await?;
        parse(response).await
    }

    /// Exchange the shared password for a token, kept for later calls
    pub async fn login(&mut self, password: &str) -> Result<IssuedToken, ClientError> {
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&LoginBody { password })
            .send()
            .await?;

        let issued: IssuedToken = parse(response).await?;
        tracing::debug!(session_id = %issued.session_id, "logged in");
        self.token = Some(issued.token.clone());
        Ok(issued)
    }

    pub async fn logout(&mut self) -> Result<bool, ClientError> {
        if self.token.is_none() {
            return Ok(false);
        }

        let response = self
            .authorized(self.http.post(self.url("/api/auth/logout")))
            .send()
            .await?;
        let receipt: LogoutResponse = parse(response).await?;
        self.token = None;
        Ok(receipt.success)
    }

    pub async fn send_message(&self, message: &OutgoingMessage) -> Result<Reply, ClientError> {
        let mut query = vec![
            ("message", message.message.as_str()),
            ("sessionId", message.session_id.as_str()),
        ];
        if let Some(previous) = message.previous_response_id.as_deref() {
            query.push(("previousResponseId", previous));
        }

        let response = self
            .authorized(self.http.get(self.url("/api/chat")))
            .query(&query)
            .send()
            .await?;
        let body: ChatResponse = parse(response).await?;

        Ok(Reply {
            output: body.output.unwrap_or_default(),
            response_id: body.response_id,
            session_id: body.session_id,
        })
    }

    pub async fn list_transcripts(
        &self,
        limit: Option<u32>,
        after: Option<&str>,
    ) -> Result<TranscriptPage, ClientError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let response = self
            .authorized(self.http.get(self.url("/api/list-transcripts")))
            .query(&query)
            .send()
            .await?;
        parse(response).await
    }

    pub async fn upload_transcript(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse, ClientError> {
        if !is_text_upload(filename, None) {
            return Err(ClientError::Rejected("Only text files are allowed".into()));
        }

        let part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("text/plain")?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .authorized(self.http.post(self.url("/api/upload-transcript")))
            .multipart(form)
            .send()
            .await?;
        parse(response).await
    }

    /// Delete a transcript, returning the server's confirmation text
    pub async fn delete_transcript(&self, file_id: &str) -> Result<String, ClientError> {
        let response = self
            .authorized(self.http.delete(self.url("/api/list-transcripts")))
            .query(&[("fileId", file_id)])
            .send()
            .await?;
        let receipt: DeleteResponse = parse(response).await?;
        Ok(receipt.message)
    }
}

#[async_trait]
impl ChatTransport for AssistantClient {
    type Error = ChatFailure;

    async fn send_message(&self, message: &OutgoingMessage) -> Result<Reply, ChatFailure> {
        AssistantClient::send_message(self, message)
            .await
            .map_err(ChatFailure)
    }
}

/// Decode a success body, or turn the `{error}` body into a [`ClientError`]
async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or_else(|_| {
            if text.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                text
            }
        });

    tracing::debug!(%status, %message, "server returned an error");
    Err(ClientError::Status { status, message })
}

/// The accumulated transcript listing shown to the user
#[derive(Debug, Default, Clone)]
pub struct TranscriptListing {
    files: Vec<TranscriptFile>,
    has_more: bool,
    last_id: Option<String>,
}

impl TranscriptListing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything before a fresh first-page load
    pub fn reset(&mut self) {
        self.files.clear();
        self.has_more = false;
        self.last_id = None;
    }

    /// Append a page fetched with [`TranscriptListing::next_cursor`]
    pub fn apply_page(&mut self, page: TranscriptPage) {
        let advanced = page.last_id.is_some() && page.last_id != self.last_id;
        self.files.extend(page.files);
        self.has_more = page.has_more && advanced;
        if advanced {
            self.last_id = page.last_id;
        }
    }

    /// Cursor for "load more", present only while the store has more and
    /// the last page moved the cursor forward
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_more {
            self.last_id.as_deref()
        } else {
            None
        }
    }

    /// Drop a deleted file from the cached listing
    pub fn remove(&mut self, file_id: &str) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f.id != file_id);
        self.files.len() != before
    }

    pub fn files(&self) -> &[TranscriptFile] {
        &self.files
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }
}
