//! OpenAI Responses API provider
//!
//! Requests reference a stored prompt (which carries the model, instructions
//! and the `file_search` tool bound to the transcript vector store) and chain
//! turns through `previous_response_id`, so no history is resent.
//!
//! # Configuration
//!
//! ```toml
//! [openai]
//! api_key_env = "OPENAI_API_KEY"
//! prompt_id = "pmpt_..."
//! prompt_version = "2"
//! ```

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::OpenAiSettings;

use super::output::{first_text, OutputItem};
use super::{ChatQuery, ChatReply, ProviderError};

pub const INVALID_KEY: &str = "Invalid OpenAI API key";
pub const NOT_FOUND: &str = "OpenAI prompt or endpoint not found. Please check your configuration.";

#[derive(Debug, Serialize)]
struct PromptRef<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Metadata<'a> {
    session_id: &'a str,
}

/// Responses API request
#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    prompt: PromptRef<'a>,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_response_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    metadata: Metadata<'a>,
}

/// Responses API response
#[derive(Debug, Deserialize)]
struct ResponsesPayload {
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    output_text: Option<String>,
}

/// Error response from API
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

pub struct OpenAiResponsesProvider {
    client: Client,
    settings: OpenAiSettings,
}

impl OpenAiResponsesProvider {
    pub fn new(client: Client, settings: OpenAiSettings) -> Self {
        Self { client, settings }
    }

    pub async fn chat(&self, query: &ChatQuery) -> Result<ChatReply, ProviderError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("OpenAI API key not configured".into()))?;
        let prompt_id = self
            .settings
            .prompt_id
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("OpenAI prompt ID not configured".into()))?;

        let request = ResponsesRequest {
            prompt: PromptRef {
                id: prompt_id,
                version: self.settings.prompt_version.as_deref(),
            },
            input: &query.message,
            previous_response_id: query.previous_response_id.as_deref(),
            model: self.settings.model.as_deref(),
            metadata: Metadata {
                session_id: &query.session_id,
            },
        };

        tracing::debug!(
            session_id = %query.session_id,
            previous_response_id = ?query.previous_response_id,
            "forwarding message to Responses API"
        );

        let response = self
            .client
            .post(format!("{}/responses", self.settings.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.clone());
            tracing::error!(%status, %detail, "Responses API error");

            return Err(match status {
                StatusCode::NOT_FOUND => ProviderError::NotFound(NOT_FOUND.into()),
                StatusCode::UNAUTHORIZED => ProviderError::Unauthorized(INVALID_KEY.into()),
                _ => ProviderError::Upstream {
                    status: status.as_u16(),
                    message: format!("OpenAI API error ({})", status.as_u16()),
                },
            });
        }

        let payload: ResponsesPayload = serde_json::from_str(&body).map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse response: {} - Body: {}", e, body))
        })?;

        let output = first_text(&payload.output)
            .or_else(|| {
                payload
                    .output_text
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
            })
            .ok_or_else(|| {
                ProviderError::InvalidResponse(format!("No text output in response {}", payload.id))
            })?;

        tracing::debug!(response_id = %payload.id, status = ?payload.status, "Responses API reply");

        Ok(ChatReply {
            output,
            session_id: query.session_id.clone(),
            response_id: Some(payload.id),
            status: payload.status,
        })
    }
}
