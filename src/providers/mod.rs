//! Upstream chat backends
//!
//! `/api/chat` is served by exactly one backend, chosen by configuration:
//! the OpenAI Responses API or an n8n workflow webhook. Each backend owns the
//! mapping from its upstream failures to user-facing messages.

pub mod output;
mod openai_responses;
mod webhook;

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{BackendKind, Config};
use crate::error::ApiError;

pub use openai_responses::OpenAiResponsesProvider;
pub use webhook::WebhookProvider;

/// Message shown for transport failures and unusable payloads
pub const GENERIC_FAILURE: &str = "Failed to process request";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => ApiError::NotFound(msg),
            ProviderError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            ProviderError::Upstream { status, message } => ApiError::upstream(status, message),
            ProviderError::NotConfigured(msg) => ApiError::Internal(msg),
            ProviderError::RequestFailed(e) => {
                tracing::error!(error = %e, timeout = e.is_timeout(), "upstream request failed");
                ApiError::Internal(GENERIC_FAILURE.to_string())
            }
            ProviderError::InvalidResponse(detail) => {
                tracing::error!(%detail, "upstream returned an unusable payload");
                ApiError::Internal(GENERIC_FAILURE.to_string())
            }
        }
    }
}

/// One user turn forwarded upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatQuery {
    pub message: String,
    pub session_id: String,
    pub previous_response_id: Option<String>,
}

/// Normalised upstream answer returned by `/api/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub output: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

pub enum ChatBackend {
    OpenAi(OpenAiResponsesProvider),
    Webhook(WebhookProvider),
}

impl ChatBackend {
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let client = http_client(config.timeout_secs)?;

        Ok(match config.backend {
            BackendKind::OpenAi => {
                ChatBackend::OpenAi(OpenAiResponsesProvider::new(client, config.openai.clone()))
            }
            BackendKind::Webhook => {
                ChatBackend::Webhook(WebhookProvider::new(client, config.webhook.clone()))
            }
        })
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            ChatBackend::OpenAi(_) => BackendKind::OpenAi,
            ChatBackend::Webhook(_) => BackendKind::Webhook,
        }
    }

    pub async fn chat(&self, query: &ChatQuery) -> Result<ChatReply, ProviderError> {
        match self {
            ChatBackend::OpenAi(p) => p.chat(query).await,
            ChatBackend::Webhook(p) => p.chat(query).await,
        }
    }
}

/// HTTP client shared by upstream calls, with the fixed request timeout
pub fn http_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}
