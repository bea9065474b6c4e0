//! Deployment settings loaded from a TOML file
//!
//! The settings file holds everything that is safe to commit:
//! - Which chat backend serves `/api/chat`
//! - Prompt and vector store identifiers
//! - Server and upload limits
//!
//! Secrets never live in the file. Each section names the environment
//! variable that carries its credential instead.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root settings file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    /// Listener settings
    #[serde(default)]
    pub server: ServerSection,

    /// Chat proxy settings
    #[serde(default)]
    pub chat: ChatSection,

    /// OpenAI settings (Responses API and vector store)
    #[serde(default)]
    pub openai: OpenAiSection,

    /// n8n webhook settings
    #[serde(default)]
    pub webhook: WebhookSection,

    /// Vector store used for transcript retrieval
    #[serde(default)]
    pub vector_store: VectorStoreSection,

    /// Access gate settings
    #[serde(default)]
    pub access: AccessSection,
}

impl SettingsFile {
    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load settings from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: SettingsFile = toml::from_str(content)?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// Largest accepted transcript upload, in bytes
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatSection {
    /// Backend name: "openai" or "webhook"
    #[serde(default)]
    pub backend: Option<String>,

    /// Upstream request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiSection {
    /// Custom API endpoint
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Stored prompt used by the Responses API
    #[serde(default)]
    pub prompt_id: Option<String>,

    #[serde(default)]
    pub prompt_version: Option<String>,

    /// Model override; the stored prompt's model is used when unset
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookSection {
    #[serde(default)]
    pub url: Option<String>,

    /// Environment variable holding the JWT sent to the webhook
    #[serde(default)]
    pub token_env: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorStoreSection {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessSection {
    /// Environment variable holding the access password
    #[serde(default)]
    pub password_env: Option<String>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_SETTINGS: &str = r#"
[server]
host = "0.0.0.0"
port = 8080
max_upload_bytes = 2097152

[chat]
backend = "webhook"
timeout_secs = 45

[openai]
api_key_env = "ASSISTANT_OPENAI_KEY"
prompt_id = "pmpt_podcast"
prompt_version = "4"

[webhook]
url = "https://n8n.example.com/webhook/assistant"
token_env = "N8N_JWT"

[vector_store]
id = "vs_transcripts"

[access]
password_env = "ASSISTANT_PASSWORD"
"#;

    #[test]
    fn test_parse_settings() {
        let settings = SettingsFile::from_toml(SAMPLE_SETTINGS).unwrap();

        assert_eq!(settings.server.port, Some(8080));
        assert_eq!(settings.server.max_upload_bytes, Some(2 * 1024 * 1024));
        assert_eq!(settings.chat.backend.as_deref(), Some("webhook"));
        assert_eq!(settings.chat.timeout_secs, Some(45));
        assert_eq!(settings.openai.prompt_id.as_deref(), Some("pmpt_podcast"));
        assert_eq!(settings.webhook.token_env.as_deref(), Some("N8N_JWT"));
        assert_eq!(settings.vector_store.id.as_deref(), Some("vs_transcripts"));
        assert_eq!(
            settings.access.password_env.as_deref(),
            Some("ASSISTANT_PASSWORD")
        );
    }

    #[test]
    fn test_empty_settings() {
        let settings = SettingsFile::from_toml("").unwrap();
        assert!(settings.chat.backend.is_none());
        assert!(settings.openai.api_key_env.is_none());
    }

    #[test]
    fn test_invalid_toml() {
        let err = SettingsFile::from_toml("[chat\nbackend = ").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
