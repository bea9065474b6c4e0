//! Application configuration
//!
//! Values come from the environment (optionally seeded by `.env`), layered
//! over an optional TOML settings file named by `ASSISTANT_CONFIG`.

pub mod file;

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use file::{ConfigError, SettingsFile};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Which upstream serves `/api/chat`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    OpenAi,
    Webhook,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "responses" => Ok(BackendKind::OpenAi),
            "webhook" | "n8n" => Ok(BackendKind::Webhook),
            other => Err(ConfigError::Validation(format!(
                "unknown chat backend '{}', expected 'openai' or 'webhook'",
                other
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::OpenAi => write!(f, "openai"),
            BackendKind::Webhook => write!(f, "webhook"),
        }
    }
}

#[derive(Clone)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub prompt_id: Option<String>,
    pub prompt_version: Option<String>,
    pub model: Option<String>,
}

#[derive(Clone)]
pub struct WebhookSettings {
    pub url: Option<String>,
    pub token: Option<String>,
}

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub backend: BackendKind,
    pub openai: OpenAiSettings,
    pub webhook: WebhookSettings,
    pub vector_store_id: Option<String>,
    pub access_password: Option<String>,
    pub timeout_secs: u64,
    pub max_upload_bytes: usize,
}

// Secrets stay out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("backend", &self.backend)
            .field("openai_base_url", &self.openai.base_url)
            .field("openai_api_key", &self.openai.api_key.as_ref().map(|_| "***"))
            .field("prompt_id", &self.openai.prompt_id)
            .field("webhook_url", &self.webhook.url)
            .field("vector_store_id", &self.vector_store_id)
            .field("access_gate", &self.access_password.is_some())
            .field("timeout_secs", &self.timeout_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl Config {
    /// Load from the process environment and the optional settings file
    pub fn from_env() -> anyhow::Result<Self> {
        let settings = match env::var("ASSISTANT_CONFIG") {
            Ok(path) => SettingsFile::from_file(&PathBuf::from(path))?,
            Err(_) => SettingsFile::default(),
        };

        Ok(Self::resolve(&settings, |key| env::var(key).ok())?)
    }

    /// Merge a settings file with environment lookups; environment wins
    pub fn resolve<F>(settings: &SettingsFile, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match var("CHAT_BACKEND").or_else(|| settings.chat.backend.clone()) {
            Some(name) => name.parse()?,
            None => BackendKind::OpenAi,
        };

        let port = match var("PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| ConfigError::Validation(format!("invalid PORT '{}'", p)))?,
            None => settings.server.port.unwrap_or(3000),
        };

        let timeout_secs = match var("UPSTREAM_TIMEOUT_SECS") {
            Some(t) => t.parse().map_err(|_| {
                ConfigError::Validation(format!("invalid UPSTREAM_TIMEOUT_SECS '{}'", t))
            })?,
            None => settings.chat.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        if timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "upstream timeout must be at least one second".into(),
            ));
        }

        let max_upload_bytes = match var("MAX_UPLOAD_BYTES") {
            Some(b) => b.parse().map_err(|_| {
                ConfigError::Validation(format!("invalid MAX_UPLOAD_BYTES '{}'", b))
            })?,
            None => settings
                .server
                .max_upload_bytes
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        };

        let api_key_env = settings
            .openai
            .api_key_env
            .as_deref()
            .unwrap_or("OPENAI_API_KEY");
        let token_env = settings.webhook.token_env.as_deref().unwrap_or("JWT_TOKEN");
        let password_env = settings
            .access
            .password_env
            .as_deref()
            .unwrap_or("ACCESS_PASSWORD");

        Ok(Self {
            host: var("HOST")
                .or_else(|| settings.server.host.clone())
                .unwrap_or_else(|| "127.0.0.1".into()),
            port,
            backend,
            openai: OpenAiSettings {
                base_url: var("OPENAI_BASE_URL")
                    .or_else(|| settings.openai.base_url.clone())
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.into())
                    .trim_end_matches('/')
                    .to_string(),
                api_key: var(api_key_env),
                prompt_id: var("OPENAI_PROMPT_ID").or_else(|| settings.openai.prompt_id.clone()),
                prompt_version: var("OPENAI_PROMPT_VERSION")
                    .or_else(|| settings.openai.prompt_version.clone()),
                model: var("OPENAI_MODEL").or_else(|| settings.openai.model.clone()),
            },
            webhook: WebhookSettings {
                url: var("N8N_WEBHOOK_URL").or_else(|| settings.webhook.url.clone()),
                token: var(token_env),
            },
            vector_store_id: var("VECTOR_STORE_ID").or_else(|| settings.vector_store.id.clone()),
            access_password: var(password_env),
            timeout_secs,
            max_upload_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::resolve(&SettingsFile::default(), lookup(&[])).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.backend, BackendKind::OpenAi);
        assert_eq!(config.openai.base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.access_password.is_none());
        assert!(config.openai.api_key.is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let settings = SettingsFile::from_toml(
            r#"
[chat]
backend = "openai"

[vector_store]
id = "vs_from_file"
"#,
        )
        .unwrap();

        let config = Config::resolve(
            &settings,
            lookup(&[("CHAT_BACKEND", "n8n"), ("VECTOR_STORE_ID", "vs_from_env")]),
        )
        .unwrap();

        assert_eq!(config.backend, BackendKind::Webhook);
        assert_eq!(config.vector_store_id.as_deref(), Some("vs_from_env"));
    }

    #[test]
    fn test_secret_env_names_from_file() {
        let settings = SettingsFile::from_toml(
            r#"
[openai]
api_key_env = "PODCAST_OPENAI_KEY"

[access]
password_env = "PODCAST_PASSWORD"
"#,
        )
        .unwrap();

        let config = Config::resolve(
            &settings,
            lookup(&[
                ("OPENAI_API_KEY", "ignored"),
                ("PODCAST_OPENAI_KEY", "sk-live"),
                ("PODCAST_PASSWORD", "letmein"),
            ]),
        )
        .unwrap();

        assert_eq!(config.openai.api_key.as_deref(), Some("sk-live"));
        assert_eq!(config.access_password.as_deref(), Some("letmein"));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = Config::resolve(
            &SettingsFile::default(),
            lookup(&[("ACCESS_PASSWORD", "  "), ("OPENAI_BASE_URL", "http://localhost:9000/v1/")]),
        )
        .unwrap();

        assert!(config.access_password.is_none());
        assert_eq!(config.openai.base_url, "http://localhost:9000/v1");
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::resolve(&SettingsFile::default(), lookup(&[("CHAT_BACKEND", "ollama")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = Config::resolve(&SettingsFile::default(), lookup(&[("PORT", "http")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = Config::resolve(
            &SettingsFile::default(),
            lookup(&[("UPSTREAM_TIMEOUT_SECS", "0")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = Config::resolve(
            &SettingsFile::default(),
            lookup(&[("OPENAI_API_KEY", "sk-secret"), ("ACCESS_PASSWORD", "hunter2")]),
        )
        .unwrap();

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-secret"));
        assert!(!rendered.contains("hunter2"));
    }
}
