//! n8n workflow webhook provider

use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde_json::Value;

use crate::config::WebhookSettings;

use super::{ChatQuery, ChatReply, ProviderError};

pub const NOT_FOUND: &str =
    "Webhook URL not found. Please check your n8n workflow is active and the URL is correct.";
pub const JWT_FAILED: &str =
    "JWT authentication failed. Please check your token matches the n8n secret.";
pub const EMPTY_REPLY: &str = "No response from AI";

const OUTPUT_KEYS: &[&str] = &["output", "response", "text", "message"];

pub struct WebhookProvider {
    client: Client,
    settings: WebhookSettings,
}

impl WebhookProvider {
    pub fn new(client: Client, settings: WebhookSettings) -> Self {
        Self { client, settings }
    }

    pub async fn chat(&self, query: &ChatQuery) -> Result<ChatReply, ProviderError> {
        let url = self
            .settings
            .url
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("Webhook URL not configured".into()))?;

        let mut request = self
            .client
            .get(url)
            .query(&[("message", &query.message), ("sessionId", &query.session_id)])
            .header(CONTENT_TYPE, "application/json");

        if let Some(ref token) = self.settings.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(%status, body = %body, "n8n webhook error");

            if status == StatusCode::NOT_FOUND {
                return Err(ProviderError::NotFound(NOT_FOUND.into()));
            }
            if status == StatusCode::UNAUTHORIZED || body.contains("invalid signature") {
                return Err(ProviderError::Unauthorized(JWT_FAILED.into()));
            }
            return Err(ProviderError::Upstream {
                status: status.as_u16(),
                message: format!("N8N API error ({})", status.as_u16()),
            });
        }

        if is_json {
            match serde_json::from_str::<Value>(&body) {
                Ok(data) => return normalize(data, query),
                Err(e) => tracing::warn!(error = %e, "webhook sent malformed JSON, using raw text"),
            }
        } else {
            tracing::debug!(body = %body, "webhook replied with plain text");
        }

        let text = body.trim();
        Ok(ChatReply {
            output: if text.is_empty() {
                EMPTY_REPLY.to_string()
            } else {
                text.to_string()
            },
            session_id: query.session_id.clone(),
            response_id: None,
            status: None,
        })
    }
}

/// Map a webhook JSON payload onto the chat reply shape.
///
/// Workflows commonly answer with either an object or a one-element array
/// wrapping it.
fn normalize(data: Value, query: &ChatQuery) -> Result<ChatReply, ProviderError> {
    let data = match data {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        other => other,
    };

    let field = |key: &str| {
        data.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let output = match &data {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        _ => OUTPUT_KEYS
            .iter()
            .find_map(|key| data.get(*key).and_then(output_text)),
    }
    .ok_or_else(|| ProviderError::InvalidResponse(format!("No output field in webhook reply: {}", data)))?;

    Ok(ChatReply {
        output,
        session_id: field("sessionId").unwrap_or_else(|| query.session_id.clone()),
        response_id: field("responseId"),
        status: field("status"),
    })
}

/// Text of an output value; structured values are passed on as JSON
fn output_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.trim().to_string()).filter(|t| !t.is_empty()),
        Value::Array(items) if items.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::http_client;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> WebhookProvider {
        WebhookProvider::new(
            http_client(5).unwrap(),
            WebhookSettings {
                url: Some(format!("{}/webhook/assistant", server.uri())),
                token: Some("jwt-token".into()),
            },
        )
    }

    fn query() -> ChatQuery {
        ChatQuery {
            message: "What did we discuss & agree?".into(),
            session_id: "session-9".into(),
            previous_response_id: None,
        }
    }

    #[tokio::test]
    async fn test_json_reply() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/webhook/assistant"))
            .and(query_param("message", "What did we discuss & agree?"))
            .and(query_param("sessionId", "session-9"))
            .and(header("authorization", "Bearer jwt-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "output": "You agreed on a March launch." }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let reply = provider(&server).chat(&query()).await.unwrap();
        assert_eq!(reply.output, "You agreed on a March launch.");
        assert_eq!(reply.session_id, "session-9");
        assert!(reply.response_id.is_none());
    }

    #[tokio::test]
    async fn test_plain_text_reply_is_wrapped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/plain")
                    .set_body_string("Plain answer"),
            )
            .mount(&server)
            .await;

        let reply = provider(&server).chat(&query()).await.unwrap();
        assert_eq!(reply.output, "Plain answer");
        assert_eq!(reply.session_id, "session-9");
    }

    #[tokio::test]
    async fn test_empty_text_reply() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/plain"))
            .mount(&server)
            .await;

        let reply = provider(&server).chat(&query()).await.unwrap();
        assert_eq!(reply.output, EMPTY_REPLY);
    }

    #[tokio::test]
    async fn test_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("webhook not registered"))
            .mount(&server)
            .await;

        let err = provider(&server).chat(&query()).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(ref msg) if msg == NOT_FOUND));
    }

    #[tokio::test]
    async fn test_invalid_signature_is_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("invalid signature"))
            .mount(&server)
            .await;

        let err = provider(&server).chat(&query()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unauthorized(ref msg) if msg == JWT_FAILED));
    }

    #[tokio::test]
    async fn test_server_error_is_mirrored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("workflow crashed"))
            .mount(&server)
            .await;

        let err = provider(&server).chat(&query()).await.unwrap_err();
        match err {
            ProviderError::Upstream { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "N8N API error (502)");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_normalize_keys() {
        let reply = normalize(
            json!({ "response": "from response key", "sessionId": "srv-1", "responseId": "r-1" }),
            &query(),
        )
        .unwrap();
        assert_eq!(reply.output, "from response key");
        assert_eq!(reply.session_id, "srv-1");
        assert_eq!(reply.response_id.as_deref(), Some("r-1"));

        let reply = normalize(json!({ "output": 42 }), &query()).unwrap();
        assert_eq!(reply.output, "42");

        let reply = normalize(json!({ "output": { "answer": "structured" } }), &query()).unwrap();
        assert_eq!(reply.output, r#"{"answer":"structured"}"#);

        let reply = normalize(json!({ "output": null, "text": "from text key" }), &query()).unwrap();
        assert_eq!(reply.output, "from text key");

        let err = normalize(json!({ "unexpected": true }), &query()).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
