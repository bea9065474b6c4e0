//! Chat proxy endpoint

use axum::{
    extract::{Query, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::gate::AccessSession;
use crate::providers::{ChatQuery, ChatReply};
use crate::AppState;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatParams {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub previous_response_id: Option<String>,
}

impl ChatParams {
    /// Fields present in `self` win over `fallback`
    fn or(self, fallback: ChatParams) -> ChatParams {
        ChatParams {
            message: self.message.or(fallback.message),
            session_id: self.session_id.or(fallback.session_id),
            previous_response_id: self.previous_response_id.or(fallback.previous_response_id),
        }
    }

    fn into_query(self) -> ApiResult<ChatQuery> {
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let message = non_blank(self.message)
            .ok_or_else(|| ApiError::BadRequest("Message is required".into()))?;

        Ok(ChatQuery {
            message,
            session_id: non_blank(self.session_id)
                .unwrap_or_else(|| format!("session-{}", Utc::now().timestamp_millis())),
            previous_response_id: non_blank(self.previous_response_id),
        })
    }
}

pub async fn chat_get(
    State(state): State<AppState>,
    Extension(access): Extension<AccessSession>,
    Query(params): Query<ChatParams>,
) -> ApiResult<Json<ChatReply>> {
    forward(&state, &access, params).await
}

/// POST accepts the same fields as a JSON body, falling back to the query
pub async fn chat_post(
    State(state): State<AppState>,
    Extension(access): Extension<AccessSession>,
    Query(params): Query<ChatParams>,
    body: Option<Json<ChatParams>>,
) -> ApiResult<Json<ChatReply>> {
    let params = match body {
        Some(Json(body)) => body.or(params),
        None => params,
    };
    forward(&state, &access, params).await
}

async fn forward(
    state: &AppState,
    access: &AccessSession,
    params: ChatParams,
) -> ApiResult<Json<ChatReply>> {
    let query = params.into_query()?;

    tracing::info!(
        access_session = %access.session_id,
        session_id = %query.session_id,
        backend = %state.backend.kind(),
        continued = query.previous_response_id.is_some(),
        "chat request"
    );

    let reply = state.backend.chat(&query).await?;
    Ok(Json(reply))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_message_rejected() {
        let params = ChatParams {
            message: Some("   ".into()),
            ..Default::default()
        };
        let err = params.into_query().unwrap_err();
        assert_eq!(err.to_string(), "Message is required");
    }

    #[test]
    fn test_defaults_session_and_drops_blank_continuation() {
        let params = ChatParams {
            message: Some("hello".into()),
            session_id: None,
            previous_response_id: Some(String::new()),
        };
        let query = params.into_query().unwrap();
        assert!(query.session_id.starts_with("session-"));
        assert!(query.previous_response_id.is_none());
    }

    #[test]
    fn test_body_wins_over_query() {
        let body = ChatParams {
            message: Some("from body".into()),
            ..Default::default()
        };
        let query = ChatParams {
            message: Some("from query".into()),
            session_id: Some("s-1".into()),
            previous_response_id: None,
        };
        let merged = body.or(query);
        assert_eq!(merged.message.as_deref(), Some("from body"));
        assert_eq!(merged.session_id.as_deref(), Some("s-1"));
    }
}
