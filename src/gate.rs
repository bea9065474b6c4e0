//! Access gate
//!
//! A shared password exchanged for an opaque bearer token. Issued sessions
//! live in memory until logout or restart. The resolved [`AccessSession`]
//! travels with each request as an extension.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ApiError;

pub const INVALID_PASSWORD: &str = "Invalid password. Please try again.";
pub const AUTH_REQUIRED: &str = "Authentication required";

/// An authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessSession {
    pub session_id: String,
    pub issued_at: DateTime<Utc>,
    /// True when the gate is disabled and nobody logged in
    #[serde(default)]
    pub anonymous: bool,
}

/// Returned by a successful login
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub session_id: String,
    pub issued_at: DateTime<Utc>,
}

pub struct AccessGate {
    secret: Option<String>,
    sessions: RwLock<HashMap<String, AccessSession>>,
}

impl AccessGate {
    pub fn new(secret: Option<String>) -> Self {
        if secret.is_none() {
            tracing::warn!("no access password configured, the access gate is disabled");
        }
        Self {
            secret,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Exchange the shared password for a session token
    pub async fn login(&self, password: &str) -> Result<IssuedToken, ApiError> {
        let session = match self.secret.as_deref() {
            Some(secret) if secret == password => AccessSession {
                session_id: Uuid::new_v4().to_string(),
                issued_at: Utc::now(),
                anonymous: false,
            },
            Some(_) => {
                tracing::warn!("rejected login attempt");
                return Err(ApiError::Unauthorized(INVALID_PASSWORD.into()));
            }
            None => Self::anonymous(),
        };

        let token = Uuid::new_v4().simple().to_string();
        if session.anonymous {
            tracing::debug!(session_id = %session.session_id, "access gate disabled, token not stored");
        } else {
            self.sessions
                .write()
                .await
                .insert(token.clone(), session.clone());
            tracing::info!(session_id = %session.session_id, "access session issued");
        }

        Ok(IssuedToken {
            token,
            session_id: session.session_id,
            issued_at: session.issued_at,
        })
    }

    /// Revoke a token; returns whether it was known
    pub async fn logout(&self, token: &str) -> bool {
        let removed = self.sessions.write().await.remove(token);
        if let Some(ref session) = removed {
            tracing::info!(session_id = %session.session_id, "access session revoked");
        }
        removed.is_some()
    }

    /// Resolve the session for an optional bearer token
    pub async fn authorize(&self, token: Option<&str>) -> Result<AccessSession, ApiError> {
        if let Some(token) = token {
            if let Some(session) = self.sessions.read().await.get(token) {
                return Ok(session.clone());
            }
        }

        if self.is_enabled() {
            Err(ApiError::Unauthorized(AUTH_REQUIRED.into()))
        } else {
            Ok(Self::anonymous())
        }
    }

    fn anonymous() -> AccessSession {
        AccessSession {
            session_id: Uuid::new_v4().to_string(),
            issued_at: Utc::now(),
            anonymous: true,
        }
    }
}

/// Extract the token from an `Authorization: Bearer ...` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Middleware placing an [`AccessSession`] in the request extensions
pub async fn require_session(
    State(gate): State<Arc<AccessGate>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).map(str::to_string);
    let session = gate.authorize(token.as_deref()).await?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}
