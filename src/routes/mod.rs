//! API routes

mod auth;
mod chat;
mod transcripts;

use axum::{
    extract::{DefaultBodyLimit, State},
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::config::BackendKind;
use crate::gate::require_session;
use crate::AppState;

pub use auth::LogoutResponse;
pub use chat::ChatParams;
pub use transcripts::{is_text_upload, DeleteResponse, UploadResponse};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend: BackendKind,
    pub access_gate: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        backend: state.backend.kind(),
        access_gate: state.gate.is_enabled(),
    })
}

pub fn router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    let protected = Router::new()
        .route("/api/chat", get(chat::chat_get).post(chat::chat_post))
        .route(
            "/api/list-transcripts",
            get(transcripts::list).delete(transcripts::delete),
        )
        .route(
            "/api/upload-transcript",
            post(transcripts::upload).layer(upload_limit),
        )
        .route("/api/auth/logout", post(auth::logout))
        .route_layer(middleware::from_fn_with_state(
            state.gate.clone(),
            require_session,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/api/auth/login", post(auth::login))
        .merge(protected)
        .with_state(state)
}
