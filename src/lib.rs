//! Transcript Assistant
//!
//! A personal AI assistant over a corpus of podcast and business
//! transcripts. The server proxies chat turns to a configured upstream
//! (OpenAI Responses API or an n8n webhook) and manages the transcript
//! vector store, keeping every credential server-side. The client side
//! holds the conversation state machine and a small HTTP client.

pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod gate;
pub mod providers;
pub mod routes;
pub mod vector_store;

use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::Config;
use gate::AccessGate;
use providers::ChatBackend;
use vector_store::VectorStoreClient;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: Arc<ChatBackend>,
    pub vector_store: Arc<VectorStoreClient>,
    pub gate: Arc<AccessGate>,
}

impl AppState {
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let backend = ChatBackend::from_config(&config)?;
        let vector_store = VectorStoreClient::from_config(&config)?;
        let gate = AccessGate::new(config.access_password.clone());

        Ok(Self {
            config: Arc::new(config),
            backend: Arc::new(backend),
            vector_store: Arc::new(vector_store),
            gate: Arc::new(gate),
        })
    }
}

/// The full HTTP application with CORS and request tracing
pub fn app(state: AppState) -> Router {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
