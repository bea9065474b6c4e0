//! Access gate login/logout

use axum::{extract::State, http::HeaderMap, response::Json};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::gate::{bearer_token, IssuedToken};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<IssuedToken>> {
    let issued = state.gate.login(&request.password).await?;
    Ok(Json(issued))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<LogoutResponse> {
    let success = match bearer_token(&headers) {
        Some(token) => state.gate.logout(token).await,
        None => false,
    };
    Json(LogoutResponse { success })
}
