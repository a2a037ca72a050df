// handlers/public/auth/login.rs - POST /api/auth/login handler

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{issue_token, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: Option<String>,
}

/// POST /api/auth/login - Exchange the shared password for a JWT
///
/// Expected Input:
/// ```json
/// { "password": "string" }
/// ```
///
/// Expected Output (Success):
/// ```json
/// { "token": "eyJhbGciOiJIUzI1NiI..." }
/// ```
pub async fn login_post(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(payload) = payload?;

    let password = payload
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::bad_request("Password is required"))?;

    let security = &state.config.security;
    if !verify_password(&password, &security.auth_password) {
        tracing::warn!("Login rejected: invalid password");
        return Err(ApiError::unauthorized("Invalid password"));
    }

    let token = issue_token(security).map_err(|e| ApiError::internal("Error issuing token", &e))?;
    tracing::info!("Login succeeded");

    Ok(Json(json!({ "token": token })))
}
