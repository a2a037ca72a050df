// handlers/public/auth/logout.rs - POST /api/auth/logout handler

use axum::response::Json;
use serde_json::{json, Value};

/// POST /api/auth/logout - Tokens are stateless; the client discards its copy
pub async fn logout_post() -> Json<Value> {
    Json(json!({ "message": "Logged out successfully" }))
}
