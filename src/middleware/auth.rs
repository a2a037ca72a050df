use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{validate_jwt, Claims};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated session context extracted from the JWT
#[derive(Clone, Debug)]
pub struct AuthSession {
    pub issued_at: i64,
}

impl From<Claims> for AuthSession {
    fn from(claims: Claims) -> Self {
        Self {
            issued_at: claims.iat,
        }
    }
}

/// JWT authentication middleware that validates tokens and injects the session
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers).ok_or_else(|| ApiError::unauthorized("No token provided"))?;

    let claims = validate_jwt(token, &state.config.security.jwt_secret).map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        ApiError::unauthorized("Invalid token")
    })?;

    if !claims.authenticated {
        return Err(ApiError::unauthorized("Invalid token"));
    }

    request.extensions_mut().insert(AuthSession::from(claims));

    Ok(next.run(request).await)
}

/// Returns the token of a `Bearer` Authorization header. An empty token is
/// still returned so it fails validation rather than counting as absent.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth_str = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    Some(auth_str.strip_prefix("Bearer ")?.trim())
}
