use axum::extract::Request;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use super::handlers::ApiError;
use crate::domain::authentication::ports::AuthServicePort;
use crate::inbound::http::router::AppState;
use crate::user::models::User;

/// Active user behind the request's bearer token, stored in request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Resolve the bearer token to an active user, or answer 401.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())?;

    let user = state.auth_service.current_user(token).await.map_err(|e| {
        tracing::debug!(error = %e, "Bearer authentication failed");
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

    let value = header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header"))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            ApiError::unauthorized("Invalid Authorization header format. Expected: Bearer <token>")
        })
}
