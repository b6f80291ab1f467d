use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum_extra::extract::CookieJar;

use super::ApiError;
use crate::domain::authentication::ports::AuthServicePort;
use crate::inbound::http::cookies::presented_refresh_secret;
use crate::inbound::http::router::AppState;

/// Revoke the presented refresh token and clear the cookie.
///
/// Unknown or already revoked tokens still answer 204. Storage failures
/// propagate.
pub async fn sign_out(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    if let Some(secret) = presented_refresh_secret(&jar) {
        state.auth_service.sign_out(secret).await?;
    }

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, state.cookies.clear_refresh_cookie()?);

    Ok((StatusCode::NO_CONTENT, headers))
}
